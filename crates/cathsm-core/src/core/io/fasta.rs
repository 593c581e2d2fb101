use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FastaError {
    #[error("I/O error while reading FASTA: {0}")]
    Io(#[from] io::Error),

    #[error("Sequence data on line {line} appears before any '>' header")]
    MissingHeader { line: usize },

    #[error("Empty sequence identifier on line {line}")]
    EmptyId { line: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    pub id: String,
    pub description: String,
    pub sequence: String,
}

impl SequenceRecord {
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

pub fn read_from(reader: impl BufRead) -> Result<Vec<SequenceRecord>, FastaError> {
    let mut records = Vec::new();
    let mut current: Option<SequenceRecord> = None;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') {
            continue;
        }

        if let Some(header) = trimmed.strip_prefix('>') {
            if let Some(done) = current.take() {
                records.push(done);
            }
            let header = header.trim();
            let (id, description) = match header.split_once(char::is_whitespace) {
                Some((id, rest)) => (id, rest.trim()),
                None => (header, ""),
            };
            if id.is_empty() {
                return Err(FastaError::EmptyId { line: line_no });
            }
            current = Some(SequenceRecord {
                id: id.to_string(),
                description: description.to_string(),
                sequence: String::new(),
            });
        } else {
            let record = current
                .as_mut()
                .ok_or(FastaError::MissingHeader { line: line_no })?;
            record
                .sequence
                .extend(trimmed.chars().filter(|c| !c.is_whitespace()));
        }
    }

    if let Some(done) = current {
        records.push(done);
    }
    Ok(records)
}

pub fn read_from_path(path: &Path) -> Result<Vec<SequenceRecord>, FastaError> {
    let file = File::open(path)?;
    read_from(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_multi_line_records() {
        let input = ">seq1 first protein\nMKVL\nAAGG\n\n>seq2\nPPQ\n";

        let records = read_from(Cursor::new(input)).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "seq1");
        assert_eq!(records[0].description, "first protein");
        assert_eq!(records[0].sequence, "MKVLAAGG");
        assert_eq!(records[0].len(), 8);
        assert_eq!(records[1].id, "seq2");
        assert_eq!(records[1].description, "");
        assert_eq!(records[1].sequence, "PPQ");
    }

    #[test]
    fn header_without_sequence_yields_empty_record() {
        let records = read_from(Cursor::new(">lonely\n")).unwrap();

        assert_eq!(records.len(), 1);
        assert!(records[0].is_empty());
    }

    #[test]
    fn sequence_before_header_is_rejected() {
        let result = read_from(Cursor::new("MKV\n>seq\nAAA\n"));

        assert!(matches!(result, Err(FastaError::MissingHeader { line: 1 })));
    }

    #[test]
    fn empty_identifier_is_rejected() {
        let result = read_from(Cursor::new(">\nAAA\n"));

        assert!(matches!(result, Err(FastaError::EmptyId { line: 1 })));
    }

    #[test]
    fn empty_input_yields_no_records() {
        assert!(read_from(Cursor::new("")).unwrap().is_empty());
    }
}
