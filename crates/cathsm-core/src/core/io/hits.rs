use crate::core::models::ResolvedHit;
use std::io::Write;
use std::path::Path;

/// Writes resolved hits as a tab-separated table, one row per hit.
pub fn write_tsv<W: Write>(writer: W, hits: &[ResolvedHit]) -> Result<(), csv::Error> {
    let mut tsv = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);
    tsv.write_record(["hit", "uuid", "ff_id", "ff_name", "query_range"])?;
    for (index, hit) in hits.iter().enumerate() {
        tsv.write_record([
            (index + 1).to_string().as_str(),
            hit.uuid.as_str(),
            hit.ff_id.as_str(),
            hit.ff_name.as_str(),
            hit.query_range.as_str(),
        ])?;
    }
    tsv.flush()?;
    Ok(())
}

pub fn write_tsv_to_path(path: &Path, hits: &[ResolvedHit]) -> Result<(), csv::Error> {
    let file = std::fs::File::create(path)?;
    write_tsv(file, hits)
}
