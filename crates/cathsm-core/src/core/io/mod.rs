pub mod fasta;
pub mod hits;

/// Strips every non-word character so an identifier can be used as a file or directory name.
pub fn safe_name(id: &str) -> String {
    id.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_name_removes_non_word_characters() {
        assert_eq!(safe_name("sp|P12345|ABC_HUMAN"), "spP12345ABC_HUMAN");
        assert_eq!(safe_name("A0PJE2/35-316"), "A0PJE235316");
        assert_eq!(safe_name("../../etc"), "etc");
        assert_eq!(safe_name("plain_id"), "plain_id");
    }
}
