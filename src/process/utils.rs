/// Tokens read as a missing cell.
pub const NULL_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "null", "NULL", "None", "#N/A", "<NA>",
];

/// Map a raw CSV field to a cell: null tokens become `None`, everything else
/// is kept verbatim.
pub fn to_cell(raw: &str) -> Option<String> {
    if NULL_TOKENS.contains(&raw) {
        None
    } else {
        Some(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_tokens_are_missing() {
        assert_eq!(to_cell(""), None);
        assert_eq!(to_cell("NaN"), None);
        assert_eq!(to_cell("N/A"), None);
        assert_eq!(to_cell("CA"), Some("CA".to_string()));
        assert_eq!(to_cell(" "), Some(" ".to_string()));
    }
}
