/// Build a composite column label: `"<field> [<category>]"`.
///
/// Empty segments stay in place, so `fuse("", "")` is `" []"`.
pub fn fuse(field: &str, category: &str) -> String {
    format!("{} [{}]", field, category)
}

/// Text strictly between the first `[` and the first `]` of `label`.
///
/// Returns `None` when either bracket is absent. A `]` that appears before
/// the first `[` yields an empty segment rather than `None`.
pub fn bracket_segment(label: &str) -> Option<&str> {
    let start = label.find('[')?;
    let end = label.find(']')?;
    if end < start {
        return Some("");
    }
    Some(&label[start + 1..end])
}

/// The field half of a composite label, i.e. everything before `" ["`.
pub fn field_part(label: &str) -> &str {
    match label.find(" [") {
        Some(idx) => &label[..idx],
        None => label,
    }
}

/// True when the label's bracket segment contains `category` as a substring.
pub fn in_category(label: &str, category: &str) -> bool {
    bracket_segment(label).map_or(false, |seg| seg.contains(category))
}
