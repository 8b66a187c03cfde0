//! Name normalization for tool and prompt lookup.

/// Lowercase `text`, drop everything but word characters, spaces and dashes,
/// then turn runs of whitespace into single dashes.
///
/// `"Code Review!"`, `"code review"` and `"code-review"` all map to `"code-review"`.
pub fn slug(text: &str) -> String {
    let cleaned: String = text
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Whether two names refer to the same entry.
pub fn same_slug(a: &str, b: &str) -> bool {
    slug(a) == slug(b)
}
