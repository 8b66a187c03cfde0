//! Cursor pagination shared by every list endpoint.

/// Maximum items returned per page.
pub const PAGE_SIZE: usize = 100;

/// Opaque cursor token for an item key (prompt name, tool name, resource name, task id).
///
/// A 32-bit FNV-1a hash rendered in decimal: a stable opaque token, not a secret.
pub fn cursor_token(key: &str) -> String {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in key.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash.to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Token of the first item after this page, if there is one.
    pub next_cursor: Option<String>,
}

/// Slice `items` into one page.
///
/// The page starts at the item whose token equals `cursor`. No cursor, or a
/// cursor matching nothing, starts from the beginning.
pub fn paginate<T, F>(items: Vec<T>, cursor: Option<&str>, key: F) -> Page<T>
where
    F: Fn(&T) -> &str,
{
    let start = cursor
        .and_then(|c| items.iter().position(|item| cursor_token(key(item)) == c))
        .unwrap_or(0);

    let next_cursor = items.get(start + PAGE_SIZE).map(|item| cursor_token(key(item)));
    let items = items.into_iter().skip(start).take(PAGE_SIZE).collect();

    Page { items, next_cursor }
}
