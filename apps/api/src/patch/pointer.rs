//! RFC 6901 style pointers: `/work/0/bullets/1`, with `~1` for `/` and `~0`
//! for `~` inside a segment.

/// Splits a pointer into unescaped segments. A string that does not start
/// with `/` (including the empty string) addresses the root and yields no
/// segments.
pub fn parse_pointer(pointer: &str) -> Vec<String> {
    match pointer.strip_prefix('/') {
        Some(rest) => rest.split('/').map(unescape).collect(),
        None => Vec::new(),
    }
}

pub fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

pub fn escape(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// How a segment reads when the container it addresses is an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayIndex {
    Index(usize),
    /// An integer below zero; never in bounds.
    Negative,
    /// Not an integer at all (including the `-` append token).
    Invalid,
}

pub fn parse_index(token: &str) -> ArrayIndex {
    match token.parse::<i64>() {
        Ok(n) if n < 0 => ArrayIndex::Negative,
        Ok(n) => usize::try_from(n).map_or(ArrayIndex::Invalid, ArrayIndex::Index),
        Err(_) => ArrayIndex::Invalid,
    }
}
