//! Shared helpers with no knowledge of plans or engines.

pub mod hash;
pub mod mime;
pub mod path;

/// `"s"` unless `n == 1`.
#[inline]
pub fn plural_s(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// `"3 files"`, `"1 file"`.
#[inline]
pub fn plural_count(count: usize, noun: &str) -> String {
    format!("{count} {noun}{}", plural_s(count))
}
