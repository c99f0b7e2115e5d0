//! Slug normalization used as the identity of tags.
//!
//! `normalize` transliterates to ASCII, lower-cases and collapses every run
//! of non-alphanumeric characters into a single `-`. Text without any
//! alphanumeric content normalizes to the empty slug, which the store
//! refuses as a tag key.

use deunicode::deunicode;

/// Separator placed between words of a slug
pub const SEPARATOR: char = '-';

/// Map arbitrary text to a URL-safe slug. Pure and idempotent.
pub fn normalize(text: &str) -> String {
    let ascii = deunicode(text);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_separator = false;

    for ch in ascii.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push(SEPARATOR);
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    slug
}
