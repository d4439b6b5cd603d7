#![deny(dead_code)]
#![deny(unreachable_patterns)]
#![deny(unused_extern_crates)]
#![deny(unused_imports)]
#![deny(unused_qualifications)]
#![deny(clippy::all)]
#![deny(missing_docs)]

//! A set of utilities used across crates: xhtml escaping with a small
//! whitelist of inline tags, mimetype guessing for epub resources,
//! and digit grouping for human-readable counts.

use aho_corasick::AhoCorasick;
use lazy_static::lazy_static;
use std::borrow::Cow;
mod mimetypes;
pub use mimetypes::{GuessMimeType, MimeType, MimeTypeHelper};

lazy_static! {
    static ref XHTML_FINDER: AhoCorasick = AhoCorasick::new(&XHTML_TARGET_CHARS);
    static ref INLINE_TAG_FINDER: AhoCorasick = AhoCorasick::new(&ESCAPED_INLINE_TAGS);
}

static XHTML_TARGET_CHARS: [&str; 3] = ["&", "<", ">"];

static XHTML_REPLACEMENTS: [&str; 3] = ["&amp;", "&lt;", "&gt;"];

static ESCAPED_INLINE_TAGS: [&str; 4] = ["&lt;b&gt;", "&lt;/b&gt;", "&lt;i&gt;", "&lt;/i&gt;"];

static INLINE_TAG_RESTORATIONS: [&str; 4] = ["<b>", "</b>", "<i>", "</i>"];

/// escape `input` for xhtml output
pub fn escape_to_xhtml<'a, S: Into<Cow<'a, str>>>(input: S) -> Cow<'a, str> {
    let input = input.into();
    let input_bytes = input.as_bytes();
    if XHTML_FINDER.is_match(input_bytes) {
        let mut wtr = Vec::with_capacity(input.len());
        XHTML_FINDER
            .stream_replace_all(input_bytes, &mut wtr, &XHTML_REPLACEMENTS)
            .expect("Aho-Corasick error");
        unsafe { Cow::Owned(String::from_utf8_unchecked(wtr)) }
    } else {
        input
    }
}

/// escape `input` for xhtml output, but let a fixed whitelist of inline
/// tags (`<b>`, `</b>`, `<i>`, `</i>`) through as markup.
///
/// Everything is escaped first and the whitelisted tags are then
/// restored from their escaped forms, so no other markup can survive.
///
/// ```
/// use pagecut_common::escape_with_inline_tags;
/// let out = escape_with_inline_tags("<b>2 & 3</b> <script>");
/// assert_eq!(out, "<b>2 &amp; 3</b> &lt;script&gt;");
/// ```
pub fn escape_with_inline_tags<'a, S: Into<Cow<'a, str>>>(input: S) -> Cow<'a, str> {
    let escaped = escape_to_xhtml(input);
    let escaped_bytes = escaped.as_bytes();
    if INLINE_TAG_FINDER.is_match(escaped_bytes) {
        let mut wtr = Vec::with_capacity(escaped.len());
        INLINE_TAG_FINDER
            .stream_replace_all(escaped_bytes, &mut wtr, &INLINE_TAG_RESTORATIONS)
            .expect("Aho-Corasick error");
        unsafe { Cow::Owned(String::from_utf8_unchecked(wtr)) }
    } else {
        escaped
    }
}

/// format `n` with thousands separators: 12345 -> `12,345`
pub fn group_digits(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let offset = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i != 0 && i % 3 == offset {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape_to_xhtml("a < b & c > d"), "a &lt; b &amp; c &gt; d");
        let unchanged = "Hello world";
        assert_eq!(escape_to_xhtml(unchanged), Cow::Borrowed(unchanged));
    }

    #[test]
    fn test_inline_tag_whitelist() {
        assert_eq!(
            escape_with_inline_tags("He said <i>wait</i> & left"),
            "He said <i>wait</i> &amp; left"
        );
        // anything outside the whitelist stays escaped
        assert_eq!(
            escape_with_inline_tags("<em>no</em><b>yes</b>"),
            "&lt;em&gt;no&lt;/em&gt;<b>yes</b>"
        );
    }

    #[test]
    fn test_group_digits() {
        assert_eq!(group_digits(0), "0");
        assert_eq!(group_digits(999), "999");
        assert_eq!(group_digits(1000), "1,000");
        assert_eq!(group_digits(1234567), "1,234,567");
    }
}
