use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref KEY_VALUE: Regex = Regex::new(r"^([A-Z_]+):\s*(.+)$").unwrap();
}

/// The metadata of a manuscript, parsed once from its header block.
///
/// Keys are uppercase (`TITLE`, `PREFIX`, ...); unknown keys are
/// retained. Every accessor falls back to a default, so an empty or
/// absent header never fails.
#[derive(Debug, Default, Clone)]
pub struct Metadata {
    keys: HashMap<String, String>,
}

impl Metadata {
    /// Parse a header block line-by-line with the `KEY: value` pattern
    pub fn from_header_block(header: &str) -> Self {
        let mut keys = HashMap::new();
        for line in header.lines() {
            if let Some(captures) = KEY_VALUE.captures(line.trim()) {
                let key = captures.get(1).unwrap().as_str().to_string();
                let value = captures.get(2).unwrap().as_str().trim().to_string();
                let _ = keys.insert(key, value);
            }
        }
        Metadata { keys }
    }

    /// look up a raw key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.keys.get(key).map(|v| v.as_str())
    }

    /// The book title
    pub fn title(&self) -> &str {
        self.get("TITLE").unwrap_or("Untitled Book")
    }

    /// The book subtitle, shown on the cover
    pub fn subtitle(&self) -> &str {
        self.get("SUBTITLE").unwrap_or("")
    }

    /// The book author
    pub fn author(&self) -> &str {
        self.get("AUTHOR").unwrap_or("")
    }

    /// The filename prefix for emitted fragments
    pub fn prefix(&self) -> &str {
        self.get("PREFIX").unwrap_or("default_book")
    }

    /// The language tag for `xml:lang` attributes and `dc:language`
    pub fn language(&self) -> &str {
        self.get("LANGUAGE").unwrap_or("en")
    }

    /// The source art used when the cover was rendered
    pub fn cover_image_art(&self) -> &str {
        self.get("COVER_IMAGE_ART").unwrap_or("cover_art.jpg")
    }

    /// A stable book identifier, if one was supplied
    pub fn book_id(&self) -> Option<&str> {
        self.get("BOOK_ID")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_lines() {
        let header = "TITLE: The Stand\nAUTHOR: Stephen King\nPREFIX: STAND\nNOT a key\nlower: no\n";
        let metadata = Metadata::from_header_block(header);
        assert_eq!(metadata.title(), "The Stand");
        assert_eq!(metadata.author(), "Stephen King");
        assert_eq!(metadata.prefix(), "STAND");
        assert_eq!(metadata.get("NOT"), None);
        assert_eq!(metadata.get("lower"), None);
    }

    #[test]
    fn defaults_when_absent() {
        let metadata = Metadata::from_header_block("");
        assert_eq!(metadata.title(), "Untitled Book");
        assert_eq!(metadata.subtitle(), "");
        assert_eq!(metadata.prefix(), "default_book");
        assert_eq!(metadata.language(), "en");
        assert_eq!(metadata.cover_image_art(), "cover_art.jpg");
        assert!(metadata.book_id().is_none());
    }

    #[test]
    fn underscore_keys_and_trimming() {
        let metadata = Metadata::from_header_block("BOOK_ID:   urn:isbn:12345  \n");
        assert_eq!(metadata.book_id(), Some("urn:isbn:12345"));
    }
}
