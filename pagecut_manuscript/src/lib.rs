//! Parse a plain-text manuscript into a metadata block and a stream of
//! typed content units.
//!
//! A manuscript is a header of `KEY: value` lines terminated by the
//! literal delimiter line `=== START OF CONTENT ===`, followed by body
//! lines in one of four forms:
//!
//! - `[Part One > Chapter 1]` -- a section heading with its hierarchy
//! - `@img: diagram.png | A diagram` -- an image directive
//! - `===` -- a paragraph boundary
//! - anything else -- raw sentence text, accumulated until the next
//!   boundary and then run through the sentence segmenter
//!
//! If the delimiter is missing the whole file is treated as content and
//! the metadata is empty; this is deliberate leniency, not an error.

#![deny(dead_code)]
#![deny(unreachable_patterns)]
#![deny(unused_extern_crates)]
#![deny(unused_imports)]
#![deny(unused_qualifications)]
#![deny(clippy::all)]
#![deny(missing_docs)]

use sentence_segmenter::Segmenter;
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

mod metadata;
pub use metadata::Metadata;

/// The line separating the metadata header from the manuscript body
pub static HEADER_DELIMITER: &str = "=== START OF CONTENT ===";

/// Decorative glyph appended to the final sentence of each flushed
/// paragraph group, used by renderers as a typographic end-of-unit cue
pub static UNIT_END_MARK: &str = "\u{2756}";

/// Errors possible while loading a manuscript
#[derive(Debug)]
pub enum ManuscriptError {
    /// the manuscript file could not be read
    FileRead(PathBuf, std::io::Error),
}

impl fmt::Display for ManuscriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Error for ManuscriptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ManuscriptError::FileRead(_, e) => Some(e),
        }
    }
}

/// A single classified line from the manuscript body.
///
/// Classification is order-sensitive: the heading, image and break
/// forms take priority over free text.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentLine {
    /// `[A > B > C]`, outermost level first
    SectionHeading(Vec<String>),
    /// `@img: file | caption`; the caption portion is optional
    ImageDirective {
        /// image filename, relative to the images directory
        file: String,
        /// caption and alt text; empty when not given
        caption: String,
    },
    /// `===`
    ParagraphBreak,
    /// any other non-empty line
    SentenceText(String),
}

impl ContentLine {
    /// Classify one trimmed, non-empty body line
    pub fn classify(line: &str) -> ContentLine {
        if line.starts_with('[') && line.ends_with(']') {
            let levels = line[1..line.len() - 1]
                .split(" > ")
                .map(|s| s.to_string())
                .collect();
            ContentLine::SectionHeading(levels)
        } else if let Some(rest) = line.strip_prefix("@img:") {
            let mut parts = rest.splitn(2, '|');
            let file = parts.next().unwrap_or("").trim().to_string();
            let caption = parts.next().unwrap_or("").trim().to_string();
            ContentLine::ImageDirective { file, caption }
        } else if line == "===" {
            ContentLine::ParagraphBreak
        } else {
            ContentLine::SentenceText(line.to_string())
        }
    }
}

/// A manuscript split into its metadata and classified body lines
#[derive(Debug)]
pub struct Manuscript {
    /// the parsed header block
    pub metadata: Metadata,
    /// the classified body lines, in order
    pub lines: Vec<ContentLine>,
    /// whether the header delimiter was present
    pub has_header: bool,
}

impl Manuscript {
    /// Split raw manuscript text on the header delimiter and classify
    /// the body. A missing delimiter yields empty metadata and treats
    /// the whole text as content.
    pub fn from_text(text: &str) -> Self {
        let (header, body, has_header) = match text.find(HEADER_DELIMITER) {
            Some(at) => (&text[..at], &text[at + HEADER_DELIMITER.len()..], true),
            None => ("", text, false),
        };
        let metadata = Metadata::from_header_block(header);
        let lines = body
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(ContentLine::classify)
            .collect();
        Manuscript {
            metadata,
            lines,
            has_header,
        }
    }

    /// Read and split a manuscript file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ManuscriptError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ManuscriptError::FileRead(path.to_path_buf(), e))?;
        Ok(Manuscript::from_text(&text))
    }
}

/// One unit of parsed content, ready for rendering
#[derive(Debug, Clone, PartialEq)]
pub enum ContentUnit {
    /// a section heading with its full hierarchy
    Heading {
        /// hierarchy segments, outermost first
        levels: Vec<String>,
    },
    /// an image with its caption
    Image {
        /// image filename
        file: String,
        /// caption and alt text
        caption: String,
    },
    /// one flushed paragraph group of segmented sentences; the final
    /// sentence carries the end-of-unit mark
    Sentences(Vec<String>),
}

/// the HTML heading tag level for a hierarchy of the given depth,
/// capped at `h6`
pub fn html_heading_level(depth: usize) -> usize {
    (depth + 1).min(6)
}

/// Everything produced by a structural parse
#[derive(Debug, Default)]
pub struct ParseOutcome {
    /// the content units, in manuscript order
    pub units: Vec<ContentUnit>,
    /// image files referenced by directives but absent from disk
    pub missing_images: Vec<String>,
    /// malformed directive lines that were skipped
    pub skipped_lines: Vec<String>,
}

/// Walks the classified line stream, accumulating consecutive sentence
/// text into a paragraph buffer and flushing it through the segmenter
/// whenever a directive or the end of input is reached.
#[derive(Debug)]
pub struct StructuralParser<'a> {
    segmenter: &'a Segmenter,
    images_dir: Option<PathBuf>,
}

impl<'a> StructuralParser<'a> {
    /// a parser delegating sentence text to `segmenter`
    pub fn new(segmenter: &'a Segmenter) -> Self {
        StructuralParser {
            segmenter,
            images_dir: None,
        }
    }

    /// Check image directives against this directory; directives whose
    /// file is absent are still emitted but recorded as missing.
    pub fn images_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.images_dir = Some(dir.into());
        self
    }

    /// Consume the line stream and produce the unit stream
    pub fn parse(&self, lines: &[ContentLine]) -> ParseOutcome {
        let mut outcome = ParseOutcome::default();
        let mut buffer: Vec<&str> = Vec::new();

        for line in lines.iter() {
            match line {
                ContentLine::SectionHeading(levels) => {
                    self.flush(&mut buffer, &mut outcome.units);
                    if levels.iter().all(|l| l.trim().is_empty()) {
                        outcome
                            .skipped_lines
                            .push(format!("[{}]", levels.join(" > ")));
                    } else {
                        outcome.units.push(ContentUnit::Heading {
                            levels: levels.clone(),
                        });
                    }
                }
                ContentLine::ImageDirective { file, caption } => {
                    self.flush(&mut buffer, &mut outcome.units);
                    if file.is_empty() {
                        outcome
                            .skipped_lines
                            .push(format!("@img: {} | {}", file, caption));
                        continue;
                    }
                    if let Some(ref dir) = self.images_dir {
                        if !dir.join(file).is_file() {
                            outcome.missing_images.push(file.clone());
                        }
                    }
                    outcome.units.push(ContentUnit::Image {
                        file: file.clone(),
                        caption: caption.clone(),
                    });
                }
                ContentLine::ParagraphBreak => {
                    self.flush(&mut buffer, &mut outcome.units);
                }
                ContentLine::SentenceText(text) => {
                    buffer.push(text);
                }
            }
        }
        self.flush(&mut buffer, &mut outcome.units);

        outcome
    }

    fn flush(&self, buffer: &mut Vec<&str>, units: &mut Vec<ContentUnit>) {
        if buffer.is_empty() {
            return;
        }
        let joined = buffer.join(" ");
        buffer.clear();
        let mut sentences = self.segmenter.segment(&joined);
        if let Some(last) = sentences.last_mut() {
            last.push(' ');
            last.push_str(UNIT_END_MARK);
        }
        if !sentences.is_empty() {
            units.push(ContentUnit::Sentences(sentences));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_line_forms() {
        assert_eq!(
            ContentLine::classify("[Part One > Chapter 1]"),
            ContentLine::SectionHeading(vec!["Part One".to_string(), "Chapter 1".to_string()])
        );
        assert_eq!(
            ContentLine::classify("@img: map.png | The realm"),
            ContentLine::ImageDirective {
                file: "map.png".to_string(),
                caption: "The realm".to_string()
            }
        );
        assert_eq!(
            ContentLine::classify("@img: bare.png"),
            ContentLine::ImageDirective {
                file: "bare.png".to_string(),
                caption: String::new()
            }
        );
        assert_eq!(ContentLine::classify("==="), ContentLine::ParagraphBreak);
        assert_eq!(
            ContentLine::classify("Just some text."),
            ContentLine::SentenceText("Just some text.".to_string())
        );
    }

    #[test]
    fn split_on_delimiter() {
        let text = "TITLE: A Book\nPREFIX: AB\n=== START OF CONTENT ===\n[One]\nHello there. It works.\n===\n";
        let manuscript = Manuscript::from_text(text);
        assert_eq!(manuscript.metadata.title(), "A Book");
        assert_eq!(manuscript.lines.len(), 3);
        assert_eq!(
            manuscript.lines[0],
            ContentLine::SectionHeading(vec!["One".to_string()])
        );
    }

    #[test]
    fn missing_delimiter_is_degraded_mode() {
        let text = "Hello there.\nMore text here.\n";
        let manuscript = Manuscript::from_text(text);
        assert_eq!(manuscript.metadata.title(), "Untitled Book");
        assert_eq!(manuscript.lines.len(), 2);
    }

    fn parse(lines: &[ContentLine]) -> ParseOutcome {
        let segmenter = Segmenter::default();
        StructuralParser::new(&segmenter).parse(lines)
    }

    #[test]
    fn buffer_flushes_with_end_mark() {
        let lines = vec![
            ContentLine::SentenceText("One sentence here. And".to_string()),
            ContentLine::SentenceText("a second one split over lines.".to_string()),
            ContentLine::ParagraphBreak,
        ];
        let outcome = parse(&lines);
        assert_eq!(outcome.units.len(), 1);
        match &outcome.units[0] {
            ContentUnit::Sentences(sentences) => {
                assert_eq!(sentences.len(), 2);
                assert_eq!(sentences[0], "One sentence here.");
                assert_eq!(
                    sentences[1],
                    format!("And a second one split over lines. {}", UNIT_END_MARK)
                );
            }
            other => panic!("expected sentences, got {:?}", other),
        }
    }

    #[test]
    fn directives_flush_pending_text() {
        let lines = vec![
            ContentLine::SentenceText("Before the heading.".to_string()),
            ContentLine::SectionHeading(vec!["One".to_string()]),
            ContentLine::SentenceText("After the heading.".to_string()),
        ];
        let outcome = parse(&lines);
        assert_eq!(outcome.units.len(), 3);
        assert!(matches!(outcome.units[0], ContentUnit::Sentences(_)));
        assert!(matches!(outcome.units[1], ContentUnit::Heading { .. }));
        assert!(matches!(outcome.units[2], ContentUnit::Sentences(_)));
    }

    #[test]
    fn missing_images_are_recorded_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("real.png"), b"png").unwrap();
        let lines = vec![
            ContentLine::ImageDirective {
                file: "real.png".to_string(),
                caption: String::new(),
            },
            ContentLine::ImageDirective {
                file: "ghost.png".to_string(),
                caption: "gone".to_string(),
            },
        ];
        let segmenter = Segmenter::default();
        let outcome = StructuralParser::new(&segmenter)
            .images_dir(dir.path())
            .parse(&lines);
        // both units are emitted; only the absent file is reported
        assert_eq!(outcome.units.len(), 2);
        assert_eq!(outcome.missing_images, vec!["ghost.png".to_string()]);
    }

    #[test]
    fn malformed_image_directive_is_skipped() {
        let lines = vec![ContentLine::ImageDirective {
            file: String::new(),
            caption: "no file".to_string(),
        }];
        let outcome = parse(&lines);
        assert!(outcome.units.is_empty());
        assert_eq!(outcome.skipped_lines.len(), 1);
    }

    #[test]
    fn heading_tag_levels_cap_at_six() {
        assert_eq!(html_heading_level(1), 2);
        assert_eq!(html_heading_level(3), 4);
        assert_eq!(html_heading_level(5), 6);
        assert_eq!(html_heading_level(9), 6);
    }
}
