//! Render parsed content units into standalone xhtml fragments.
//!
//! Every heading, image and sentence becomes its own file named
//! `{prefix}_{index:04}.xhtml`, numbered by one global monotonic
//! counter so filenames sort into reading order. The first fragment is
//! always the cover page and the second the text-statistics page;
//! `index.xhtml`, holding the visual table of contents, sits outside
//! the numeric sequence.

#![deny(dead_code)]
#![deny(unreachable_patterns)]
#![deny(unused_extern_crates)]
#![deny(unused_imports)]
#![deny(unused_qualifications)]
#![deny(clippy::all)]
#![deny(missing_docs)]

use epub_packer::toc::{build_tree, TocEntry, TocNode};
use pagecut_common::{escape_to_xhtml, escape_with_inline_tags, group_digits};
use pagecut_manuscript::{html_heading_level, ContentUnit, UNIT_END_MARK};
use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// the stylesheet every fragment links, relative to `OEBPS/text/`
static STYLESHEET_HREF: &str = "../Styles/Style001.css";

/// the words-per-page figure behind the estimated page count
pub static WORDS_PER_PAGE_ESTIMATE: u64 = 275;

/// Errors possible while emitting fragments
#[derive(Debug)]
pub enum EmitError {
    /// a fragment file could not be written
    FileWrite(PathBuf, std::io::Error),
    /// parsing produced no content units at all
    EmptyContent,
}

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Error for EmitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EmitError::FileWrite(_, e) => Some(e),
            EmitError::EmptyContent => None,
        }
    }
}

/// Document length metrics, shown on the stats page
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    /// number of sentences across all paragraph groups
    pub total_sentences: u64,
    /// number of whitespace-separated words
    pub total_words: u64,
    /// number of non-whitespace characters
    pub total_characters_clean: u64,
    /// `total_words / 275`, rounded up
    pub estimated_pages: u64,
    /// mean sentence length in words
    pub avg_words_per_sentence: f64,
}

impl Metrics {
    /// Measure the parsed unit stream. The decorative end-of-unit mark
    /// is not part of the text and is excluded.
    pub fn from_units(units: &[ContentUnit]) -> Self {
        let mut total_sentences = 0u64;
        let mut total_words = 0u64;
        let mut total_characters_clean = 0u64;

        for unit in units.iter() {
            if let ContentUnit::Sentences(sentences) = unit {
                for sentence in sentences.iter() {
                    let text = sentence.trim_end_matches(UNIT_END_MARK).trim_end();
                    total_sentences += 1;
                    total_words += text.split_whitespace().count() as u64;
                    total_characters_clean +=
                        text.chars().filter(|c| !c.is_whitespace()).count() as u64;
                }
            }
        }

        let estimated_pages = if total_words > 0 {
            (total_words + WORDS_PER_PAGE_ESTIMATE - 1) / WORDS_PER_PAGE_ESTIMATE
        } else {
            0
        };
        let avg_words_per_sentence = if total_sentences > 0 {
            total_words as f64 / total_sentences as f64
        } else {
            0.0
        };

        Metrics {
            total_sentences,
            total_words,
            total_characters_clean,
            estimated_pages,
            avg_words_per_sentence,
        }
    }
}

/// Everything the emission stage hands on to packaging
#[derive(Debug)]
pub struct EmissionSummary {
    /// toc entries collected from heading units, in emission order
    pub toc_entries: Vec<TocEntry>,
    /// content fragments written, excluding cover and stats
    pub content_fragments: usize,
}

/// The cursor owning fragment numbering and toc accumulation.
///
/// Fragments are written in strictly increasing index order; headings,
/// images and sentences share the one counter.
#[derive(Debug)]
pub struct FragmentEmitter {
    out_dir: PathBuf,
    prefix: String,
    language: String,
    start_index: usize,
    index: usize,
    content_count: usize,
    toc_entries: Vec<TocEntry>,
}

impl FragmentEmitter {
    /// an emitter writing `{prefix}_*.xhtml` files into `out_dir`
    pub fn new<P: Into<PathBuf>, S: ToString, L: ToString>(
        out_dir: P,
        prefix: S,
        language: L,
    ) -> Self {
        FragmentEmitter {
            out_dir: out_dir.into(),
            prefix: prefix.to_string(),
            language: language.to_string(),
            start_index: 1,
            index: 1,
            content_count: 0,
            toc_entries: Vec::new(),
        }
    }

    /// start numbering at `start_index` instead of 1
    pub fn with_start_index(mut self, start_index: usize) -> Self {
        self.start_index = start_index;
        self.index = start_index;
        self
    }

    fn current_filename(&self) -> String {
        format!("{}_{:04}.xhtml", self.prefix, self.index)
    }

    fn stats_filename(&self) -> String {
        format!("{}_{:04}.xhtml", self.prefix, self.start_index + 1)
    }

    fn write_document(&self, filename: &str, xhtml: &str) -> Result<(), EmitError> {
        let path = self.out_dir.join(filename);
        std::fs::write(&path, xhtml).map_err(|e| EmitError::FileWrite(path, e))
    }

    // the shared fragment shell: head with title and stylesheet link,
    // body holding one div
    fn render_fragment(&self, title: &str, body_div: &str) -> String {
        let mut xhtml = String::new();
        xhtml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xhtml.push('\n');
        xhtml.push_str(&format!(
            "<html xmlns=\"http://www.w3.org/1999/xhtml\" xml:lang=\"{}\">\n",
            self.language
        ));
        xhtml.push_str("  <head>\n    <meta charset=\"UTF-8\"/>\n");
        xhtml.push_str(&format!("    <title>{}</title>\n", title));
        xhtml.push_str(&format!(
            "    <link rel=\"stylesheet\" href=\"{}\" type=\"text/css\"/>\n",
            STYLESHEET_HREF
        ));
        xhtml.push_str("  </head>\n  <body>\n");
        xhtml.push_str(body_div);
        xhtml.push_str("\n  </body>\n</html>");
        xhtml
    }

    fn write_fragment(&mut self, title: &str, body_div: &str) -> Result<String, EmitError> {
        let filename = self.current_filename();
        let xhtml = self.render_fragment(title, body_div);
        self.write_document(&filename, &xhtml)?;
        self.index += 1;
        Ok(filename)
    }

    /// Write the cover page as the first fragment
    pub fn write_cover(&mut self, title: &str) -> Result<(), EmitError> {
        let filename = self.current_filename();
        let escaped_title = escape_to_xhtml(title);
        let mut xhtml = String::new();
        xhtml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xhtml.push('\n');
        xhtml.push_str(&format!(
            "<html xmlns=\"http://www.w3.org/1999/xhtml\" xml:lang=\"{}\" xmlns:epub=\"http://www.idpf.org/2007/ops\">\n",
            self.language
        ));
        xhtml.push_str("  <head>\n    <meta charset=\"UTF-8\"/>\n");
        xhtml.push_str(&format!("    <title>{}</title>\n", escaped_title));
        xhtml.push_str(&format!(
            "    <link rel=\"stylesheet\" href=\"{}\" type=\"text/css\"/>\n",
            STYLESHEET_HREF
        ));
        xhtml.push_str("  </head>\n  <body epub:type=\"cover\">\n");
        xhtml.push_str("    <div class=\"centered\">\n");
        xhtml.push_str(&format!(
            "      <img src=\"../Images/{}\" alt=\"{} Cover\" style=\"max-width:100%; height:auto;\"/>\n",
            epub_packer::COVER_IMAGE_NAME, escaped_title
        ));
        xhtml.push_str(
            "      <p style=\"text-indent: 0; text-align: center;\"><a href=\"index.xhtml\">Go to Index</a></p>\n",
        );
        xhtml.push_str("    </div>\n  </body>\n</html>");
        self.write_document(&filename, &xhtml)?;
        self.index += 1;
        Ok(())
    }

    /// Write the text-statistics page as the second fragment
    pub fn write_stats(&mut self, metrics: &Metrics) -> Result<(), EmitError> {
        let mut body = String::new();
        body.push_str("    <div class=\"centered\" style=\"text-align: center; margin-top: 50px;\">\n");
        body.push_str("      <h1 style=\"text-align: center;\">Text Stats</h1>\n");
        body.push_str(&format!(
            "      <p style=\"text-align: center;\">Est. Pages: <b>{}</b> ({} WPP)</p>\n",
            group_digits(metrics.estimated_pages),
            WORDS_PER_PAGE_ESTIMATE
        ));
        body.push_str(&format!(
            "      <p style=\"text-align: center;\">Avg. W/Sentence: <b>{:.1}</b></p>\n",
            metrics.avg_words_per_sentence
        ));
        body.push_str(&format!(
            "      <p style=\"text-align: center;\">Total Sentences: <b>{}</b></p>\n",
            group_digits(metrics.total_sentences)
        ));
        body.push_str(&format!(
            "      <p style=\"text-align: center;\">Total Words: <b>{}</b></p>\n",
            group_digits(metrics.total_words)
        ));
        body.push_str(&format!(
            "      <p style=\"text-align: center;\">Chars (Clean): <b>{}</b></p>\n",
            group_digits(metrics.total_characters_clean)
        ));
        body.push_str(
            "      <p style=\"margin-top: 40px; text-align: center;\"><a href=\"index.xhtml\">Go to Index</a></p>\n",
        );
        body.push_str("    </div>");
        let _ = self.write_fragment("Text Stats", &body)?;
        Ok(())
    }

    /// Render one content unit into one or more fragments
    pub fn emit(&mut self, unit: &ContentUnit) -> Result<(), EmitError> {
        match unit {
            ContentUnit::Heading { levels } => {
                let tag = html_heading_level(levels.len());
                let title = levels.last().map(|s| s.as_str()).unwrap_or("");
                let escaped = escape_to_xhtml(title);
                let body = format!(
                    "    <div class=\"context\">\n      <h{}>{}</h{}>\n    </div>",
                    tag, escaped, tag
                );
                let filename = self.write_fragment(&escaped, &body)?;
                self.toc_entries
                    .push(TocEntry::new(levels.clone(), filename));
                self.content_count += 1;
            }
            ContentUnit::Image { file, caption } => {
                let escaped_file = escape_to_xhtml(file.as_str());
                let escaped_caption = escape_to_xhtml(caption.as_str());
                let mut body = String::new();
                body.push_str("    <div class=\"image-page\">\n      <figure>\n");
                body.push_str(&format!(
                    "        <img src=\"../Images/{}\" alt=\"{}\" />\n",
                    escaped_file, escaped_caption
                ));
                body.push_str(&format!(
                    "        <figcaption>{}</figcaption>\n",
                    escaped_caption
                ));
                body.push_str("      </figure>\n    </div>");
                let title = format!("Image: {}", escaped_file);
                let _ = self.write_fragment(&title, &body)?;
                self.content_count += 1;
            }
            ContentUnit::Sentences(sentences) => {
                for sentence in sentences.iter() {
                    let title = format!("Page {}", self.index);
                    let body = format!(
                        "    <div class=\"centered\">{}</div>",
                        escape_with_inline_tags(sentence.as_str())
                    );
                    let _ = self.write_fragment(&title, &body)?;
                    self.content_count += 1;
                }
            }
        }
        Ok(())
    }

    /// Write the visual `index.xhtml` and close the emission stage.
    ///
    /// Emitting no content fragments at all is fatal: the manuscript
    /// body was empty or consisted solely of skipped directives.
    pub fn finish(self) -> Result<EmissionSummary, EmitError> {
        if self.content_count == 0 {
            return Err(EmitError::EmptyContent);
        }

        let tree = build_tree(&self.toc_entries);
        let mut body = String::new();
        body.push_str(
            "    <div class=\"centered toc-visual\" style=\"margin-top: 3em; text-align: center;\">\n",
        );
        body.push_str("      <h2 style=\"margin-bottom: 1em;\">Index</h2>\n");
        body.push_str(&format!(
            "      <p style=\"margin: 0.5em 0;\"><a href=\"{}\">Text Stats</a></p>\n",
            self.stats_filename()
        ));
        body.push_str(&render_index_list(&tree, 0));
        body.push_str("    </div>");
        let xhtml = self.render_fragment("Index", &body);
        self.write_document("index.xhtml", &xhtml)?;

        Ok(EmissionSummary {
            toc_entries: self.toc_entries,
            content_fragments: self.content_count,
        })
    }
}

// one nested list level of the visual index; unlinked grouping labels
// render as bare text
fn render_index_list(nodes: &[TocNode], depth: usize) -> String {
    if nodes.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    out.push_str("      <ul style='list-style: none; padding-left: 0;'>\n");
    for node in nodes.iter() {
        out.push_str(&format!(
            "      <li style='margin-left: {}em; margin-top: 0.2em;'>",
            depth as f64 * 1.5
        ));
        let escaped = escape_to_xhtml(node.title.as_str());
        match node.file {
            Some(ref file) => out.push_str(&format!("<a href=\"{}\">{}</a>", file, escaped)),
            None => out.push_str(&escaped),
        }
        if !node.children.is_empty() {
            out.push('\n');
            out.push_str(&render_index_list(&node.children, depth + 1));
        }
        out.push_str("</li>\n");
    }
    out.push_str("      </ul>\n");
    out
}
