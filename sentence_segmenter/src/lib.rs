//! Split a paragraph of raw text into discrete sentences.
//!
//! This is a heuristic segmenter, not a grammar: a bounded set of
//! protected patterns -- abbreviations, professional titles, dotted
//! acronyms, single-letter initials, leading list numbers and ellipses --
//! is temporarily replaced with placeholder tokens so that the dots
//! within them are never mistaken for sentence boundaries. A boundary is
//! a terminal punctuation mark (`.`, `!` or `?`), optionally followed by
//! a single closing quote or bracket, followed by a capital letter, an
//! opening quote, or the end of the paragraph.
//!
//! ```
//! use sentence_segmenter::Segmenter;
//!
//! let segmenter = Segmenter::default();
//! let sentences = segmenter.segment("Dr. Smith arrived. He left.");
//! assert_eq!(sentences, vec!["Dr. Smith arrived.", "He left."]);
//! ```
//!
//! An ellipsis never ends a sentence, and survives verbatim:
//!
//! ```
//! # use sentence_segmenter::Segmenter;
//! let segmenter = Segmenter::default();
//! let sentences = segmenter.segment("Wait... what happened?");
//! assert_eq!(sentences, vec!["Wait... what happened?"]);
//! ```
//!
//! The protected tables are data, not code; new terms can be added
//! without touching the algorithm:
//!
//! ```
//! # use sentence_segmenter::{ProtectedTerms, Segmenter};
//! let mut terms = ProtectedTerms::default();
//! terms.push("approx.");
//! let segmenter = Segmenter::new(&terms);
//! let sentences = segmenter.segment("It took approx. Two hours.");
//! assert_eq!(sentences, vec!["It took approx. Two hours."]);
//! ```

#![deny(dead_code)]
#![deny(unreachable_patterns)]
#![deny(unused_extern_crates)]
#![deny(unused_imports)]
#![deny(unused_qualifications)]
#![deny(clippy::all)]
#![deny(missing_docs)]

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use lazy_static::lazy_static;
use regex::Regex;

mod boundaries;
use boundaries::{mark_boundaries, SPLIT_MARKER};

static ABBREVIATIONS: &[&str] = &[
    "c.", "e.g.", "i.e.", "etc.", "a. C.", "d. C.", "P.M.", "A.M.", "P.S.", "U.S.", "vs.",
];

static TITLES: &[&str] = &[
    "Mr.", "Mrs.", "Ms.", "Dr.", "Prof.", "Sr.", "Jr.", "St.",
];

static ACRONYMS: &[&str] = &[
    "O.W.L.", "D.A.", "N.E.W.T.", "S.P.E.W.", "R.A.B.", "L.A.", "U.S.A.",
];

const ELLIPSIS_TOKEN: &str = "[ELLIPSIS]";

lazy_static! {
    static ref CITATION: Regex = Regex::new(r"\[\d+\]").unwrap();
    static ref CITATION_NEEDED: Regex = Regex::new(r"(?i)\[citation needed\]").unwrap();
    static ref LIST_MARKER: Regex = Regex::new(r"^\s*(\d+)\.\s*").unwrap();
    static ref ELLIPSIS_RUN: Regex = Regex::new(r"\.(\s*\.){2,}").unwrap();
    static ref INITIAL: Regex =
        Regex::new(r"([A-Z])\.\s+([A-ZÁÉÍÓÚÑ][a-zA-ZáéíóúñÁÉÍÓÚÑ]+)").unwrap();
    static ref INITIAL_RESTORE: Regex = Regex::new(r"__INITIALDOT__\s*").unwrap();
    static ref LIST_MARKER_RESTORE: Regex = Regex::new(r"(\d+)__NUMDOT__\s*").unwrap();
}

/// The table of terms whose internal dots must never be treated as
/// sentence boundaries.
///
/// Each term is paired with a deterministic placeholder derived by
/// replacing its dots; the pairing is an implementation detail and the
/// table is exposed purely as a list of literal terms.
#[derive(Debug, Clone)]
pub struct ProtectedTerms {
    terms: Vec<String>,
}

impl Default for ProtectedTerms {
    fn default() -> Self {
        let terms = ABBREVIATIONS
            .iter()
            .chain(TITLES.iter())
            .chain(ACRONYMS.iter())
            .map(|t| t.to_string())
            .collect();
        ProtectedTerms { terms }
    }
}

impl ProtectedTerms {
    /// A table with no entries
    pub fn empty() -> Self {
        ProtectedTerms { terms: Vec::new() }
    }

    /// Add a term to protect
    pub fn push<S: ToString>(&mut self, term: S) -> &mut Self {
        self.terms.push(term.to_string());
        self
    }

    fn placeholder_for(term: &str) -> String {
        term.replace('.', "__DOT__")
    }
}

/// A compiled sentence segmenter.
///
/// Compiling builds two automatons over the protected table: one
/// replacing terms with their placeholders, one reversing the
/// substitution. Both use leftmost-longest matching, so a term like
/// `U.S.A.` always wins over its prefix `U.S.` regardless of the order
/// entries were added in.
#[derive(Debug)]
pub struct Segmenter {
    terms: Vec<String>,
    placeholders: Vec<String>,
    protect: AhoCorasick,
    restore: AhoCorasick,
}

impl Default for Segmenter {
    fn default() -> Self {
        Segmenter::new(&ProtectedTerms::default())
    }
}

impl Segmenter {
    /// Compile a segmenter over the given protected table
    pub fn new(table: &ProtectedTerms) -> Self {
        let terms = table.terms.clone();
        let placeholders = terms
            .iter()
            .map(|t| ProtectedTerms::placeholder_for(t))
            .collect::<Vec<_>>();
        let protect = AhoCorasickBuilder::new()
            .match_kind(MatchKind::LeftmostLongest)
            .build(&terms);
        let restore = AhoCorasickBuilder::new()
            .match_kind(MatchKind::LeftmostLongest)
            .build(&placeholders);
        Segmenter {
            terms,
            placeholders,
            protect,
            restore,
        }
    }

    /// Split one logical paragraph into an ordered list of sentences.
    ///
    /// The concatenation of the output, rejoined with single spaces,
    /// reconstructs the input modulo the cleanups performed: bracketed
    /// citation markers and zero-width characters are stripped, and runs
    /// of more than three dots collapse to a plain `...`.
    pub fn segment(&self, paragraph: &str) -> Vec<String> {
        let text = CITATION.replace_all(paragraph, "");
        let text = CITATION_NEEDED.replace_all(&text, "");
        let text = text.replace('\u{200b}', "").replace('\u{200c}', "");

        let text = LIST_MARKER.replace(&text, "${1}__NUMDOT__ ");

        let text = ELLIPSIS_RUN.replace_all(&text, "...");
        let text = text.replace('\u{2026}', "...");

        let text = INITIAL.replace_all(&text, "${1}__INITIALDOT__ ${2}");
        let text = self.protect.replace_all(&text, &self.placeholders);

        let text = text.replace("...", ELLIPSIS_TOKEN);

        let marked = mark_boundaries(&text);

        let mut sentences: Vec<String> = Vec::new();
        for piece in marked.split(SPLIT_MARKER) {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            let restored = self.restore.replace_all(piece, &self.terms);
            let restored = INITIAL_RESTORE.replace_all(&restored, ". ");
            let restored = restored.replace(ELLIPSIS_TOKEN, "...");
            let restored = LIST_MARKER_RESTORE.replace_all(&restored, "${1}. ");
            let restored = restored.trim();
            if restored.is_empty() {
                continue;
            }

            // a piece beginning with a closing quote or bracket is stray
            // dialogue punctuation; reattach it to its owning sentence
            let first = restored.chars().next().unwrap();
            if starts_with_closer(first) && !sentences.is_empty() {
                let prev = sentences.last_mut().unwrap();
                prev.push(' ');
                prev.push_str(restored);
            } else {
                sentences.push(restored.to_string());
            }
        }

        sentences
    }
}

const fn starts_with_closer(c: char) -> bool {
    matches!(c, '\'' | '"' | '”' | '’' | ']' | ')')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(text: &str) -> Vec<String> {
        Segmenter::default().segment(text)
    }

    #[test]
    fn plain_sentences() {
        let s = segment("It was cold. The wind had picked up. Nobody spoke.");
        assert_eq!(
            s,
            vec!["It was cold.", "The wind had picked up.", "Nobody spoke."]
        );
    }

    #[test]
    fn titles_do_not_split() {
        let s = segment("Dr. Smith arrived. He left.");
        assert_eq!(s, vec!["Dr. Smith arrived.", "He left."]);
        let s = segment("Mr. Keeley spoke to Mrs. Keeley. Nothing happened.");
        assert_eq!(
            s,
            vec!["Mr. Keeley spoke to Mrs. Keeley.", "Nothing happened."]
        );
    }

    #[test]
    fn abbreviations_do_not_split() {
        let s = segment("They sell fruit, e.g. Apples and pears. Nothing else.");
        assert_eq!(
            s,
            vec!["They sell fruit, e.g. Apples and pears.", "Nothing else."]
        );
        let s = segment("Roma cayó en 44 a. C. Y nada fue igual.");
        assert_eq!(s, vec!["Roma cayó en 44 a. C. Y nada fue igual."]);
    }

    #[test]
    fn acronyms_do_not_split() {
        let s = segment("She sat her O.W.L. Exams that year. It went badly.");
        assert_eq!(
            s,
            vec!["She sat her O.W.L. Exams that year.", "It went badly."]
        );
        let s = segment("He moved to the U.S.A. Then he moved back.");
        assert_eq!(s, vec!["He moved to the U.S.A. Then he moved back."]);
    }

    #[test]
    fn initials_do_not_split() {
        let s = segment("The report cites H. Keeley at length. It is thorough.");
        assert_eq!(
            s,
            vec!["The report cites H. Keeley at length.", "It is thorough."]
        );
    }

    #[test]
    fn ellipsis_is_preserved_verbatim() {
        let s = segment("Wait... what happened?");
        assert_eq!(s, vec!["Wait... what happened?"]);
        let s = segment("So. . . . it begins. Now.");
        assert_eq!(s, vec!["So... it begins.", "Now."]);
        let s = segment("He trailed off\u{2026} then recovered.");
        assert_eq!(s, vec!["He trailed off... then recovered."]);
    }

    #[test]
    fn list_markers_do_not_split() {
        let s = segment("1. First item on the list. It matters.");
        assert_eq!(s, vec!["1. First item on the list.", "It matters."]);
    }

    #[test]
    fn citations_are_stripped() {
        let s = segment("The battle ended.[12] Everyone went home.[citation needed]");
        assert_eq!(s, vec!["The battle ended.", "Everyone went home."]);
    }

    #[test]
    fn dialogue_boundary_follows_closing_quote() {
        let s = segment("He said \"stop.\" Then he left.");
        assert_eq!(s, vec!["He said \"stop.\"", "Then he left."]);
        for sentence in s {
            assert!(!sentence.starts_with('"'));
        }
    }

    #[test]
    fn stray_closers_merge_into_previous_sentence() {
        let s = segment("She whispered. \" And vanished.");
        assert_eq!(s.len(), 1);
        assert!(s[0].starts_with("She whispered."));
    }

    #[test]
    fn boundary_before_opening_quote() {
        let s = segment("He nodded. \u{201c}Fine,\u{201d} she said.");
        assert_eq!(s, vec!["He nodded.", "\u{201c}Fine,\u{201d} she said."]);
    }

    #[test]
    fn no_split_before_lowercase() {
        let s = segment("It cost 3.50 euros. the end was near.");
        // lowercase continuation after a full stop is not a boundary
        assert_eq!(s, vec!["It cost 3.50 euros. the end was near."]);
    }

    #[test]
    fn extensible_table() {
        let mut terms = ProtectedTerms::default();
        terms.push("No.");
        let segmenter = Segmenter::new(&terms);
        let s = segmenter.segment("See No. Five for details. It helps.");
        assert_eq!(s, vec!["See No. Five for details.", "It helps."]);
    }

    #[test]
    fn idempotent_over_own_output() {
        let segmenter = Segmenter::default();
        let input = "Dr. Smith arrived at 9 P.M. sharp. \"Wait...\" he said. Nobody answered.";
        let first = segmenter.segment(input);
        let rejoined = first.join(" ");
        let second = segmenter.segment(&rejoined);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_input() {
        assert!(segment("").is_empty());
        assert!(segment("   ").is_empty());
    }
}
