//! The canonical table-of-contents tree.
//!
//! Fragment emission produces a flat, ordered list of [`TocEntry`]
//! values which is persisted to disk between pipeline stages. A single
//! grouping pass turns that list into one tree of [`TocNode`]s; the
//! visual index page, the EPUB3 navigation document and the legacy NCX
//! map are all rendered from the same tree so their grouping can never
//! diverge.

use pagecut_common::escape_to_xhtml;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// One table-of-contents record: a heading's full hierarchy path and
/// the fragment file it was written to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TocEntry {
    /// hierarchy segments, outermost first
    pub levels: Vec<String>,
    /// fragment filename, e.g. `BOOK_0003.xhtml`
    pub file: String,
}

impl TocEntry {
    /// a new entry
    pub fn new<S: ToString, F: ToString>(levels: Vec<S>, file: F) -> Self {
        TocEntry {
            levels: levels.into_iter().map(|l| l.to_string()).collect(),
            file: file.to_string(),
        }
    }
}

/// Persist the flat entry list as a JSON array of
/// `{"levels": [...], "file": "..."}` objects
pub fn save_entries<P: AsRef<Path>>(path: P, entries: &[TocEntry]) -> Result<(), String> {
    let json = serde_json::to_string_pretty(entries)
        .map_err(|e| format!("Error serializing toc entries: {}", e))?;
    std::fs::write(path.as_ref(), json)
        .map_err(|e| format!("{}: [{}]", e, path.as_ref().display()))
}

/// Read back a persisted entry list
pub fn load_entries<P: AsRef<Path>>(path: P) -> Result<Vec<TocEntry>, String> {
    let json = std::fs::read_to_string(path.as_ref())
        .map_err(|e| format!("{}: [{}]", e, path.as_ref().display()))?;
    serde_json::from_str(&json).map_err(|e| format!("Error parsing toc entries: {}", e))
}

/// A node of the canonical tree.
///
/// `file` is set only when some entry's hierarchy ends exactly at this
/// node; a node without a file is a non-linking grouping label.
#[derive(Debug, Clone, PartialEq)]
pub struct TocNode {
    /// the heading text at this node
    pub title: String,
    /// the linked fragment, when this node is itself a destination
    pub file: Option<String>,
    /// deeper headings grouped under this node
    pub children: Vec<TocNode>,
}

/// Group the flat entry list into the canonical tree.
///
/// At each depth, entries sharing the same segment string collapse into
/// one node; distinct segments keep their first-seen order. Two entries
/// with an identical full path therefore share a single branch, linked
/// to the first occurrence's file.
pub fn build_tree(entries: &[TocEntry]) -> Vec<TocNode> {
    let refs: Vec<&TocEntry> = entries.iter().collect();
    group_at_depth(&refs, 0)
}

fn group_at_depth(entries: &[&TocEntry], depth: usize) -> Vec<TocNode> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&TocEntry>> = HashMap::new();

    for entry in entries.iter() {
        if entry.levels.len() > depth {
            let key = entry.levels[depth].as_str();
            if !groups.contains_key(key) {
                order.push(key);
            }
            groups.entry(key).or_insert_with(Vec::new).push(entry);
        }
    }

    order
        .into_iter()
        .map(|title| {
            let grouped = groups.remove(title).unwrap();
            let file = grouped
                .iter()
                .find(|e| e.levels.len() == depth + 1)
                .map(|e| e.file.clone());
            let deeper: Vec<&TocEntry> = grouped
                .into_iter()
                .filter(|e| e.levels.len() > depth + 1)
                .collect();
            TocNode {
                title: title.to_string(),
                file,
                children: group_at_depth(&deeper, depth + 1),
            }
        })
        .collect()
}

/// Render the tree as the `<ol>` list of an EPUB3 `<nav epub:type="toc">`.
/// Hrefs are relative to the package document, so files live under `text/`.
pub(crate) fn render_nav_list(nodes: &[TocNode]) -> String {
    let mut out = String::from("\n<ol>");
    for node in nodes.iter() {
        match node.file {
            Some(ref file) => {
                out.push_str(&format!(
                    "\n<li><a href=\"text/{}\">{}</a>",
                    file,
                    escape_to_xhtml(node.title.as_str())
                ));
            }
            None => {
                out.push_str(&format!("\n<li>{}", escape_to_xhtml(node.title.as_str())));
            }
        }
        if !node.children.is_empty() {
            out.push_str(&render_nav_list(&node.children));
        }
        out.push_str("</li>");
    }
    out.push_str("\n</ol>");
    out
}

/// Render the tree as NCX navPoints, incrementing `play_order` in
/// pre-order. A node without a file has no `src` to give a navPoint, so
/// it and its subtree are skipped, as the flattened map requires every
/// point to be a destination.
pub(crate) fn render_nav_points(nodes: &[TocNode], play_order: &mut usize) -> String {
    let mut out = String::new();
    for node in nodes.iter() {
        if let Some(ref file) = node.file {
            out.push_str(&format!(
                "\n    <navPoint id=\"navpoint-{}\" playOrder=\"{}\">\n      <navLabel>\n        <text>{}</text>\n      </navLabel>\n      <content src=\"text/{}\"/>",
                play_order,
                play_order,
                escape_to_xhtml(node.title.as_str()),
                file
            ));
            *play_order += 1;
            if !node.children.is_empty() {
                out.push_str(&render_nav_points(&node.children, play_order));
            }
            out.push_str("</navPoint>");
        }
    }
    out
}
