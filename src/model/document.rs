//! Marker tree for one source file or a merged set of files.

use super::marker::{collect_text, push_text, Marker, MarkerKind, Node};
use serde::Serialize;

/// A parsed marker tree.
///
/// The same type serves as the per-file tree returned by a parser and as
/// the composite document of a conversion: merging is plain ordered
/// insertion, no reconciliation across files is performed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Document {
    /// Top-level nodes in source order
    pub contents: Vec<Node>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends all contents of `other` after the existing contents.
    pub fn insert(&mut self, other: Document) {
        self.contents.extend(other.contents);
    }

    /// Appends a top-level marker.
    pub fn push_marker(&mut self, marker: Marker) {
        self.contents.push(Node::Marker(marker));
    }

    /// Appends top-level text.
    pub fn push_text(&mut self, text: &str) {
        push_text(&mut self.contents, text);
    }

    /// Returns true if the document has no content.
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Returns an iterator over every marker in document order (depth first).
    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        let mut stack: Vec<&Node> = self.contents.iter().rev().collect();
        std::iter::from_fn(move || {
            while let Some(node) = stack.pop() {
                if let Node::Marker(marker) = node {
                    stack.extend(marker.children.iter().rev());
                    return Some(marker);
                }
            }
            None
        })
    }

    /// Returns all markers with the given tag, in document order.
    pub fn markers_with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Marker> {
        self.markers().filter(move |m| m.tag == tag)
    }

    /// Returns the number of chapter markers.
    pub fn chapter_count(&self) -> usize {
        self.markers()
            .filter(|m| m.kind() == MarkerKind::Chapter)
            .count()
    }

    /// Returns the number of verse markers.
    pub fn verse_count(&self) -> usize {
        self.markers().filter(|m| m.kind() == MarkerKind::Verse).count()
    }

    /// Returns the book codes from `\id` markers, in order.
    pub fn book_codes(&self) -> Vec<String> {
        self.markers_with_tag("id")
            .filter_map(|m| {
                m.plain_text()
                    .split_whitespace()
                    .next()
                    .map(|code| code.to_string())
            })
            .collect()
    }

    /// Returns the plain text content of the entire document.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.contents, &mut out);
        out
    }

    /// Returns the document structure as pretty-printed JSON.
    pub fn raw_content(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
