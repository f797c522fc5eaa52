//! Marker and node definitions.

use serde::Serialize;

/// Character-level markers: opened inline and closed by `\tag*`.
const CHARACTER_MARKERS: &[&str] = &[
    "f", "fe", "x", "w", "add", "nd", "wj", "bk", "qt", "k", "tl", "sc", "it", "bd", "bdit",
    "em", "sup", "no", "pn", "ord", "sls", "dc", "qs", "qac", "rq", "ca", "va", "vp",
];

/// Markers that structure the inside of a footnote or cross reference.
/// Each one implicitly closes a preceding sibling of the same family.
const NOTE_CONTENT_MARKERS: &[&str] = &[
    "fr", "ft", "fq", "fqa", "fk", "fl", "fv", "fp", "fw", "xo", "xt", "xq", "xk", "xta",
];

/// Standalone milestones written without a `-s`/`-e` suffix.
const MILESTONE_MARKERS: &[&str] = &["ts"];

/// Markers carrying document metadata rather than readable text.
const METADATA_MARKERS: &[&str] = &[
    "id", "ide", "rem", "toc", "toca", "sts", "usfm", "cl", "cp", "h",
];

/// Structural role of a marker in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarkerKind {
    /// `\c`: chapter container
    Chapter,
    /// `\v`: verse container
    Verse,
    /// Paragraph, heading, title and every other block marker
    Block,
    /// Inline span closed by `\tag*`
    Character,
    /// Inline span inside a note, closed by its note or next sibling
    NoteContent,
    /// Empty point marker (`\ts\*`, `\qt-s ...\*`, `\k-e\*`)
    Milestone,
}

impl MarkerKind {
    /// Classifies a marker tag (with or without its numeric level).
    pub fn of(tag: &str) -> Self {
        if tag.ends_with("-s") || tag.ends_with("-e") {
            return MarkerKind::Milestone;
        }
        let base = base_tag(tag);
        match base {
            "c" => MarkerKind::Chapter,
            "v" => MarkerKind::Verse,
            _ if MILESTONE_MARKERS.contains(&base) => MarkerKind::Milestone,
            _ if NOTE_CONTENT_MARKERS.contains(&base) => MarkerKind::NoteContent,
            _ if CHARACTER_MARKERS.contains(&base) => MarkerKind::Character,
            _ => MarkerKind::Block,
        }
    }

    /// Returns true for markers that live inline and need closing.
    pub fn is_inline(self) -> bool {
        matches!(self, MarkerKind::Character | MarkerKind::NoteContent)
    }
}

/// Strips the start/end suffix from a milestone tag (`qt1-s` -> `qt1`).
pub fn milestone_name(tag: &str) -> &str {
    tag.strip_suffix("-s")
        .or_else(|| tag.strip_suffix("-e"))
        .unwrap_or(tag)
}

/// Strips the numeric level from a tag (`q2` -> `q`, `toc1` -> `toc`).
pub fn base_tag(tag: &str) -> &str {
    tag.trim_end_matches(|c: char| c.is_ascii_digit())
}

/// A node of a marker tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Node {
    /// Plain text
    Text(String),
    /// A marker with its nested content
    Marker(Marker),
}

impl Node {
    /// Returns the marker if this node is one.
    pub fn as_marker(&self) -> Option<&Marker> {
        match self {
            Node::Marker(m) => Some(m),
            Node::Text(_) => None,
        }
    }
}

/// A parsed marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    /// Tag name without backslash (e.g. `p`, `q1`, `v`)
    pub tag: String,
    /// Number argument for chapter and verse markers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub argument: Option<String>,
    /// Nested content
    pub children: Vec<Node>,
}

impl Marker {
    /// Creates an empty marker.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            argument: None,
            children: Vec::new(),
        }
    }

    /// Creates a marker with a number argument.
    pub fn with_argument(tag: impl Into<String>, argument: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            argument: Some(argument.into()),
            children: Vec::new(),
        }
    }

    /// Structural role of this marker.
    pub fn kind(&self) -> MarkerKind {
        MarkerKind::of(&self.tag)
    }

    /// Tag without its numeric level.
    pub fn base_tag(&self) -> &str {
        base_tag(&self.tag)
    }

    /// Returns true if this marker only carries metadata.
    pub fn is_metadata(&self) -> bool {
        METADATA_MARKERS.contains(&self.base_tag())
    }

    /// Appends a child marker.
    pub fn push_marker(&mut self, marker: Marker) {
        self.children.push(Node::Marker(marker));
    }

    /// Appends text, merging with a preceding text node.
    pub fn push_text(&mut self, text: &str) {
        push_text(&mut self.children, text);
    }

    /// Returns the plain text content of this marker and its descendants.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

/// Appends text to a node list, merging with a preceding text node.
pub(crate) fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Node::Text(last)) = nodes.last_mut() {
        last.push_str(text);
    } else {
        nodes.push(Node::Text(text.to_string()));
    }
}

pub(crate) fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Marker(marker) => collect_text(&marker.children, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_kind_classification() {
        assert_eq!(MarkerKind::of("c"), MarkerKind::Chapter);
        assert_eq!(MarkerKind::of("v"), MarkerKind::Verse);
        assert_eq!(MarkerKind::of("p"), MarkerKind::Block);
        assert_eq!(MarkerKind::of("q2"), MarkerKind::Block);
        assert_eq!(MarkerKind::of("f"), MarkerKind::Character);
        assert_eq!(MarkerKind::of("ft"), MarkerKind::NoteContent);
        assert_eq!(MarkerKind::of("unknownmarker"), MarkerKind::Block);
        assert_eq!(MarkerKind::of("ts"), MarkerKind::Milestone);
        assert_eq!(MarkerKind::of("qt1-s"), MarkerKind::Milestone);
        assert_eq!(MarkerKind::of("k-e"), MarkerKind::Milestone);
        assert!(!MarkerKind::Milestone.is_inline());
    }

    #[test]
    fn test_milestone_name() {
        assert_eq!(milestone_name("qt1-s"), "qt1");
        assert_eq!(milestone_name("k-e"), "k");
        assert_eq!(milestone_name("ts"), "ts");
    }

    #[test]
    fn test_base_tag() {
        assert_eq!(base_tag("toc1"), "toc");
        assert_eq!(base_tag("s5"), "s");
        assert_eq!(base_tag("p"), "p");
    }

    #[test]
    fn test_metadata_markers() {
        assert!(Marker::new("id").is_metadata());
        assert!(Marker::new("toc2").is_metadata());
        assert!(!Marker::new("mt1").is_metadata());
    }

    #[test]
    fn test_plain_text_joins_nested_content() {
        let mut verse = Marker::with_argument("v", "1");
        verse.push_text("In the beginning ");
        let mut add = Marker::new("add");
        add.push_text("God");
        verse.push_marker(add);
        verse.push_text(" created");

        assert_eq!(verse.plain_text(), "In the beginning God created");
    }
}
