//! USFM marker parsing.
//!
//! [`MarkerParser`] is the seam the aggregator parses through;
//! [`UsfmParser`] is the bundled implementation.

mod lexer;
mod parser;

pub use lexer::{collapse_whitespace, tokenize, Token};

use crate::error::Result;
use crate::model::Document;
use crate::parse_options::ParseOptions;
use parser::TreeBuilder;
use unicode_normalization::UnicodeNormalization;

/// Turns marker source text into a marker tree.
pub trait MarkerParser: Send + Sync {
    /// Parses one source text. Fails with [`crate::Error::Parse`] on
    /// malformed content.
    fn parse(&self, text: &str) -> Result<Document>;
}

/// USFM parser.
#[derive(Debug, Clone, Default)]
pub struct UsfmParser {
    options: ParseOptions,
}

impl UsfmParser {
    /// Creates a parser with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a parser with the given options.
    pub fn with_options(options: ParseOptions) -> Self {
        Self { options }
    }

    /// Parsing options in effect.
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }
}

impl MarkerParser for UsfmParser {
    fn parse(&self, text: &str) -> Result<Document> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        if self.options.normalize_unicode {
            let normalized: String = text.nfc().collect();
            TreeBuilder::new(&self.options).build(&normalized)
        } else {
            TreeBuilder::new(&self.options).build(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{Marker, MarkerKind, Node};

    const GENESIS: &str = "\\id GEN Genesis\n\
\\h Genesis\n\
\\mt1 Genesis\n\
\\s5\n\
\\c 1\n\
\\s1 The Creation\n\
\\p\n\
\\v 1 In the beginning God created the heavens and the earth.\n\
\\v 2 The earth was \\add without form\\add* and empty.\\f + \\fr 1:2 \\ft Or: formless\\f*\n\
\\c 2\n\
\\p\n\
\\v 1 Thus the heavens were finished.\n";

    fn parse(text: &str) -> Result<Document> {
        UsfmParser::new().parse(text)
    }

    fn top_markers(doc: &Document) -> Vec<&Marker> {
        doc.contents.iter().filter_map(|n| n.as_marker()).collect()
    }

    #[test]
    fn test_parse_book_structure() {
        let doc = parse(GENESIS).unwrap();
        let tags: Vec<_> = top_markers(&doc).iter().map(|m| m.tag.as_str()).collect();
        assert_eq!(tags, vec!["id", "h", "mt1", "c", "c"]);
        assert_eq!(doc.book_codes(), vec!["GEN"]);
        assert_eq!(doc.chapter_count(), 2);
        assert_eq!(doc.verse_count(), 3);
    }

    #[test]
    fn test_chapter_contains_heading_and_paragraph() {
        let doc = parse(GENESIS).unwrap();
        let chapter = top_markers(&doc)[3];
        assert_eq!(chapter.argument.as_deref(), Some("1"));

        let children: Vec<_> = chapter.children.iter().filter_map(|n| n.as_marker()).collect();
        assert_eq!(children[0].tag, "s1");
        assert_eq!(children[0].plain_text(), "The Creation");
        assert_eq!(children[1].tag, "p");

        let verses: Vec<_> = children[1]
            .children
            .iter()
            .filter_map(|n| n.as_marker())
            .collect();
        assert_eq!(verses.len(), 2);
        assert_eq!(verses[0].argument.as_deref(), Some("1"));
        assert_eq!(
            verses[0].plain_text(),
            "In the beginning God created the heavens and the earth."
        );
    }

    #[test]
    fn test_character_and_note_markers_nest() {
        let doc = parse(GENESIS).unwrap();
        let verse = doc
            .markers()
            .find(|m| m.kind() == MarkerKind::Verse && m.argument.as_deref() == Some("2"))
            .unwrap();

        assert!(matches!(&verse.children[0], Node::Text(t) if t == "The earth was "));
        let add = verse.children[1].as_marker().unwrap();
        assert_eq!(add.tag, "add");
        assert_eq!(add.plain_text(), "without form");

        let note = verse.children[3].as_marker().unwrap();
        assert_eq!(note.tag, "f");
        let note_tags: Vec<_> = note
            .children
            .iter()
            .filter_map(|n| n.as_marker())
            .map(|m| m.tag.as_str())
            .collect();
        assert_eq!(note_tags, vec!["fr", "ft"]);
    }

    #[test]
    fn test_ignored_marker_is_dropped() {
        let doc = parse(GENESIS).unwrap();
        assert!(doc.markers().all(|m| m.tag != "s5"));

        let keep = UsfmParser::with_options(ParseOptions::new().without_ignored_markers());
        let doc = keep.parse(GENESIS).unwrap();
        assert_eq!(doc.markers_with_tag("s5").count(), 1);
    }

    #[test]
    fn test_self_closing_milestone_leaves_no_text() {
        let source = "\\c 1\n\\p\n\\v 1 In the beginning.\n\\ts\\*\n\\p\n\\v 2 More.";
        let doc = parse(source).unwrap();
        let text = doc.plain_text();
        assert!(text.contains("In the beginning."), "{}", text);
        assert!(text.contains("More."), "{}", text);
        assert!(!text.contains("\\*"), "{}", text);
        assert_eq!(doc.markers_with_tag("ts").count(), 0);
        assert_eq!(doc.verse_count(), 2);

        let keep = UsfmParser::with_options(ParseOptions::new().without_ignored_markers());
        let doc = keep.parse(source).unwrap();
        let ts = doc.markers_with_tag("ts").next().unwrap();
        assert_eq!(ts.kind(), MarkerKind::Milestone);
        assert!(ts.children.is_empty());
        assert!(!doc.plain_text().contains("\\*"));
    }

    #[test]
    fn test_milestone_pair_is_not_a_character_span() {
        let doc = parse("\\c 1\n\\p\n\\v 1 \\k-s |key=\"x\"\\*word\\k-e\\* more").unwrap();
        let verse = doc.markers_with_tag("v").next().unwrap();
        assert_eq!(verse.plain_text(), "word more");
        assert_eq!(doc.markers_with_tag("k-s").count(), 1);
        assert_eq!(doc.markers_with_tag("k-e").count(), 1);
        assert_eq!(doc.markers_with_tag("k").count(), 0);
    }

    #[test]
    fn test_quotation_milestones_span_paragraphs() {
        let source = "\\c 1\n\\p\n\\v 1 \\qt-s |who=\"Jesus\"\\*Follow me.\n\\p\n\\v 2 Come.\\qt-e\\*\n";
        let doc = parse(source).unwrap();
        assert_eq!(doc.verse_count(), 2);
        assert_eq!(doc.markers_with_tag("p").count(), 2);
        let verses: Vec<_> = doc.markers_with_tag("v").map(|v| v.plain_text()).collect();
        assert_eq!(verses, vec!["Follow me.", "Come."]);
    }

    #[test]
    fn test_word_attributes_are_hidden() {
        let doc = parse("\\c 1\n\\p\n\\v 1 \\w gracious|strong=\"H2603\"\\w* Lord").unwrap();
        let verse = doc.markers_with_tag("v").next().unwrap();
        assert_eq!(verse.plain_text(), "gracious Lord");
    }

    #[test]
    fn test_plain_text_source() {
        let doc = parse("Just a line of text.\nAnother line.").unwrap();
        assert_eq!(doc.contents, vec![Node::Text("Just a line of text. Another line.".into())]);
    }

    #[test]
    fn test_verse_without_number_is_parse_error() {
        let result = parse("\\c 1\n\\p\n\\v \\add x\\add*");
        match result {
            Err(Error::Parse { line, message, .. }) => {
                assert_eq!(line, 3);
                assert!(message.contains("\\v"), "{}", message);
            }
            other => panic!("Expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_chapter_with_non_numeric_argument_is_parse_error() {
        assert!(matches!(parse("\\c one\n"), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_unmatched_closing_marker_is_parse_error() {
        assert!(matches!(
            parse("\\c 1\n\\p\n\\v 1 text\\nd*"),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn test_unclosed_note_is_parse_error() {
        let result = parse("\\c 1\n\\p\n\\v 1 text\\f + \\ft note\n\\v 2 more");
        assert!(matches!(result, Err(Error::Parse { line: 4, .. })));

        let result = parse("\\c 1\n\\p\n\\v 1 text\\f + \\ft note");
        assert!(matches!(result, Err(Error::Parse { .. })));
    }

    #[test]
    fn test_lenient_mode_recovers() {
        let parser = UsfmParser::with_options(ParseOptions::new().lenient());
        let doc = parser
            .parse("\\c 1\n\\p\n\\v 1 text\\nd*\\f + \\ft note\n\\v\n\\v 3 end")
            .unwrap();
        assert_eq!(doc.chapter_count(), 1);
        assert_eq!(doc.verse_count(), 3);
    }

    #[test]
    fn test_byte_order_mark_is_stripped() {
        let doc = parse("\u{feff}\\id GEN").unwrap();
        assert_eq!(doc.book_codes(), vec!["GEN"]);
    }

    #[test]
    fn test_unicode_is_normalized() {
        // "e" + combining acute accent becomes a precomposed character.
        let doc = parse("\\p caf\u{0065}\u{0301}").unwrap();
        let p = doc.markers_with_tag("p").next().unwrap();
        assert_eq!(p.plain_text(), "caf\u{00e9}");
    }
}
