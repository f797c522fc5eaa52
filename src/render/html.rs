//! HTML renderer.

use super::{HypertextConfig, HypertextRenderer};
use crate::error::Result;
use crate::model::{Document, Marker, MarkerKind, Node};

/// Renders a marker tree as a standalone HTML5 page linking `style.css`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    /// Creates a new renderer.
    pub fn new() -> Self {
        Self
    }
}

impl HypertextRenderer for HtmlRenderer {
    fn render(
        &self,
        document: &Document,
        config: &HypertextConfig,
        front_matter: &str,
        footer: &str,
    ) -> Result<String> {
        let mut writer = HtmlWriter::new(config);
        writer.document(document, front_matter, footer);
        Ok(writer.out)
    }
}

struct Note {
    class: &'static str,
    body: String,
}

struct HtmlWriter<'a> {
    config: &'a HypertextConfig,
    out: String,
    /// Notes waiting to be listed at the end of the current chapter
    notes: Vec<Note>,
    /// Notes emitted so far, for numbering
    note_count: usize,
    chapters: usize,
}

impl<'a> HtmlWriter<'a> {
    fn new(config: &'a HypertextConfig) -> Self {
        Self {
            config,
            out: String::new(),
            notes: Vec::new(),
            note_count: 0,
            chapters: 0,
        }
    }

    fn document(&mut self, document: &Document, front_matter: &str, footer: &str) {
        let title = document
            .markers_with_tag("h")
            .next()
            .map(|m| m.plain_text())
            .unwrap_or_default();

        self.out.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
        self.out.push_str("<meta charset=\"utf-8\">\n");
        self.out.push_str(&format!("<title>{}</title>\n", escape_html(&title)));
        self.out.push_str("<link rel=\"stylesheet\" href=\"style.css\">\n");
        self.out.push_str("</head>\n<body>\n");

        push_raw(&mut self.out, front_matter);

        match self.config.class_attribute() {
            Some(classes) => self
                .out
                .push_str(&format!("<div class=\"{}\">\n", escape_html(&classes))),
            None => self.out.push_str("<div>\n"),
        }
        self.blocks(&document.contents);
        self.flush_notes();
        self.out.push_str("</div>\n");

        push_raw(&mut self.out, footer);
        self.out.push_str("</body>\n</html>\n");
    }

    /// Renders block-level content. Runs of inline nodes become paragraphs.
    fn blocks(&mut self, nodes: &[Node]) {
        let mut run: Vec<&Node> = Vec::new();
        for node in nodes {
            match node {
                Node::Marker(m) if m.is_metadata() => {}
                Node::Marker(m) if matches!(m.kind(), MarkerKind::Chapter | MarkerKind::Block) => {
                    self.paragraph(None, &std::mem::take(&mut run));
                    if m.kind() == MarkerKind::Chapter {
                        self.chapter(m);
                    } else {
                        self.block_marker(m);
                    }
                }
                _ => run.push(node),
            }
        }
        self.paragraph(None, &run);
    }

    fn chapter(&mut self, chapter: &Marker) {
        if self.chapters > 0 && self.config.separate_chapters {
            self.out.push_str("<div class=\"pagebreak\"></div>\n");
        }
        self.chapters += 1;

        self.out.push_str("<div class=\"chapter\">\n");
        if let Some(number) = &chapter.argument {
            self.out.push_str(&format!(
                "<h2 class=\"chapter-number\">{}</h2>\n",
                escape_html(number)
            ));
        }
        self.blocks(&chapter.children);
        self.flush_notes();
        self.out.push_str("</div>\n");
    }

    fn block_marker(&mut self, marker: &Marker) {
        let heading = match marker.base_tag() {
            "mt" | "imt" | "mte" => Some("h1"),
            "ms" | "mr" => Some("h2"),
            "s" | "is" | "r" | "sr" | "sp" | "d" => Some("h3"),
            "b" => {
                self.out.push_str("<br>\n");
                return;
            }
            _ => None,
        };

        match heading {
            Some(element) => {
                let children: Vec<&Node> = marker.children.iter().collect();
                let content = self.inline(&children);
                self.out.push_str(&format!(
                    "<{element} class=\"{}\">{}</{element}>\n",
                    escape_html(&marker.tag),
                    content
                ));
            }
            None => {
                let children: Vec<&Node> = marker.children.iter().collect();
                self.paragraph(Some(&marker.tag), &children);
            }
        }
    }

    /// Writes a paragraph. With verse separation every verse gets its own
    /// paragraph inside a wrapper carrying the block class.
    fn paragraph(&mut self, class: Option<&str>, nodes: &[&Node]) {
        let is_blank = |n: &&Node| match n {
            Node::Text(t) => t.trim().is_empty(),
            Node::Marker(m) => m.kind() == MarkerKind::Milestone,
        };
        if class.is_none() && nodes.iter().all(is_blank) {
            return;
        }

        let has_verses = nodes
            .iter()
            .any(|n| matches!(n, Node::Marker(m) if m.kind() == MarkerKind::Verse));

        if !(self.config.separate_verses && has_verses) {
            let content = self.inline(nodes);
            self.out.push_str(&format!("<p{}>{}</p>\n", class_attr(class), content));
            return;
        }

        self.out.push_str(&format!("<div{}>\n", class_attr(class)));
        let mut pending: Vec<&Node> = Vec::new();
        for node in nodes {
            match node {
                Node::Marker(m) if m.kind() == MarkerKind::Verse => {
                    if !pending.iter().all(is_blank) {
                        let content = self.inline(&pending);
                        self.out.push_str(&format!("<p>{}</p>\n", content));
                    }
                    pending.clear();
                    let verse = self.verse(m);
                    self.out.push_str(&format!("<p class=\"verse\">{}</p>\n", verse));
                }
                _ => pending.push(node),
            }
        }
        if !pending.iter().all(is_blank) {
            let content = self.inline(&pending);
            self.out.push_str(&format!("<p>{}</p>\n", content));
        }
        self.out.push_str("</div>\n");
    }

    fn inline(&mut self, nodes: &[&Node]) -> String {
        let mut out = String::new();
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(&escape_html(text)),
                Node::Marker(m) => self.inline_marker(m, &mut out),
            }
        }
        out.trim().to_string()
    }

    fn inline_children(&mut self, marker: &Marker) -> String {
        let children: Vec<&Node> = marker.children.iter().collect();
        let mut out = String::new();
        for node in children {
            match node {
                Node::Text(text) => out.push_str(&escape_html(text)),
                Node::Marker(m) => self.inline_marker(m, &mut out),
            }
        }
        out
    }

    fn inline_marker(&mut self, marker: &Marker, out: &mut String) {
        if marker.is_metadata() {
            return;
        }
        match marker.kind() {
            MarkerKind::Verse => {
                out.push_str(&self.verse(marker));
                out.push('\n');
            }
            MarkerKind::Character => match marker.base_tag() {
                "f" | "fe" | "x" => out.push_str(&self.note(marker)),
                "w" => out.push_str(&self.inline_children(marker)),
                "bd" => out.push_str(&format!("<b>{}</b>", self.inline_children(marker))),
                "it" => out.push_str(&format!("<i>{}</i>", self.inline_children(marker))),
                "em" => out.push_str(&format!("<em>{}</em>", self.inline_children(marker))),
                "bdit" => {
                    out.push_str(&format!("<b><i>{}</i></b>", self.inline_children(marker)))
                }
                "sup" => out.push_str(&format!("<sup>{}</sup>", self.inline_children(marker))),
                _ => out.push_str(&format!(
                    "<span class=\"{}\">{}</span>",
                    escape_html(&marker.tag),
                    self.inline_children(marker)
                )),
            },
            MarkerKind::NoteContent => out.push_str(&format!(
                "<span class=\"{}\">{}</span>",
                escape_html(&marker.tag),
                self.inline_children(marker)
            )),
            MarkerKind::Chapter | MarkerKind::Block => {
                out.push_str(&self.inline_children(marker));
            }
            MarkerKind::Milestone => {}
        }
    }

    fn verse(&mut self, verse: &Marker) -> String {
        let number = verse.argument.as_deref().unwrap_or_default();
        let content = self.inline_children(verse);
        format!(
            "<span class=\"verse\"><sup class=\"versemarker\">{}</sup> {}</span>",
            escape_html(number),
            content.trim()
        )
    }

    /// Writes a note reference and queues the note body.
    fn note(&mut self, note: &Marker) -> String {
        self.note_count += 1;
        let number = self.note_count;
        let class = if note.base_tag() == "x" { "crossref" } else { "footnote" };

        // Text directly inside the note is the caller, not content.
        let mut body = String::new();
        for child in note.children.iter().filter_map(|n| n.as_marker()) {
            self.inline_marker(child, &mut body);
        }
        self.notes.push(Note {
            class,
            body: body.trim().to_string(),
        });

        format!(
            "<sup class=\"{class}\"><a href=\"#fn{number}\" id=\"fnref{number}\">{number}</a></sup>"
        )
    }

    fn flush_notes(&mut self) {
        if self.notes.is_empty() {
            return;
        }
        let first = self.note_count - self.notes.len() + 1;
        self.out.push_str("<div class=\"footnotes\">\n");
        for (offset, note) in std::mem::take(&mut self.notes).into_iter().enumerate() {
            let number = first + offset;
            self.out.push_str(&format!(
                "<p class=\"{}\" id=\"fn{number}\"><a href=\"#fnref{number}\">{number}</a> {}</p>\n",
                note.class, note.body
            ));
        }
        self.out.push_str("</div>\n");
    }
}

fn class_attr(class: Option<&str>) -> String {
    class
        .map(|c| format!(" class=\"{}\"", escape_html(c)))
        .unwrap_or_default()
}

fn push_raw(out: &mut String, html: &str) {
    if html.is_empty() {
        return;
    }
    out.push_str(html);
    if !html.ends_with('\n') {
        out.push('\n');
    }
}

/// Escapes text for HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(ch),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_options::ParseOptions;
    use crate::usfm::{MarkerParser, UsfmParser};

    const SOURCE: &str = "\\id GEN\n\\h Genesis\n\\mt1 Genesis\n\
\\c 1\n\\s1 The Creation\n\\p\n\
\\v 1 In the beginning.\n\\v 2 The earth was empty.\\f + \\fr 1:2 \\ft Or: formless\\f*\n\
\\c 2\n\\p\n\\v 1 Finished.\n\
\\c 3\n\\p\n\\v 1 Rest.\n";

    fn render(config: &HypertextConfig) -> String {
        let doc = UsfmParser::new().parse(SOURCE).unwrap();
        HtmlRenderer::new().render(&doc, config, "", "").unwrap()
    }

    #[test]
    fn test_default_document_shape() {
        let html = render(&HypertextConfig::default());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Genesis</title>"));
        assert!(html.contains("<link rel=\"stylesheet\" href=\"style.css\">"));
        assert!(html.contains("<body>\n<div>\n"));
        assert!(html.contains("<h1 class=\"mt1\">Genesis</h1>"));
        assert!(html.contains("<h3 class=\"s1\">The Creation</h3>"));
        assert!(html.contains("<h2 class=\"chapter-number\">1</h2>"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_div_carries_classes() {
        let config = HypertextConfig {
            div_classes: vec!["double-space".into(), "two-column".into()],
            ..Default::default()
        };
        let html = render(&config);
        assert!(html.contains("<div class=\"double-space two-column\">"));
    }

    #[test]
    fn test_chapter_page_breaks() {
        let separated = render(&HypertextConfig::default());
        assert_eq!(separated.matches("class=\"pagebreak\"").count(), 2);

        let combined = render(&HypertextConfig {
            separate_chapters: false,
            ..Default::default()
        });
        assert_eq!(combined.matches("class=\"pagebreak\"").count(), 0);
    }

    #[test]
    fn test_verses_inline_by_default() {
        let html = render(&HypertextConfig::default());
        assert_eq!(html.matches("<span class=\"verse\">").count(), 4);
        assert_eq!(html.matches("<p class=\"verse\">").count(), 0);
        assert!(html.contains(
            "<span class=\"verse\"><sup class=\"versemarker\">1</sup> In the beginning.</span>"
        ));
    }

    #[test]
    fn test_separated_verses_get_paragraphs() {
        let html = render(&HypertextConfig {
            separate_verses: true,
            ..Default::default()
        });
        assert_eq!(html.matches("<p class=\"verse\">").count(), 4);
        assert!(html.contains("<div class=\"p\">"));
    }

    #[test]
    fn test_footnotes_listed_after_chapter() {
        let html = render(&HypertextConfig::default());
        assert!(html.contains("<sup class=\"footnote\"><a href=\"#fn1\" id=\"fnref1\">1</a></sup>"));
        assert!(html.contains("<div class=\"footnotes\">"));
        assert!(html.contains("<span class=\"ft\">Or: formless</span>"));
        assert!(!html.contains("+ "));

        let notes_at = html.find("class=\"footnotes\"").unwrap();
        let chapter_two_at = html.find("<h2 class=\"chapter-number\">2</h2>").unwrap();
        assert!(notes_at < chapter_two_at);
    }

    #[test]
    fn test_front_matter_and_footer_placement() {
        let doc = UsfmParser::new().parse("\\p Text").unwrap();
        let html = HtmlRenderer::new()
            .render(
                &doc,
                &HypertextConfig::default(),
                "<p>LICENSE</p>",
                "<div class=\"FooterSection\">FOOTER</div>",
            )
            .unwrap();

        let license = html.find("LICENSE").unwrap();
        let content = html.find("<p class=\"p\">Text</p>").unwrap();
        let footer = html.find("FOOTER").unwrap();
        assert!(license < content && content < footer);
    }

    #[test]
    fn test_milestones_render_nothing() {
        let parser = UsfmParser::with_options(ParseOptions::new().without_ignored_markers());
        let doc = parser
            .parse("\\c 1\n\\p\n\\v 1 \\qt-s |who=\"Jesus\"\\*Follow me.\n\\ts\\*\n\\p\n\\v 2 Come.\\qt-e\\*")
            .unwrap();
        let html = HtmlRenderer::new()
            .render(&doc, &HypertextConfig::default(), "", "")
            .unwrap();
        assert!(html.contains("<sup class=\"versemarker\">1</sup> Follow me.</span>"));
        assert!(html.contains("<sup class=\"versemarker\">2</sup> Come.</span>"));
        assert!(!html.contains("qt-"));
        assert!(!html.contains("\\*"));
    }

    #[test]
    fn test_text_is_escaped() {
        let doc = UsfmParser::new().parse("\\p a < b & \"c\"").unwrap();
        let html = HtmlRenderer::new()
            .render(&doc, &HypertextConfig::default(), "", "")
            .unwrap();
        assert!(html.contains("a &lt; b &amp; &quot;c&quot;"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href='x'>"), "&lt;a href=&#39;x&#39;&gt;");
    }
}
