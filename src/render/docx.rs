//! DOCX renderer.
//!
//! The marker tree is first laid out as a flat list of paragraphs, which are
//! then serialized into `word/document.xml` and packed with the static parts
//! of a minimal WordprocessingML package.

use super::{DocumentConfig, DocumentRenderer};
use crate::error::Result;
use crate::model::{Document, Marker, MarkerKind, Node};
use bytes::Bytes;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
</Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:rPr><w:sz w:val="24"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:pPr><w:jc w:val="center"/></w:pPr><w:rPr><w:b/><w:sz w:val="48"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:rPr><w:b/><w:sz w:val="32"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:rPr><w:i/><w:sz w:val="28"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="ChapterNumber"><w:name w:val="Chapter Number"/><w:basedOn w:val="Normal"/><w:rPr><w:b/><w:sz w:val="36"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="Note"><w:name w:val="Note"/><w:basedOn w:val="Normal"/><w:rPr><w:sz w:val="18"/></w:rPr></w:style>
</w:styles>"#;

/// Renders a marker tree as a DOCX package.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxRenderer;

impl DocxRenderer {
    /// Creates a new renderer.
    pub fn new() -> Self {
        Self
    }
}

impl DocumentRenderer for DocxRenderer {
    fn render(&self, document: &Document, config: &DocumentConfig) -> Result<Bytes> {
        let paragraphs = Layout::new(config).run(document);
        let document_xml = write_document_xml(&paragraphs, config)?;
        package(&document_xml)
    }
}

/// Paragraph style ids defined in `styles.xml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParagraphStyle {
    Normal,
    Title,
    Heading1,
    Heading2,
    ChapterNumber,
    Note,
}

impl ParagraphStyle {
    fn id(self) -> &'static str {
        match self {
            ParagraphStyle::Normal => "Normal",
            ParagraphStyle::Title => "Title",
            ParagraphStyle::Heading1 => "Heading1",
            ParagraphStyle::Heading2 => "Heading2",
            ParagraphStyle::ChapterNumber => "ChapterNumber",
            ParagraphStyle::Note => "Note",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RunFormat {
    bold: bool,
    italic: bool,
    superscript: bool,
    small_caps: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct Run {
    text: String,
    format: RunFormat,
}

#[derive(Debug, Clone, PartialEq)]
struct Paragraph {
    style: ParagraphStyle,
    page_break_before: bool,
    runs: Vec<Run>,
}

impl Paragraph {
    fn new(style: ParagraphStyle) -> Self {
        Self {
            style,
            page_break_before: false,
            runs: Vec::new(),
        }
    }

    fn is_blank(&self) -> bool {
        self.runs.iter().all(|r| r.text.trim().is_empty())
    }

    fn push(&mut self, text: &str, format: RunFormat) {
        if text.is_empty() {
            return;
        }
        match self.runs.last_mut() {
            Some(last) if last.format == format => last.text.push_str(text),
            _ => self.runs.push(Run {
                text: text.to_string(),
                format,
            }),
        }
    }

    fn trim(&mut self) {
        if let Some(first) = self.runs.first_mut() {
            first.text = first.text.trim_start().to_string();
        }
        if let Some(last) = self.runs.last_mut() {
            last.text = last.text.trim_end().to_string();
        }
        self.runs.retain(|r| !r.text.is_empty());
    }
}

/// Flattens the marker tree into paragraphs.
struct Layout<'a> {
    config: &'a DocumentConfig,
    paragraphs: Vec<Paragraph>,
    notes: Vec<Paragraph>,
    note_count: usize,
    chapters: usize,
}

impl<'a> Layout<'a> {
    fn new(config: &'a DocumentConfig) -> Self {
        Self {
            config,
            paragraphs: Vec::new(),
            notes: Vec::new(),
            note_count: 0,
            chapters: 0,
        }
    }

    fn run(mut self, document: &Document) -> Vec<Paragraph> {
        self.blocks(&document.contents);
        self.flush_notes();
        self.paragraphs
    }

    fn blocks(&mut self, nodes: &[Node]) {
        let mut current = Paragraph::new(ParagraphStyle::Normal);
        for node in nodes {
            match node {
                Node::Marker(m) if m.is_metadata() => {}
                Node::Marker(m) if m.kind() == MarkerKind::Chapter => {
                    self.finish(std::mem::replace(&mut current, Paragraph::new(ParagraphStyle::Normal)));
                    self.chapter(m);
                }
                Node::Marker(m) if m.kind() == MarkerKind::Block => {
                    self.finish(std::mem::replace(&mut current, Paragraph::new(ParagraphStyle::Normal)));
                    self.block_marker(m);
                }
                Node::Marker(m) if m.kind() == MarkerKind::Verse && self.config.separate_verses => {
                    self.finish(std::mem::replace(&mut current, Paragraph::new(ParagraphStyle::Normal)));
                    let mut verse = Paragraph::new(ParagraphStyle::Normal);
                    self.verse(m, &mut verse);
                    self.finish(verse);
                }
                _ => self.inline(node, RunFormat::default(), &mut current),
            }
        }
        self.finish(current);
    }

    fn chapter(&mut self, chapter: &Marker) {
        let mut heading = Paragraph::new(ParagraphStyle::ChapterNumber);
        heading.page_break_before = self.chapters > 0 && self.config.separate_chapters;
        self.chapters += 1;

        let number = chapter.argument.as_deref().unwrap_or_default();
        heading.push(number, RunFormat::default());
        self.paragraphs.push(heading);

        self.blocks(&chapter.children);
        self.flush_notes();
    }

    fn block_marker(&mut self, marker: &Marker) {
        let style = match marker.base_tag() {
            "mt" | "imt" | "mte" => ParagraphStyle::Title,
            "ms" | "mr" => ParagraphStyle::Heading1,
            "s" | "is" | "r" | "sr" | "sp" | "d" => ParagraphStyle::Heading2,
            "b" => {
                self.paragraphs.push(Paragraph::new(ParagraphStyle::Normal));
                return;
            }
            _ => ParagraphStyle::Normal,
        };

        if style != ParagraphStyle::Normal {
            let mut heading = Paragraph::new(style);
            for child in &marker.children {
                self.inline(child, RunFormat::default(), &mut heading);
            }
            self.finish(heading);
            return;
        }

        let mut current = Paragraph::new(style);
        for child in &marker.children {
            match child {
                Node::Marker(m) if m.kind() == MarkerKind::Verse && self.config.separate_verses => {
                    self.finish(std::mem::replace(&mut current, Paragraph::new(style)));
                    let mut verse = Paragraph::new(style);
                    self.verse(m, &mut verse);
                    self.finish(verse);
                }
                _ => self.inline(child, RunFormat::default(), &mut current),
            }
        }
        self.finish(current);
    }

    fn verse(&mut self, verse: &Marker, paragraph: &mut Paragraph) {
        let number = verse.argument.as_deref().unwrap_or_default();
        let superscript = RunFormat {
            superscript: true,
            ..RunFormat::default()
        };
        if let Some(last) = paragraph.runs.last_mut() {
            if !last.text.ends_with(' ') {
                last.text.push(' ');
            }
        }
        paragraph.push(number, superscript);
        paragraph.push(" ", RunFormat::default());
        for child in &verse.children {
            self.inline(child, RunFormat::default(), paragraph);
        }
    }

    fn inline(&mut self, node: &Node, format: RunFormat, paragraph: &mut Paragraph) {
        let marker = match node {
            Node::Text(text) => return paragraph.push(text, format),
            Node::Marker(m) => m,
        };
        if marker.is_metadata() || marker.kind() == MarkerKind::Milestone {
            return;
        }

        if marker.kind() == MarkerKind::Verse {
            return self.verse(marker, paragraph);
        }

        let mut format = format;
        match marker.base_tag() {
            "f" | "fe" | "x" => return self.note(marker, paragraph),
            "bd" => format.bold = true,
            "it" | "em" | "add" => format.italic = true,
            "bdit" => {
                format.bold = true;
                format.italic = true;
            }
            "sup" => format.superscript = true,
            "nd" | "sc" => format.small_caps = true,
            _ => {}
        }
        for child in &marker.children {
            self.inline(child, format, paragraph);
        }
    }

    /// Places a superscript note number and queues the note text.
    fn note(&mut self, note: &Marker, paragraph: &mut Paragraph) {
        self.note_count += 1;
        let number = self.note_count.to_string();
        paragraph.push(
            &number,
            RunFormat {
                superscript: true,
                ..RunFormat::default()
            },
        );

        let mut body = Paragraph::new(ParagraphStyle::Note);
        body.push(&format!("{} ", number), RunFormat::default());
        // Text directly inside the note is the caller, not content.
        for child in note.children.iter().filter(|n| n.as_marker().is_some()) {
            let format = match child.as_marker().map(|m| m.base_tag()) {
                Some("fr") | Some("xo") => RunFormat {
                    bold: true,
                    ..RunFormat::default()
                },
                _ => RunFormat::default(),
            };
            self.inline_note_content(child, format, &mut body);
        }
        body.trim();
        self.notes.push(body);
    }

    fn inline_note_content(&mut self, node: &Node, format: RunFormat, paragraph: &mut Paragraph) {
        match node {
            Node::Text(text) => paragraph.push(text, format),
            Node::Marker(m) => {
                for child in &m.children {
                    self.inline_note_content(child, format, paragraph);
                }
            }
        }
    }

    fn flush_notes(&mut self) {
        let notes = std::mem::take(&mut self.notes);
        self.paragraphs.extend(notes);
    }

    fn finish(&mut self, mut paragraph: Paragraph) {
        paragraph.trim();
        if paragraph.style == ParagraphStyle::Normal && paragraph.is_blank() {
            return;
        }
        self.paragraphs.push(paragraph);
    }
}

fn write_document_xml(paragraphs: &[Paragraph], config: &DocumentConfig) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    start(&mut writer, "w:document", &[("xmlns:w", W_NS)])?;
    start(&mut writer, "w:body", &[])?;

    let line = config.line_twips().to_string();
    for paragraph in paragraphs {
        write_paragraph(&mut writer, paragraph, config, &line)?;
    }

    start(&mut writer, "w:sectPr", &[])?;
    let columns = config.column_count.max(1).to_string();
    empty(&mut writer, "w:cols", &[("w:num", columns.as_str()), ("w:space", "720")])?;
    end(&mut writer, "w:sectPr")?;

    end(&mut writer, "w:body")?;
    end(&mut writer, "w:document")?;
    Ok(writer.into_inner())
}

fn write_paragraph(
    writer: &mut Writer<Vec<u8>>,
    paragraph: &Paragraph,
    config: &DocumentConfig,
    line: &str,
) -> Result<()> {
    start(writer, "w:p", &[])?;

    start(writer, "w:pPr", &[])?;
    empty(writer, "w:pStyle", &[("w:val", paragraph.style.id())])?;
    if paragraph.page_break_before {
        empty(writer, "w:pageBreakBefore", &[])?;
    }
    if config.right_to_left {
        empty(writer, "w:bidi", &[])?;
    }
    empty(writer, "w:spacing", &[("w:line", line), ("w:lineRule", "auto")])?;
    end(writer, "w:pPr")?;

    for run in &paragraph.runs {
        start(writer, "w:r", &[])?;
        let format = run.format;
        if format != RunFormat::default() || config.right_to_left {
            start(writer, "w:rPr", &[])?;
            if format.bold {
                empty(writer, "w:b", &[])?;
            }
            if format.italic {
                empty(writer, "w:i", &[])?;
            }
            if format.small_caps {
                empty(writer, "w:smallCaps", &[])?;
            }
            if format.superscript {
                empty(writer, "w:vertAlign", &[("w:val", "superscript")])?;
            }
            if config.right_to_left {
                empty(writer, "w:rtl", &[])?;
            }
            end(writer, "w:rPr")?;
        }
        start(writer, "w:t", &[("xml:space", "preserve")])?;
        writer.write_event(Event::Text(BytesText::new(&run.text)))?;
        end(writer, "w:t")?;
        end(writer, "w:r")?;
    }

    end(writer, "w:p")?;
    Ok(())
}

fn start(writer: &mut Writer<Vec<u8>>, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
    let element = BytesStart::new(name).with_attributes(attrs.iter().copied());
    writer.write_event(Event::Start(element))?;
    Ok(())
}

fn empty(writer: &mut Writer<Vec<u8>>, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
    let element = BytesStart::new(name).with_attributes(attrs.iter().copied());
    writer.write_event(Event::Empty(element))?;
    Ok(())
}

fn end(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<()> {
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn package(document_xml: &[u8]) -> Result<Bytes> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts: [(&str, &[u8]); 5] = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes()),
        ("_rels/.rels", ROOT_RELS_XML.as_bytes()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS_XML.as_bytes()),
        ("word/styles.xml", STYLES_XML.as_bytes()),
        ("word/document.xml", document_xml),
    ];
    for (name, content) in parts {
        zip.start_file(name, options)?;
        zip.write_all(content)?;
    }

    let cursor = zip.finish()?;
    Ok(Bytes::from(cursor.into_inner()))
}
