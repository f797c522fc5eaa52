//! Tree builder over the token stream.

use super::lexer::{tokenize, Token};
use crate::error::{Error, Result};
use crate::model::{milestone_name, Document, Marker, MarkerKind, Node};
use crate::parse_options::ParseOptions;

/// Builds a marker tree from source text.
pub(crate) struct TreeBuilder<'a> {
    options: &'a ParseOptions,
    document: Document,
    /// Open markers, outermost first
    open: Vec<Marker>,
    /// Drop text until the next marker (after an ignored marker)
    skipping: bool,
    /// Expect the chapter/verse number as the next word
    awaiting_argument: Option<usize>,
}

impl<'a> TreeBuilder<'a> {
    pub(crate) fn new(options: &'a ParseOptions) -> Self {
        Self {
            options,
            document: Document::new(),
            open: Vec::new(),
            skipping: false,
            awaiting_argument: None,
        }
    }

    pub(crate) fn build(mut self, input: &str) -> Result<Document> {
        let mut last_line = 1;
        for token in tokenize(input) {
            last_line = token.line();
            self.check_argument(&token)?;
            match token {
                Token::Open { tag, line, .. } => self.open_marker(tag, line)?,
                Token::Close { tag, line } => self.close_marker(&tag, line)?,
                Token::Text { text, line } => self.text(&text, line)?,
                Token::Milestone { tag, .. } => self.milestone(tag),
            }
        }

        if let Some(line) = self.awaiting_argument.take() {
            self.missing_argument(line)?;
        }
        if let Some(inline) = self.open.iter().find(|m| m.kind().is_inline()) {
            if !self.options.is_lenient() {
                return Err(Error::parse(
                    last_line,
                    format!("unclosed marker \\{} at end of input", inline.tag),
                ));
            }
        }
        self.close_while(|_| true);
        trim_trailing(&mut self.document.contents);
        Ok(self.document)
    }

    /// Chapter and verse markers must be followed by a number.
    fn check_argument(&mut self, token: &Token) -> Result<()> {
        if let Some(line) = self.awaiting_argument {
            if !matches!(token, Token::Text { .. }) {
                self.awaiting_argument = None;
                self.missing_argument(line)?;
            }
        }
        Ok(())
    }

    fn missing_argument(&mut self, line: usize) -> Result<()> {
        let tag = self.open.last().map(|m| m.tag.clone()).unwrap_or_default();
        if self.options.is_lenient() {
            return Ok(());
        }
        Err(Error::parse(
            line,
            format!("\\{} marker without a number", tag),
        ))
    }

    fn open_marker(&mut self, tag: String, line: usize) -> Result<()> {
        let kind = MarkerKind::of(&tag);
        if kind == MarkerKind::Milestone {
            self.milestone(tag);
            return Ok(());
        }
        if self.options.is_ignored(&tag) {
            self.skipping = true;
            return Ok(());
        }
        self.skipping = false;

        match kind {
            MarkerKind::Chapter | MarkerKind::Block | MarkerKind::Verse => {
                self.ensure_no_inline(&tag, line)?;
                match kind {
                    MarkerKind::Chapter => self.close_while(|_| true),
                    MarkerKind::Block => self.close_while(|k| k != MarkerKind::Chapter),
                    _ => self.close_while(|k| k == MarkerKind::Verse || k.is_inline()),
                }
                if matches!(kind, MarkerKind::Chapter | MarkerKind::Verse) {
                    self.awaiting_argument = Some(line);
                }
            }
            MarkerKind::NoteContent => {
                if self.open.last().map(|m| m.kind()) == Some(MarkerKind::NoteContent) {
                    self.pop();
                }
            }
            MarkerKind::Character | MarkerKind::Milestone => {}
        }

        self.open.push(Marker::new(tag));
        Ok(())
    }

    /// Places an empty point marker. Milestones open nothing, so a start
    /// milestone never has to be closed before the next block.
    fn milestone(&mut self, tag: String) {
        self.skipping = false;
        if self.options.is_ignored(milestone_name(&tag)) {
            return;
        }
        let marker = Marker::new(tag);
        match self.open.last_mut() {
            Some(parent) => parent.push_marker(marker),
            None => self.document.push_marker(marker),
        }
    }

    fn close_marker(&mut self, tag: &str, line: usize) -> Result<()> {
        if self.options.is_ignored(tag) {
            return Ok(());
        }
        self.skipping = false;

        let position = self
            .open
            .iter()
            .rposition(|m| m.tag == tag)
            .filter(|&i| self.open[i..].iter().all(|m| m.kind().is_inline()));

        match position {
            Some(index) => {
                while self.open.len() > index {
                    self.pop();
                }
                Ok(())
            }
            None if self.options.is_lenient() => Ok(()),
            None => Err(Error::parse(
                line,
                format!("closing marker \\{}* without a matching opening marker", tag),
            )),
        }
    }

    fn text(&mut self, text: &str, line: usize) -> Result<()> {
        if self.skipping {
            return Ok(());
        }

        let mut text = text;
        if self.awaiting_argument.take().is_some() {
            let trimmed = text.trim_start();
            let end = trimmed.find(' ').unwrap_or(trimmed.len());
            let (number, rest) = trimmed.split_at(end);
            if number.starts_with(|c: char| c.is_ascii_digit()) {
                if let Some(marker) = self.open.last_mut() {
                    marker.argument = Some(number.to_string());
                }
                text = rest.strip_prefix(' ').unwrap_or(rest);
            } else {
                self.missing_argument(line)?;
            }
        }

        let top_is_inline = self
            .open
            .last()
            .map(|m| m.kind().is_inline())
            .unwrap_or(false);

        match self.open.last_mut() {
            Some(marker) if marker.tag == "w" => {
                // Word attributes follow a `|` and are not readable text.
                let visible = text.split('|').next().unwrap_or_default();
                marker.push_text(visible);
            }
            Some(marker) => {
                if top_is_inline || !text.trim().is_empty() || ends_with_inline(marker) {
                    let text = if marker.children.iter().all(is_milestone) {
                        text.trim_start()
                    } else {
                        text
                    };
                    marker.push_text(text);
                }
            }
            None => {
                if !text.trim().is_empty() {
                    let text = if self.document.contents.is_empty() {
                        text.trim_start()
                    } else {
                        text
                    };
                    self.document.push_text(text);
                }
            }
        }
        Ok(())
    }

    fn ensure_no_inline(&mut self, tag: &str, line: usize) -> Result<()> {
        if self.options.is_lenient() {
            return Ok(());
        }
        match self.open.iter().find(|m| m.kind().is_inline()) {
            Some(inline) => Err(Error::parse(
                line,
                format!("\\{} inside unclosed \\{}", tag, inline.tag),
            )),
            None => Ok(()),
        }
    }

    /// Closes open markers from the innermost outward while `pred` holds.
    fn close_while(&mut self, pred: impl Fn(MarkerKind) -> bool) {
        while let Some(top) = self.open.last() {
            if !pred(top.kind()) {
                break;
            }
            self.pop();
        }
    }

    /// Closes the innermost open marker and attaches it to its parent.
    fn pop(&mut self) {
        let Some(mut marker) = self.open.pop() else {
            return;
        };
        if !marker.kind().is_inline() {
            trim_trailing(&mut marker.children);
        }
        match self.open.last_mut() {
            Some(parent) => parent.push_marker(marker),
            None => self.document.push_marker(marker),
        }
    }
}

fn is_milestone(node: &Node) -> bool {
    node.as_marker()
        .map(|m| m.kind() == MarkerKind::Milestone)
        .unwrap_or(false)
}

fn ends_with_inline(marker: &Marker) -> bool {
    marker
        .children
        .last()
        .and_then(|n| n.as_marker())
        .map(|m| m.kind().is_inline())
        .unwrap_or(false)
}

/// Removes trailing whitespace from the last text node, dropping it if empty.
fn trim_trailing(nodes: &mut Vec<Node>) {
    if let Some(Node::Text(text)) = nodes.last_mut() {
        let trimmed_len = text.trim_end().len();
        text.truncate(trimmed_len);
        if text.is_empty() {
            nodes.pop();
        }
    }
}
