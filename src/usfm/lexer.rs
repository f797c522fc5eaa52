//! Marker tokenizer.

use regex::Regex;
use std::sync::LazyLock;

/// `\tag`, `\+tag` (nested character marker), `\tag*` (closing marker) and
/// `\tag-s` / `\tag-e` (milestone start and end).
static RE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\(\+?)([A-Za-z][A-Za-z0-9]*(?:-[se])?)(\*?)").unwrap());

/// Terminator of a milestone and its attributes.
const SELF_CLOSE: &str = "\\*";

/// A lexical token with the 1-based line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Opening marker
    Open { tag: String, nested: bool, line: usize },
    /// Closing marker (`\tag*`)
    Close { tag: String, line: usize },
    /// Text between markers, whitespace runs collapsed to one space
    Text { text: String, line: usize },
    /// Empty point marker: `\tag\*`, or `\tag-s`/`\tag-e` with its
    /// attributes up to `\*`
    Milestone { tag: String, line: usize },
}

impl Token {
    /// Line the token starts on.
    pub fn line(&self) -> usize {
        match self {
            Token::Open { line, .. }
            | Token::Close { line, .. }
            | Token::Text { line, .. }
            | Token::Milestone { line, .. } => *line,
        }
    }
}

/// Splits marker source into tokens.
///
/// One whitespace character after an opening marker belongs to the marker
/// and is not part of the following text.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut cursor = 0;
    let mut line = 1;

    for caps in RE_MARKER.captures_iter(input) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() < cursor {
            continue;
        }

        push_text(&mut tokens, &input[cursor..whole.start()], line);
        line += count_newlines(&input[cursor..whole.start()]);

        let tag = caps[2].to_string();
        let closing = !caps[3].is_empty();
        cursor = whole.end();

        if closing {
            tokens.push(Token::Close { tag, line });
        } else if let Some(skipped) = milestone_end(&tag, &input[cursor..]) {
            tokens.push(Token::Milestone { tag, line });
            line += count_newlines(&input[cursor..cursor + skipped]);
            cursor += skipped;
        } else {
            tokens.push(Token::Open {
                tag,
                nested: !caps[1].is_empty(),
                line,
            });
            if let Some(ws) = input[cursor..].chars().next().filter(|c| c.is_whitespace()) {
                if ws == '\n' {
                    line += 1;
                }
                cursor += ws.len_utf8();
            }
        }
    }

    push_text(&mut tokens, &input[cursor..], line);
    tokens
}

/// Length of the milestone tail after `tag`, or None when `tag` opens a
/// regular marker.
///
/// `\tag\*` ends right away. A `-s`/`-e` milestone may carry attributes;
/// they are consumed when `\*` is the next marker.
fn milestone_end(tag: &str, rest: &str) -> Option<usize> {
    if rest.starts_with(SELF_CLOSE) {
        return Some(SELF_CLOSE.len());
    }
    if !(tag.ends_with("-s") || tag.ends_with("-e")) {
        return None;
    }
    match rest.find('\\') {
        Some(at) if rest[at..].starts_with(SELF_CLOSE) => Some(at + SELF_CLOSE.len()),
        _ => Some(0),
    }
}

fn push_text(tokens: &mut Vec<Token>, raw: &str, line: usize) {
    if raw.is_empty() {
        return;
    }
    let text = collapse_whitespace(raw);
    if !text.is_empty() {
        tokens.push(Token::Text { text, line });
    }
}

fn count_newlines(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count()
}

/// Collapses every whitespace run to a single space.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}
