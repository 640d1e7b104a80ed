//! Choosing how a scalar is written, and writing it.
//!
//! A scalar is written plain when scanning the text back yields the same
//! plain scalar and the same resolved type. Otherwise it is single-quoted
//! when it is one printable line, a literal block when it is multi-line
//! text in block context, and double-quoted with escapes as a last resort.

use std::borrow::Cow;

use yamlet_parse::CORE_TAG_PREFIX;
use yamlet_parse::resolver::{is_null, resolve_plain};
use yamlet_scanner::{Scanner, Token, TokenKind};

/// How a scalar is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    /// `|` block, with the chomping indicator in the header.
    Literal,
}

/// Where a scalar is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Inside a flow collection.
    pub flow: bool,
    /// A map key.
    pub key: bool,
}

/// Whether `text` scans back as exactly this plain scalar.
pub fn rescans_as_plain(text: &str, flow: bool) -> bool {
    if text.is_empty() {
        return false;
    }
    // Indicators that end a plain scalar early in flow context.
    if flow && text.contains([':', ',', '[', ']', '{', '}', '#']) {
        return false;
    }
    let source = if flow {
        Cow::Owned(format!("[{}]", text))
    } else {
        Cow::Borrowed(text)
    };
    let Ok(tokens) = Scanner::new(source.as_ref()).collect::<Result<Vec<Token>, _>>() else {
        return false;
    };
    let scalar = match (flow, tokens.as_slice()) {
        (false, [scalar]) => scalar,
        (true, [open, scalar, close])
            if open.kind == TokenKind::FlowSeqStart && close.kind == TokenKind::FlowSeqEnd =>
        {
            scalar
        }
        _ => return false,
    };
    scalar.kind == TokenKind::PlainScalar && scalar.value == text
}

/// Whether the tag asks for a string regardless of what the text looks like.
fn wants_string(tag: &str) -> bool {
    tag == "!" || tag.strip_prefix(CORE_TAG_PREFIX) == Some("str")
}

fn is_printable(c: char) -> bool {
    !c.is_control() && !matches!(c, '\u{feff}' | '\u{2028}' | '\u{2029}')
}

fn fits_literal(text: &str) -> bool {
    if !text.contains('\n') || text.ends_with("\n\n") {
        return false;
    }
    let first = text.lines().next().unwrap_or_default();
    !first.is_empty()
        && !first.starts_with([' ', '\t'])
        && text.chars().all(|c| c == '\n' || c == '\t' || is_printable(c))
}

/// Pick the style for a scalar with the given tag.
pub fn choose_style(text: &str, tag: &str, placement: Placement) -> ScalarStyle {
    let untyped = tag.is_empty() || tag == "?";
    let plain = rescans_as_plain(text, placement.flow)
        && !(wants_string(tag) && resolve_plain(text) != "str")
        && !(untyped && is_null(text));
    if plain {
        ScalarStyle::Plain
    } else if text.chars().all(is_printable) {
        ScalarStyle::SingleQuoted
    } else if !placement.flow && !placement.key && fits_literal(text) {
        ScalarStyle::Literal
    } else {
        ScalarStyle::DoubleQuoted
    }
}

/// The tag to write in front of a node, or `None` when the written form
/// already implies it. `implied` is the core schema name the node would
/// resolve to untagged.
pub fn tag_text(tag: &str, implied: &str) -> Option<String> {
    if tag.is_empty() || tag == "?" || tag == "!" {
        return None;
    }
    if let Some(suffix) = tag.strip_prefix(CORE_TAG_PREFIX) {
        return (suffix != implied).then(|| format!("!!{}", suffix));
    }
    if tag.starts_with('!') {
        Some(tag.to_string())
    } else {
        Some(format!("!<{}>", tag))
    }
}

/// The core schema type a scalar written in `style` resolves to untagged.
pub fn implied_type(text: &str, style: ScalarStyle) -> &'static str {
    match style {
        ScalarStyle::Plain => resolve_plain(text),
        _ => "str",
    }
}

/// `text` in single quotes, with `'` doubled.
pub fn single_quoted(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// `text` in double quotes, with escapes for quotes, backslashes and
/// anything unprintable.
pub fn double_quoted(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + 2);
    result.push('"');
    for c in text.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\0' => result.push_str("\\0"),
            '\u{7}' => result.push_str("\\a"),
            '\u{8}' => result.push_str("\\b"),
            '\t' => result.push_str("\\t"),
            '\n' => result.push_str("\\n"),
            '\u{b}' => result.push_str("\\v"),
            '\u{c}' => result.push_str("\\f"),
            '\r' => result.push_str("\\r"),
            '\u{1b}' => result.push_str("\\e"),
            '\u{85}' => result.push_str("\\N"),
            '\u{2028}' => result.push_str("\\L"),
            '\u{2029}' => result.push_str("\\P"),
            c if !is_printable(c) => {
                let code = c as u32;
                if code <= 0xff {
                    result.push_str(&format!("\\x{:02X}", code));
                } else {
                    result.push_str(&format!("\\u{:04X}", code));
                }
            }
            c => result.push(c),
        }
    }
    result.push('"');
    result
}

/// The header and body of a literal block, the body indented by `indent`
/// columns.
pub fn literal(text: &str, indent: usize) -> String {
    let (header, body) = match text.strip_suffix('\n') {
        Some(body) => ("|", body),
        None => ("|-", text),
    };
    let mut result = String::from(header);
    for line in body.split('\n') {
        result.push('\n');
        if !line.is_empty() {
            result.extend(std::iter::repeat_n(' ', indent));
            result.push_str(line);
        }
    }
    result
}
