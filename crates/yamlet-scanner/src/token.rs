//! Token types produced by the scanner.

use std::fmt;

use crate::Mark;

/// The kind of a token.
///
/// Block collections are implied by indentation and have no start/end tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `%NAME params...`
    Directive,
    /// `---`
    DocStart,
    /// `...`
    DocEnd,
    /// `-` in block context
    BlockEntry,
    /// `[`
    FlowSeqStart,
    /// `{`
    FlowMapStart,
    /// `]`
    FlowSeqEnd,
    /// `}`
    FlowMapEnd,
    /// `,`
    FlowEntry,
    /// `?`, or inserted in front of a simple key
    Key,
    /// `:`
    Value,
    /// `&name`
    Anchor,
    /// `*name`
    Alias,
    /// `!...`
    Tag,
    /// Unquoted scalar
    PlainScalar,
    /// Quoted or block scalar
    NonPlainScalar,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Directive => "DIRECTIVE",
            TokenKind::DocStart => "DOC_START",
            TokenKind::DocEnd => "DOC_END",
            TokenKind::BlockEntry => "BLOCK_ENTRY",
            TokenKind::FlowSeqStart => "FLOW_SEQ_START",
            TokenKind::FlowMapStart => "FLOW_MAP_START",
            TokenKind::FlowSeqEnd => "FLOW_SEQ_END",
            TokenKind::FlowMapEnd => "FLOW_MAP_END",
            TokenKind::FlowEntry => "FLOW_ENTRY",
            TokenKind::Key => "KEY",
            TokenKind::Value => "VALUE",
            TokenKind::Anchor => "ANCHOR",
            TokenKind::Alias => "ALIAS",
            TokenKind::Tag => "TAG",
            TokenKind::PlainScalar => "PLAIN_SCALAR",
            TokenKind::NonPlainScalar => "NON_PLAIN_SCALAR",
        };
        f.write_str(name)
    }
}

/// The syntactic form of a tag token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    /// `!<uri>`
    Verbatim,
    /// `!suffix`
    PrimaryHandle,
    /// `!!suffix` before the suffix is known
    SecondaryHandle,
    /// `!handle!suffix`, including `!!suffix`
    NamedHandle,
    /// `!`
    NonSpecific,
}

impl TagKind {
    fn from_data(data: i32) -> Option<Self> {
        Some(match data {
            0 => TagKind::Verbatim,
            1 => TagKind::PrimaryHandle,
            2 => TagKind::SecondaryHandle,
            3 => TagKind::NamedHandle,
            4 => TagKind::NonSpecific,
            _ => return None,
        })
    }

    pub(crate) fn data(self) -> i32 {
        match self {
            TagKind::Verbatim => 0,
            TagKind::PrimaryHandle => 1,
            TagKind::SecondaryHandle => 2,
            TagKind::NamedHandle => 3,
            TagKind::NonSpecific => 4,
        }
    }
}

/// A token with its position and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Where the token starts.
    pub mark: Mark,
    /// Scalar text, anchor/alias name, directive name or tag handle.
    pub value: String,
    /// Directive arguments, or the suffix of a named tag.
    pub params: Vec<String>,
    /// Extra payload; the [`TagKind`] for tag tokens.
    pub data: i32,
}

impl Token {
    /// Create an empty token of the given kind.
    pub fn new(kind: TokenKind, mark: Mark) -> Self {
        Self {
            kind,
            mark,
            value: String::new(),
            params: Vec::new(),
            data: 0,
        }
    }

    /// Create a token carrying `value`.
    pub fn with_value(kind: TokenKind, mark: Mark, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::new(kind, mark)
        }
    }

    /// The tag form, for tag tokens.
    pub fn tag_kind(&self) -> Option<TagKind> {
        if self.kind != TokenKind::Tag {
            return None;
        }
        TagKind::from_data(self.data)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.value.is_empty() {
            write!(f, " {:?}", self.value)?;
        }
        for param in &self.params {
            write!(f, " {:?}", param)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_kinds() {
        let mut token = Token::with_value(TokenKind::Tag, Mark::default(), "e");
        token.data = TagKind::NamedHandle.data();
        token.params.push("foo".to_string());
        assert_eq!(token.tag_kind(), Some(TagKind::NamedHandle));
        assert_eq!(token.to_string(), r#"TAG "e" "foo""#);

        let scalar = Token::with_value(TokenKind::PlainScalar, Mark::default(), "x");
        assert_eq!(scalar.tag_kind(), None);
    }
}
