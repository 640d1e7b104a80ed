//! Scan errors.

use crate::Mark;

/// The reason a scan failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanErrorKind {
    /// A character that cannot start any token.
    UnknownToken,
    /// `---` or `...` inside a quoted scalar.
    DocInScalar,
    /// Input ended inside a quoted scalar.
    EofInScalar,
    /// A character that is not allowed in a plain scalar.
    CharInScalar,
    /// A tab where indentation must be spaces.
    TabInIndentation,
    /// `]` or `}` with no matching open bracket.
    FlowEnd,
    /// `-` where a block entry is not allowed.
    BlockEntry,
    /// `?` where a key is not allowed.
    MapKey,
    /// `:` where a value is not allowed.
    MapValue,
    /// `*` not followed by a name.
    AliasNotFound,
    /// `&` not followed by a name.
    AnchorNotFound,
    /// An alias name ended on an unexpected character.
    CharInAlias,
    /// An anchor name ended on an unexpected character.
    CharInAnchor,
    /// A block scalar header with an explicit `0` indentation.
    ZeroIndentInBlock,
    /// A block scalar header with an unexpected character.
    CharInBlock,
    /// A tag handle with an illegal character.
    CharInTagHandle,
    /// A tag handle that is not followed by a suffix.
    TagWithNoSuffix,
    /// `!<...` with no closing `>`.
    EndOfVerbatimTag,
    /// A bad hex digit in an escape.
    InvalidHex,
    /// An escape that produces a surrogate or an out-of-range code point.
    InvalidUnicode(u32),
    /// An unknown escape character.
    InvalidEscape(char),
}

impl ScanErrorKind {
    /// A stable, machine-checkable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            ScanErrorKind::UnknownToken => "unknown-token",
            ScanErrorKind::DocInScalar => "doc-in-scalar",
            ScanErrorKind::EofInScalar => "eof-in-scalar",
            ScanErrorKind::CharInScalar => "char-in-scalar",
            ScanErrorKind::TabInIndentation => "tab-in-indentation",
            ScanErrorKind::FlowEnd => "illegal-flow-end",
            ScanErrorKind::BlockEntry => "illegal-block-entry",
            ScanErrorKind::MapKey => "illegal-map-key",
            ScanErrorKind::MapValue => "illegal-map-value",
            ScanErrorKind::AliasNotFound => "alias-not-found",
            ScanErrorKind::AnchorNotFound => "anchor-not-found",
            ScanErrorKind::CharInAlias => "char-in-alias",
            ScanErrorKind::CharInAnchor => "char-in-anchor",
            ScanErrorKind::ZeroIndentInBlock => "zero-indent-in-block",
            ScanErrorKind::CharInBlock => "char-in-block",
            ScanErrorKind::CharInTagHandle => "char-in-tag-handle",
            ScanErrorKind::TagWithNoSuffix => "tag-with-no-suffix",
            ScanErrorKind::EndOfVerbatimTag => "end-of-verbatim-tag",
            ScanErrorKind::InvalidHex => "invalid-hex",
            ScanErrorKind::InvalidUnicode(_) => "invalid-unicode",
            ScanErrorKind::InvalidEscape(_) => "invalid-escape",
        }
    }
}

impl std::fmt::Display for ScanErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanErrorKind::UnknownToken => write!(f, "unknown token"),
            ScanErrorKind::DocInScalar => write!(f, "illegal document indicator in scalar"),
            ScanErrorKind::EofInScalar => write!(f, "illegal EOF in scalar"),
            ScanErrorKind::CharInScalar => write!(f, "illegal character in scalar"),
            ScanErrorKind::TabInIndentation => {
                write!(f, "illegal tab when looking for indentation")
            }
            ScanErrorKind::FlowEnd => write!(f, "illegal flow end"),
            ScanErrorKind::BlockEntry => write!(f, "illegal block entry"),
            ScanErrorKind::MapKey => write!(f, "illegal map key"),
            ScanErrorKind::MapValue => write!(f, "illegal map value"),
            ScanErrorKind::AliasNotFound => write!(f, "alias not found after *"),
            ScanErrorKind::AnchorNotFound => write!(f, "anchor not found after &"),
            ScanErrorKind::CharInAlias => {
                write!(f, "illegal character found while scanning alias")
            }
            ScanErrorKind::CharInAnchor => {
                write!(f, "illegal character found while scanning anchor")
            }
            ScanErrorKind::ZeroIndentInBlock => {
                write!(f, "cannot set zero indentation for a block scalar")
            }
            ScanErrorKind::CharInBlock => write!(f, "unexpected character in block scalar"),
            ScanErrorKind::CharInTagHandle => {
                write!(f, "illegal character found while scanning tag handle")
            }
            ScanErrorKind::TagWithNoSuffix => write!(f, "tag handle with no suffix"),
            ScanErrorKind::EndOfVerbatimTag => write!(f, "end of verbatim tag not found"),
            ScanErrorKind::InvalidHex => {
                write!(f, "bad character found while scanning hex number")
            }
            ScanErrorKind::InvalidUnicode(value) => write!(f, "invalid unicode: {:#x}", value),
            ScanErrorKind::InvalidEscape(c) => write!(f, "unknown escape character: {}", c),
        }
    }
}

/// A scan failure with the position it happened at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanError {
    /// Where the scanner was when it failed.
    pub mark: Mark,
    /// What went wrong.
    pub kind: ScanErrorKind,
}

impl ScanError {
    /// Create a new scan error.
    pub fn new(mark: Mark, kind: ScanErrorKind) -> Self {
        Self { mark, kind }
    }
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.kind, self.mark)
    }
}

impl std::error::Error for ScanError {}
