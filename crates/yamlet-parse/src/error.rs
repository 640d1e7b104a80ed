//! Parse error kinds.

use std::fmt;

use yamlet_scanner::ScanErrorKind;

/// Parse error kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The scanner rejected the input.
    Scan(ScanErrorKind),
    /// `%YAML` without exactly one argument.
    YamlDirectiveArgs,
    /// `%YAML` argument is not `major.minor`.
    YamlVersion(String),
    /// `%YAML` major version above 1.
    YamlMajorVersion,
    /// Second `%YAML` for one document.
    RepeatedYamlDirective,
    /// `%TAG` without exactly two arguments.
    TagDirectiveArgs,
    /// Second `%TAG` for the same handle.
    RepeatedTagDirective,
    /// Two tags on one node.
    MultipleTags,
    /// Two anchors on one node.
    MultipleAnchors,
    /// An alias with a tag or anchor.
    AliasContent,
    /// Alias to an anchor that was not declared earlier in the document.
    UnknownAnchor(String),
    /// Something other than a key or value inside a block map.
    EndOfMap,
    /// A flow map was not closed.
    EndOfMapFlow,
    /// Something other than an entry inside a block sequence.
    EndOfSeq,
    /// A flow sequence was not closed.
    EndOfSeqFlow,
    /// Content after the root node of a document.
    TrailingContent,
    /// The input ended inside a node.
    UnexpectedEof,
    /// Nesting deeper than the configured limit.
    DepthLimit(usize),
}

impl ParseErrorKind {
    /// A stable, machine-checkable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            ParseErrorKind::Scan(kind) => kind.code(),
            ParseErrorKind::YamlDirectiveArgs => "yaml-directive-args",
            ParseErrorKind::YamlVersion(_) => "bad-yaml-version",
            ParseErrorKind::YamlMajorVersion => "yaml-major-version",
            ParseErrorKind::RepeatedYamlDirective => "repeated-yaml-directive",
            ParseErrorKind::TagDirectiveArgs => "tag-directive-args",
            ParseErrorKind::RepeatedTagDirective => "repeated-tag-directive",
            ParseErrorKind::MultipleTags => "multiple-tags",
            ParseErrorKind::MultipleAnchors => "multiple-anchors",
            ParseErrorKind::AliasContent => "alias-content",
            ParseErrorKind::UnknownAnchor(_) => "unknown-anchor",
            ParseErrorKind::EndOfMap => "end-of-map",
            ParseErrorKind::EndOfMapFlow => "end-of-map-flow",
            ParseErrorKind::EndOfSeq => "end-of-seq",
            ParseErrorKind::EndOfSeqFlow => "end-of-seq-flow",
            ParseErrorKind::TrailingContent => "trailing-content",
            ParseErrorKind::UnexpectedEof => "unexpected-eof",
            ParseErrorKind::DepthLimit(_) => "depth-limit",
        }
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::Scan(kind) => write!(f, "{}", kind),
            ParseErrorKind::YamlDirectiveArgs => {
                write!(f, "YAML directives must have exactly one argument")
            }
            ParseErrorKind::YamlVersion(version) => write!(f, "bad YAML version: {}", version),
            ParseErrorKind::YamlMajorVersion => write!(f, "YAML major version too large"),
            ParseErrorKind::RepeatedYamlDirective => write!(f, "repeated YAML directive"),
            ParseErrorKind::TagDirectiveArgs => {
                write!(f, "TAG directives must have exactly two arguments")
            }
            ParseErrorKind::RepeatedTagDirective => write!(f, "repeated TAG directive"),
            ParseErrorKind::MultipleTags => {
                write!(f, "cannot assign multiple tags to the same node")
            }
            ParseErrorKind::MultipleAnchors => {
                write!(f, "cannot assign multiple anchors to the same node")
            }
            ParseErrorKind::AliasContent => {
                write!(f, "aliases can't have any content, *including* tags")
            }
            ParseErrorKind::UnknownAnchor(name) => {
                write!(f, "the referenced anchor '{}' is not defined", name)
            }
            ParseErrorKind::EndOfMap => write!(f, "end of map not found"),
            ParseErrorKind::EndOfMapFlow => write!(f, "end of map flow not found"),
            ParseErrorKind::EndOfSeq => write!(f, "end of sequence not found"),
            ParseErrorKind::EndOfSeqFlow => write!(f, "end of sequence flow not found"),
            ParseErrorKind::TrailingContent => write!(f, "unexpected content after the document root"),
            ParseErrorKind::UnexpectedEof => write!(f, "unexpected end of input"),
            ParseErrorKind::DepthLimit(limit) => {
                write!(f, "nesting exceeds the depth limit of {}", limit)
            }
        }
    }
}
