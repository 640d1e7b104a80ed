//! Diagnostic rendering for parser errors.

use std::ops::Range;

use ariadne::{Color, Config, IndexType, Label, Report, ReportKind, Source};
use yamlet_scanner::{Mark, ScanError, ScanErrorKind};

use crate::ParseErrorKind;

/// A parser error with source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Source location.
    pub mark: Mark,
    /// The kind of error.
    pub kind: ParseErrorKind,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(mark: Mark, kind: ParseErrorKind) -> Self {
        Self { mark, kind }
    }

    /// Render this error with ariadne.
    ///
    /// Returns a string containing the formatted error message with source context.
    pub fn render(&self, filename: &str, source: &str) -> String {
        let mut output = Vec::new();
        self.write_report(filename, source, &mut output);
        String::from_utf8(output).unwrap_or_else(|_| format!("{}", self))
    }

    /// Write the error report to a writer.
    pub fn write_report<W: std::io::Write>(&self, filename: &str, source: &str, writer: W) {
        let report = self.build_report(filename, self.label_range(source));
        let _ = report
            .finish()
            .write((filename, Source::from(source)), writer);
    }

    /// The character at the mark, or an empty range past the end.
    fn label_range(&self, source: &str) -> Range<usize> {
        let start = self.mark.offset.min(source.len());
        if !source.is_char_boundary(start) {
            return start..start;
        }
        let len = source[start..].chars().next().map_or(0, char::len_utf8);
        start..start + len
    }

    fn build_report<'a>(
        &self,
        filename: &'a str,
        range: Range<usize>,
    ) -> ariadne::ReportBuilder<'static, (&'a str, Range<usize>)> {
        let label = match &self.kind {
            ParseErrorKind::Scan(_) => "here",
            ParseErrorKind::EndOfMap | ParseErrorKind::EndOfSeq => "unexpected at this indentation",
            ParseErrorKind::EndOfMapFlow | ParseErrorKind::EndOfSeqFlow => "expected a closing bracket",
            ParseErrorKind::UnknownAnchor(_) => "alias used here",
            ParseErrorKind::DepthLimit(_) => "too deep",
            _ => "in this node",
        };
        let report = Report::build(ReportKind::Error, (filename, range.clone()))
            .with_config(Config::default().with_index_type(IndexType::Byte))
            .with_message(self.kind.to_string())
            .with_label(
                Label::new((filename, range))
                    .with_message(label)
                    .with_color(Color::Red),
            );
        match self.help() {
            Some(help) => report.with_help(help),
            None => report,
        }
    }

    fn help(&self) -> Option<&'static str> {
        Some(match &self.kind {
            ParseErrorKind::Scan(ScanErrorKind::MapValue) => {
                "a simple key must fit on one line, directly before the ':'"
            }
            ParseErrorKind::Scan(ScanErrorKind::TabInIndentation) => {
                "indent with spaces; tabs are not allowed in indentation"
            }
            ParseErrorKind::Scan(ScanErrorKind::EofInScalar) => "add the closing quote",
            ParseErrorKind::Scan(ScanErrorKind::ZeroIndentInBlock) => {
                "indentation indicators range from 1 to 9"
            }
            ParseErrorKind::YamlMajorVersion => "only YAML 1.x documents are supported",
            ParseErrorKind::RepeatedTagDirective => "each handle may be declared once per document",
            ParseErrorKind::AliasContent => "move the tag or anchor to the anchored node",
            ParseErrorKind::UnknownAnchor(_) => "declare the anchor with '&name' before using it",
            ParseErrorKind::EndOfMap => "entries of a block map must start at the same column",
            ParseErrorKind::EndOfSeq => "entries of a block sequence must start at the same column",
            ParseErrorKind::EndOfMapFlow => "close the map with '}'",
            ParseErrorKind::EndOfSeqFlow => "close the sequence with ']'",
            ParseErrorKind::TrailingContent => "start another document with '---'",
            ParseErrorKind::DepthLimit(_) => "raise ParserOptions::max_depth to accept deeper documents",
            _ => return None,
        })
    }
}

impl From<ScanError> for ParseError {
    fn from(error: ScanError) -> Self {
        Self::new(error.mark, ParseErrorKind::Scan(error.kind))
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.kind, self.mark)
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(source: &str) -> String {
        let err = crate::parse_events(source).unwrap_err();
        let rendered = err.render("test.yaml", source);
        String::from_utf8(strip_ansi_escapes::strip(rendered.as_bytes())).unwrap()
    }

    #[test]
    fn scan_error_diagnostic() {
        let output = render("a: b: c\n");
        assert!(output.contains("illegal map value"), "{}", output);
        assert!(output.contains("test.yaml"), "{}", output);
        assert!(output.contains("a simple key must fit on one line"), "{}", output);
    }

    #[test]
    fn unclosed_flow_diagnostic() {
        let output = render("key: [1, 2\n");
        assert!(output.contains("end of sequence flow not found"), "{}", output);
        assert!(output.contains("close the sequence with ']'"), "{}", output);
    }

    #[test]
    fn display_includes_position() {
        let err = crate::parse_events("a: *nope").unwrap_err();
        assert_eq!(
            err.to_string(),
            "the referenced anchor 'nope' is not defined at line 1, column 4"
        );
    }
}
