//! Scalar scanning shared by plain, quoted and block scalars.
//!
//! Each line goes through three phases: scan until the line break, eat the
//! break, then consume the next line's indentation. [`ScalarParams`] decides
//! where to stop, how line breaks fold and what happens to trailing breaks.

use crate::exp::{self, Exp};
use crate::stream::Stream;
use crate::{ScanError, ScanErrorKind};

/// What terminates a scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarEnd {
    /// Only the end of input or indentation.
    None,
    /// A plain scalar in block context.
    Plain,
    /// A plain scalar in flow context.
    PlainInFlow,
    /// A `'` that is not the start of a `''` escape.
    SingleQuote,
    /// A `"`.
    DoubleQuote,
}

impl ScalarEnd {
    fn match_len(self, stream: &mut Stream<'_>) -> Option<usize> {
        match self {
            ScalarEnd::None => None,
            ScalarEnd::Plain => exp::SCALAR_END.match_len(stream),
            ScalarEnd::PlainInFlow => exp::SCALAR_END_IN_FLOW.match_len(stream),
            ScalarEnd::SingleQuote => {
                (stream.peek() == '\'' && !exp::ESC_SINGLE_QUOTE.matches(stream)).then_some(1)
            }
            ScalarEnd::DoubleQuote => Exp::Char('"').match_len(stream),
        }
    }

    fn matches(self, stream: &mut Stream<'_>) -> bool {
        self.match_len(stream).is_some()
    }
}

/// How line breaks inside the scalar are folded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fold {
    /// Keep every break (literal block scalars).
    #[default]
    DontFold,
    /// Folded block scalar rules.
    Block,
    /// Flow scalar rules: single breaks become spaces.
    Flow,
}

/// What happens to trailing line breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Chomp {
    /// Drop all of them.
    Strip,
    /// Keep a single one.
    #[default]
    Clip,
    /// Keep all of them.
    Keep,
}

/// Reaction to a document marker or a tab inside indentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// Treat it as content.
    #[default]
    None,
    /// End the scalar.
    Break,
    /// Fail the scan.
    Throw,
}

/// Parameters for [`scan_scalar`].
#[derive(Debug, Clone)]
pub struct ScalarParams {
    pub end: ScalarEnd,
    /// Consume the terminator, and fail if the input ends before it.
    pub eat_end: bool,
    /// Minimum column of continuation lines.
    pub indent: usize,
    /// Detect `indent` from the first non-empty line.
    pub detect_indent: bool,
    pub eat_leading_whitespace: bool,
    /// Character that starts an escape sequence.
    pub escape: Option<char>,
    pub fold: Fold,
    pub trim_trailing_spaces: bool,
    pub chomp: Chomp,
    pub on_doc_indicator: Action,
    pub on_tab_in_indentation: Action,
    /// Set when the scalar ended because a following line was less indented.
    pub leading_spaces: bool,
}

impl Default for ScalarParams {
    fn default() -> Self {
        Self {
            end: ScalarEnd::None,
            eat_end: false,
            indent: 0,
            detect_indent: false,
            eat_leading_whitespace: false,
            escape: None,
            fold: Fold::DontFold,
            trim_trailing_spaces: false,
            chomp: Chomp::Clip,
            on_doc_indicator: Action::None,
            on_tab_in_indentation: Action::None,
            leading_spaces: false,
        }
    }
}

fn at_doc_indicator(stream: &mut Stream<'_>) -> bool {
    exp::DOC_INDICATOR.matches(stream)
}

/// Scan a scalar body starting at the current position.
pub fn scan_scalar(stream: &mut Stream<'_>, params: &mut ScalarParams) -> Result<String, ScanError> {
    let mut found_non_empty_line = false;
    let mut past_opening_break = params.fold == Fold::Flow;
    let mut empty_line = false;
    let mut more_indented = false;
    let mut folded_newline_count = 0usize;
    let mut folded_newline_started_more_indented = false;
    let mut last_escaped: Option<usize> = None;
    let mut scalar = String::new();
    let mut terminated = false;
    params.leading_spaces = false;

    while stream.has_more() {
        // Phase 1: scan until the line ends.
        let mut escaped_newline = false;
        let mut last_non_whitespace = scalar.len();

        loop {
            if params.end.matches(stream) || !stream.has_more() {
                break;
            }
            let c = stream.peek();
            let is_whitespace = c == ' ' || c == '\t';

            if !is_whitespace {
                if c == '\n' || (c == '\r' && exp::BREAK.matches(stream)) {
                    break;
                }
                if stream.column() == 0 && at_doc_indicator(stream) {
                    match params.on_doc_indicator {
                        Action::Break => break,
                        Action::Throw => {
                            return Err(ScanError::new(stream.mark(), ScanErrorKind::DocInScalar));
                        }
                        Action::None => {}
                    }
                }
            }

            found_non_empty_line = true;
            past_opening_break = true;

            if params.escape != Some(c) {
                scalar.push(c);
                stream.eat(1);
                if !is_whitespace {
                    last_non_whitespace = scalar.len();
                }
            } else if c == '\\' && exp::ESC_BREAK.matches(stream) {
                // The break itself is handled below; trailing whitespace stays.
                stream.eat(1);
                last_non_whitespace = scalar.len();
                last_escaped = Some(scalar.len());
                escaped_newline = true;
                break;
            } else {
                scalar.push(exp::escape(stream)?);
                last_non_whitespace = scalar.len();
                last_escaped = Some(scalar.len());
            }
        }

        if !stream.has_more() {
            if params.eat_end {
                return Err(ScanError::new(stream.mark(), ScanErrorKind::EofInScalar));
            }
            break;
        }

        if params.on_doc_indicator == Action::Break
            && stream.column() == 0
            && at_doc_indicator(stream)
        {
            break;
        }

        if let Some(n) = params.end.match_len(stream) {
            if params.eat_end {
                stream.eat(n);
            }
            terminated = true;
            break;
        }

        if params.fold == Fold::Flow {
            scalar.truncate(last_non_whitespace);
        }

        // Phase 2: eat the line break.
        if let Some(n) = exp::BREAK.match_len(stream) {
            stream.eat(n);
        }

        // Phase 3: scan the indentation of the next line.
        while stream.peek() == ' '
            && (stream.column() < params.indent || (params.detect_indent && !found_non_empty_line))
            && !params.end.matches(stream)
        {
            stream.eat(1);
        }

        if params.detect_indent && !found_non_empty_line {
            params.indent = params.indent.max(stream.column());
        }

        loop {
            let c = stream.peek();
            if c != ' ' && c != '\t' {
                break;
            }
            if c == '\t'
                && stream.column() < params.indent
                && params.on_tab_in_indentation == Action::Throw
            {
                return Err(ScanError::new(stream.mark(), ScanErrorKind::TabInIndentation));
            }
            if !params.eat_leading_whitespace || params.end.matches(stream) {
                break;
            }
            stream.eat(1);
        }

        let next_empty_line = exp::BREAK.matches(stream);
        let next_more_indented = exp::BLANK.matches(stream);
        if params.fold == Fold::Block && folded_newline_count == 0 && next_empty_line {
            folded_newline_started_more_indented = more_indented;
        }

        // A block scalar's first break belongs to the header.
        if past_opening_break {
            match params.fold {
                Fold::DontFold => scalar.push('\n'),
                Fold::Block => {
                    if !empty_line
                        && !next_empty_line
                        && !more_indented
                        && !next_more_indented
                        && stream.column() >= params.indent
                    {
                        scalar.push(' ');
                    } else if next_empty_line {
                        folded_newline_count += 1;
                    } else {
                        scalar.push('\n');
                    }

                    if !next_empty_line && folded_newline_count > 0 {
                        scalar.extend(std::iter::repeat_n('\n', folded_newline_count - 1));
                        if folded_newline_started_more_indented
                            || next_more_indented
                            || !found_non_empty_line
                        {
                            scalar.push('\n');
                        }
                        folded_newline_count = 0;
                    }
                }
                Fold::Flow => {
                    if next_empty_line {
                        scalar.push('\n');
                    } else if !empty_line && !escaped_newline {
                        scalar.push(' ');
                    }
                }
            }
        }

        empty_line = next_empty_line;
        more_indented = next_more_indented;
        past_opening_break = true;

        if !empty_line && stream.column() < params.indent {
            params.leading_spaces = true;
            break;
        }
    }

    // Quoted scalars that run out on a trailing line break.
    if params.eat_end && !terminated {
        return Err(ScanError::new(stream.mark(), ScanErrorKind::EofInScalar));
    }

    if params.trim_trailing_spaces {
        let content = scalar.trim_end_matches(' ').len();
        if let Some(keep) = floor_at_escape(content, last_escaped) {
            scalar.truncate(keep);
        }
    }

    match params.chomp {
        Chomp::Clip => {
            let content = scalar.trim_end_matches('\n').len();
            match floor_at_escape(content, last_escaped) {
                None => scalar.clear(),
                Some(keep) => scalar.truncate(keep + 1),
            }
        }
        Chomp::Strip => {
            let content = scalar.trim_end_matches('\n').len();
            match floor_at_escape(content, last_escaped) {
                None => scalar.clear(),
                Some(keep) => scalar.truncate(keep),
            }
        }
        Chomp::Keep => {}
    }

    Ok(scalar)
}

/// Length to keep given the content length, never cutting an escaped character.
///
/// `None` means there is nothing to keep at all.
fn floor_at_escape(content: usize, last_escaped: Option<usize>) -> Option<usize> {
    match last_escaped {
        Some(escaped) if content <= escaped => Some(escaped + 1),
        _ if content == 0 => None,
        _ => Some(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(source: &str, fold: Fold, chomp: Chomp) -> String {
        let mut stream = Stream::from(source);
        let mut params = ScalarParams {
            indent: 1,
            detect_indent: true,
            fold,
            chomp,
            on_tab_in_indentation: Action::Throw,
            ..Default::default()
        };
        scan_scalar(&mut stream, &mut params).unwrap()
    }

    fn plain(source: &str) -> (String, bool) {
        let mut stream = Stream::from(source);
        let mut params = ScalarParams {
            end: ScalarEnd::Plain,
            indent: 1,
            fold: Fold::Flow,
            eat_leading_whitespace: true,
            trim_trailing_spaces: true,
            chomp: Chomp::Strip,
            on_doc_indicator: Action::Break,
            on_tab_in_indentation: Action::Throw,
            ..Default::default()
        };
        let value = scan_scalar(&mut stream, &mut params).unwrap();
        (value, params.leading_spaces)
    }

    fn quoted(source: &str, quote: char) -> Result<String, ScanErrorKind> {
        let mut stream = Stream::from(source);
        stream.eat(1);
        let mut params = ScalarParams {
            end: if quote == '\'' {
                ScalarEnd::SingleQuote
            } else {
                ScalarEnd::DoubleQuote
            },
            eat_end: true,
            escape: Some(if quote == '\'' { '\'' } else { '\\' }),
            fold: Fold::Flow,
            eat_leading_whitespace: true,
            chomp: Chomp::Clip,
            on_doc_indicator: Action::Throw,
            ..Default::default()
        };
        scan_scalar(&mut stream, &mut params).map_err(|e| e.kind)
    }

    #[test]
    fn folded_block() {
        assert_eq!(
            block("\n  line one\n  line two\n", Fold::Block, Chomp::Clip),
            "line one line two\n"
        );
    }

    #[test]
    fn folded_block_keeps_more_indented_lines() {
        assert_eq!(
            block("\n a\n   b\n c\n", Fold::Block, Chomp::Clip),
            "a\n  b\nc\n"
        );
    }

    #[test]
    fn literal_chomping() {
        assert_eq!(block("\n a\n b\n\n", Fold::DontFold, Chomp::Clip), "a\nb\n");
        assert_eq!(block("\n a\n b\n\n", Fold::DontFold, Chomp::Strip), "a\nb");
        assert_eq!(block("\n a\n b\n\n", Fold::DontFold, Chomp::Keep), "a\nb\n\n");
    }

    #[test]
    fn empty_literal() {
        assert_eq!(block("\n\n", Fold::DontFold, Chomp::Clip), "");
    }

    #[test]
    fn tab_in_block_indentation() {
        let mut stream = Stream::from("\n   a\n\tb\n");
        let mut params = ScalarParams {
            indent: 3,
            on_tab_in_indentation: Action::Throw,
            ..Default::default()
        };
        let err = scan_scalar(&mut stream, &mut params).unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::TabInIndentation);
    }

    #[test]
    fn plain_multiline() {
        assert_eq!(plain("foo\n bar: x"), ("foo bar".to_string(), false));
        assert_eq!(plain("foo  \n\n bar"), ("foo\nbar".to_string(), false));
        assert_eq!(plain("foo # c"), ("foo".to_string(), false));
        assert_eq!(plain("a\nb: c"), ("a".to_string(), true));
    }

    #[test]
    fn plain_stops_at_document_marker() {
        assert_eq!(plain("a\n---\n"), ("a".to_string(), true));
    }

    #[test]
    fn single_quoted() {
        assert_eq!(quoted("'a''b'", '\''), Ok("a'b".to_string()));
        assert_eq!(quoted("'a\n  b'", '\''), Ok("a b".to_string()));
        assert_eq!(quoted("'a\n\n  b'", '\''), Ok("a\nb".to_string()));
        assert_eq!(quoted("'abc", '\''), Err(ScanErrorKind::EofInScalar));
        assert_eq!(quoted("'abc\n", '\''), Err(ScanErrorKind::EofInScalar));
    }

    #[test]
    fn double_quoted() {
        assert_eq!(quoted("\"a\\tb\"", '"'), Ok("a\tb".to_string()));
        assert_eq!(quoted("\"a \\\n  b\"", '"'), Ok("a b".to_string()));
        assert_eq!(quoted("\"ab\\\n  cd\"", '"'), Ok("abcd".to_string()));
        assert_eq!(quoted("\"x\\n\"", '"'), Ok("x\n".to_string()));
        assert_eq!(quoted("\"\\x4\"", '"'), Err(ScanErrorKind::InvalidHex));
    }

    #[test]
    fn document_marker_in_quoted_scalar() {
        assert_eq!(quoted("'a\n--- b'", '\''), Err(ScanErrorKind::DocInScalar));
    }
}
