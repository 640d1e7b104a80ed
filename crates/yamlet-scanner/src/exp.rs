//! Lexical matchers.
//!
//! Every production is a small, fixed pattern over a bounded look-ahead
//! window. Patterns are plain `const` data, evaluated against anything that
//! can hand out characters by position ([`CharSource`]): the live [`Stream`],
//! a `&str`, or a single `char`.
//!
//! ```
//! use yamlet_scanner::exp;
//!
//! assert!(exp::DOC_START.matches_str("--- x"));
//! assert!(!exp::DOC_START.matches_str("---x"));
//! assert_eq!(exp::BREAK.match_str("\r\nfoo"), Some(2));
//! ```

use crate::stream::{EOF, Stream};
use crate::{ScanError, ScanErrorKind};

/// Random access to upcoming characters.
///
/// Positions past the end of the input report [`EOF`].
pub trait CharSource {
    /// The character at position `i` from the current position.
    fn char_at(&mut self, i: usize) -> char;
}

impl CharSource for Stream<'_> {
    #[inline]
    fn char_at(&mut self, i: usize) -> char {
        self.peek_nth(i)
    }
}

impl CharSource for &str {
    fn char_at(&mut self, i: usize) -> char {
        self.chars().nth(i).unwrap_or(EOF)
    }
}

impl CharSource for char {
    fn char_at(&mut self, i: usize) -> char {
        if i == 0 { *self } else { EOF }
    }
}

/// A lexical pattern.
#[derive(Debug, Clone, Copy)]
pub enum Exp {
    /// Exactly this character.
    Char(char),
    /// Any character in the inclusive range.
    Range(char, char),
    /// The first alternative that matches.
    Or(&'static [Exp]),
    /// Each pattern in turn, lengths summed.
    Seq(&'static [Exp]),
    /// One character, provided the inner pattern does not match here.
    ///
    /// Never matches at the end of input.
    Not(&'static Exp),
    /// Zero-length match at the end of input only.
    Empty,
}

impl Exp {
    /// Length of the match starting `pos` characters ahead, if any.
    pub fn match_at<S: CharSource + ?Sized>(&self, source: &mut S, pos: usize) -> Option<usize> {
        match *self {
            Exp::Char(c) => (source.char_at(pos) == c).then_some(1),
            Exp::Range(lo, hi) => {
                let c = source.char_at(pos);
                (c != EOF && (lo..=hi).contains(&c)).then_some(1)
            }
            Exp::Or(alternatives) => alternatives
                .iter()
                .find_map(|alt| alt.match_at(source, pos)),
            Exp::Seq(parts) => {
                let mut len = 0;
                for part in parts {
                    len += part.match_at(source, pos + len)?;
                }
                Some(len)
            }
            Exp::Not(inner) => {
                if source.char_at(pos) == EOF || inner.match_at(source, pos).is_some() {
                    None
                } else {
                    Some(1)
                }
            }
            Exp::Empty => (source.char_at(pos) == EOF).then_some(0),
        }
    }

    /// Length of the match at the current position, if any.
    #[inline]
    pub fn match_len<S: CharSource + ?Sized>(&self, source: &mut S) -> Option<usize> {
        self.match_at(source, 0)
    }

    /// Whether the pattern matches at the current position.
    #[inline]
    pub fn matches<S: CharSource + ?Sized>(&self, source: &mut S) -> bool {
        self.match_at(source, 0).is_some()
    }

    /// Length of the match at the start of `s`, if any.
    pub fn match_str(&self, mut s: &str) -> Option<usize> {
        self.match_at(&mut s, 0)
    }

    /// Whether the pattern matches at the start of `s`.
    pub fn matches_str(&self, s: &str) -> bool {
        self.match_str(s).is_some()
    }

    /// Whether the pattern matches the single character `c`.
    pub fn matches_char(&self, mut c: char) -> bool {
        self.match_at(&mut c, 0).is_some()
    }
}

pub const SPACE: Exp = Exp::Char(' ');
pub const TAB: Exp = Exp::Char('\t');
pub const BLANK: Exp = Exp::Or(&[SPACE, TAB]);
pub const BREAK: Exp = Exp::Or(&[Exp::Char('\n'), Exp::Seq(&[Exp::Char('\r'), Exp::Char('\n')])]);
pub const BLANK_OR_BREAK: Exp = Exp::Or(&[BLANK, BREAK]);
pub const DIGIT: Exp = Exp::Range('0', '9');
pub const ALPHA: Exp = Exp::Or(&[Exp::Range('a', 'z'), Exp::Range('A', 'Z')]);
pub const ALPHA_NUMERIC: Exp = Exp::Or(&[ALPHA, DIGIT]);
pub const WORD: Exp = Exp::Or(&[ALPHA_NUMERIC, Exp::Char('-')]);
pub const HEX: Exp = Exp::Or(&[DIGIT, Exp::Range('a', 'f'), Exp::Range('A', 'F')]);

/// C0 controls other than tab and line breaks, DEL, and C1 controls other than NEL.
pub const NOT_PRINTABLE: Exp = Exp::Or(&[
    Exp::Range('\u{0}', '\u{8}'),
    Exp::Char('\u{B}'),
    Exp::Char('\u{C}'),
    Exp::Range('\u{E}', '\u{1F}'),
    Exp::Char('\u{7F}'),
    Exp::Range('\u{80}', '\u{84}'),
    Exp::Range('\u{86}', '\u{9F}'),
]);

const BLANK_OR_BREAK_OR_EOF: Exp = Exp::Or(&[BLANK_OR_BREAK, Exp::Empty]);

pub const DOC_START: Exp = Exp::Seq(&[
    Exp::Char('-'),
    Exp::Char('-'),
    Exp::Char('-'),
    BLANK_OR_BREAK_OR_EOF,
]);
pub const DOC_END: Exp = Exp::Seq(&[
    Exp::Char('.'),
    Exp::Char('.'),
    Exp::Char('.'),
    BLANK_OR_BREAK_OR_EOF,
]);
pub const DOC_INDICATOR: Exp = Exp::Or(&[DOC_START, DOC_END]);
pub const BLOCK_ENTRY: Exp = Exp::Seq(&[Exp::Char('-'), BLANK_OR_BREAK_OR_EOF]);
pub const KEY: Exp = Exp::Seq(&[Exp::Char('?'), BLANK_OR_BREAK]);
pub const KEY_IN_FLOW: Exp = Exp::Seq(&[Exp::Char('?'), BLANK_OR_BREAK]);
pub const VALUE: Exp = Exp::Seq(&[Exp::Char(':'), BLANK_OR_BREAK_OR_EOF]);
pub const VALUE_IN_FLOW: Exp = Exp::Seq(&[
    Exp::Char(':'),
    Exp::Or(&[BLANK_OR_BREAK, Exp::Char(','), Exp::Char('}')]),
]);
pub const VALUE_IN_JSON_FLOW: Exp = Exp::Char(':');
pub const COMMENT: Exp = Exp::Char('#');

pub const ANCHOR: Exp = Exp::Not(&Exp::Or(&[
    Exp::Char('['),
    Exp::Char(']'),
    Exp::Char('{'),
    Exp::Char('}'),
    Exp::Char(','),
    BLANK_OR_BREAK,
]));
pub const ANCHOR_END: Exp = Exp::Or(&[
    Exp::Char('?'),
    Exp::Char(':'),
    Exp::Char(','),
    Exp::Char(']'),
    Exp::Char('}'),
    Exp::Char('%'),
    Exp::Char('@'),
    Exp::Char('`'),
    BLANK_OR_BREAK,
]);

const ESCAPED_HEX: Exp = Exp::Seq(&[Exp::Char('%'), HEX, HEX]);

pub const URI: Exp = Exp::Or(&[
    WORD,
    Exp::Char('#'),
    Exp::Char(';'),
    Exp::Char('/'),
    Exp::Char('?'),
    Exp::Char(':'),
    Exp::Char('@'),
    Exp::Char('&'),
    Exp::Char('='),
    Exp::Char('+'),
    Exp::Char('$'),
    Exp::Char(','),
    Exp::Char('_'),
    Exp::Char('.'),
    Exp::Char('!'),
    Exp::Char('~'),
    Exp::Char('*'),
    Exp::Char('\''),
    Exp::Char('('),
    Exp::Char(')'),
    Exp::Char('['),
    Exp::Char(']'),
    ESCAPED_HEX,
]);
pub const TAG: Exp = Exp::Or(&[
    WORD,
    Exp::Char('#'),
    Exp::Char(';'),
    Exp::Char('/'),
    Exp::Char('?'),
    Exp::Char(':'),
    Exp::Char('@'),
    Exp::Char('&'),
    Exp::Char('='),
    Exp::Char('+'),
    Exp::Char('$'),
    Exp::Char('_'),
    Exp::Char('.'),
    Exp::Char('~'),
    Exp::Char('*'),
    Exp::Char('\''),
    ESCAPED_HEX,
]);

// A plain scalar never starts with a blank or one of , [ ] { } # & * ! | > ' " % @ `.
// In block context - ? : must not be followed by a space; in flow context ? is
// not allowed at all.
pub const PLAIN_SCALAR_COMMON: Exp = Exp::Not(&Exp::Or(&[
    BLANK_OR_BREAK,
    Exp::Char(','),
    Exp::Char('['),
    Exp::Char(']'),
    Exp::Char('{'),
    Exp::Char('}'),
    Exp::Char('#'),
    Exp::Char('&'),
    Exp::Char('*'),
    Exp::Char('!'),
    Exp::Char('|'),
    Exp::Char('>'),
    Exp::Char('\''),
    Exp::Char('"'),
    Exp::Char('%'),
    Exp::Char('@'),
    Exp::Char('`'),
]));
pub const PLAIN_SCALAR: Exp = Exp::Not(&Exp::Seq(&[
    Exp::Or(&[Exp::Char('-'), Exp::Char('?'), Exp::Char(':')]),
    BLANK_OR_BREAK_OR_EOF,
]));
pub const PLAIN_SCALAR_IN_FLOW: Exp = Exp::Not(&Exp::Or(&[
    Exp::Char('?'),
    Exp::Seq(&[Exp::Or(&[Exp::Char('-'), Exp::Char(':')]), BLANK]),
]));

/// End of a plain scalar in block context.
pub const SCALAR_END: Exp = Exp::Or(&[
    Exp::Seq(&[Exp::Char(':'), BLANK_OR_BREAK_OR_EOF]),
    Exp::Seq(&[BLANK_OR_BREAK, COMMENT]),
]);
/// End of a plain scalar in flow context.
pub const SCALAR_END_IN_FLOW: Exp = Exp::Or(&[
    Exp::Seq(&[
        Exp::Char(':'),
        Exp::Or(&[
            BLANK_OR_BREAK,
            Exp::Char(','),
            Exp::Char(']'),
            Exp::Char('}'),
            Exp::Empty,
        ]),
    ]),
    Exp::Char(','),
    Exp::Char('?'),
    Exp::Char('['),
    Exp::Char(']'),
    Exp::Char('{'),
    Exp::Char('}'),
    Exp::Seq(&[BLANK_OR_BREAK, COMMENT]),
]);

pub const ESC_SINGLE_QUOTE: Exp = Exp::Seq(&[Exp::Char('\''), Exp::Char('\'')]);
pub const ESC_BREAK: Exp = Exp::Seq(&[Exp::Char('\\'), BREAK]);

const CHOMP_INDICATOR: Exp = Exp::Or(&[Exp::Char('+'), Exp::Char('-')]);
pub const CHOMP: Exp = Exp::Or(&[
    Exp::Seq(&[CHOMP_INDICATOR, DIGIT]),
    Exp::Seq(&[DIGIT, CHOMP_INDICATOR]),
    CHOMP_INDICATOR,
    DIGIT,
]);

/// Whether `s` is a plain scalar start in either context.
pub fn is_plain_start(s: &str, in_flow: bool) -> bool {
    let context = if in_flow { PLAIN_SCALAR_IN_FLOW } else { PLAIN_SCALAR };
    PLAIN_SCALAR_COMMON.matches_str(s) && context.matches_str(s)
}

fn escape_code(stream: &mut Stream<'_>, digits: usize) -> Result<char, ScanError> {
    let mut value = 0u32;
    for _ in 0..digits {
        let c = stream.get();
        let Some(digit) = c.to_digit(16) else {
            return Err(ScanError::new(stream.mark(), ScanErrorKind::InvalidHex));
        };
        value = (value << 4) | digit;
    }
    // Surrogates and anything past U+10FFFF have no char.
    char::from_u32(value)
        .ok_or_else(|| ScanError::new(stream.mark(), ScanErrorKind::InvalidUnicode(value)))
}

/// Decode the escape sequence at the head of `stream`.
///
/// The stream must be positioned on the escape character: `\` for a
/// double-quoted escape, or the first `'` of a single-quoted `''`.
pub fn escape(stream: &mut Stream<'_>) -> Result<char, ScanError> {
    let introducer = stream.get();
    let c = stream.get();
    if introducer == '\'' && c == '\'' {
        return Ok('\'');
    }
    let decoded = match c {
        '0' => '\0',
        'a' => '\u{7}',
        'b' => '\u{8}',
        't' | '\t' => '\t',
        'n' => '\n',
        'v' => '\u{B}',
        'f' => '\u{C}',
        'r' => '\r',
        'e' => '\u{1B}',
        ' ' => ' ',
        '"' => '"',
        '\'' => '\'',
        '\\' => '\\',
        '/' => '/',
        'N' => '\u{85}',
        '_' => '\u{A0}',
        'L' => '\u{2028}',
        'P' => '\u{2029}',
        'x' => return escape_code(stream, 2),
        'u' => return escape_code(stream, 4),
        'U' => return escape_code(stream, 8),
        other => {
            return Err(ScanError::new(
                stream.mark(),
                ScanErrorKind::InvalidEscape(other),
            ));
        }
    };
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breaks_and_blanks() {
        assert_eq!(BREAK.match_str("\n"), Some(1));
        assert_eq!(BREAK.match_str("\r\n"), Some(2));
        assert_eq!(BREAK.match_str("\r"), None);
        assert!(BLANK_OR_BREAK.matches_char('\t'));
        assert!(!BLANK_OR_BREAK.matches_char('x'));
    }

    #[test]
    fn document_markers() {
        assert!(DOC_START.matches_str("---"));
        assert!(DOC_START.matches_str("---\n"));
        assert!(!DOC_START.matches_str("----"));
        assert_eq!(DOC_END.match_str("... # done"), Some(4));
        assert_eq!(DOC_END.match_str("..."), Some(3));
    }

    #[test]
    fn indicators() {
        assert!(BLOCK_ENTRY.matches_str("- a"));
        assert!(BLOCK_ENTRY.matches_str("-"));
        assert!(!BLOCK_ENTRY.matches_str("-1"));
        assert!(KEY.matches_str("? a"));
        assert!(!KEY.matches_str("?"));
        assert!(VALUE.matches_str(":"));
        assert!(!VALUE.matches_str(":a"));
        assert!(VALUE_IN_FLOW.matches_str(":,"));
        assert!(VALUE_IN_FLOW.matches_str(":}"));
        assert!(!VALUE_IN_FLOW.matches_str(":]"));
    }

    #[test]
    fn plain_scalar_starts() {
        assert!(is_plain_start("abc", false));
        assert!(is_plain_start("-1", false));
        assert!(is_plain_start(":x", false));
        assert!(!is_plain_start("- x", false));
        assert!(!is_plain_start("-", false));
        assert!(!is_plain_start("&a", false));
        assert!(!is_plain_start("", false));
        assert!(is_plain_start("-x", true));
        assert!(!is_plain_start("?x", true));
        assert!(!is_plain_start(": x", true));
        assert!(!is_plain_start("[", true));
    }

    #[test]
    fn scalar_ends() {
        assert_eq!(SCALAR_END.match_str(": x"), Some(2));
        assert_eq!(SCALAR_END.match_str(":"), Some(1));
        assert_eq!(SCALAR_END.match_str(" #c"), Some(2));
        assert_eq!(SCALAR_END.match_str(":x"), None);
        assert!(SCALAR_END_IN_FLOW.matches_str(","));
        assert!(SCALAR_END_IN_FLOW.matches_str(":]"));
        assert!(!SCALAR_END_IN_FLOW.matches_str(":x"));
    }

    #[test]
    fn anchors_and_tags() {
        assert!(ANCHOR.matches_char('a'));
        assert!(!ANCHOR.matches_char(','));
        assert!(!ANCHOR.matches_str(""));
        assert!(ANCHOR_END.matches_char(':'));
        assert_eq!(URI.match_str("%2F"), Some(3));
        assert_eq!(TAG.match_str("%zz"), None);
        assert!(URI.matches_char('!'));
        assert!(!TAG.matches_char('!'));
    }

    #[test]
    fn chomp_indicators() {
        assert_eq!(CHOMP.match_str("+2"), Some(2));
        assert_eq!(CHOMP.match_str("3-"), Some(2));
        assert_eq!(CHOMP.match_str("-\n"), Some(1));
        assert_eq!(CHOMP.match_str(" "), None);
    }

    #[test]
    fn not_printable() {
        assert!(NOT_PRINTABLE.matches_char('\u{7}'));
        assert!(!NOT_PRINTABLE.matches_char('\u{85}'));
        assert!(!NOT_PRINTABLE.matches_char('\t'));
        assert!(!NOT_PRINTABLE.matches_char('é'));
    }

    fn escaped(s: &str) -> Result<char, ScanErrorKind> {
        let mut stream = Stream::from(s);
        escape(&mut stream).map_err(|e| e.kind)
    }

    #[test]
    fn escapes() {
        assert_eq!(escaped("\\n"), Ok('\n'));
        assert_eq!(escaped("\\0"), Ok('\0'));
        assert_eq!(escaped("\\x41"), Ok('A'));
        assert_eq!(escaped("\\u00e9"), Ok('é'));
        assert_eq!(escaped("\\U0001D11E"), Ok('𝄞'));
        assert_eq!(escaped("\\L"), Ok('\u{2028}'));
        assert_eq!(escaped("''"), Ok('\''));
        assert_eq!(escaped("\\xZZ"), Err(ScanErrorKind::InvalidHex));
        assert_eq!(escaped("\\uD800"), Err(ScanErrorKind::InvalidUnicode(0xD800)));
        assert_eq!(
            escaped("\\U00110000"),
            Err(ScanErrorKind::InvalidUnicode(0x11_0000))
        );
        assert_eq!(escaped("\\q"), Err(ScanErrorKind::InvalidEscape('q')));
    }
}
