//! Tag scanning helpers.

use crate::exp;
use crate::stream::Stream;
use crate::{Mark, ScanError, ScanErrorKind};

/// Scan `<uri>` after a `!`. The stream must be positioned on the `<`.
pub fn scan_verbatim_tag(stream: &mut Stream<'_>) -> Result<String, ScanError> {
    let mut tag = String::new();
    stream.eat(1);
    while stream.has_more() {
        if stream.peek() == '>' {
            stream.eat(1);
            return Ok(tag);
        }
        let Some(n) = exp::URI.match_len(stream).filter(|&n| n > 0) else {
            break;
        };
        tag.push_str(&stream.get_n(n));
    }
    Err(ScanError::new(stream.mark(), ScanErrorKind::EndOfVerbatimTag))
}

/// Scan a tag handle or a shorthand tag without a handle.
///
/// Returns the text and whether it can still be a named handle (only word
/// characters so far).
pub fn scan_tag_handle(stream: &mut Stream<'_>) -> Result<(String, bool), ScanError> {
    let mut tag = String::new();
    let mut can_be_handle = true;
    let mut first_non_word = Mark::default();
    while stream.has_more() {
        if stream.peek() == '!' {
            if !can_be_handle {
                return Err(ScanError::new(first_non_word, ScanErrorKind::CharInTagHandle));
            }
            break;
        }
        let mut n = None;
        if can_be_handle {
            n = exp::WORD.match_len(stream);
            if n.is_none() {
                can_be_handle = false;
                first_non_word = stream.mark();
            }
        }
        if !can_be_handle {
            n = exp::TAG.match_len(stream);
        }
        let Some(n) = n.filter(|&n| n > 0) else {
            break;
        };
        tag.push_str(&stream.get_n(n));
    }
    Ok((tag, can_be_handle))
}

/// Scan the suffix after a named handle.
pub fn scan_tag_suffix(stream: &mut Stream<'_>) -> Result<String, ScanError> {
    let mut tag = String::new();
    while stream.has_more() {
        let Some(n) = exp::TAG.match_len(stream).filter(|&n| n > 0) else {
            break;
        };
        tag.push_str(&stream.get_n(n));
    }
    if tag.is_empty() {
        return Err(ScanError::new(stream.mark(), ScanErrorKind::TagWithNoSuffix));
    }
    Ok(tag)
}
