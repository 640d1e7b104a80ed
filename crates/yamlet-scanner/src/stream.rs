//! Encoding-aware character stream.
//!
//! Bytes are read in blocks, the encoding is sniffed from the first few bytes
//! (with or without a byte order mark), and everything is decoded into a small
//! read-ahead queue of `char`s. Callers only ever see characters.

use std::collections::VecDeque;
use std::io::{self, Read};

use tracing::warn;

use crate::Mark;

/// Returned by [`Stream::peek`] and [`Stream::get`] once the input is exhausted.
///
/// A literal U+0004 in the input is decoded as U+FFFD so this value is never
/// real content.
pub const EOF: char = '\u{4}';

/// Default size of the block read from the underlying reader.
pub const DEFAULT_PREFETCH: usize = 2048;

const REPLACEMENT: char = '\u{FFFD}';

/// Character encoding of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// UTF-8, the default.
    Utf8,
    /// UTF-16, little endian.
    Utf16Le,
    /// UTF-16, big endian.
    Utf16Be,
    /// UTF-32, little endian.
    Utf32Le,
    /// UTF-32, big endian.
    Utf32Be,
}

/// Guess the encoding from the first bytes of the input.
///
/// Returns the encoding and the length of the byte order mark to skip.
pub fn detect_encoding(bytes: &[u8]) -> (Encoding, usize) {
    if let [b0, b1, b2, b3, ..] = *bytes {
        match (b0, b1, b2, b3) {
            (0x00, 0x00, 0xFE, 0xFF) => return (Encoding::Utf32Be, 4),
            (0x00, 0x00, 0x00, _) => return (Encoding::Utf32Be, 0),
            (0xFF, 0xFE, 0x00, 0x00) => return (Encoding::Utf32Le, 4),
            (_, 0x00, 0x00, 0x00) => return (Encoding::Utf32Le, 0),
            _ => {}
        }
    }
    if let [b0, b1, ..] = *bytes {
        match (b0, b1) {
            (0xFE, 0xFF) => return (Encoding::Utf16Be, 2),
            (0x00, _) => return (Encoding::Utf16Be, 0),
            (0xFF, 0xFE) => return (Encoding::Utf16Le, 2),
            (_, 0x00) => return (Encoding::Utf16Le, 0),
            _ => {}
        }
    }
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return (Encoding::Utf8, 3);
    }
    (Encoding::Utf8, 0)
}

/// A forward-only character stream over a byte source.
pub struct Stream<'a> {
    input: Box<dyn Read + 'a>,
    prefetched: Vec<u8>,
    available: usize,
    used: usize,
    exhausted: bool,
    readahead: VecDeque<char>,
    mark: Mark,
    encoding: Encoding,
}

impl<'a> Stream<'a> {
    /// Create a stream reading from `input` with the default prefetch size.
    pub fn new(input: impl Read + 'a) -> Self {
        Self::with_capacity(input, DEFAULT_PREFETCH)
    }

    /// Create a stream reading blocks of `prefetch` bytes from `input`.
    pub fn with_capacity(input: impl Read + 'a, prefetch: usize) -> Self {
        let mut stream = Self {
            input: Box::new(input),
            prefetched: vec![0; prefetch.max(4)],
            available: 0,
            used: 0,
            exhausted: false,
            readahead: VecDeque::new(),
            mark: Mark::default(),
            encoding: Encoding::Utf8,
        };
        // Short reads are legal, so keep going until the sniffing window is full.
        while stream.available < 4 && !stream.exhausted {
            let start = stream.available;
            match stream.read_into(start) {
                0 => stream.exhausted = true,
                n => stream.available += n,
            }
        }
        let (encoding, bom) = detect_encoding(&stream.prefetched[..stream.available]);
        stream.encoding = encoding;
        stream.used = bom.min(stream.available);
        stream
    }

    /// Create a stream over an in-memory byte slice.
    pub fn from_slice(bytes: &'a [u8]) -> Self {
        Self::new(bytes)
    }

    /// The detected input encoding.
    #[inline]
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Current position.
    #[inline]
    pub fn mark(&self) -> Mark {
        self.mark
    }

    /// Current 0-based line.
    #[inline]
    pub fn line(&self) -> usize {
        self.mark.line
    }

    /// Current 0-based column.
    #[inline]
    pub fn column(&self) -> usize {
        self.mark.column
    }

    /// Current byte offset.
    #[inline]
    pub fn offset(&self) -> usize {
        self.mark.offset
    }

    /// Whether any input remains.
    #[inline]
    pub fn has_more(&mut self) -> bool {
        self.prepare(0)
    }

    /// Peek at the next character without consuming it.
    #[inline]
    pub fn peek(&mut self) -> char {
        self.peek_nth(0)
    }

    /// Peek at the character `i` positions ahead (0-indexed).
    pub fn peek_nth(&mut self, i: usize) -> char {
        if self.prepare(i) {
            self.readahead[i]
        } else {
            EOF
        }
    }

    /// Consume one character and return it, updating the position.
    pub fn get(&mut self) -> char {
        if !self.prepare(0) {
            return EOF;
        }
        let Some(c) = self.readahead.pop_front() else {
            return EOF;
        };
        self.mark.offset += c.len_utf8();
        if c == '\n' {
            self.mark.line += 1;
            self.mark.column = 0;
        } else {
            self.mark.column += 1;
        }
        c
    }

    /// Consume `n` characters and return them.
    pub fn get_n(&mut self, n: usize) -> String {
        let mut out = String::with_capacity(n);
        for _ in 0..n {
            let c = self.get();
            if c == EOF {
                break;
            }
            out.push(c);
        }
        out
    }

    /// Consume `n` characters.
    pub fn eat(&mut self, n: usize) {
        for _ in 0..n {
            self.get();
        }
    }

    /// Make sure the read-ahead queue holds more than `i` characters.
    fn prepare(&mut self, i: usize) -> bool {
        while self.readahead.len() <= i {
            let resume = match self.encoding {
                Encoding::Utf8 => self.stream_in_utf8(),
                Encoding::Utf16Le | Encoding::Utf16Be => self.stream_in_utf16(),
                Encoding::Utf32Le | Encoding::Utf32Be => self.stream_in_utf32(),
            };
            if !resume {
                break;
            }
        }
        self.readahead.len() > i
    }

    fn read_into(&mut self, start: usize) -> usize {
        loop {
            match self.input.read(&mut self.prefetched[start..]) {
                Ok(n) => return n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("read failed, treating as end of input: {}", e);
                    return 0;
                }
            }
        }
    }

    fn peek_byte(&mut self) -> Option<u8> {
        if self.used >= self.available {
            if self.exhausted {
                return None;
            }
            self.used = 0;
            self.available = self.read_into(0);
            if self.available == 0 {
                self.exhausted = true;
                return None;
            }
        }
        Some(self.prefetched[self.used])
    }

    fn next_byte(&mut self) -> Option<u8> {
        let byte = self.peek_byte()?;
        self.used += 1;
        Some(byte)
    }

    fn queue(&mut self, c: char) {
        self.readahead
            .push_back(if c == EOF { REPLACEMENT } else { c });
    }

    fn queue_code_point(&mut self, value: u32) {
        self.queue(char::from_u32(value).unwrap_or(REPLACEMENT));
    }

    fn stream_in_utf8(&mut self) -> bool {
        let Some(lead) = self.next_byte() else {
            return false;
        };
        let (len, init, min) = match lead {
            0x00..=0x7F => {
                self.queue(lead as char);
                return true;
            }
            0xC2..=0xDF => (2, u32::from(lead & 0x1F), 0x80),
            0xE0..=0xEF => (3, u32::from(lead & 0x0F), 0x800),
            0xF0..=0xF4 => (4, u32::from(lead & 0x07), 0x1_0000),
            _ => {
                self.queue(REPLACEMENT);
                return true;
            }
        };
        let mut value = init;
        for _ in 1..len {
            match self.peek_byte() {
                Some(b) if b & 0xC0 == 0x80 => {
                    self.used += 1;
                    value = (value << 6) | u32::from(b & 0x3F);
                }
                // Leave the offending byte for the next character.
                _ => {
                    self.queue(REPLACEMENT);
                    return true;
                }
            }
        }
        if value < min {
            self.queue(REPLACEMENT);
        } else {
            self.queue_code_point(value);
        }
        true
    }

    fn read_utf16_unit(&mut self) -> Option<Result<u32, ()>> {
        let first = self.next_byte()?;
        let Some(second) = self.next_byte() else {
            return Some(Err(()));
        };
        let (hi, lo) = match self.encoding {
            Encoding::Utf16Be => (first, second),
            _ => (second, first),
        };
        Some(Ok((u32::from(hi) << 8) | u32::from(lo)))
    }

    fn stream_in_utf16(&mut self) -> bool {
        let mut unit = match self.read_utf16_unit() {
            None => return false,
            Some(Err(())) => {
                self.queue(REPLACEMENT);
                return true;
            }
            Some(Ok(unit)) => unit,
        };
        loop {
            if (0xDC00..0xE000).contains(&unit) {
                // A low surrogate with no high surrogate before it.
                self.queue(REPLACEMENT);
                return true;
            }
            if !(0xD800..0xDC00).contains(&unit) {
                self.queue_code_point(unit);
                return true;
            }
            let low = match self.read_utf16_unit() {
                Some(Ok(low)) => low,
                _ => {
                    self.queue(REPLACEMENT);
                    return true;
                }
            };
            if (0xDC00..0xE000).contains(&low) {
                let value = 0x1_0000 + (((unit & 0x3FF) << 10) | (low & 0x3FF));
                self.queue_code_point(value);
                return true;
            }
            // Unpaired high surrogate; `low` starts over as a fresh unit.
            self.queue(REPLACEMENT);
            unit = low;
        }
    }

    fn stream_in_utf32(&mut self) -> bool {
        let mut bytes = [0u8; 4];
        for (i, slot) in bytes.iter_mut().enumerate() {
            match self.next_byte() {
                Some(b) => *slot = b,
                None if i == 0 => return false,
                None => {
                    self.queue(REPLACEMENT);
                    return true;
                }
            }
        }
        let value = match self.encoding {
            Encoding::Utf32Be => u32::from_be_bytes(bytes),
            _ => u32::from_le_bytes(bytes),
        };
        self.queue_code_point(value);
        true
    }
}

impl<'a> From<&'a str> for Stream<'a> {
    fn from(source: &'a str) -> Self {
        Stream::from_slice(source.as_bytes())
    }
}

impl<'a> From<&'a [u8]> for Stream<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Stream::from_slice(bytes)
    }
}

impl<'a> From<&'a String> for Stream<'a> {
    fn from(source: &'a String) -> Self {
        Stream::from_slice(source.as_bytes())
    }
}

impl std::fmt::Debug for Stream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("encoding", &self.encoding)
            .field("mark", &self.mark)
            .field("readahead", &self.readahead)
            .finish_non_exhaustive()
    }
}
