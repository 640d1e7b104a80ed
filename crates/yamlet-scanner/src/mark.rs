//! Position tracking for source locations.

use std::fmt;

/// A position in the decoded input.
///
/// Offsets count UTF-8 bytes of the decoded text (whatever the input
/// encoding was), lines and columns are 0-based and columns count characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Mark {
    /// Byte offset of the position.
    pub offset: usize,
    /// 0-based line number.
    pub line: usize,
    /// 0-based column number.
    pub column: usize,
}

impl Mark {
    /// Create a new mark.
    #[inline]
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }

    /// Byte range of length `len` starting at this mark.
    #[inline]
    pub fn range(&self, len: usize) -> std::ops::Range<usize> {
        self.offset..self.offset + len
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line + 1, self.column + 1)
    }
}

impl From<Mark> for std::ops::Range<usize> {
    fn from(mark: Mark) -> Self {
        mark.offset..mark.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_one_based() {
        assert_eq!(Mark::new(10, 2, 4).to_string(), "line 3, column 5");
    }

    #[test]
    fn ranges() {
        let mark = Mark::new(3, 0, 3);
        assert_eq!(mark.range(2), 3..5);
        assert_eq!(std::ops::Range::<usize>::from(mark), 3..3);
    }
}
