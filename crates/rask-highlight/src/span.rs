// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Source location tracking.

use std::ops::Range;

/// A byte range in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Shift both ends by `offset`. Used when a sub-slice was lexed on its own.
    pub fn offset(self, offset: usize) -> Self {
        Self::new(self.start + offset, self.end + offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_moves_both_ends() {
        let span = Span::new(2, 5).offset(10);
        assert_eq!(span, Span::new(12, 15));
        assert_eq!(span.range(), 12..15);
    }

    #[test]
    fn empty_span() {
        assert!(Span::new(4, 4).is_empty());
        assert!(!Span::new(4, 5).is_empty());
    }
}
