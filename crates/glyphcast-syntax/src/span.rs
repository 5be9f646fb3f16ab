//! Styled spans produced by the tokenizer.

use std::ops::Range;

use crate::format::{Format, FormatId};

/// A contiguous range of text tagged with one resolved format.
///
/// Offsets are code-point indices into the tokenized text, half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StyledSpan {
    /// First code point covered (inclusive).
    pub start: usize,
    /// End of the span (exclusive).
    pub end: usize,
    /// Resolved format.
    pub format: Format,
    /// Named format that claimed this range, `None` for default text.
    pub id: Option<FormatId>,
}

impl StyledSpan {
    /// Create a new span.
    pub fn new(start: usize, end: usize, format: Format, id: Option<FormatId>) -> Self {
        Self {
            start,
            end,
            format,
            id,
        }
    }

    /// Code-point range covered by this span.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Check if this span contains a code-point position.
    pub fn contains(&self, pos: usize) -> bool {
        pos >= self.start && pos < self.end
    }

    /// Number of code points covered.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if the span covers nothing.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Check if the span carries the default format.
    pub fn is_default(&self) -> bool {
        self.id.is_none()
    }
}

/// Find the span covering a code-point position.
///
/// `spans` must be ordered and non-overlapping, as produced by
/// [`tokenize`](crate::tokenize).
pub fn span_at(spans: &[StyledSpan], pos: usize) -> Option<&StyledSpan> {
    let idx = spans.partition_point(|s| s.end <= pos);
    spans.get(idx).filter(|s| s.contains(pos))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize) -> StyledSpan {
        StyledSpan::new(start, end, Format::default(), None)
    }

    #[test]
    fn span_contains() {
        let s = span(5, 10);
        assert!(!s.contains(4));
        assert!(s.contains(5));
        assert!(s.contains(9));
        assert!(!s.contains(10));
        assert_eq!(s.len(), 5);
        assert!(s.is_default());
    }

    #[test]
    fn span_lookup() {
        let spans = [span(0, 3), span(3, 4), span(4, 9)];
        assert_eq!(span_at(&spans, 0).map(|s| s.start), Some(0));
        assert_eq!(span_at(&spans, 3).map(|s| s.start), Some(3));
        assert_eq!(span_at(&spans, 8).map(|s| s.start), Some(4));
        assert!(span_at(&spans, 9).is_none());
        assert!(span_at(&[], 0).is_none());
    }
}
