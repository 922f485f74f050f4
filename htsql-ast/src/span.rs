use std::ops::Range;

/// A byte-offset range into the original HTSQL source text.
///
/// Every syntax, binding, flow and term node carries one so diagnostics can
/// point back at source text without re-walking the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A zero-width span at `pos`, used for synthesized nodes that have no
    /// literal source text (e.g. an implicit primary-key sort key).
    pub const fn synthetic(pos: usize) -> Self {
        Self::new(pos, pos)
    }

    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    pub fn as_range(self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Span::new(range.start, range.end)
    }
}
