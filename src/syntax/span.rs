/// A source location: byte offset range plus the 1-based line/column of
/// the first byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub start: u32,
    pub end: u32,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: u32, end: u32, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    pub fn dummy() -> Self {
        Self {
            start: 0,
            end: 0,
            line: 0,
            column: 0,
        }
    }

    /// Smallest span covering both. Line/column follow whichever starts first.
    pub fn merge(self, other: Span) -> Span {
        let (line, column) = if other.start < self.start {
            (other.line, other.column)
        } else {
            (self.line, self.column)
        };
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line,
            column,
        }
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start as usize..self.end.max(self.start) as usize
    }
}

/// A value annotated with its source span.
#[derive(Clone, Debug)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    pub fn dummy(node: T) -> Self {
        Self {
            node,
            span: Span::dummy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_earliest_position() {
        let a = Span::new(10, 12, 2, 3);
        let b = Span::new(4, 6, 1, 5);
        let m = a.merge(b);
        assert_eq!(m.start, 4);
        assert_eq!(m.end, 12);
        assert_eq!((m.line, m.column), (1, 5));
    }

    #[test]
    fn range_of_dummy_is_empty() {
        assert!(Span::dummy().range().is_empty());
    }
}
