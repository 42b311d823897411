//! Selection model over document positions

/// A selection between `anchor` and `head`. Collapsed when they are equal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    /// Create a collapsed cursor at a single position
    pub fn cursor_at(pos: usize) -> Self {
        Self {
            anchor: pos,
            head: pos,
        }
    }

    /// Create a range selection
    pub fn range(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// The cursor position, if the selection is collapsed
    pub fn cursor(&self) -> Option<usize> {
        (self.anchor == self.head).then_some(self.head)
    }

    /// Start of the selected range
    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    /// End of the selected range
    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    /// Keep both ends inside a document of `size` positions
    pub fn clamp(self, size: usize) -> Self {
        Self {
            anchor: self.anchor.min(size),
            head: self.head.min(size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_forward_selection() {
        let sel = Selection::range(5, 10);
        assert_eq!((sel.from(), sel.to()), (5, 10));
        assert_eq!(sel.cursor(), None);
    }

    #[test]
    fn test_range_backward_selection() {
        let sel = Selection::range(10, 5);
        assert_eq!((sel.from(), sel.to()), (5, 10));
    }

    #[test]
    fn test_collapsed_selection() {
        let sel = Selection::cursor_at(7);
        assert_eq!(sel.cursor(), Some(7));
        assert_eq!((sel.from(), sel.to()), (7, 7));
    }

    #[test]
    fn test_clamp() {
        assert_eq!(Selection::range(2, 20).clamp(8), Selection::range(2, 8));
    }
}
