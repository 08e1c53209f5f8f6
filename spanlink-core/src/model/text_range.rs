use serde::{Deserialize, Serialize};

/// Half-open `[start, end)` range of character offsets
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check if this range contains the given offset
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    /// True when the two ranges share at least one character
    pub fn overlaps(&self, other: &TextRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Valid as a span range over a text of `text_len` characters
    pub fn fits(&self, text_len: usize) -> bool {
        self.start < self.end && self.end <= text_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_orders_endpoints() {
        let r = TextRange::new(9, 3);
        assert_eq!((r.start, r.end), (3, 9));
        assert_eq!(r.len(), 6);
    }

    #[test]
    fn touching_ranges_do_not_overlap() {
        let a = TextRange::new(0, 4);
        assert!(!a.overlaps(&TextRange::new(4, 8)));
        assert!(a.overlaps(&TextRange::new(3, 5)));
        assert!(a.overlaps(&TextRange::new(1, 2)));
    }

    #[test]
    fn fits_rejects_empty_and_out_of_bounds() {
        assert!(TextRange::new(0, 4).fits(4));
        assert!(!TextRange::new(2, 2).fits(4));
        assert!(!TextRange::new(2, 5).fits(4));
    }
}
