//! Offset resolution: rendered selection boundaries to character ranges.
//!
//! The host renderer draws a document as an ordered list of text nodes inside
//! one render container. A selection names two boundaries in that node list.
//! Offsets are measured as rendered text length from the container start, so
//! the result does not depend on how the renderer chose to split the text, as
//! long as every character is rendered exactly once and in document order.

use crate::model::TextRange;

/// Identity of a render container (one per displayed document)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId(pub u32);

/// A point between characters: `offset` characters into text node `node`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Boundary {
    pub node: usize,
    pub offset: usize,
}

impl Boundary {
    pub fn new(node: usize, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A native selection as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Container holding the selection's common ancestor
    pub root: ContainerId,
    pub anchor: Boundary,
    pub focus: Boundary,
}

impl Selection {
    pub fn new(root: ContainerId, anchor: Boundary, focus: Boundary) -> Self {
        Self { root, anchor, focus }
    }

    /// Boundaries in document order (selections may be made backwards)
    pub fn ordered(&self) -> (Boundary, Boundary) {
        if self.anchor <= self.focus {
            (self.anchor, self.focus)
        } else {
            (self.focus, self.anchor)
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

/// Text nodes of one render container, by rendered character count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderNodes {
    container: ContainerId,
    lens: Vec<usize>,
    starts: Vec<usize>,
}

impl RenderNodes {
    pub fn new(container: ContainerId, lens: Vec<usize>) -> Self {
        let mut starts = Vec::with_capacity(lens.len());
        let mut acc = 0;
        for len in &lens {
            starts.push(acc);
            acc += len;
        }
        Self {
            container,
            lens,
            starts,
        }
    }

    pub fn from_texts<S: AsRef<str>>(container: ContainerId, nodes: &[S]) -> Self {
        Self::new(
            container,
            nodes.iter().map(|n| n.as_ref().chars().count()).collect(),
        )
    }

    pub fn container(&self) -> ContainerId {
        self.container
    }

    pub fn node_count(&self) -> usize {
        self.lens.len()
    }

    pub fn node_len(&self, node: usize) -> Option<usize> {
        self.lens.get(node).copied()
    }

    pub fn total_len(&self) -> usize {
        self.starts.last().zip(self.lens.last()).map(|(s, l)| s + l).unwrap_or(0)
    }

    /// Rendered length of the range from the container start to `boundary`.
    ///
    /// Offsets past the end of a node clamp to the node length. A boundary in
    /// a node that does not exist yields `None`, except the collapsed point
    /// just past the last node.
    pub fn text_len_before(&self, boundary: Boundary) -> Option<usize> {
        match self.lens.get(boundary.node) {
            Some(&len) => Some(self.starts[boundary.node] + boundary.offset.min(len)),
            None if boundary.node == self.lens.len() && boundary.offset == 0 => {
                Some(self.total_len())
            }
            None => None,
        }
    }

    /// Boundary just before character `index`; clamps to the container end
    pub fn boundary_at(&self, index: usize) -> Boundary {
        let total = self.total_len();
        if index >= total {
            return match self.lens.len() {
                0 => Boundary::new(0, 0),
                n => Boundary::new(n - 1, self.lens[n - 1]),
            };
        }
        let node = self.starts.partition_point(|&s| s <= index) - 1;
        Boundary::new(node, index - self.starts[node])
    }
}

/// Convert a selection to a character range over `text`.
///
/// Returns `None` when there is no selection, the selection belongs to another
/// container, it is empty, or it falls outside the text.
pub fn resolve(selection: Option<&Selection>, nodes: &RenderNodes, text: &str) -> Option<TextRange> {
    let selection = selection?;
    if selection.root != nodes.container() {
        return None;
    }
    let (first, last) = selection.ordered();

    let start = nodes.text_len_before(first)?;
    let length = nodes.text_len_before(last)?.checked_sub(start)?;
    if length == 0 {
        return None;
    }
    let end = start + length;
    if end > text.chars().count() || start >= end {
        return None;
    }
    Some(TextRange { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: ContainerId = ContainerId(1);

    fn nodes() -> RenderNodes {
        // "Mike lives in America." split the way a wrapping renderer might
        RenderNodes::from_texts(ROOT, &["Mike ", "lives in ", "America."])
    }

    #[test]
    fn resolves_within_one_node() {
        let sel = Selection::new(ROOT, Boundary::new(0, 0), Boundary::new(0, 4));
        assert_eq!(
            resolve(Some(&sel), &nodes(), "Mike lives in America."),
            Some(TextRange::new(0, 4))
        );
    }

    #[test]
    fn resolves_across_nodes_and_backwards() {
        let sel = Selection::new(ROOT, Boundary::new(2, 7), Boundary::new(1, 0));
        assert_eq!(
            resolve(Some(&sel), &nodes(), "Mike lives in America."),
            Some(TextRange::new(5, 21))
        );
    }

    #[test]
    fn rejects_missing_empty_and_foreign_selections() {
        let text = "Mike lives in America.";
        assert_eq!(resolve(None, &nodes(), text), None);

        let collapsed = Selection::new(ROOT, Boundary::new(1, 2), Boundary::new(1, 2));
        assert_eq!(resolve(Some(&collapsed), &nodes(), text), None);

        let foreign = Selection::new(ContainerId(9), Boundary::new(0, 0), Boundary::new(0, 4));
        assert_eq!(resolve(Some(&foreign), &nodes(), text), None);

        let past_end = Selection::new(ROOT, Boundary::new(0, 0), Boundary::new(7, 1));
        assert_eq!(resolve(Some(&past_end), &nodes(), text), None);
    }

    #[test]
    fn rejects_when_render_is_longer_than_text() {
        let sel = Selection::new(ROOT, Boundary::new(0, 0), Boundary::new(2, 8));
        assert_eq!(resolve(Some(&sel), &nodes(), "Mike lives"), None);
    }

    #[test]
    fn boundary_at_inverts_text_len_before() {
        let nodes = RenderNodes::new(ROOT, vec![3, 0, 4]);
        assert_eq!(nodes.boundary_at(0), Boundary::new(0, 0));
        assert_eq!(nodes.boundary_at(3), Boundary::new(2, 0));
        assert_eq!(nodes.boundary_at(6), Boundary::new(2, 3));
        assert_eq!(nodes.boundary_at(7), Boundary::new(2, 4));
        assert_eq!(nodes.boundary_at(99), Boundary::new(2, 4));
        for i in 0..=7 {
            assert_eq!(nodes.text_len_before(nodes.boundary_at(i)), Some(i));
        }
    }
}
