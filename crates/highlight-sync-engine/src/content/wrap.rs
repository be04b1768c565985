use super::{ContentTree, Element, NodeId};

/// A position inside a text node, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextPoint {
    pub node: NodeId,
    pub offset: usize,
}

impl TextPoint {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

impl ContentTree {
    /// Move everything between two text points into a new `wrapper` element.
    ///
    /// Mirrors extracting a DOM range and re-inserting it inside a wrapper:
    /// the boundary text nodes are split, every partially covered ancestor
    /// below the common ancestor is split into fragments, and the now fully
    /// covered run of common-ancestor children is moved into the wrapper.
    /// `start` must not come after `end` in document order.
    ///
    /// Returns `None` when the points are not text nodes or span nothing.
    pub fn wrap_range(&mut self, start: TextPoint, end: TextPoint, wrapper: Element) -> Option<NodeId> {
        self.text(start.node)?;
        self.text(end.node)?;
        if start.node == end.node && start.offset >= end.offset {
            return None;
        }

        // Isolate the covered text: `first` begins and `last` ends the range.
        let mut last = end.node;
        let mut last_offset = end.offset.min(self.char_len(end.node));
        let first = if start.offset > 0 && start.offset < self.char_len(start.node) {
            let right = self.split_text(start.node, start.offset)?;
            if start.node == end.node {
                last = right;
                last_offset -= start.offset;
            }
            right
        } else if start.offset == 0 {
            start.node
        } else {
            // Start sits at the very end of its node; nothing of it is covered.
            return None;
        };
        if last_offset == 0 {
            return None;
        }
        if last_offset < self.char_len(last) {
            self.split_text(last, last_offset)?;
        }

        let common = self.common_ancestor(first, last)?;

        // Split ancestors on the start side so `first` leads its fragments.
        let mut head = first;
        while let Some(parent) = self.parent(head).filter(|parent| *parent != common) {
            let index = self.index_in_parent(head)?;
            head = if index > 0 {
                self.split_element(parent, index)?
            } else {
                parent
            };
        }

        // Split ancestors on the end side so `last` closes its fragments.
        let mut tail = last;
        while let Some(parent) = self.parent(tail).filter(|parent| *parent != common) {
            let index = self.index_in_parent(tail)?;
            if index + 1 < self.children(parent).len() {
                self.split_element(parent, index + 1)?;
            }
            tail = parent;
        }

        let from = self.index_in_parent(head)?;
        let to = self.index_in_parent(tail)?;
        if to < from {
            return None;
        }
        Some(self.wrap_children(common, from, to - from + 1, wrapper))
    }
}
