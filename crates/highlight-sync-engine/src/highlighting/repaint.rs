//! DOM Re-painter: wraps normalised ranges in marker elements.

use crate::content::{ContentTree, Element, Marker, MarkerId, NodeId};
use crate::highlighting::offsets::{Bias, locate_position};
use crate::models::{HighlightRange, Palette};

/// What a repaint pass managed to draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepaintReport {
    pub painted: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Repainter {
    palette: Palette,
}

impl Repainter {
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Replace every settled marker under `root` with markers for `ranges`.
    ///
    /// Pending (optimistic) markers are left in place. Ranges whose offsets
    /// no longer fit the content are skipped for this pass; they stay in the
    /// caller's range set and can paint on a later pass.
    pub fn repaint(
        &self,
        tree: &mut ContentTree,
        root: NodeId,
        ranges: &[HighlightRange],
    ) -> RepaintReport {
        self.clear_markers(tree, root, false);

        let mut ordered: Vec<&HighlightRange> = ranges.iter().collect();
        ordered.sort_by_key(|range| range.start);

        let mut report = RepaintReport::default();
        for range in ordered {
            match self.wrap(tree, root, range.start, range.end, range.color.as_deref(), false) {
                Some(_) => report.painted += 1,
                None => {
                    log::debug!(
                        "skipping highlight {}..{}: not locatable in current content",
                        range.start,
                        range.end
                    );
                    report.skipped += 1;
                }
            }
        }
        report
    }

    /// Wrap `[start, end)` in a pending marker for instant feedback.
    pub fn paint_pending(
        &self,
        tree: &mut ContentTree,
        root: NodeId,
        start: usize,
        end: usize,
        color: Option<&str>,
    ) -> Option<MarkerId> {
        self.wrap(tree, root, start, end, color, true)
    }

    /// Clear the pending flag on every fragment of an optimistic marker so
    /// the next repaint treats it like any other marker.
    pub fn settle(&self, tree: &mut ContentTree, root: NodeId, id: MarkerId) {
        for node in tree.markers_under(root) {
            if let Some(marker) = tree
                .element_mut(node)
                .and_then(|element| element.marker.as_mut())
                .filter(|marker| marker.id == id)
            {
                marker.pending = false;
            }
        }
    }

    /// Unwrap markers under `root`, pending ones only if asked to.
    pub fn clear_markers(&self, tree: &mut ContentTree, root: NodeId, include_pending: bool) {
        let doomed: Vec<NodeId> = tree
            .markers_under(root)
            .into_iter()
            .filter(|node| {
                tree.marker(*node)
                    .is_some_and(|marker| include_pending || !marker.pending)
            })
            .collect();
        for node in doomed {
            tree.unwrap(node);
        }
        tree.normalize_subtree(root);
    }

    fn wrap(
        &self,
        tree: &mut ContentTree,
        root: NodeId,
        start: usize,
        end: usize,
        color: Option<&str>,
        pending: bool,
    ) -> Option<MarkerId> {
        if start >= end {
            return None;
        }
        let from = locate_position(tree, root, start, Bias::Forward)?;
        let to = locate_position(tree, root, end, Bias::Backward)?;

        let marker = Marker {
            id: MarkerId::new(),
            color: self.palette.tag_for(color).to_string(),
            presentation: self.palette.presentation(color).to_string(),
            pending,
        };
        let id = marker.id;
        tree.wrap_range(from, to, Element::marker(marker))?;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::html::inner_html;
    use crate::highlighting::normalize::normalize;
    use pretty_assertions::assert_eq;

    fn message() -> ContentTree {
        ContentTree::from_markdown("Hello **bold** world, see [link](https://x.test).")
    }

    fn marker_count(tree: &ContentTree) -> usize {
        tree.markers_under(tree.root()).len()
    }

    #[test]
    fn test_repaint_wraps_exact_spans() {
        // Given a rendered message
        let mut tree = message();
        let root = tree.root();
        let repainter = Repainter::default();

        // When painting "bold" and "link"
        let report = repainter.repaint(
            &mut tree,
            root,
            &[HighlightRange::new(6, 10), HighlightRange::new(22, 26).with_color("pink")],
        );

        // Then both spans are wrapped and the text is untouched
        assert_eq!(report, RepaintReport { painted: 2, skipped: 0 });
        let marked: Vec<String> = tree
            .markers_under(root)
            .into_iter()
            .map(|node| tree.plain_text(node))
            .collect();
        assert_eq!(marked, vec!["bold", "link"]);
        assert_eq!(tree.plain_text(root), "Hello bold world, see link.");
    }

    #[test]
    fn test_repaint_is_stable() {
        let mut tree = message();
        let root = tree.root();
        let repainter = Repainter::default();
        let ranges = [HighlightRange::new(3, 13), HighlightRange::new(18, 23)];

        repainter.repaint(&mut tree, root, &ranges);
        let first_text = tree.plain_text(root);
        let first_markers = marker_count(&tree);
        repainter.repaint(&mut tree, root, &ranges);

        assert_eq!(tree.plain_text(root), first_text);
        assert_eq!(marker_count(&tree), first_markers);
        assert_eq!(first_text, "Hello bold world, see link.");
    }

    #[test]
    fn test_clearing_restores_original_markup() {
        let mut tree = message();
        let root = tree.root();
        let original = inner_html(&tree, root);
        let repainter = Repainter::default();

        repainter.repaint(&mut tree, root, &[HighlightRange::new(8, 24)]);
        assert_ne!(inner_html(&tree, root), original);
        repainter.repaint(&mut tree, root, &[]);

        assert_eq!(inner_html(&tree, root), original);
    }

    #[test]
    fn test_stale_range_is_skipped_not_fatal() {
        let mut tree = message();
        let root = tree.root();
        let repainter = Repainter::default();

        let report = repainter.repaint(
            &mut tree,
            root,
            &[HighlightRange::new(0, 5), HighlightRange::new(20, 400)],
        );

        assert_eq!(report, RepaintReport { painted: 1, skipped: 1 });
        assert_eq!(marker_count(&tree), 1);
    }

    #[test]
    fn test_pending_marker_survives_repaint_until_settled() {
        // Given an optimistic marker
        let mut tree = message();
        let root = tree.root();
        let repainter = Repainter::default();
        let id = repainter
            .paint_pending(&mut tree, root, 0, 5, Some("green"))
            .unwrap();

        // When repainting with no settled ranges
        repainter.repaint(&mut tree, root, &[]);

        // Then the pending marker is still there
        let pending: Vec<NodeId> = tree.markers_under(root);
        assert_eq!(pending.len(), 1);
        assert_eq!(tree.marker(pending[0]).map(|m| m.id), Some(id));
        assert_eq!(tree.plain_text(pending[0]), "Hello");

        // And once settled the next repaint removes it
        repainter.settle(&mut tree, root, id);
        repainter.repaint(&mut tree, root, &[]);
        assert_eq!(marker_count(&tree), 0);
    }

    #[test]
    fn test_marker_carries_palette_colour() {
        let mut tree = ContentTree::from_markdown("abc");
        let root = tree.root();
        let repainter = Repainter::default();

        repainter.repaint(&mut tree, root, &[HighlightRange::new(0, 3).with_color("nope")]);

        let node = tree.markers_under(root)[0];
        let marker = tree.marker(node).unwrap();
        assert_eq!(marker.color, "yellow");
        assert_eq!(marker.presentation, "#fef08a");
    }

    quickcheck::quickcheck! {
        fn prop_repaint_twice_keeps_text_and_markers(spans: Vec<(u8, u8)>) -> bool {
            let mut tree = message();
            let root = tree.root();
            let original = tree.plain_text(root);
            let repainter = Repainter::default();
            // Offsets run a little past the 27 characters so some ranges are skipped.
            let ranges: Vec<HighlightRange> = spans
                .iter()
                .map(|&(a, b)| HighlightRange::new(a as usize % 30, b as usize % 30))
                .collect();
            let ranges = normalize(&ranges);

            let first = repainter.repaint(&mut tree, root, &ranges);
            let first_text = tree.plain_text(root);
            let first_markers = marker_count(&tree);
            let second = repainter.repaint(&mut tree, root, &ranges);

            first == second
                && first_text == original
                && tree.plain_text(root) == original
                && marker_count(&tree) == first_markers
        }
    }
}
