use crate::content::{ContentTree, NodeId};
use crate::highlighting::offsets::{Bias, locate_position};
use crate::models::{SelectionAnchor, SelectionEvent};

/// Narrow view of the host's ambient selection state.
pub trait SelectionSource {
    fn current_selection(&self) -> Option<SelectionEvent>;
}

/// A fixed selection, for tests and scripted hosts.
#[derive(Debug, Clone, Default)]
pub struct StaticSelection(pub Option<SelectionEvent>);

impl SelectionSource for StaticSelection {
    fn current_selection(&self) -> Option<SelectionEvent> {
        self.0.clone()
    }
}

/// Build the selection a user dragging over exactly `[start, end)` would make.
pub fn selection_for_offsets(
    tree: &ContentTree,
    root: NodeId,
    start: usize,
    end: usize,
) -> Option<SelectionEvent> {
    let from = locate_position(tree, root, start, Bias::Forward)?;
    let to = locate_position(tree, root, end, Bias::Backward)?;
    let text: String = tree
        .plain_text(root)
        .chars()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect();
    Some(SelectionEvent::new(
        SelectionAnchor::new(from.node, from.offset),
        SelectionAnchor::new(to.node, to.offset),
        text,
    ))
}
