use crate::content::NodeId;

/// One end of a selection as the selection API reports it.
///
/// For a text node `offset` counts characters into its content; for an
/// element node it is a child index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionAnchor {
    pub node: NodeId,
    pub offset: usize,
}

impl SelectionAnchor {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// An ephemeral user selection. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionEvent {
    pub start: SelectionAnchor,
    pub end: SelectionAnchor,
    /// Live selected text, used when the anchors cannot be walked.
    pub text: String,
}

impl SelectionEvent {
    pub fn new(start: SelectionAnchor, end: SelectionAnchor, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Whitespace-only text counts as no selection.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
