//! Offset Mapper: selection anchors to plain-text character offsets.

use regex::Regex;

use crate::content::{ContentTree, NodeId, TextPoint};
use crate::models::{SelectionAnchor, SelectionEvent, TextOffsets};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("selection is empty")]
    EmptySelection,
    #[error("selection could not be located in the content")]
    NotFound,
}

/// Which neighbour wins when an absolute offset falls on a text node boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    /// Start of the following node; used for range starts.
    Forward,
    /// End of the preceding node; used for range ends.
    Backward,
}

/// Translate a selection into `[start, end)` offsets within `root`.
///
/// Anchors on element nodes resolve to the nearest text node (forward from
/// the indicated child, then backward, then the first text under `root`).
/// If the anchors cannot be walked, the selected text is searched for as a
/// literal substring of the plain text. Backwards selections are swapped.
pub fn map_selection_to_offsets(
    tree: &ContentTree,
    selection: &SelectionEvent,
    root: NodeId,
) -> Result<TextOffsets, MapError> {
    if selection.is_empty() {
        return Err(MapError::EmptySelection);
    }

    let walked = resolve_anchor(tree, selection.start, root)
        .zip(resolve_anchor(tree, selection.end, root))
        .and_then(|(start, end)| {
            let start = absolute_offset(tree, root, start)?;
            let end = absolute_offset(tree, root, end)?;
            Some(TextOffsets::ordered(start, end))
        });
    if let Some(offsets) = walked {
        return Ok(offsets);
    }

    log::debug!("selection anchors not walkable, searching for the selected text");
    find_literal(&tree.plain_text(root), &selection.text).ok_or(MapError::NotFound)
}

/// Resolve an anchor to a concrete text node position under `root`.
pub fn resolve_anchor(
    tree: &ContentTree,
    anchor: SelectionAnchor,
    root: NodeId,
) -> Option<TextPoint> {
    if !tree.contains(root, anchor.node) {
        return None;
    }
    if tree.text(anchor.node).is_some() {
        let offset = anchor.offset.min(tree.char_len(anchor.node));
        return Some(TextPoint::new(anchor.node, offset));
    }

    let children = tree.children(anchor.node);
    let split = anchor.offset.min(children.len());
    let forward = children[split..]
        .iter()
        .find_map(|child| tree.first_text_descendant(*child))
        .map(|node| TextPoint::new(node, 0));
    let backward = || {
        children[..split]
            .iter()
            .rev()
            .find_map(|child| tree.last_text_descendant(*child))
            .map(|node| TextPoint::new(node, tree.char_len(node)))
    };
    let anywhere = || {
        tree.first_text_descendant(root)
            .map(|node| TextPoint::new(node, 0))
    };

    forward.or_else(backward).or_else(anywhere)
}

/// Absolute character offset of a text point, walking text leaves in order.
pub fn absolute_offset(tree: &ContentTree, root: NodeId, point: TextPoint) -> Option<usize> {
    let mut running = 0;
    for node in tree.text_nodes_under(root) {
        let len = tree.char_len(node);
        if node == point.node {
            return Some(running + point.offset.min(len));
        }
        running += len;
    }
    None
}

/// Locate the text node and intra-node offset at an absolute position.
///
/// Empty text nodes are never returned. `None` when `offset` lies past the
/// end of the plain text or there is no text at all.
pub fn locate_position(
    tree: &ContentTree,
    root: NodeId,
    offset: usize,
    bias: Bias,
) -> Option<TextPoint> {
    let nodes: Vec<(NodeId, usize)> = tree
        .text_nodes_under(root)
        .into_iter()
        .map(|node| (node, tree.char_len(node)))
        .filter(|(_, len)| *len > 0)
        .collect();

    let mut running = 0;
    let mut last = None;
    for (node, len) in &nodes {
        let (node, len) = (*node, *len);
        let hit = match bias {
            Bias::Forward => offset < running + len,
            Bias::Backward => offset <= running + len && (offset > running || running == 0),
        };
        if hit && offset >= running {
            return Some(TextPoint::new(node, offset - running));
        }
        running += len;
        last = Some((node, len));
    }

    // Forward bias at the very end of the text lands on the last node.
    match last {
        Some((node, len)) if offset == running => Some(TextPoint::new(node, len)),
        _ => None,
    }
}

/// First exact occurrence of `needle` in `plain`, in character offsets.
pub fn find_literal(plain: &str, needle: &str) -> Option<TextOffsets> {
    if needle.is_empty() {
        return None;
    }
    let byte = plain.find(needle)?;
    let start = plain[..byte].chars().count();
    Some(TextOffsets {
        start,
        end: start + needle.chars().count(),
    })
}

/// First occurrence of `needle` where any whitespace run in the needle
/// matches any non-empty whitespace run in `plain`.
///
/// Selected text often differs from the rendered text only in how line
/// breaks and indentation were copied out, so this is the fallback when an
/// exact search fails.
pub fn find_whitespace_insensitive(plain: &str, needle: &str) -> Option<TextOffsets> {
    let words: Vec<String> = needle.split_whitespace().map(regex::escape).collect();
    if words.is_empty() {
        return None;
    }
    let pattern = Regex::new(&words.join(r"\s+")).ok()?;
    let found = pattern.find(plain)?;
    let start = plain[..found.start()].chars().count();
    Some(TextOffsets {
        start,
        end: start + found.as_str().chars().count(),
    })
}
