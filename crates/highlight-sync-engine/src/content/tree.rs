use std::fmt;

use uuid::Uuid;

/// Index of a node in a [`ContentTree`] arena. Stable for the node's lifetime;
/// detached nodes keep their slot but are unreachable from the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity shared by every fragment of one painted highlight marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerId(Uuid);

impl MarkerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MarkerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Highlight metadata carried by a `<mark>` element.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: MarkerId,
    /// Resolved logical colour tag.
    pub color: String,
    /// Presentation value, e.g. a CSS colour.
    pub presentation: String,
    /// Optimistic markers awaiting the store's answer survive repaints.
    pub pending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub marker: Option<Marker>,
    /// Set on the right-hand fragment when an element is split at a range
    /// boundary; points at the first fragment so unwrapping can re-join them.
    pub continues: Option<NodeId>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            marker: None,
            continues: None,
        }
    }

    pub fn marker(marker: Marker) -> Self {
        Self {
            marker: Some(marker),
            ..Self::new("mark")
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Text(String),
    Element(Element),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element(_) => None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match &self.kind {
            NodeKind::Element(element) => Some(element),
            NodeKind::Text(_) => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text(_))
    }
}

/// Rendered message content as an ordered tree of text and element nodes.
///
/// This is the stand-in for a browser content root: offsets are computed
/// against the plain-text projection (all text leaves in document order), so
/// wrapping text in markers never moves the offsets of unmarked text.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for ContentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentTree {
    /// Create a tree with an empty `div` root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Element(Element::new("div")),
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Panics on an id from another tree, like slice indexing.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.node(id).as_text()
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.node(id).as_element()
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(element) => Some(element),
            NodeKind::Text(_) => None,
        }
    }

    pub fn marker(&self, id: NodeId) -> Option<&Marker> {
        self.element(id).and_then(|element| element.marker.as_ref())
    }

    /// Length of a text node in characters; zero for elements.
    pub fn char_len(&self, id: NodeId) -> usize {
        self.text(id).map_or(0, |text| text.chars().count())
    }

    pub fn append_element(&mut self, parent: NodeId, element: Element) -> NodeId {
        let index = self.children(parent).len();
        let id = self.alloc(NodeKind::Element(element));
        self.attach(parent, index, id);
        id
    }

    pub fn append_text(&mut self, parent: NodeId, text: impl Into<String>) -> NodeId {
        let index = self.children(parent).len();
        let id = self.alloc(NodeKind::Text(text.into()));
        self.attach(parent, index, id);
        id
    }

    /// True if `node` is `ancestor` or lies underneath it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Nodes under `root` (inclusive) in document order.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        out
    }

    /// Text leaves under `root` in document order, empty ones included.
    pub fn text_nodes_under(&self, root: NodeId) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| self.node(*id).is_text())
            .collect()
    }

    /// The plain-text projection every offset is addressed against.
    pub fn plain_text(&self, root: NodeId) -> String {
        self.text_nodes_under(root)
            .into_iter()
            .filter_map(|id| self.text(id))
            .collect()
    }

    /// First non-empty text node under `node`, in document order.
    pub fn first_text_descendant(&self, node: NodeId) -> Option<NodeId> {
        self.text_nodes_under(node)
            .into_iter()
            .find(|id| self.char_len(*id) > 0)
    }

    /// Last non-empty text node under `node`, in document order.
    pub fn last_text_descendant(&self, node: NodeId) -> Option<NodeId> {
        self.text_nodes_under(node)
            .into_iter()
            .rev()
            .find(|id| self.char_len(*id) > 0)
    }

    /// Marker elements under `root`, outermost first.
    pub fn markers_under(&self, root: NodeId) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| self.marker(*id).is_some())
            .collect()
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    /// Ancestors of `id` from its parent up to the tree root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(parent) = current {
            out.push(parent);
            current = self.parent(parent);
        }
        out
    }

    /// Lowest element containing both nodes.
    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        let a_chain: Vec<NodeId> = std::iter::once(a).chain(self.ancestors(a)).collect();
        std::iter::once(b)
            .chain(self.ancestors(b))
            .find(|candidate| a_chain.contains(candidate) && !self.node(*candidate).is_text())
    }

    /// Split a text node at a character offset. The node keeps the left part;
    /// the returned sibling holds the right part.
    pub fn split_text(&mut self, id: NodeId, at: usize) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        let right = match &mut self.nodes[id.0].kind {
            NodeKind::Text(text) => {
                let byte = char_to_byte(text, at);
                text.split_off(byte)
            }
            NodeKind::Element(_) => return None,
        };
        let right_id = self.alloc(NodeKind::Text(right));
        self.attach(parent, index + 1, right_id);
        Some(right_id)
    }

    /// Split an element before child `at`. The element keeps children
    /// `..at`; the returned fragment, inserted right after it, takes the rest.
    pub fn split_element(&mut self, id: NodeId, at: usize) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        let mut fragment = self.element(id)?.clone();
        fragment.continues = fragment.continues.or(Some(id));

        let moved = self.nodes[id.0].children.split_off(at);
        let fragment_id = self.alloc(NodeKind::Element(fragment));
        for child in &moved {
            self.nodes[child.0].parent = Some(fragment_id);
        }
        self.nodes[fragment_id.0].children = moved;
        self.attach(parent, index + 1, fragment_id);
        Some(fragment_id)
    }

    /// Insert a new element at `index` in `parent` and move `count` of the
    /// following siblings into it.
    pub fn wrap_children(
        &mut self,
        parent: NodeId,
        index: usize,
        count: usize,
        element: Element,
    ) -> NodeId {
        let moved: Vec<NodeId> = self.nodes[parent.0]
            .children
            .drain(index..index + count)
            .collect();
        let wrapper = self.alloc(NodeKind::Element(element));
        for child in &moved {
            self.nodes[child.0].parent = Some(wrapper);
        }
        self.nodes[wrapper.0].children = moved;
        self.attach(parent, index, wrapper);
        wrapper
    }

    /// Replace an element by its children, keeping their order.
    pub fn unwrap(&mut self, id: NodeId) {
        let (Some(parent), Some(index)) = (self.parent(id), self.index_in_parent(id)) else {
            return;
        };
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for child in &children {
            self.nodes[child.0].parent = Some(parent);
        }
        let siblings = &mut self.nodes[parent.0].children;
        let _removed: Vec<NodeId> = siblings.splice(index..=index, children).collect();
        self.nodes[id.0].parent = None;
    }

    /// Detach a node (and its subtree) from its parent.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            self.nodes[parent.0].children.retain(|child| *child != id);
            self.nodes[id.0].parent = None;
        }
    }

    /// Merge adjacent text siblings, drop empty text nodes and re-join
    /// element fragments left behind by [`split_element`](Self::split_element).
    /// The plain-text projection is unchanged.
    pub fn normalize_subtree(&mut self, id: NodeId) {
        let mut index = 0;
        while index < self.children(id).len() {
            let current = self.children(id)[index];

            if self.text(current).is_some_and(str::is_empty) {
                self.detach(current);
                continue;
            }

            if index > 0 {
                let previous = self.children(id)[index - 1];
                if self.try_merge(previous, current) {
                    continue;
                }
            }
            index += 1;
        }

        for child in self.children(id).to_vec() {
            if !self.node(child).is_text() {
                self.normalize_subtree(child);
            }
        }
    }

    fn try_merge(&mut self, previous: NodeId, current: NodeId) -> bool {
        if let (Some(_), Some(right)) = (self.text(previous), self.text(current)) {
            let right = right.to_string();
            if let NodeKind::Text(left) = &mut self.nodes[previous.0].kind {
                left.push_str(&right);
            }
            self.detach(current);
            return true;
        }

        let (Some(left), Some(right)) = (self.element(previous), self.element(current)) else {
            return false;
        };
        let same_origin = right.continues.is_some()
            && (right.continues == Some(previous) || right.continues == left.continues);
        let compatible = left.tag == right.tag
            && left.marker.as_ref().map(|m| (m.id, m.pending))
                == right.marker.as_ref().map(|m| (m.id, m.pending));
        if !(same_origin && compatible) {
            return false;
        }

        let moved = std::mem::take(&mut self.nodes[current.0].children);
        for child in &moved {
            self.nodes[child.0].parent = Some(previous);
        }
        self.nodes[previous.0].children.extend(moved);
        self.detach(current);
        true
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn attach(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(index, child);
    }
}

/// Byte index of the `chars`-th character, clamped to the string length.
pub(crate) fn char_to_byte(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map_or(text.len(), |(byte, _)| byte)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// `<div><p>Hello <b>bold</b> world</p></div>`
    fn sample() -> (ContentTree, NodeId, NodeId) {
        let mut tree = ContentTree::new();
        let root = tree.root();
        let p = tree.append_element(root, Element::new("p"));
        tree.append_text(p, "Hello ");
        let b = tree.append_element(p, Element::new("b"));
        tree.append_text(b, "bold");
        tree.append_text(p, " world");
        (tree, p, b)
    }

    #[test]
    fn test_plain_text_projection_is_document_order() {
        let (tree, _, _) = sample();
        assert_eq!(tree.plain_text(tree.root()), "Hello bold world");
    }

    #[test]
    fn test_split_text_counts_characters_not_bytes() {
        let mut tree = ContentTree::new();
        let root = tree.root();
        let text = tree.append_text(root, "héllo");

        let right = tree.split_text(text, 2).unwrap();

        assert_eq!(tree.text(text), Some("hé"));
        assert_eq!(tree.text(right), Some("llo"));
        assert_eq!(tree.children(root), &[text, right]);
    }

    #[test]
    fn test_split_element_then_normalize_rejoins_fragments() {
        // Given a bold element split in the middle of its text
        let (mut tree, p, b) = sample();
        let bold_text = tree.children(b)[0];
        tree.split_text(bold_text, 2);
        let fragment = tree.split_element(b, 1).unwrap();
        assert_eq!(tree.children(p).len(), 4);
        assert_eq!(tree.element(fragment).unwrap().continues, Some(b));

        // When normalizing
        tree.normalize_subtree(tree.root());

        // Then the original shape is restored
        assert_eq!(tree.children(p).len(), 3);
        assert_eq!(tree.children(b).len(), 1);
        assert_eq!(tree.text(tree.children(b)[0]), Some("bold"));
    }

    #[test]
    fn test_unwrap_keeps_children_in_place() {
        let (mut tree, p, b) = sample();
        tree.unwrap(b);
        tree.normalize_subtree(p);

        assert_eq!(tree.children(p).len(), 1);
        assert_eq!(tree.plain_text(p), "Hello bold world");
    }

    #[test]
    fn test_unrelated_adjacent_elements_are_not_merged() {
        let mut tree = ContentTree::new();
        let root = tree.root();
        let first = tree.append_element(root, Element::new("b"));
        tree.append_text(first, "a");
        let second = tree.append_element(root, Element::new("b"));
        tree.append_text(second, "b");

        tree.normalize_subtree(root);

        assert_eq!(tree.children(root), &[first, second]);
    }

    #[test]
    fn test_common_ancestor_and_contains() {
        let (tree, p, b) = sample();
        let hello = tree.children(p)[0];
        let bold = tree.children(b)[0];

        assert_eq!(tree.common_ancestor(hello, bold), Some(p));
        assert_eq!(tree.common_ancestor(bold, bold), Some(b));
        assert!(tree.contains(p, bold));
        assert!(!tree.contains(b, hello));
    }
}
