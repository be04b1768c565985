//! Abstract rendered-content tree.
//!
//! A message renders to markup; highlighting works against the ordered tree
//! of text and element nodes behind that markup. The same walking and
//! wrapping code drives a browser adapter or a test fixture.

pub mod html;
pub mod markdown;
pub mod tree;
pub mod wrap;

pub use tree::{ContentTree, Element, Marker, MarkerId, Node, NodeId, NodeKind};
pub use wrap::TextPoint;
