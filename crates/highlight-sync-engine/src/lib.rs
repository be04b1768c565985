pub mod content;
pub mod highlighting;
pub mod io;
pub mod models;

// Re-export key types for easier usage
pub use content::{ContentTree, Element, NodeId};
pub use highlighting::*;
pub use io::{HighlightStore, InMemoryStore, SelectionSource, StoreError};
pub use models::*;
