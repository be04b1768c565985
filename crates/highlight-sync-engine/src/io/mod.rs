//! Boundaries to the outside world: the highlight store and the selection source.

pub mod memory;
pub mod selection;

use async_trait::async_trait;

use crate::models::{HighlightSet, NewHighlight};

pub use memory::InMemoryStore;
pub use selection::{SelectionSource, StaticSelection, selection_for_offsets};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid highlight range {start}..{end}")]
    InvalidRange { start: usize, end: usize },
    #[error("Request to {url} failed: {detail}")]
    Transport { url: String, detail: String },
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },
    #[error("Could not decode response from {url}: {detail}")]
    Decode { url: String, detail: String },
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// The persistence collaborator. The store is authoritative: whatever range
/// list it returns after a mutation replaces the client's local guess.
#[async_trait]
pub trait HighlightStore: Send + Sync {
    /// Append a range and return the message's full range list.
    async fn add_highlight(
        &self,
        content_id: &str,
        session_id: Option<&str>,
        highlight: &NewHighlight,
    ) -> Result<HighlightSet, StoreError>;

    /// Remove stored ranges intersecting `[start, end)` and return what is left.
    async fn remove_highlight_range(
        &self,
        content_id: &str,
        start: usize,
        end: usize,
        text: Option<&str>,
    ) -> Result<HighlightSet, StoreError>;

    /// `Ok(None)` when nothing was ever stored for the message.
    async fn get_highlights(&self, content_id: &str) -> Result<Option<HighlightSet>, StoreError>;

    /// Delete every range of a message. `Ok(false)` when there was nothing to delete.
    async fn clear_highlights(&self, content_id: &str) -> Result<bool, StoreError>;

    /// Cheap existence probe that never reports not-found as an error.
    async fn highlights_exist(&self, content_id: &str) -> Result<bool, StoreError>;
}
