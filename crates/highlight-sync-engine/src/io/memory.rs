use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{HighlightStore, StoreError};
use crate::highlighting::normalize::{RemovalPolicy, remove_range};
use crate::models::{HighlightRange, HighlightSet, NewHighlight};

/// In-process highlight store with the same contract as the remote service.
///
/// Adds are appended without merging, exactly as the service stores them;
/// clients normalise what they adopt. Can be told to fail upcoming calls to
/// exercise the optimistic paths.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    policy: RemovalPolicy,
}

#[derive(Debug, Default)]
struct Inner {
    sets: HashMap<String, HighlightSet>,
    failures_remaining: usize,
}

impl InMemoryStore {
    pub fn new(policy: RemovalPolicy) -> Self {
        Self {
            inner: Mutex::default(),
            policy,
        }
    }

    /// Make the next `count` calls fail with [`StoreError::Unavailable`].
    pub fn fail_next(&self, count: usize) {
        self.lock().failures_remaining = count;
    }

    /// Seed a message's stored ranges directly.
    pub fn insert(&self, content_id: &str, ranges: Vec<HighlightRange>) {
        let mut set = HighlightSet::empty(content_id);
        set.ranges = ranges;
        self.lock().sets.insert(content_id.to_string(), set);
    }

    /// Stored ranges of a message, as-is.
    pub fn ranges(&self, content_id: &str) -> Vec<HighlightRange> {
        self.lock()
            .sets
            .get(content_id)
            .map(|set| set.ranges.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Recover from poisoned mutex (another thread panicked while holding lock)
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_available(inner: &mut Inner) -> Result<(), StoreError> {
        if inner.failures_remaining > 0 {
            inner.failures_remaining -= 1;
            return Err(StoreError::Unavailable("simulated network error".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl HighlightStore for InMemoryStore {
    async fn add_highlight(
        &self,
        content_id: &str,
        session_id: Option<&str>,
        highlight: &NewHighlight,
    ) -> Result<HighlightSet, StoreError> {
        let mut inner = self.lock();
        Self::check_available(&mut inner)?;
        if highlight.end <= highlight.start {
            return Err(StoreError::InvalidRange {
                start: highlight.start,
                end: highlight.end,
            });
        }

        let set = inner
            .sets
            .entry(content_id.to_string())
            .or_insert_with(|| HighlightSet::empty(content_id));
        if let Some(session_id) = session_id {
            set.session_id = Some(session_id.to_string());
        }
        set.ranges.push(HighlightRange::from(highlight));
        Ok(set.clone())
    }

    async fn remove_highlight_range(
        &self,
        content_id: &str,
        start: usize,
        end: usize,
        _text: Option<&str>,
    ) -> Result<HighlightSet, StoreError> {
        let mut inner = self.lock();
        Self::check_available(&mut inner)?;

        let set = inner
            .sets
            .entry(content_id.to_string())
            .or_insert_with(|| HighlightSet::empty(content_id));
        set.ranges = remove_range(&set.ranges, start, end, self.policy);
        Ok(set.clone())
    }

    async fn get_highlights(&self, content_id: &str) -> Result<Option<HighlightSet>, StoreError> {
        let mut inner = self.lock();
        Self::check_available(&mut inner)?;
        Ok(inner.sets.get(content_id).cloned())
    }

    async fn clear_highlights(&self, content_id: &str) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        Self::check_available(&mut inner)?;
        Ok(inner.sets.remove(content_id).is_some())
    }

    async fn highlights_exist(&self, content_id: &str) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        if Self::check_available(&mut inner).is_err() {
            return Ok(false);
        }
        Ok(inner.sets.contains_key(content_id))
    }
}
