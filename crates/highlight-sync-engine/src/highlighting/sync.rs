//! Optimistic Sync Coordinator for one rendered message.

use std::sync::Arc;
use std::time::Duration;

use crate::content::html::inner_html;
use crate::content::{ContentTree, MarkerId, NodeId};
use crate::highlighting::normalize::{RemovalPolicy, normalize, remove_range};
use crate::highlighting::notice::{DEFAULT_NOTICE_TTL, Notice, NoticeKind};
use crate::highlighting::offsets::{MapError, find_whitespace_insensitive, map_selection_to_offsets};
use crate::highlighting::repaint::Repainter;
use crate::io::{HighlightStore, SelectionSource, StoreError};
use crate::models::{HighlightRange, HighlightSet, NewHighlight, Palette, SelectionEvent, TextOffsets};

/// Why a highlight action was abandoned before reaching the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HighlightError {
    #[error("Nothing is selected")]
    EmptySelection,
    #[error("Selection extends outside the message")]
    OutsideContent,
    #[error("Could not find \"{text}\" in the message")]
    NotFound { text: String },
}

impl HighlightError {
    /// The transient message a host should show for this failure.
    pub fn notice(&self, ttl: Duration) -> Notice {
        Notice::new(NoticeKind::SelectionNotFound, self.to_string(), ttl)
    }
}

/// Per-message interaction state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionState {
    Idle,
    SelectionActive(SelectionEvent),
    Highlighting,
    Unhighlighting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissReason {
    Scroll,
    OutsideClick,
    Escape,
}

/// Result of settling a store round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The store answered; its ranges are now the local state.
    Applied { ranges: Vec<HighlightRange> },
    /// The store failed; the optimistic local state was kept.
    KeptLocal { notice: Notice },
    /// The message was unmounted before the answer arrived; nothing changed.
    Discarded,
}

/// An add that has been painted locally and awaits the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingHighlight {
    pub request: NewHighlight,
    marker: Option<MarkerId>,
}

/// A removal that has been applied locally and awaits the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUnhighlight {
    pub start: usize,
    pub end: usize,
    pub text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub session_id: Option<String>,
    pub palette: Palette,
    pub removal_policy: RemovalPolicy,
    pub notice_ttl: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            session_id: None,
            palette: Palette::default(),
            removal_policy: RemovalPolicy::default(),
            notice_ttl: DEFAULT_NOTICE_TTL,
        }
    }
}

/// Owns the highlight state of one mounted message.
///
/// Every store call is split into a synchronous `begin_*` step (optimistic
/// local update and paint) and a `finish_*` step that adopts the store's
/// answer. The `request_*` methods chain both around the single await. A host
/// that issues a second request before the first resolves gets both
/// optimistic paints, and whichever answer is finished last wins.
pub struct SyncCoordinator {
    content_id: String,
    session_id: Option<String>,
    tree: ContentTree,
    root: NodeId,
    ranges: Vec<HighlightRange>,
    state: SelectionState,
    mounted: bool,
    repainter: Repainter,
    removal_policy: RemovalPolicy,
    notice_ttl: Duration,
    store: Arc<dyn HighlightStore>,
}

impl SyncCoordinator {
    pub fn new(
        content_id: impl Into<String>,
        tree: ContentTree,
        store: Arc<dyn HighlightStore>,
        options: SyncOptions,
    ) -> Self {
        let root = tree.root();
        Self {
            content_id: content_id.into(),
            session_id: options.session_id,
            tree,
            root,
            ranges: Vec::new(),
            state: SelectionState::Idle,
            mounted: true,
            repainter: Repainter::new(options.palette),
            removal_policy: options.removal_policy,
            notice_ttl: options.notice_ttl,
            store,
        }
    }

    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    /// The canonical local range set.
    pub fn ranges(&self) -> &[HighlightRange] {
        &self.ranges
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn tree(&self) -> &ContentTree {
        &self.tree
    }

    /// Direct access for host re-renders. Call [`repaint`](Self::repaint) afterwards.
    pub fn tree_mut(&mut self) -> &mut ContentTree {
        &mut self.tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Current markup of the content root, markers included.
    pub fn html(&self) -> String {
        inner_html(&self.tree, self.root)
    }

    pub fn notice_ttl(&self) -> Duration {
        self.notice_ttl
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Mark the hosting component as torn down. Answers arriving afterwards
    /// are dropped without touching state or content.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.state = SelectionState::Idle;
    }

    /// Redraw every settled marker from the local range set.
    pub fn repaint(&mut self) {
        let report = self.repainter.repaint(&mut self.tree, self.root, &self.ranges);
        log::debug!(
            "repainted {}: {} painted, {} skipped",
            self.content_id,
            report.painted,
            report.skipped
        );
    }

    // Selection state machine

    /// Handle a pointer release. Enters `SelectionActive` for a non-empty
    /// selection lying entirely inside the content root.
    pub fn on_pointer_up(&mut self, source: &dyn SelectionSource) -> bool {
        match source.current_selection() {
            Some(selection) if self.qualifies(&selection) => {
                log::debug!("selection active in {}", self.content_id);
                self.state = SelectionState::SelectionActive(selection);
                true
            }
            _ => {
                if matches!(self.state, SelectionState::SelectionActive(_)) {
                    self.state = SelectionState::Idle;
                }
                false
            }
        }
    }

    /// Scroll, outside click or `Escape` drop an active selection.
    pub fn dismiss(&mut self, reason: DismissReason) {
        if matches!(self.state, SelectionState::SelectionActive(_)) {
            log::debug!("selection dismissed in {} ({reason:?})", self.content_id);
            self.state = SelectionState::Idle;
        }
    }

    pub fn active_selection(&self) -> Option<&SelectionEvent> {
        match &self.state {
            SelectionState::SelectionActive(selection) => Some(selection),
            _ => None,
        }
    }

    fn qualifies(&self, selection: &SelectionEvent) -> bool {
        !selection.is_empty()
            && self.tree.contains(self.root, selection.start.node)
            && self.tree.contains(self.root, selection.end.node)
    }

    // Highlight

    /// Resolve, paint and record a highlight locally.
    pub fn begin_highlight(
        &mut self,
        selection: &SelectionEvent,
        color: Option<&str>,
    ) -> Result<PendingHighlight, HighlightError> {
        if selection.is_empty() {
            return Err(HighlightError::EmptySelection);
        }
        if !self.tree.contains(self.root, selection.start.node)
            || !self.tree.contains(self.root, selection.end.node)
        {
            return Err(HighlightError::OutsideContent);
        }

        let offsets = self.resolve(selection)?;
        let marker =
            self.repainter
                .paint_pending(&mut self.tree, self.root, offsets.start, offsets.end, color);
        if marker.is_none() {
            log::debug!(
                "could not paint optimistic marker at {}..{}",
                offsets.start,
                offsets.end
            );
        }

        let request = NewHighlight {
            start: offsets.start,
            end: offsets.end,
            text: Some(selection.text.clone()),
            color: color.map(str::to_string),
        };
        self.ranges.push(HighlightRange::from(&request));
        self.ranges = normalize(&self.ranges);
        self.state = SelectionState::Highlighting;

        Ok(PendingHighlight { request, marker })
    }

    /// Adopt the store's answer to an add.
    pub fn finish_highlight(
        &mut self,
        pending: PendingHighlight,
        result: Result<HighlightSet, StoreError>,
    ) -> SyncOutcome {
        if !self.mounted {
            log::debug!("dropping highlight answer for unmounted {}", self.content_id);
            return SyncOutcome::Discarded;
        }
        self.state = SelectionState::Idle;
        if let Some(marker) = pending.marker {
            self.repainter.settle(&mut self.tree, self.root, marker);
        }
        self.settle(result, "highlight")
    }

    /// Highlight a selection and wait for the store.
    ///
    /// Returns `Err` only when the selection cannot be resolved; store
    /// failures come back as [`SyncOutcome::KeptLocal`].
    pub async fn request_highlight(
        &mut self,
        selection: &SelectionEvent,
        color: Option<&str>,
    ) -> Result<SyncOutcome, HighlightError> {
        let pending = self.begin_highlight(selection, color)?;
        let store = Arc::clone(&self.store);
        let result = store
            .add_highlight(&self.content_id, self.session_id.as_deref(), &pending.request)
            .await;
        Ok(self.finish_highlight(pending, result))
    }

    /// Highlight whatever selection is currently active.
    pub async fn highlight_active_selection(
        &mut self,
        color: Option<&str>,
    ) -> Result<SyncOutcome, HighlightError> {
        let selection = self
            .active_selection()
            .cloned()
            .ok_or(HighlightError::EmptySelection)?;
        self.request_highlight(&selection, color).await
    }

    // Unhighlight

    /// Drop stored ranges intersecting `[start, end)` locally and repaint.
    pub fn begin_unhighlight(&mut self, offsets: TextOffsets, text: Option<&str>) -> PendingUnhighlight {
        self.ranges = remove_range(&self.ranges, offsets.start, offsets.end, self.removal_policy);
        self.repaint();
        self.state = SelectionState::Unhighlighting;
        PendingUnhighlight {
            start: offsets.start,
            end: offsets.end,
            text: text.map(str::to_string),
        }
    }

    /// Adopt the store's answer to a removal.
    pub fn finish_unhighlight(
        &mut self,
        _pending: PendingUnhighlight,
        result: Result<HighlightSet, StoreError>,
    ) -> SyncOutcome {
        if !self.mounted {
            log::debug!("dropping removal answer for unmounted {}", self.content_id);
            return SyncOutcome::Discarded;
        }
        self.state = SelectionState::Idle;
        self.settle(result, "unhighlight")
    }

    pub async fn request_unhighlight(&mut self, offsets: TextOffsets, text: Option<&str>) -> SyncOutcome {
        let pending = self.begin_unhighlight(offsets, text);
        let store = Arc::clone(&self.store);
        let result = store
            .remove_highlight_range(
                &self.content_id,
                pending.start,
                pending.end,
                pending.text.as_deref(),
            )
            .await;
        self.finish_unhighlight(pending, result)
    }

    /// Resolve a selection to offsets, then unhighlight them.
    pub async fn unhighlight_selection(
        &mut self,
        selection: &SelectionEvent,
    ) -> Result<SyncOutcome, HighlightError> {
        let offsets = self.resolve(selection)?;
        Ok(self.request_unhighlight(offsets, Some(&selection.text)).await)
    }

    // Whole-message operations

    /// Adopt whatever the store holds for this message and paint it.
    pub async fn load(&mut self) -> SyncOutcome {
        let store = Arc::clone(&self.store);
        let result = store
            .get_highlights(&self.content_id)
            .await
            .map(|found| found.unwrap_or_else(|| HighlightSet::empty(self.content_id.as_str())));
        if !self.mounted {
            return SyncOutcome::Discarded;
        }
        self.settle(result, "load")
    }

    /// Remove every highlight of the message, locally first.
    pub async fn clear_all(&mut self) -> SyncOutcome {
        self.ranges.clear();
        self.repainter.clear_markers(&mut self.tree, self.root, true);

        let store = Arc::clone(&self.store);
        let result = store.clear_highlights(&self.content_id).await;
        if !self.mounted {
            return SyncOutcome::Discarded;
        }
        match result {
            Ok(_) => SyncOutcome::Applied { ranges: Vec::new() },
            Err(e) => self.persistence_failed("clear", &e),
        }
    }

    /// Whether the store has anything for this message. Errors read as `false`.
    pub async fn has_remote_highlights(&self) -> bool {
        match self.store.highlights_exist(&self.content_id).await {
            Ok(exists) => exists,
            Err(e) => {
                log::warn!("highlight probe for {} failed: {e}", self.content_id);
                false
            }
        }
    }

    fn resolve(&self, selection: &SelectionEvent) -> Result<TextOffsets, HighlightError> {
        let offsets = match map_selection_to_offsets(&self.tree, selection, self.root) {
            Ok(offsets) => offsets,
            Err(MapError::EmptySelection) => return Err(HighlightError::EmptySelection),
            Err(MapError::NotFound) => {
                find_whitespace_insensitive(&self.tree.plain_text(self.root), &selection.text)
                    .ok_or_else(|| HighlightError::NotFound {
                        text: selection.text.clone(),
                    })?
            }
        };
        if offsets.is_empty() {
            return Err(HighlightError::EmptySelection);
        }
        Ok(offsets)
    }

    fn settle(&mut self, result: Result<HighlightSet, StoreError>, action: &str) -> SyncOutcome {
        match result {
            Ok(set) => {
                self.ranges = normalize(&set.ranges);
                self.repaint();
                log::info!(
                    "{action} on {}: adopted {} range(s) from store",
                    self.content_id,
                    self.ranges.len()
                );
                SyncOutcome::Applied {
                    ranges: self.ranges.clone(),
                }
            }
            Err(e) => self.persistence_failed(action, &e),
        }
    }

    fn persistence_failed(&self, action: &str, error: &StoreError) -> SyncOutcome {
        log::warn!("{action} on {} not saved: {error}", self.content_id);
        SyncOutcome::KeptLocal {
            notice: Notice::new(
                NoticeKind::PersistenceFailed,
                format!("Couldn't save your change: {error}"),
                self.notice_ttl,
            ),
        }
    }
}
