/*!
 * # Highlighting Core
 *
 * Turns user selections inside rendered message content into persisted,
 * repainted highlight ranges.
 *
 * ## Data flow
 *
 * 1. The host reports a selection; [`offsets`] maps its anchors to
 *    `[start, end)` character offsets of the content's plain text.
 * 2. [`sync::SyncCoordinator`] paints an optimistic marker and folds the new
 *    range into its local set with [`normalize::normalize`].
 * 3. The [`HighlightStore`](crate::io::HighlightStore) is called. On success
 *    its range list replaces the local one and [`repaint::Repainter`]
 *    redraws every marker; on failure the local state stays and a
 *    [`notice::Notice`] is returned.
 *
 * All offsets address the plain-text projection, never markup, so painting
 * markers never shifts the positions of other ranges.
 */

pub mod normalize;
pub mod notice;
pub mod offsets;
pub mod repaint;
pub mod sync;

pub use normalize::{RemovalPolicy, normalize, remove_range};
pub use notice::{Notice, NoticeKind};
pub use offsets::{
    Bias, MapError, find_literal, find_whitespace_insensitive, locate_position,
    map_selection_to_offsets,
};
pub use repaint::{RepaintReport, Repainter};
pub use sync::{
    DismissReason, HighlightError, PendingHighlight, PendingUnhighlight, SelectionState,
    SyncCoordinator, SyncOptions, SyncOutcome,
};
