use serde::{Deserialize, Serialize};

/// A highlighted span of a message's plain-text projection.
///
/// `start` is inclusive and `end` exclusive, both counted in characters
/// (Unicode scalar values) of the concatenated text leaves, never in markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightRange {
    pub start: usize,
    pub end: usize,
    /// The literal text the range was created from. Diagnostic only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Logical colour tag such as `"yellow"`; absent renders with the default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl HighlightRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            text: None,
            color: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Length in characters. Uses saturating subtraction for inverted ranges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// True for zero-length and inverted ranges, which never survive normalisation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if this range shares at least one character with `[start, end)`.
    /// An empty interval shares nothing.
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        start < end && self.start < end && start < self.end
    }
}

/// Resolved character offsets of a selection, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextOffsets {
    pub start: usize,
    pub end: usize,
}

impl TextOffsets {
    /// Builds offsets in ascending order regardless of selection direction.
    pub fn ordered(a: usize, b: usize) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Payload sent to the store when the user highlights a selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHighlight {
    pub start: usize,
    pub end: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl From<&NewHighlight> for HighlightRange {
    fn from(new: &NewHighlight) -> Self {
        Self {
            start: new.start,
            end: new.end,
            text: new.text.clone(),
            color: new.color.clone(),
        }
    }
}

/// The authoritative range list for one message, as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightSet {
    #[serde(rename = "messageId")]
    pub content_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub ranges: Vec<HighlightRange>,
}

impl HighlightSet {
    pub fn empty(content_id: impl Into<String>) -> Self {
        Self {
            content_id: content_id.into(),
            session_id: None,
            ranges: Vec::new(),
        }
    }
}
