//! Range Normalizer: canonical, sorted, non-overlapping highlight sets.

use serde::{Deserialize, Serialize};

use crate::models::HighlightRange;

/// How an unhighlight treats stored ranges that only partly overlap it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemovalPolicy {
    /// Delete every range intersecting the removed interval, whole.
    #[default]
    DropIntersecting,
    /// Remove only the intersection and keep the uncovered remainders.
    Split,
}

/// Produce the canonical form of a range list.
///
/// Empty and inverted ranges are dropped, the rest sorted by `(start, end)`
/// and folded: a range starting at or before the previous range's end is
/// merged into it, taking the newer colour and filling in missing text.
/// The input is never mutated.
pub fn normalize(ranges: &[HighlightRange]) -> Vec<HighlightRange> {
    let mut sorted: Vec<&HighlightRange> = ranges.iter().filter(|r| !r.is_empty()).collect();
    // Stable sort keeps supply order among equal keys, so "newest" stays last.
    sorted.sort_by_key(|r| (r.start, r.end));

    let mut out: Vec<HighlightRange> = Vec::with_capacity(sorted.len());
    for candidate in sorted {
        match out.last_mut() {
            Some(last) if candidate.start <= last.end => {
                last.end = last.end.max(candidate.end);
                if candidate.color.is_some() {
                    last.color.clone_from(&candidate.color);
                }
                if last.text.is_none() {
                    last.text.clone_from(&candidate.text);
                }
            }
            _ => out.push(candidate.clone()),
        }
    }
    out
}

/// Remove `[start, end)` from a range list and re-normalise the remainder.
pub fn remove_range(
    ranges: &[HighlightRange],
    start: usize,
    end: usize,
    policy: RemovalPolicy,
) -> Vec<HighlightRange> {
    let mut kept = Vec::with_capacity(ranges.len());
    for range in ranges {
        if !range.overlaps(start, end) {
            kept.push(range.clone());
            continue;
        }
        if policy == RemovalPolicy::Split {
            if range.start < start {
                kept.push(HighlightRange {
                    end: start,
                    ..range.clone()
                });
            }
            if range.end > end {
                kept.push(HighlightRange {
                    start: end,
                    ..range.clone()
                });
            }
        }
    }
    normalize(&kept)
}
