//! Segment selection and overlap-table validation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{CongestionError, OverlapSegment, Result, StartTimes};

/// A requested km range of one event, e.g. `"10K:5.81-8.10"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSelection {
    pub event: String,
    #[serde(rename = "start")]
    pub start_km: f64,
    #[serde(rename = "end")]
    pub end_km: f64,
}

impl SegmentSelection {
    pub fn new(event: impl Into<String>, start_km: f64, end_km: f64) -> Self {
        Self {
            event: event.into(),
            start_km,
            end_km,
        }
    }

    /// Whether the selection shares at least one point with `[start, end]`.
    pub fn intersects(&self, start_km: f64, end_km: f64) -> bool {
        let (lo1, hi1) = ordered(self.start_km, self.end_km);
        let (lo2, hi2) = ordered(start_km, end_km);
        !(hi1 < lo2 || hi2 < lo1)
    }
}

impl fmt::Display for SegmentSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:.2}-{:.2}", self.event, self.start_km, self.end_km)
    }
}

impl FromStr for SegmentSelection {
    type Err = CongestionError;

    /// Parse `Event:start-end`. An en-dash is accepted in place of `-`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| CongestionError::InvalidSegmentSpec {
            spec: s.to_string(),
            reason: reason.to_string(),
        };
        let normalized = s.replace('\u{2013}', "-");
        let (event, range) = normalized
            .trim()
            .split_once(':')
            .ok_or_else(|| invalid("expected 'Event:start-end'"))?;
        let (start, end) = range
            .split_once('-')
            .ok_or_else(|| invalid("expected 'Event:start-end'"))?;
        let event = event.trim();
        if event.is_empty() {
            return Err(invalid("event name is empty"));
        }
        let start_km: f64 = start
            .trim()
            .parse()
            .map_err(|_| invalid("start is not a number"))?;
        let end_km: f64 = end
            .trim()
            .parse()
            .map_err(|_| invalid("end is not a number"))?;
        Ok(Self::new(event, start_km, end_km))
    }
}

/// Keep declared rows that intersect any selection.
///
/// Rows are returned in selection order, then table order, without
/// duplicates. An empty selection keeps every row. If any selection matches
/// nothing, the error lists the requested ranges and, per missed event, the
/// valid ranges to pick from.
pub fn filter_overlap_segments(
    segments: &[OverlapSegment],
    selections: &[SegmentSelection],
) -> Result<Vec<OverlapSegment>> {
    if selections.is_empty() {
        return Ok(segments.to_vec());
    }

    let mut errors = Vec::new();
    let mut kept: Vec<&OverlapSegment> = Vec::new();
    for sel in selections {
        let event_rows: Vec<&OverlapSegment> = segments
            .iter()
            .filter(|seg| seg.event.trim() == sel.event)
            .collect();
        if event_rows.is_empty() {
            errors.push(format!("- No such event in overlaps: {}", sel.event));
            continue;
        }
        let matches: Vec<&OverlapSegment> = event_rows
            .iter()
            .copied()
            .filter(|seg| sel.intersects(seg.start_km, seg.end_km))
            .collect();
        if matches.is_empty() {
            let mut sorted = event_rows;
            sorted.sort_by(|a, b| a.start_km.total_cmp(&b.start_km));
            let mut lines = vec![format!(
                "- No overlapping range for {} ({:.2}-{:.2}). Valid segments for this event:",
                sel.event, sel.start_km, sel.end_km
            )];
            lines.extend(sorted.iter().map(|seg| {
                format!(
                    "   - {}:{:.2}-{:.2} ({})",
                    sel.event, seg.start_km, seg.end_km, seg.description
                )
            }));
            errors.push(lines.join("\n"));
            continue;
        }
        for seg in matches {
            if !kept.iter().any(|k| same_row(k, seg)) {
                kept.push(seg);
            }
        }
    }

    if !errors.is_empty() {
        let mut messages = vec!["Requested segments:".to_string()];
        messages.extend(selections.iter().map(|sel| format!("- {sel}")));
        messages.push(String::new());
        messages.extend(errors);
        return Err(CongestionError::SegmentSelection { messages });
    }
    Ok(kept.into_iter().cloned().collect())
}

/// A problem found in a declared overlap table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    /// `event` does not start strictly earlier than `overlaps_with`
    WrongDirection {
        event: String,
        overlaps_with: String,
        start_km: f64,
        end_km: f64,
    },
    /// The same (event, start, end, overlapswith) row appears more than once
    Duplicate {
        event: String,
        overlaps_with: String,
        start_km: f64,
        end_km: f64,
        occurrences: usize,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::WrongDirection {
                event,
                overlaps_with,
                start_km,
                end_km,
            } => write!(
                f,
                "{event} -> {overlaps_with} {start_km:.2}-{end_km:.2}km: '{event}' does not start before '{overlaps_with}'"
            ),
            ValidationIssue::Duplicate {
                event,
                overlaps_with,
                start_km,
                end_km,
                occurrences,
            } => write!(
                f,
                "{event} -> {overlaps_with} {start_km:.2}-{end_km:.2}km: duplicated {occurrences} times"
            ),
        }
    }
}

/// Check that every row is directed earlier -> later and that no row is
/// repeated. Rows naming an event without a start time cannot be ordered
/// and are reported as wrong direction.
pub fn validate_overlap_segments(
    segments: &[OverlapSegment],
    start_times: &StartTimes,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for seg in segments {
        let prev = start_times.get(seg.event.trim());
        let curr = start_times.get(seg.overlaps_with.trim());
        let directed = matches!((prev, curr), (Some(p), Some(c)) if p < c);
        if !directed {
            issues.push(ValidationIssue::WrongDirection {
                event: seg.event.clone(),
                overlaps_with: seg.overlaps_with.clone(),
                start_km: seg.start_km,
                end_km: seg.end_km,
            });
        }
    }

    let mut reported: Vec<&OverlapSegment> = Vec::new();
    for seg in segments {
        if reported.iter().any(|r| same_row(r, seg)) {
            continue;
        }
        let occurrences = segments.iter().filter(|other| same_row(seg, other)).count();
        if occurrences > 1 {
            reported.push(seg);
            issues.push(ValidationIssue::Duplicate {
                event: seg.event.clone(),
                overlaps_with: seg.overlaps_with.clone(),
                start_km: seg.start_km,
                end_km: seg.end_km,
                occurrences,
            });
        }
    }

    issues
}

fn same_row(a: &OverlapSegment, b: &OverlapSegment) -> bool {
    a.event.trim() == b.event.trim()
        && a.overlaps_with.trim() == b.overlaps_with.trim()
        && a.start_km == b.start_km
        && a.end_km == b.end_km
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b { (a, b) } else { (b, a) }
}
