//! # Segment Overlap Detection
//!
//! Finds where two event populations occupy the same shared course segment
//! within a time tolerance, using only the constant-pace model.
//!
//! ## Algorithm
//! 1. Pre-filter runners whose arrival interval over the segment never comes
//!    within the window of the other event's runners
//! 2. Coarse scan at `step_km * coarse_factor`, flagging kilometres where
//!    some pair may be within tolerance nearby
//! 3. Expand each flagged km by one coarse step and merge the intervals
//! 4. Fine scan at `step_km` over the merged intervals, accumulating hits,
//!    distinct pairs, peak congestion and the first overlap
//!
//! The coarse pass trades a cheap wide search for an expensive narrow one.
//! Its tolerance is widened by each pair's drift over a coarse step, and
//! every stage allows a few microseconds of slack on the window so pairs
//! sitting exactly on the boundary are judged alike. The result is identical
//! to [`detect_segment_overlap_full_scan`].

mod coarse;
mod field;
mod fine;

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::pace::grid_len;
use crate::{CongestionError, PaceTable, Result};
use coarse::{coarse_candidates, fine_indices, merge_ranges, prefilter};
use field::EventField;
use fine::{ScanTotals, scan_steps};

/// Tuning parameters of the overlap detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionConfig {
    /// Two runners within this many seconds of each other at the same km
    /// count as overlapping. Default: 60
    #[serde(alias = "timeWindow")]
    pub time_window_secs: f64,
    /// Fine sampling resolution in km. Default: 0.01
    pub step_km: f64,
    /// Coarse step as a multiple of `step_km`. Default: 5
    pub coarse_factor: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            time_window_secs: 60.0,
            step_km: 0.01,
            coarse_factor: 5,
        }
    }
}

impl DetectionConfig {
    /// Reject parameters the scans cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !self.step_km.is_finite() || self.step_km <= 0.0 {
            return Err(CongestionError::InvalidParameter(format!(
                "step_km must be positive, got {}",
                self.step_km
            )));
        }
        if !self.time_window_secs.is_finite() || self.time_window_secs < 0.0 {
            return Err(CongestionError::InvalidParameter(format!(
                "time_window_secs must be non-negative, got {}",
                self.time_window_secs
            )));
        }
        if self.coarse_factor == 0 {
            return Err(CongestionError::InvalidParameter(
                "coarse_factor must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn coarse_step_km(&self) -> f64 {
        self.step_km * f64::from(self.coarse_factor.max(1))
    }
}

/// Earliest moment two runners were within tolerance on the segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstOverlap {
    /// `min(time_prev, time_curr)` in minutes since midnight
    pub event_time_min: f64,
    pub km: f64,
    pub prev_runner_id: String,
    pub curr_runner_id: String,
}

/// Overlap statistics for one segment and one ordered event pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub segment_start: f64,
    pub segment_end: f64,
    /// Runners registered for the earlier event
    pub total_prev: usize,
    /// Runners registered for the later event
    pub total_curr: usize,
    pub first_overlap: Option<FirstOverlap>,
    /// Runner-pair hits summed over every sampled km
    pub cumulative_overlap_events: u64,
    /// Most distinct runners (both events) within tolerance at a single km
    pub peak_congestion: usize,
    pub peak_prev_at_peak: BTreeSet<String>,
    pub peak_curr_at_peak: BTreeSet<String>,
    /// Distinct (prev, curr) runner pairs ever within tolerance
    pub unique_overlapping_pairs: usize,
}

impl DetectionResult {
    /// A checked segment with no overlap anywhere.
    pub fn zero(segment_start: f64, segment_end: f64, total_prev: usize, total_curr: usize) -> Self {
        Self {
            segment_start,
            segment_end,
            total_prev,
            total_curr,
            first_overlap: None,
            cumulative_overlap_events: 0,
            peak_congestion: 0,
            peak_prev_at_peak: BTreeSet::new(),
            peak_curr_at_peak: BTreeSet::new(),
            unique_overlapping_pairs: 0,
        }
    }

    pub fn has_overlap(&self) -> bool {
        self.cumulative_overlap_events > 0
    }

    /// Peak congestion as a share of both populations (0 when both are empty).
    pub fn peak_ratio(&self) -> f64 {
        let total = self.total_prev + self.total_curr;
        if total == 0 {
            0.0
        } else {
            self.peak_congestion as f64 / total as f64
        }
    }

    fn from_totals(
        segment_start: f64,
        segment_end: f64,
        total_prev: usize,
        total_curr: usize,
        prev: &EventField<'_>,
        curr: &EventField<'_>,
        totals: ScanTotals,
    ) -> Self {
        let first_overlap = totals.first_hit.map(|hit| FirstOverlap {
            event_time_min: hit.time,
            km: hit.km,
            prev_runner_id: prev.ids[hit.prev_slot].to_string(),
            curr_runner_id: curr.ids[hit.curr_slot].to_string(),
        });
        Self {
            segment_start,
            segment_end,
            total_prev,
            total_curr,
            first_overlap,
            cumulative_overlap_events: totals.cumulative_hits,
            peak_congestion: totals.peak_congestion,
            peak_prev_at_peak: totals
                .peak_prev_slots
                .iter()
                .map(|&s| prev.ids[s].to_string())
                .collect(),
            peak_curr_at_peak: totals
                .peak_curr_slots
                .iter()
                .map(|&s| curr.ids[s].to_string())
                .collect(),
            unique_overlapping_pairs: totals.unique_pairs.len(),
        }
    }
}

/// Detect overlaps between two events on one shared segment.
///
/// Returns `None` when either event has no runners, or when no runner of one
/// event ever comes within the window of the other event on this segment
/// (nothing to check). Returns a zero result when runners are present but no
/// pair is ever within tolerance.
///
/// # Example
/// ```
/// use run_congestion::{DetectionConfig, PaceTable, Runner, detect_segment_overlap};
///
/// let pace = PaceTable::new(vec![
///     Runner::new("A", "a1", 5.0, 10.0),
///     Runner::new("B", "b1", 6.0, 10.0),
/// ]);
/// let config = DetectionConfig { step_km: 0.1, ..Default::default() };
///
/// // B starts 2 minutes later and is slower: never within 60 s
/// let result = detect_segment_overlap(&pace, "A", "B", 0.0, 2.0, 0.0, 1.0, &config).unwrap();
/// assert!(result.first_overlap.is_none());
/// assert_eq!(result.cumulative_overlap_events, 0);
/// ```
#[allow(clippy::too_many_arguments)]
pub fn detect_segment_overlap(
    pace: &PaceTable,
    event_prev: &str,
    event_curr: &str,
    start_prev_min: f64,
    start_curr_min: f64,
    seg_start_km: f64,
    seg_end_km: f64,
    config: &DetectionConfig,
) -> Option<DetectionResult> {
    let prev_all = EventField::from_table(pace, event_prev, start_prev_min);
    let curr_all = EventField::from_table(pace, event_curr, start_curr_min);
    if prev_all.is_empty() || curr_all.is_empty() {
        return None;
    }
    let (total_prev, total_curr) = (prev_all.len(), curr_all.len());

    let (seg_lo, seg_hi) = ordered(seg_start_km, seg_end_km);
    let window = config.time_window_secs;
    let step = config.step_km;
    let coarse_step = config.coarse_step_km();

    let (prev, curr) = prefilter(&prev_all, &curr_all, seg_lo, seg_hi, window);
    if prev.is_empty() || curr.is_empty() {
        debug!(
            "[Overlaps] {} vs {} {:.2}-{:.2}km: no runners within reach after pre-filter",
            event_prev, event_curr, seg_lo, seg_hi
        );
        return None;
    }

    let candidates = coarse_candidates(&prev, &curr, seg_lo, seg_hi, coarse_step, window);
    if candidates.is_empty() {
        debug!(
            "[Overlaps] {} vs {} {:.2}-{:.2}km: no coarse candidates ({} x {} runners)",
            event_prev,
            event_curr,
            seg_lo,
            seg_hi,
            prev.len(),
            curr.len()
        );
        return Some(DetectionResult::zero(
            seg_start_km,
            seg_end_km,
            total_prev,
            total_curr,
        ));
    }

    let ranges = merge_ranges(&candidates, coarse_step, seg_lo, seg_hi);
    let indices = fine_indices(&ranges, seg_lo, step, grid_len(seg_lo, seg_hi, step));
    let totals = scan_steps(&prev, &curr, seg_lo, step, indices, window);

    debug!(
        "[Overlaps] {} vs {} {:.2}-{:.2}km: {} coarse candidates, {} ranges, {} fine steps, {} hits",
        event_prev,
        event_curr,
        seg_lo,
        seg_hi,
        candidates.len(),
        ranges.len(),
        totals.steps_scanned,
        totals.cumulative_hits
    );

    Some(DetectionResult::from_totals(
        seg_start_km,
        seg_end_km,
        total_prev,
        total_curr,
        &prev,
        &curr,
        totals,
    ))
}

/// Reference detector: scan every fine step of the segment, no pre-filter
/// and no coarse pass.
///
/// Slower than [`detect_segment_overlap`] but trivially correct; useful for
/// verification and debugging. Returns `None` only when an event has no
/// runners.
#[allow(clippy::too_many_arguments)]
pub fn detect_segment_overlap_full_scan(
    pace: &PaceTable,
    event_prev: &str,
    event_curr: &str,
    start_prev_min: f64,
    start_curr_min: f64,
    seg_start_km: f64,
    seg_end_km: f64,
    config: &DetectionConfig,
) -> Option<DetectionResult> {
    let prev = EventField::from_table(pace, event_prev, start_prev_min);
    let curr = EventField::from_table(pace, event_curr, start_curr_min);
    if prev.is_empty() || curr.is_empty() {
        return None;
    }

    let (seg_lo, seg_hi) = ordered(seg_start_km, seg_end_km);
    let steps = grid_len(seg_lo, seg_hi, config.step_km);
    let totals = scan_steps(
        &prev,
        &curr,
        seg_lo,
        config.step_km,
        0..steps,
        config.time_window_secs,
    );

    Some(DetectionResult::from_totals(
        seg_start_km,
        seg_end_km,
        prev.len(),
        curr.len(),
        &prev,
        &curr,
        totals,
    ))
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b { (a, b) } else { (b, a) }
}
