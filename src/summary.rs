//! Summary records, ranking and report rendering.
//!
//! A [`SummaryRecord`] is the flat, externally visible form of one
//! [`DetectionResult`]: it can be serialized straight to a CSV row or JSON
//! object. Records are ranked with a stable sort so equal keys keep their
//! task order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::pace::format_clock;
use crate::{CongestionError, DetectionConfig, DetectionResult, OverlapSegment};

/// Metric used to rank summary records (descending).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankBy {
    /// Peak congestion ratio: acute bottlenecks first
    #[default]
    PeakRatio,
    /// Cumulative overlap events: longest exposure first
    Intensity,
}

impl RankBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankBy::PeakRatio => "peak_ratio",
            RankBy::Intensity => "intensity",
        }
    }

    /// Heading fragment used in the ranked report.
    pub fn heading(&self) -> &'static str {
        match self {
            RankBy::PeakRatio => "peak congestion ratio (acute bottlenecks)",
            RankBy::Intensity => "cumulative intensity",
        }
    }
}

impl fmt::Display for RankBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankBy {
    type Err = CongestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "peak_ratio" | "peak-ratio" | "ratio" => Ok(RankBy::PeakRatio),
            "intensity" => Ok(RankBy::Intensity),
            other => Err(CongestionError::InvalidParameter(format!(
                "unknown rank metric '{other}', expected peak_ratio or intensity"
            ))),
        }
    }
}

/// One ranked row of the overlap summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub prev_event: String,
    pub curr_event: String,
    /// Range label, e.g. `"0.00km-2.74km"`
    pub segment: String,
    pub description: String,
    pub segment_start: f64,
    pub segment_end: f64,
    /// Cumulative overlap events
    pub intensity: u64,
    pub intensity_per_km: f64,
    pub distinct_pairs: usize,
    pub peak_congestion: usize,
    pub peak_congestion_ratio: f64,
    pub total_prev: usize,
    pub total_curr: usize,
    pub start_prev: f64,
    pub start_curr: f64,
    pub time_window: f64,
    pub step: f64,
    /// `HH:MM:SS`, empty when there was no overlap
    pub first_overlap_time: String,
    pub first_overlap_km: Option<f64>,
    pub first_overlap_prev_runner: String,
    pub first_overlap_curr_runner: String,
}

/// Derive a summary record from one detection result.
///
/// `intensity_per_km` divides by the segment length floored at `1e-9` km, so
/// a zero-length segment never divides by zero.
pub fn build_summary_record(
    segment: &OverlapSegment,
    result: &DetectionResult,
    start_prev: f64,
    start_curr: f64,
    config: &DetectionConfig,
) -> SummaryRecord {
    let intensity = result.cumulative_overlap_events;
    let length_km = (segment.end_km - segment.start_km).max(1e-9);
    let first = result.first_overlap.as_ref();

    SummaryRecord {
        prev_event: segment.event.clone(),
        curr_event: segment.overlaps_with.clone(),
        segment: segment.label(),
        description: segment.description.trim().to_string(),
        segment_start: segment.start_km,
        segment_end: segment.end_km,
        intensity,
        intensity_per_km: intensity as f64 / length_km,
        distinct_pairs: result.unique_overlapping_pairs,
        peak_congestion: result.peak_congestion,
        peak_congestion_ratio: result.peak_ratio(),
        total_prev: result.total_prev,
        total_curr: result.total_curr,
        start_prev,
        start_curr,
        time_window: config.time_window_secs,
        step: config.step_km,
        first_overlap_time: first
            .map(|f| format_clock(f.event_time_min))
            .unwrap_or_default(),
        first_overlap_km: first.map(|f| (f.km * 100.0).round() / 100.0),
        first_overlap_prev_runner: first.map(|f| f.prev_runner_id.clone()).unwrap_or_default(),
        first_overlap_curr_runner: first.map(|f| f.curr_runner_id.clone()).unwrap_or_default(),
    }
}

/// Sort records by `rank_by`, descending. Stable: ties keep input order.
pub fn rank_records(records: &mut [SummaryRecord], rank_by: RankBy) {
    match rank_by {
        RankBy::PeakRatio => records.sort_by(|a, b| {
            b.peak_congestion_ratio
                .total_cmp(&a.peak_congestion_ratio)
        }),
        RankBy::Intensity => records.sort_by(|a, b| b.intensity.cmp(&a.intensity)),
    }
}

/// Render the numbered ranked block. Records must already be ranked.
///
/// Returns an empty string when there are no records.
pub fn render_summary(records: &[SummaryRecord], rank_by: RankBy) -> String {
    if records.is_empty() {
        return String::new();
    }
    let mut out = format!(
        "Interaction Intensity Summary - ranked by {}:\n",
        rank_by.heading()
    );
    for (idx, r) in records.iter().enumerate() {
        let desc = if r.description.is_empty() {
            String::new()
        } else {
            format!(" ({})", r.description)
        };
        out.push_str(&format!(
            "{:02}. {} vs {} {}{}: PeakRatio={:.2}%, Peak={}, Intensity/km={:.1}, Intensity={}, DistinctPairs={}\n",
            idx + 1,
            r.prev_event,
            r.curr_event,
            r.segment,
            desc,
            r.peak_congestion_ratio * 100.0,
            r.peak_congestion,
            r.intensity_per_km,
            thousands(r.intensity),
            thousands(r.distinct_pairs as u64),
        ));
    }
    out
}

/// Verbose narration of one checked segment.
///
/// `result` is `None` when an event had no runners in reach; that case is
/// narrated as zero runners and no overlap.
pub(crate) fn narrate_segment(segment: &OverlapSegment, result: Option<&DetectionResult>) -> String {
    let prev = &segment.event;
    let curr = &segment.overlaps_with;
    let desc = segment.description.trim();
    let mut out = format!(
        "Checking {prev} vs {curr} from {:.2}km to {:.2}km...\n",
        segment.start_km, segment.end_km
    );
    if !desc.is_empty() {
        out.push_str(&format!("Segment: {desc}\n"));
    }
    let desc_suffix = if desc.is_empty() {
        String::new()
    } else {
        format!(" ({desc})")
    };
    out.push_str(&format!(
        "Overlap segment: {:.2} km -> {:.2} km{desc_suffix}\n",
        segment.start_km, segment.end_km
    ));

    let Some(result) = result else {
        out.push_str(&format!("Total in '{curr}': 0 runners\n"));
        out.push_str(&format!("Total in '{prev}': 0 runners\n"));
        out.push_str("No overlap detected between events in this segment.\n\n");
        return out;
    };

    out.push_str(&format!("Total in '{curr}': {} runners\n", result.total_curr));
    out.push_str(&format!("Total in '{prev}': {} runners\n", result.total_prev));
    match &result.first_overlap {
        Some(first) => out.push_str(&format!(
            "First overlap at {} at {:.2}km -> {prev} Bib: {}, {curr} Bib: {}\n",
            format_clock(first.event_time_min),
            first.km,
            first.prev_runner_id,
            first.curr_runner_id
        )),
        None => out.push_str("No overlap detected between events in this segment.\n"),
    }
    out.push_str(&format!(
        "Interaction Intensity over segment: {} (cumulative overlap events)\n",
        thousands(result.cumulative_overlap_events)
    ));
    out.push_str(&format!(
        "Peak congestion: {} total runners at best step ({} from '{prev}', {} from '{curr}')\n",
        result.peak_congestion,
        result.peak_prev_at_peak.len(),
        result.peak_curr_at_peak.len()
    ));
    out.push_str(&format!(
        "Unique Pairs: {} (cross-bib relationships with at least one overlap)\n\n",
        thousands(result.unique_overlapping_pairs as u64)
    ));
    out
}

/// `1234567` -> `"1,234,567"`.
pub(crate) fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
