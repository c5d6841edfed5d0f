//! # Run Congestion
//!
//! Runner interference and course density analysis for multi-event races.
//!
//! Every runner is modelled with a constant pace, so the time a runner
//! reaches any kilometre is `start_time[event] + pace * km`. From that
//! closed form the library estimates where two event populations share a
//! course segment at the same time, without simulating trajectories.
//!
//! This library provides:
//! - Pairwise overlap detection on shared segments (coarse-to-fine scan)
//! - Ranked per-segment summaries (acute bottlenecks or cumulative exposure)
//! - Per-step course density, zone breakdown and a 0-10 congestion index
//! - CSV loading with schema validation
//! - A request layer with an injectable LRU + TTL result cache
//!
//! ## Features
//!
//! - **`parallel`** - Fan out per-segment detection with rayon
//! - **`cli`** - Build the `run-congestion-cli` driver
//! - **`synthetic`** - Seeded synthetic race fields for stress tests
//!
//! ## Quick Start
//!
//! ```rust
//! use run_congestion::{DetectionConfig, PaceTable, Runner, detect_segment_overlap};
//!
//! let pace = PaceTable::new(vec![
//!     Runner::new("Full", "1", 5.0, 42.2),
//!     Runner::new("10K", "2", 6.0, 10.0),
//! ]);
//!
//! let config = DetectionConfig { step_km: 0.1, ..Default::default() };
//! let result = detect_segment_overlap(&pace, "Full", "10K", 0.0, 4.9, 0.0, 1.0, &config);
//!
//! if let Some(result) = result {
//!     println!("{} overlap events", result.cumulative_overlap_events);
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// Unified error handling
pub mod error;
pub use error::{CongestionError, OptionExt, Result};

// Constant-pace model and clock helpers
pub mod pace;
pub use pace::{format_clock, parse_start_times};

// Pairwise segment overlap detection
pub mod overlap;
pub use overlap::{
    DetectionConfig, DetectionResult, FirstOverlap, detect_segment_overlap,
    detect_segment_overlap_full_scan,
};

// Ranked summaries and report rendering
pub mod summary;
pub use summary::{RankBy, SummaryRecord, build_summary_record, rank_records, render_summary};

// Multi-segment overlap analysis
pub mod analysis;
pub use analysis::{
    AnalysisConfig, AnalysisReport, ExecutionMode, SkippedSegment, analyze_overlaps,
    analyze_overlaps_with_progress,
};

// Segment selection and overlap-table validation
pub mod segments;
pub use segments::{
    SegmentSelection, ValidationIssue, filter_overlap_segments, validate_overlap_segments,
};

// Course density rollup
pub mod density;
pub use density::{
    DensityBlock, DensityConfig, DensityReport, DensitySegment, DensityStep, Direction,
    SegmentRollup, Zone, ZoneKm, analyze_density, analyze_density_with_progress,
    compute_density_steps, congestion_index, render_density_block, rollup_segment,
};

// CSV readers and writers
pub mod io;

// Request layer with result caching
pub mod engine;
pub use engine::{
    CongestionEngine, DensityRequest, DensityResponse, EngineConfig, OverlapRequest,
    OverlapResponse, ResultCache,
};

// Progress reporting for long analyses
pub mod progress;
pub use progress::{AnalysisPhase, AnalysisProgressCallback, AtomicProgressTracker, NoopProgress};

// Synthetic race fields (feature-gated)
#[cfg(feature = "synthetic")]
pub mod synthetic;

// ============================================================================
// Core Types
// ============================================================================

/// One runner from the pace table.
///
/// `runner_id` is unique within its event, not across events.
///
/// # Example
/// ```
/// use run_congestion::Runner;
/// let runner = Runner::new("10K", "1042", 5.5, 10.0);
/// assert_eq!(runner.arrival_time(440.0, 2.0), 451.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Runner {
    pub event: String,
    pub runner_id: String,
    /// Minutes per kilometre, constant over the course
    pub pace: f64,
    /// Race distance in km (informational)
    pub distance: f64,
}

impl Runner {
    pub fn new(
        event: impl Into<String>,
        runner_id: impl Into<String>,
        pace: f64,
        distance: f64,
    ) -> Self {
        Self {
            event: event.into(),
            runner_id: runner_id.into(),
            pace,
            distance,
        }
    }

    /// Minutes since midnight at which this runner reaches `km`.
    pub fn arrival_time(&self, start_min: f64, km: f64) -> f64 {
        pace::arrival_time(start_min, self.pace, km)
    }

    /// Arrival-time interval `[t(km_from), t(km_to)]` over a segment.
    pub fn arrival_interval(&self, start_min: f64, km_from: f64, km_to: f64) -> (f64, f64) {
        pace::arrival_interval(start_min, self.pace, km_from, km_to)
    }
}

/// All runners of one analysis request.
///
/// Immutable once loaded; detection borrows per-event slices from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaceTable {
    runners: Vec<Runner>,
}

impl PaceTable {
    pub fn new(runners: Vec<Runner>) -> Self {
        Self { runners }
    }

    pub fn runners(&self) -> &[Runner] {
        &self.runners
    }

    /// Runners of a single event, in table order.
    pub fn event_runners<'a>(&'a self, event: &'a str) -> impl Iterator<Item = &'a Runner> + 'a {
        self.runners.iter().filter(move |r| r.event == event)
    }

    /// Number of runners registered for `event`.
    pub fn event_count(&self, event: &str) -> usize {
        self.event_runners(event).count()
    }

    /// Distinct event names, sorted.
    pub fn events(&self) -> Vec<&str> {
        let mut events: Vec<&str> = self.runners.iter().map(|r| r.event.as_str()).collect();
        events.sort_unstable();
        events.dedup();
        events
    }

    pub fn len(&self) -> usize {
        self.runners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }
}

impl FromIterator<Runner> for PaceTable {
    fn from_iter<I: IntoIterator<Item = Runner>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Event start times in minutes since midnight.
///
/// Backed by an ordered map so serialization (and therefore cache keys)
/// is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StartTimes(BTreeMap<String, f64>);

impl StartTimes {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, event: impl Into<String>, minutes: f64) {
        self.0.insert(event.into(), minutes);
    }

    pub fn get(&self, event: &str) -> Option<f64> {
        self.0.get(event).copied()
    }

    pub fn contains(&self, event: &str) -> bool {
        self.0.contains_key(event)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for StartTimes {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// A declared course range shared by two events.
///
/// By convention `event` starts earlier than `overlaps_with`. Several rows
/// may exist for the same pair when the shared stretches are not contiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapSegment {
    pub event: String,
    #[serde(rename = "overlapswith")]
    pub overlaps_with: String,
    #[serde(rename = "start")]
    pub start_km: f64,
    #[serde(rename = "end")]
    pub end_km: f64,
    #[serde(default)]
    pub description: String,
}

impl OverlapSegment {
    pub fn new(
        event: impl Into<String>,
        overlaps_with: impl Into<String>,
        start_km: f64,
        end_km: f64,
    ) -> Self {
        Self {
            event: event.into(),
            overlaps_with: overlaps_with.into(),
            start_km,
            end_km,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn length_km(&self) -> f64 {
        (self.end_km - self.start_km).abs()
    }

    /// Human-readable range, e.g. `"5.81km-8.10km"`.
    pub fn label(&self) -> String {
        format!("{:.2}km-{:.2}km", self.start_km, self.end_km)
    }
}
