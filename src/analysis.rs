//! Multi-segment overlap analysis.
//!
//! Turns the declared overlap table into detection tasks, runs the detector
//! over every task (optionally on a rayon worker pool), and assembles the
//! ranked report. Tasks share no mutable state, so execution order does not
//! matter: records are rebuilt in task order before ranking.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::progress::{AnalysisPhase, AnalysisProgressCallback, NoopProgress};
use crate::summary::narrate_segment;
use crate::{
    CongestionError, DetectionConfig, DetectionResult, OverlapSegment, PaceTable, RankBy, Result,
    StartTimes, SummaryRecord, build_summary_record, detect_segment_overlap, rank_records,
    render_summary,
};

/// How independent segment tasks are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Rayon worker pool (falls back to sequential without the `parallel` feature)
    #[default]
    Parallel,
    Sequential,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Parallel => "parallel",
            ExecutionMode::Sequential => "sequential",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = CongestionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "parallel" => Ok(ExecutionMode::Parallel),
            "sequential" => Ok(ExecutionMode::Sequential),
            other => Err(CongestionError::InvalidParameter(format!(
                "unknown execution mode '{other}', expected parallel or sequential"
            ))),
        }
    }
}

/// Configuration for [`analyze_overlaps`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisConfig {
    /// Detector parameters (step defaults to 0.03 km here)
    pub detection: DetectionConfig,
    pub rank_by: RankBy,
    pub execution_mode: ExecutionMode,
    /// Prepend per-segment narration to the report text
    pub verbose: bool,
    /// Fail on rows whose events have no start time instead of skipping them
    pub strict_events: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            detection: DetectionConfig {
                step_km: 0.03,
                ..DetectionConfig::default()
            },
            rank_by: RankBy::PeakRatio,
            execution_mode: ExecutionMode::Parallel,
            verbose: false,
            strict_events: false,
        }
    }
}

impl AnalysisConfig {
    /// Coarser sampling for quick previews.
    pub fn fast() -> Self {
        let mut config = Self::default();
        config.detection.step_km = 0.05;
        config
    }

    /// Fine sampling for final reports.
    pub fn precise() -> Self {
        let mut config = Self::default();
        config.detection.step_km = 0.01;
        config
    }
}

/// A declared row that was not analyzed because an event has no start time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedSegment {
    pub event: String,
    pub overlaps_with: String,
    pub start_km: f64,
    pub end_km: f64,
    /// The event(s) missing from the start-time map
    pub missing_events: Vec<String>,
}

/// Output of [`analyze_overlaps`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Verbose narration (if enabled) followed by the ranked summary
    pub report_text: String,
    /// Ranked records, one per segment with runners on both sides
    pub records: Vec<SummaryRecord>,
    pub skipped: Vec<SkippedSegment>,
}

struct Task<'a> {
    segment: &'a OverlapSegment,
    start_prev: f64,
    start_curr: f64,
}

/// Analyze every declared overlap segment and rank the results.
///
/// Rows referencing an event without a start time are skipped (and listed in
/// [`AnalysisReport::skipped`]) unless `strict_events` is set.
pub fn analyze_overlaps(
    pace: &PaceTable,
    segments: &[OverlapSegment],
    start_times: &StartTimes,
    config: &AnalysisConfig,
) -> Result<AnalysisReport> {
    analyze_overlaps_with_progress(pace, segments, start_times, config, &NoopProgress)
}

/// [`analyze_overlaps`] with progress reporting.
pub fn analyze_overlaps_with_progress(
    pace: &PaceTable,
    segments: &[OverlapSegment],
    start_times: &StartTimes,
    config: &AnalysisConfig,
    progress: &dyn AnalysisProgressCallback,
) -> Result<AnalysisReport> {
    config.detection.validate()?;
    let started = Instant::now();

    let (tasks, skipped) = build_tasks(segments, start_times, config.strict_events)?;
    info!(
        "[Overlaps] Analyzing {} segment tasks ({} skipped), mode={}, step={}km, window={}s",
        tasks.len(),
        skipped.len(),
        config.execution_mode,
        config.detection.step_km,
        config.detection.time_window_secs
    );

    progress.on_phase(AnalysisPhase::Detecting, tasks.len() as u32);
    let results = run_tasks(pace, &tasks, config, progress);

    progress.on_phase(AnalysisPhase::Ranking, results.len() as u32);
    let mut narration = String::new();
    let mut records = Vec::with_capacity(results.len());
    for (task, result) in tasks.iter().zip(&results) {
        if config.verbose {
            narration.push_str(&narrate_segment(task.segment, result.as_ref()));
        }
        if let Some(result) = result {
            records.push(build_summary_record(
                task.segment,
                result,
                task.start_prev,
                task.start_curr,
                &config.detection,
            ));
        }
        progress.on_progress();
    }

    rank_records(&mut records, config.rank_by);
    let mut report_text = narration;
    report_text.push_str(&render_summary(&records, config.rank_by));

    info!(
        "[Overlaps] Analysis complete: {} records in {}ms",
        records.len(),
        started.elapsed().as_millis()
    );

    Ok(AnalysisReport {
        report_text,
        records,
        skipped,
    })
}

/// Group rows by `(event, overlapswith)` in sorted key order, keeping input
/// order within each group.
fn build_tasks<'a>(
    segments: &'a [OverlapSegment],
    start_times: &StartTimes,
    strict: bool,
) -> Result<(Vec<Task<'a>>, Vec<SkippedSegment>)> {
    let mut groups: BTreeMap<(&str, &str), Vec<&OverlapSegment>> = BTreeMap::new();
    for seg in segments {
        groups
            .entry((seg.event.as_str(), seg.overlaps_with.as_str()))
            .or_default()
            .push(seg);
    }

    let mut tasks = Vec::with_capacity(segments.len());
    let mut skipped = Vec::new();
    for ((prev, curr), rows) in groups {
        match (start_times.get(prev), start_times.get(curr)) {
            (Some(start_prev), Some(start_curr)) => {
                tasks.extend(rows.into_iter().map(|segment| Task {
                    segment,
                    start_prev,
                    start_curr,
                }));
            }
            (sp, sc) => {
                let missing: Vec<String> = [(prev, sp), (curr, sc)]
                    .into_iter()
                    .filter(|(_, start)| start.is_none())
                    .map(|(event, _)| event.to_string())
                    .collect();
                if strict {
                    return Err(CongestionError::UnknownEvent {
                        event: missing.join(", "),
                    });
                }
                warn!(
                    "[Overlaps] Skipping {} row(s) for {} vs {}: no start time for {}",
                    rows.len(),
                    prev,
                    curr,
                    missing.join(", ")
                );
                skipped.extend(rows.into_iter().map(|seg| SkippedSegment {
                    event: seg.event.clone(),
                    overlaps_with: seg.overlaps_with.clone(),
                    start_km: seg.start_km,
                    end_km: seg.end_km,
                    missing_events: missing.clone(),
                }));
            }
        }
    }
    Ok((tasks, skipped))
}

fn run_task(pace: &PaceTable, task: &Task<'_>, config: &DetectionConfig) -> Option<DetectionResult> {
    let started = Instant::now();
    let seg = task.segment;
    let result = detect_segment_overlap(
        pace,
        &seg.event,
        &seg.overlaps_with,
        task.start_prev,
        task.start_curr,
        seg.start_km,
        seg.end_km,
        config,
    );
    debug!(
        "[Overlaps] {} vs {} {}: {}us",
        seg.event,
        seg.overlaps_with,
        seg.label(),
        started.elapsed().as_micros()
    );
    result
}

#[cfg(feature = "parallel")]
fn run_tasks(
    pace: &PaceTable,
    tasks: &[Task<'_>],
    config: &AnalysisConfig,
    progress: &dyn AnalysisProgressCallback,
) -> Vec<Option<DetectionResult>> {
    use rayon::prelude::*;

    match config.execution_mode {
        ExecutionMode::Parallel => tasks
            .par_iter()
            .map(|task| {
                let result = run_task(pace, task, &config.detection);
                progress.on_progress();
                result
            })
            .collect(),
        ExecutionMode::Sequential => run_sequential(pace, tasks, config, progress),
    }
}

#[cfg(not(feature = "parallel"))]
fn run_tasks(
    pace: &PaceTable,
    tasks: &[Task<'_>],
    config: &AnalysisConfig,
    progress: &dyn AnalysisProgressCallback,
) -> Vec<Option<DetectionResult>> {
    run_sequential(pace, tasks, config, progress)
}

fn run_sequential(
    pace: &PaceTable,
    tasks: &[Task<'_>],
    config: &AnalysisConfig,
    progress: &dyn AnalysisProgressCallback,
) -> Vec<Option<DetectionResult>> {
    tasks
        .iter()
        .map(|task| {
            let result = run_task(pace, task, &config.detection);
            progress.on_progress();
            result
        })
        .collect()
}
