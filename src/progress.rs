//! Progress reporting for overlap and density analyses.
//!
//! An analysis announces each stage with its item count (segment tasks,
//! summary records or density segments) and ticks once per finished item.
//! Overlap tasks can finish on rayon worker threads, so callbacks are shared
//! across threads.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

/// Stages of an analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisPhase {
    /// One tick per overlap segment task
    Detecting,
    /// One tick per detection result turned into a summary record
    Ranking,
    /// One tick per density segment sampled and rolled up
    DensitySampling,
}

impl AnalysisPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisPhase::Detecting => "detecting",
            AnalysisPhase::Ranking => "ranking",
            AnalysisPhase::DensitySampling => "density_sampling",
        }
    }
}

/// Receiver for stage changes and per-item ticks.
pub trait AnalysisProgressCallback: Send + Sync {
    /// A stage with `total` items starts.
    fn on_phase(&self, phase: AnalysisPhase, total: u32);
    /// One item of the current stage finished.
    fn on_progress(&self);
}

/// Discards every update. Used by the plain `analyze_*` entry points.
pub struct NoopProgress;

impl AnalysisProgressCallback for NoopProgress {
    fn on_phase(&self, _phase: AnalysisPhase, _total: u32) {}
    fn on_progress(&self) {}
}

/// Counters another thread can poll while an analysis runs.
pub struct AtomicProgressTracker {
    pub phase: Mutex<Option<AnalysisPhase>>,
    pub completed: AtomicU32,
    pub total: AtomicU32,
}

impl Default for AtomicProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomicProgressTracker {
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(None),
            completed: AtomicU32::new(0),
            total: AtomicU32::new(0),
        }
    }

    /// Current stage, `None` before the first one starts.
    pub fn current_phase(&self) -> Option<AnalysisPhase> {
        self.phase.lock().ok().and_then(|p| *p)
    }

    /// Current stage name, empty before the first one starts.
    pub fn phase_name(&self) -> String {
        self.current_phase()
            .map(|p| p.as_str().to_string())
            .unwrap_or_default()
    }

    /// Share of the current stage done, in `[0, 1]`. An empty stage is done.
    pub fn fraction_done(&self) -> f64 {
        let total = self.total.load(Ordering::SeqCst);
        if total == 0 {
            return 1.0;
        }
        let completed = self.completed.load(Ordering::SeqCst).min(total);
        f64::from(completed) / f64::from(total)
    }
}

impl AnalysisProgressCallback for AtomicProgressTracker {
    fn on_phase(&self, phase: AnalysisPhase, total: u32) {
        if let Ok(mut current) = self.phase.lock() {
            *current = Some(phase);
        }
        self.completed.store(0, Ordering::SeqCst);
        self.total.store(total, Ordering::SeqCst);
    }

    fn on_progress(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_stage_resets_completed() {
        let tracker = AtomicProgressTracker::new();
        tracker.on_phase(AnalysisPhase::Detecting, 4);
        tracker.on_progress();
        tracker.on_progress();
        assert_eq!(tracker.fraction_done(), 0.5);

        tracker.on_phase(AnalysisPhase::Ranking, 3);
        assert_eq!(tracker.completed.load(Ordering::SeqCst), 0);
        assert_eq!(tracker.phase_name(), "ranking");
        assert_eq!(tracker.fraction_done(), 0.0);
    }
}
