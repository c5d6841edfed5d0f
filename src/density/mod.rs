//! # Course Density
//!
//! Per-step runner density over a stretch of course, for one event or two
//! events sharing the stretch.
//!
//! At each sampled km every runner's arrival time is computed from the
//! constant-pace model. Per event, the earliest arrival anchors a time window
//! and the runners arriving inside it are counted: an approximation of who is
//! physically on that piece of course at once. Counts are turned into areal
//! (runners/m²) and linear (runners/m) densities, then rolled up per segment
//! into zones and a 0-10 congestion index (see [`rollup_segment`]).

mod rollup;

pub use rollup::{
    CongestionIndex, DensityBlock, DensityFigures, DensityReport, Geometry, KmRange,
    SegmentRollup, Zone, ZoneKm, analyze_density, analyze_density_with_progress,
    congestion_index, render_density_block, rollup_segment,
};

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::{CongestionError, PaceTable, Result, StartTimes};

/// Traffic direction on a density segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Uni,
    Bi,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Uni => "uni",
            Direction::Bi => "bi",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = CongestionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uni" => Ok(Direction::Uni),
            "bi" => Ok(Direction::Bi),
            other => Err(CongestionError::InvalidSegmentSpec {
                spec: other.to_string(),
                reason: "direction must be 'uni' or 'bi'".to_string(),
            }),
        }
    }
}

fn default_width() -> f64 {
    3.0
}

/// A stretch of course to sample for density.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensitySegment {
    #[serde(rename = "eventA")]
    pub event_a: String,
    #[serde(rename = "eventB", default)]
    pub event_b: Option<String>,
    #[serde(rename = "from")]
    pub km_from: f64,
    #[serde(rename = "to")]
    pub km_to: f64,
    /// Course width in metres
    #[serde(rename = "width", default = "default_width")]
    pub width_m: f64,
    #[serde(default)]
    pub direction: Direction,
}

impl DensitySegment {
    pub fn new(event_a: impl Into<String>, km_from: f64, km_to: f64, width_m: f64) -> Self {
        Self {
            event_a: event_a.into(),
            event_b: None,
            km_from,
            km_to,
            width_m,
            direction: Direction::Uni,
        }
    }

    pub fn with_event_b(mut self, event_b: impl Into<String>) -> Self {
        self.event_b = Some(event_b.into());
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Event A, then event B if present.
    pub fn events(&self) -> Vec<&str> {
        let mut events = vec![self.event_a.as_str()];
        events.extend(self.event_b.as_deref());
        events
    }
}

impl FromStr for DensitySegment {
    type Err = CongestionError;

    /// Parse `EventA,EventB,from,to,width,direction`; EventB may be empty.
    ///
    /// ```
    /// use run_congestion::DensitySegment;
    /// let seg: DensitySegment = "10K,,2.74,5.80,1.5,bi".parse().unwrap();
    /// assert!(seg.event_b.is_none());
    /// assert_eq!(seg.width_m, 1.5);
    /// ```
    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: String| CongestionError::InvalidSegmentSpec {
            spec: s.to_string(),
            reason,
        };
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 6 {
            return Err(invalid(format!(
                "expected 6 values EventA,EventB,from,to,width,direction, got {}",
                parts.len()
            )));
        }
        if parts[0].is_empty() {
            return Err(invalid("EventA is empty".to_string()));
        }
        let number = |idx: usize, name: &str| -> Result<f64> {
            parts[idx]
                .parse()
                .map_err(|_| invalid(format!("{name} '{}' is not a number", parts[idx])))
        };
        Ok(Self {
            event_a: parts[0].to_string(),
            event_b: (!parts[1].is_empty()).then(|| parts[1].to_string()),
            km_from: number(2, "from")?,
            km_to: number(3, "to")?,
            width_m: number(4, "width")?,
            direction: parts[5]
                .parse::<Direction>()
                .map_err(|_| invalid(format!("direction '{}' must be uni or bi", parts[5])))?,
        })
    }
}

/// Sampling parameters for density.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DensityConfig {
    /// Sampling step in km. Default: 0.03
    pub step_km: f64,
    /// Presence window in seconds, centred on the first arrival. Default: 60
    #[serde(alias = "timeWindow")]
    pub window_secs: f64,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            step_km: 0.03,
            window_secs: 60.0,
        }
    }
}

impl DensityConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.step_km.is_finite() || self.step_km <= 0.0 {
            return Err(CongestionError::InvalidParameter(format!(
                "density step_km must be positive, got {}",
                self.step_km
            )));
        }
        if !self.window_secs.is_finite() || self.window_secs < 0.0 {
            return Err(CongestionError::InvalidParameter(format!(
                "density window_secs must be non-negative, got {}",
                self.window_secs
            )));
        }
        Ok(())
    }
}

/// Density at one sampled km.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityStep {
    pub km: f64,
    /// Runners present per event
    pub counts: BTreeMap<String, usize>,
    pub combined: usize,
    /// Runners per square metre
    pub areal_m2: f64,
    /// Runners per linear metre
    pub linear_m: f64,
}

/// Sample density along a segment.
///
/// Bins run from `km_from` to `km_to` inclusive in `step_km` increments
/// (bin positions are rounded to 0.01 km). An event without a start time is
/// treated as starting at minute 0. Returns an empty list for a non-positive
/// step.
pub fn compute_density_steps(
    pace: &PaceTable,
    segment: &DensitySegment,
    start_times: &StartTimes,
    config: &DensityConfig,
) -> Vec<DensityStep> {
    let step = config.step_km;
    if !step.is_finite() || step <= 0.0 {
        return Vec::new();
    }

    // Arrival model in seconds: start_s + sec_per_km * km
    let fields: Vec<(&str, f64, Vec<f64>)> = segment
        .events()
        .into_iter()
        .map(|event| {
            let start_min = start_times.get(event).unwrap_or_else(|| {
                warn!("[Density] No start time for '{event}', assuming minute 0");
                0.0
            });
            let sec_per_km: Vec<f64> = pace.event_runners(event).map(|r| r.pace * 60.0).collect();
            (event, start_min * 60.0, sec_per_km)
        })
        .collect();

    let step_m = step * 1000.0;
    let area_per_step = step_m * segment.width_m.max(0.01);
    let half_window = config.window_secs / 2.0;

    bins(segment.km_from, segment.km_to, step)
        .into_iter()
        .map(|km| {
            let mut counts = BTreeMap::new();
            for (event, start_s, sec_per_km) in &fields {
                counts.insert(event.to_string(), count_present(*start_s, sec_per_km, km, half_window));
            }
            let combined: usize = counts.values().sum();
            DensityStep {
                km,
                counts,
                combined,
                areal_m2: combined as f64 / area_per_step,
                linear_m: combined as f64 / step_m,
            }
        })
        .collect()
}

/// Runners arriving within `half_window` seconds of the first arrival at `km`.
fn count_present(start_s: f64, sec_per_km: &[f64], km: f64, half_window: f64) -> usize {
    let arrivals = sec_per_km.iter().map(|s| start_s + s * km);
    let Some(t0) = arrivals.clone().min_by(f64::total_cmp) else {
        return 0;
    };
    arrivals
        .filter(|&t| t >= t0 - half_window && t <= t0 + half_window)
        .count()
}

/// Inclusive bins `k0 + i * step`, rounded to 0.01 km.
fn bins(k0: f64, k1: f64, step: f64) -> Vec<f64> {
    let n = ((k1 - k0) / step).round().max(0.0) as usize;
    (0..=n)
        .map(|i| ((k0 + i as f64 * step) * 100.0).round() / 100.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bins_include_both_ends() {
        let b = bins(0.0, 0.3, 0.03);
        assert_eq!(b.len(), 11);
        assert_eq!(b[0], 0.0);
        assert_eq!(b[10], 0.3);
    }

    #[test]
    fn inverted_range_yields_single_bin() {
        assert_eq!(bins(2.0, 1.0, 0.1), vec![2.0]);
    }

    #[test]
    fn window_is_anchored_on_first_arrival() {
        // Arrivals at 0s, 20s, 40s, 100s with a 60s window (+-30s around 0s)
        let counted = count_present(0.0, &[0.0, 20.0, 40.0, 100.0], 1.0, 30.0);
        assert_eq!(counted, 2);
    }

    #[test]
    fn empty_population_counts_zero() {
        assert_eq!(count_present(0.0, &[], 1.0, 30.0), 0);
    }
}
