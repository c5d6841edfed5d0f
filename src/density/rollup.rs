//! Segment rollup: peak step, zones, congestion index and report blocks.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use super::{DensityConfig, DensitySegment, DensityStep, Direction, compute_density_steps};
use crate::progress::{AnalysisPhase, AnalysisProgressCallback, NoopProgress};
use crate::{CongestionError, PaceTable, Result, StartTimes};

/// Density band on areal density (runners/m²).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Green,
    Amber,
    Red,
    DarkRed,
}

impl Zone {
    /// `<1.0` green, `<1.5` amber, `<2.0` red, otherwise dark red.
    pub fn classify(areal_m2: f64) -> Self {
        if areal_m2 < 1.0 {
            Zone::Green
        } else if areal_m2 < 1.5 {
            Zone::Amber
        } else if areal_m2 < 2.0 {
            Zone::Red
        } else {
            Zone::DarkRed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Green => "green",
            Zone::Amber => "amber",
            Zone::Red => "red",
            Zone::DarkRed => "dark_red",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-zone amounts (km of course, or shares of the segment).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneKm {
    pub green: f64,
    pub amber: f64,
    pub red: f64,
    pub dark_red: f64,
}

impl ZoneKm {
    fn add(&mut self, zone: Zone, amount: f64) {
        match zone {
            Zone::Green => self.green += amount,
            Zone::Amber => self.amber += amount,
            Zone::Red => self.red += amount,
            Zone::DarkRed => self.dark_red += amount,
        }
    }

    fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            green: f(self.green),
            amber: f(self.amber),
            red: f(self.red),
            dark_red: f(self.dark_red),
        }
    }

    pub fn total(&self) -> f64 {
        self.green + self.amber + self.red + self.dark_red
    }
}

/// 0-10 congestion score.
///
/// Peak component (0-5) ramps linearly across the zone breakpoints and
/// saturates at 3 runners/m². Duration component (0-3) weights the share of
/// the segment spent in amber, red and dark red. Rounded to one decimal.
pub fn congestion_index(peak_areal_m2: f64, share_amber: f64, share_red: f64, share_dark: f64) -> f64 {
    let d = peak_areal_m2;
    let s_peak = if d < 1.0 {
        0.0
    } else if d < 1.5 {
        2.0 * (d - 1.0) / 0.5
    } else if d < 2.0 {
        2.0 + 2.0 * (d - 1.5) / 0.5
    } else {
        4.0 + (d.min(3.0) - 2.0)
    };
    let s_peak = s_peak.clamp(0.0, 5.0);
    let s_zones = 3.0 * (0.4 * share_amber + 0.8 * share_red + share_dark).min(1.0);
    round_to(s_peak + s_zones, 1).min(10.0)
}

/// Summary of one density segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRollup {
    pub segment: DensitySegment,
    pub peak_km: f64,
    /// Per-event counts at the peak step
    pub peak_counts: BTreeMap<String, usize>,
    pub peak_combined: usize,
    pub peak_step_areal_m2: f64,
    pub peak_step_linear_m: f64,
    /// Peak runner count spread over the whole segment area
    pub segment_avg_at_peak_areal_m2: f64,
    pub segment_avg_at_peak_linear_m: f64,
    pub zones_km: ZoneKm,
    /// Fraction of steps in each zone; sums to 1
    pub zone_shares: ZoneKm,
    pub index_0_10: f64,
}

/// Roll sampled steps up into a [`SegmentRollup`].
///
/// The peak is the first step with the highest areal density. Zone shares
/// are by step count and `zones_km` scales them by the segment length.
pub fn rollup_segment(steps: &[DensityStep], segment: &DensitySegment) -> Result<SegmentRollup> {
    let mut peak = steps.first().ok_or(CongestionError::EmptySteps)?;
    for step in &steps[1..] {
        if step.areal_m2 > peak.areal_m2 {
            peak = step;
        }
    }

    let mut shares = ZoneKm::default();
    let per_step = 1.0 / steps.len() as f64;
    for step in steps {
        shares.add(Zone::classify(step.areal_m2), per_step);
    }

    let length_km = (segment.km_to - segment.km_from).max(1e-9);
    let length_m = length_km * 1000.0;
    let area = (length_m * segment.width_m.max(0.01)).max(1.0);

    let index = congestion_index(peak.areal_m2, shares.amber, shares.red, shares.dark_red);

    Ok(SegmentRollup {
        segment: segment.clone(),
        peak_km: peak.km,
        peak_counts: peak.counts.clone(),
        peak_combined: peak.combined,
        peak_step_areal_m2: round_to(peak.areal_m2, 2),
        peak_step_linear_m: round_to(peak.linear_m, 2),
        segment_avg_at_peak_areal_m2: round_to(peak.combined as f64 / area, 3),
        segment_avg_at_peak_linear_m: round_to(peak.combined as f64 / length_m, 3),
        zones_km: shares.map(|s| round_to(s * length_km, 2)),
        zone_shares: shares,
        index_0_10: index,
    })
}

/// Plain-text report block for one rolled-up segment.
pub fn render_density_block(rollup: &SegmentRollup) -> String {
    let seg = &rollup.segment;
    let z = &rollup.zones_km;
    let versus = seg
        .event_b
        .as_deref()
        .map(|b| format!(" vs {b}"))
        .unwrap_or_default();
    let counts = rollup
        .peak_counts
        .iter()
        .map(|(event, n)| format!("{event}={n}"))
        .collect::<Vec<_>>()
        .join(", ");
    [
        format!(
            "Checking {}{versus} from {:.2}km-{:.2}km...",
            seg.event_a, seg.km_from, seg.km_to
        ),
        format!("Segment: width={} m, direction={}", seg.width_m, seg.direction),
        format!(
            "Peak concurrent: {} ({counts}) @ {:.2} km",
            rollup.peak_combined, rollup.peak_km
        ),
        format!(
            "Density (peak step): {} /m2 (Linear ~ {} /m)",
            rollup.peak_step_areal_m2, rollup.peak_step_linear_m
        ),
        format!(
            "Density (segment-average @ peak): {} /m2 (Linear ~ {} /m)",
            rollup.segment_avg_at_peak_areal_m2, rollup.segment_avg_at_peak_linear_m
        ),
        format!(
            "Zones (km): G={}, A={}, R={}, D={}",
            z.green, z.amber, z.red, z.dark_red
        ),
        format!("Index: {}/10", rollup.index_0_10),
    ]
    .join("\n")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KmRange {
    pub from_km: f64,
    pub to_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub width_m: f64,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityFigures {
    pub peak_step_areal_m2: f64,
    pub peak_step_linear_m: f64,
    pub segment_avg_at_peak_areal_m2: f64,
    pub segment_avg_at_peak_linear_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CongestionIndex {
    pub congestion_0_10: f64,
    pub version: String,
}

/// Structured per-segment output of [`analyze_density`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityBlock {
    pub segment: KmRange,
    pub geometry: Geometry,
    /// `combined` plus per-event counts at the peak step
    pub concurrency: BTreeMap<String, usize>,
    pub density: DensityFigures,
    pub zones_km: ZoneKm,
    pub index: CongestionIndex,
}

impl From<&SegmentRollup> for DensityBlock {
    fn from(rollup: &SegmentRollup) -> Self {
        let mut concurrency = rollup.peak_counts.clone();
        concurrency.insert("combined".to_string(), rollup.peak_combined);
        Self {
            segment: KmRange {
                from_km: rollup.segment.km_from,
                to_km: rollup.segment.km_to,
            },
            geometry: Geometry {
                width_m: rollup.segment.width_m,
                direction: rollup.segment.direction,
            },
            concurrency,
            density: DensityFigures {
                peak_step_areal_m2: rollup.peak_step_areal_m2,
                peak_step_linear_m: rollup.peak_step_linear_m,
                segment_avg_at_peak_areal_m2: rollup.segment_avg_at_peak_areal_m2,
                segment_avg_at_peak_linear_m: rollup.segment_avg_at_peak_linear_m,
            },
            zones_km: rollup.zones_km,
            index: CongestionIndex {
                congestion_0_10: rollup.index_0_10,
                version: "v1".to_string(),
            },
        }
    }
}

/// Output of [`analyze_density`]: one block per segment plus the joined text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityReport {
    pub blocks: Vec<DensityBlock>,
    pub text: String,
}

/// Sample and roll up every density segment.
pub fn analyze_density(
    pace: &PaceTable,
    segments: &[DensitySegment],
    start_times: &StartTimes,
    config: &DensityConfig,
) -> Result<DensityReport> {
    analyze_density_with_progress(pace, segments, start_times, config, &NoopProgress)
}

/// [`analyze_density`] with progress reporting.
pub fn analyze_density_with_progress(
    pace: &PaceTable,
    segments: &[DensitySegment],
    start_times: &StartTimes,
    config: &DensityConfig,
    progress: &dyn AnalysisProgressCallback,
) -> Result<DensityReport> {
    config.validate()?;
    let started = Instant::now();
    progress.on_phase(AnalysisPhase::DensitySampling, segments.len() as u32);

    let mut blocks = Vec::with_capacity(segments.len());
    let mut texts = Vec::with_capacity(segments.len());
    for segment in segments {
        let steps = compute_density_steps(pace, segment, start_times, config);
        let rollup = rollup_segment(&steps, segment)?;
        debug!(
            "[Density] {} {:.2}-{:.2}km: {} steps, peak {} @ {:.2}km, index {}",
            segment.event_a,
            segment.km_from,
            segment.km_to,
            steps.len(),
            rollup.peak_combined,
            rollup.peak_km,
            rollup.index_0_10
        );
        blocks.push(DensityBlock::from(&rollup));
        texts.push(render_density_block(&rollup));
        progress.on_progress();
    }

    info!(
        "[Density] Rolled up {} segments in {}ms",
        blocks.len(),
        started.elapsed().as_millis()
    );
    Ok(DensityReport {
        blocks,
        text: texts.join("\n\n"),
    })
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
