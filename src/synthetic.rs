//! Synthetic race fields for stress testing and benchmarking.
//!
//! Generates seeded pace tables with staggered event starts and a set of
//! shared course segments, so detection can be exercised at realistic
//! population sizes without real registration data.
//!
//! Feature-gated behind `synthetic`, not included in production builds.
//!
//! # Example
//!
//! ```rust
//! use run_congestion::synthetic::SyntheticRace;
//!
//! let race = SyntheticRace::three_event(200, 42).generate();
//! assert_eq!(race.pace.len(), 600);
//! assert_eq!(race.start_times.len(), 3);
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{OverlapSegment, PaceTable, Runner, StartTimes};

/// One event of a synthetic race.
#[derive(Debug, Clone)]
pub struct EventSpec {
    pub name: String,
    pub runners: usize,
    /// Minutes since midnight
    pub start_min: f64,
    pub distance_km: f64,
    /// Fastest and slowest pace in min/km
    pub pace_range: (f64, f64),
}

/// A shared stretch declared between two events.
#[derive(Debug, Clone)]
pub struct SharedStretch {
    pub earlier: String,
    pub later: String,
    pub start_km: f64,
    pub end_km: f64,
}

/// Recipe for a synthetic race.
#[derive(Debug, Clone)]
pub struct SyntheticRace {
    pub events: Vec<EventSpec>,
    pub stretches: Vec<SharedStretch>,
    pub seed: u64,
}

/// Generated inputs for one analysis.
#[derive(Debug, Clone)]
pub struct SyntheticField {
    pub pace: PaceTable,
    pub start_times: StartTimes,
    pub segments: Vec<OverlapSegment>,
}

impl SyntheticRace {
    /// Full / 10K / Half starting 20 minutes apart, with three shared stretches.
    pub fn three_event(runners_per_event: usize, seed: u64) -> Self {
        let event = |name: &str, start_min: f64, distance_km: f64, pace_range: (f64, f64)| EventSpec {
            name: name.to_string(),
            runners: runners_per_event,
            start_min,
            distance_km,
            pace_range,
        };
        let stretch = |earlier: &str, later: &str, start_km: f64, end_km: f64| SharedStretch {
            earlier: earlier.to_string(),
            later: later.to_string(),
            start_km,
            end_km,
        };
        Self {
            events: vec![
                event("Full", 420.0, 42.2, (3.5, 8.0)),
                event("10K", 440.0, 10.0, (3.8, 9.5)),
                event("Half", 460.0, 21.1, (3.6, 8.5)),
            ],
            stretches: vec![
                stretch("Full", "10K", 0.0, 2.74),
                stretch("Full", "Half", 2.74, 5.8),
                stretch("10K", "Half", 0.0, 4.5),
            ],
            seed,
        }
    }

    /// Two events on one stretch, for focused benchmarks.
    pub fn two_event(runners_per_event: usize, start_gap_min: f64, seed: u64) -> Self {
        Self {
            events: vec![
                EventSpec {
                    name: "A".to_string(),
                    runners: runners_per_event,
                    start_min: 0.0,
                    distance_km: 10.0,
                    pace_range: (4.0, 7.0),
                },
                EventSpec {
                    name: "B".to_string(),
                    runners: runners_per_event,
                    start_min: start_gap_min,
                    distance_km: 10.0,
                    pace_range: (4.0, 7.0),
                },
            ],
            stretches: vec![SharedStretch {
                earlier: "A".to_string(),
                later: "B".to_string(),
                start_km: 0.0,
                end_km: 5.0,
            }],
            seed,
        }
    }

    /// Build the field. The same recipe and seed always give the same field.
    pub fn generate(&self) -> SyntheticField {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut runners = Vec::new();
        let mut start_times = StartTimes::new();

        for spec in &self.events {
            start_times.insert(spec.name.clone(), spec.start_min);
            let (fast, slow) = spec.pace_range;
            for i in 0..spec.runners {
                // Mean of two uniforms: a field bunched around the middle pace
                let u = (rng.r#gen::<f64>() + rng.r#gen::<f64>()) / 2.0;
                let pace = fast + (slow - fast) * u;
                runners.push(Runner::new(
                    spec.name.clone(),
                    format!("{}", 1000 + i),
                    pace,
                    spec.distance_km,
                ));
            }
        }

        let segments = self
            .stretches
            .iter()
            .enumerate()
            .map(|(i, s)| {
                OverlapSegment::new(s.earlier.clone(), s.later.clone(), s.start_km, s.end_km)
                    .with_description(format!("Shared stretch {}", i + 1))
            })
            .collect();

        SyntheticField {
            pace: PaceTable::new(runners),
            start_times,
            segments,
        }
    }
}

/// Random pace table for property tests: `n` runners per event with paces
/// drawn uniformly from `pace_range`.
pub fn random_pace_table(events: &[&str], n: usize, pace_range: (f64, f64), seed: u64) -> PaceTable {
    let mut rng = StdRng::seed_from_u64(seed);
    events
        .iter()
        .flat_map(|event| (0..n).map(move |i| (*event, i)))
        .map(|(event, i)| {
            let pace = rng.gen_range(pace_range.0..=pace_range.1);
            Runner::new(event, i.to_string(), pace, 10.0)
        })
        .collect()
}
