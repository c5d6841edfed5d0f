//! Fine-resolution scan and its accumulators.

use std::collections::HashSet;

use super::field::EventField;

/// Two first-overlap candidates closer than this (minutes) count as tied.
pub(crate) const FIRST_OVERLAP_TIME_EPS: f64 = 1e-6;

/// Slack (seconds) on the window test. Equal-pace runners whose start gap
/// equals the window sit exactly on the boundary, and rounding puts them a
/// few ulps either side depending on km.
pub(crate) const TIME_EPS_SECS: f64 = 1e-6;

/// Whether two arrival times (minutes) are within `window_secs` of each other.
#[inline]
pub(crate) fn within_window(tp: f64, tc: f64, window_secs: f64) -> bool {
    (tp - tc).abs() * 60.0 <= window_secs + TIME_EPS_SECS
}

/// Earliest hit seen so far: (event time, km, prev slot, curr slot).
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FirstHit {
    pub time: f64,
    pub km: f64,
    pub prev_slot: usize,
    pub curr_slot: usize,
}

impl FirstHit {
    /// Whether `candidate` should replace `self` as the first overlap.
    fn is_beaten_by(&self, candidate: &FirstHit) -> bool {
        candidate.time < self.time
            || ((candidate.time - self.time).abs() < FIRST_OVERLAP_TIME_EPS
                && candidate.km < self.km)
    }
}

/// Running totals of a fine scan.
#[derive(Debug, Default)]
pub(crate) struct ScanTotals {
    pub cumulative_hits: u64,
    pub unique_pairs: HashSet<(usize, usize)>,
    pub peak_congestion: usize,
    pub peak_prev_slots: Vec<usize>,
    pub peak_curr_slots: Vec<usize>,
    pub first_hit: Option<FirstHit>,
    pub steps_scanned: usize,
}

/// Scan the given fine-grid indices in increasing order.
///
/// At each sampled km every (prev, curr) pair whose arrival times differ by
/// at most `window_secs` (plus [`TIME_EPS_SECS`]) is a hit. Hits are counted
/// per step: a pair that stays within tolerance over several steps
/// contributes once per step.
pub(crate) fn scan_steps(
    prev: &EventField<'_>,
    curr: &EventField<'_>,
    seg_lo: f64,
    step: f64,
    indices: impl IntoIterator<Item = usize>,
    window_secs: f64,
) -> ScanTotals {
    let mut totals = ScanTotals::default();

    let mut prev_t = Vec::with_capacity(prev.len());
    let mut curr_t = Vec::with_capacity(curr.len());
    let mut prev_hit = vec![false; prev.ids.len()];
    let mut curr_hit = vec![false; curr.ids.len()];

    for idx in indices {
        let km = seg_lo + idx as f64 * step;
        prev.arrivals_at(km, &mut prev_t);
        curr.arrivals_at(km, &mut curr_t);
        prev_hit.iter_mut().for_each(|h| *h = false);
        curr_hit.iter_mut().for_each(|h| *h = false);

        let mut step_hits = 0u64;
        let mut step_best: Option<(f64, usize, usize)> = None;

        for (i, &tp) in prev_t.iter().enumerate() {
            let ps = prev.slots[i];
            for (j, &tc) in curr_t.iter().enumerate() {
                if !within_window(tp, tc, window_secs) {
                    continue;
                }
                let cs = curr.slots[j];
                step_hits += 1;
                prev_hit[ps] = true;
                curr_hit[cs] = true;
                totals.unique_pairs.insert((ps, cs));

                // Row-major order keeps the earliest (prev, curr) on equal times
                let event_time = tp.min(tc);
                if step_best.is_none_or(|(t, _, _)| event_time < t) {
                    step_best = Some((event_time, ps, cs));
                }
            }
        }

        totals.steps_scanned += 1;
        if step_hits == 0 {
            continue;
        }
        totals.cumulative_hits += step_hits;

        if let Some((time, prev_slot, curr_slot)) = step_best {
            let candidate = FirstHit {
                time,
                km,
                prev_slot,
                curr_slot,
            };
            match &totals.first_hit {
                Some(stored) if !stored.is_beaten_by(&candidate) => {}
                _ => totals.first_hit = Some(candidate),
            }
        }

        let prev_count = prev_hit.iter().filter(|&&h| h).count();
        let curr_count = curr_hit.iter().filter(|&&h| h).count();
        if prev_count + curr_count > totals.peak_congestion {
            totals.peak_congestion = prev_count + curr_count;
            totals.peak_prev_slots = slots_set(&prev_hit);
            totals.peak_curr_slots = slots_set(&curr_hit);
        }
    }

    totals
}

fn slots_set(flags: &[bool]) -> Vec<usize> {
    flags
        .iter()
        .enumerate()
        .filter_map(|(slot, &hit)| hit.then_some(slot))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_boundary_counts_as_hit() {
        // A gap a rounding error past the window still counts
        assert!(within_window(0.0, 1.0, 60.0));
        assert!(within_window(421.0 + 1e-13, 420.0, 60.0));
        assert!(!within_window(0.0, 1.001, 60.0));
    }

    #[test]
    fn earlier_time_beats_stored_hit() {
        let stored = FirstHit {
            time: 10.0,
            km: 1.0,
            prev_slot: 0,
            curr_slot: 0,
        };
        let earlier = FirstHit { time: 9.5, ..stored };
        assert!(stored.is_beaten_by(&earlier));
    }

    #[test]
    fn tied_time_prefers_smaller_km() {
        let stored = FirstHit {
            time: 10.0,
            km: 1.0,
            prev_slot: 0,
            curr_slot: 0,
        };
        let tied_closer = FirstHit {
            time: 10.0 + 1e-9,
            km: 0.5,
            ..stored
        };
        let tied_further = FirstHit {
            time: 10.0,
            km: 1.5,
            ..stored
        };
        assert!(stored.is_beaten_by(&tied_closer));
        assert!(!stored.is_beaten_by(&tied_further));
    }
}
