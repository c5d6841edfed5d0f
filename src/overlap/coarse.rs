//! Pre-filter and coarse pass of the overlap detector.
//!
//! Both stages only ever discard work that provably cannot produce a hit
//! at fine resolution, so the fine scan over what remains returns exactly
//! the result of a full-resolution scan.

use super::field::EventField;
use super::fine::TIME_EPS_SECS;
use crate::pace::{arrival_interval, sample_grid};

/// Slack (seconds) of the filtering stages. Twice the fine-scan slack, so
/// rounding in the interval ends and coarse arrival sums never drops a pair
/// the fine scan would count.
const FILTER_EPS_SECS: f64 = 2.0 * TIME_EPS_SECS;

/// Drop runners whose arrival interval over the segment never comes within
/// the time window of any runner of the other event.
///
/// Every interval is widened by the window; without it a pair that never
/// shares a clock instant but passes within the tolerance would be discarded.
pub(crate) fn prefilter<'a>(
    prev: &EventField<'a>,
    curr: &EventField<'a>,
    seg_lo: f64,
    seg_hi: f64,
    window_secs: f64,
) -> (EventField<'a>, EventField<'a>) {
    let pad_min = (window_secs + FILTER_EPS_SECS) / 60.0;
    let prev_iv: Vec<(f64, f64)> = prev
        .paces
        .iter()
        .map(|&p| arrival_interval(prev.start_min, p, seg_lo, seg_hi))
        .collect();
    let curr_iv: Vec<(f64, f64)> = curr
        .paces
        .iter()
        .map(|&p| arrival_interval(curr.start_min, p, seg_lo, seg_hi))
        .collect();

    let mut keep_prev = vec![false; prev_iv.len()];
    let mut keep_curr = vec![false; curr_iv.len()];

    for (i, &(p_lo, p_hi)) in prev_iv.iter().enumerate() {
        for (j, &(c_lo, c_hi)) in curr_iv.iter().enumerate() {
            if p_hi + pad_min >= c_lo && c_hi + pad_min >= p_lo {
                keep_prev[i] = true;
                keep_curr[j] = true;
            }
        }
    }

    (prev.retain(&keep_prev), curr.retain(&keep_curr))
}

/// Coarse kilometres at which some pair may be within tolerance nearby.
///
/// A pair's arrival gap changes linearly with distance, by `|pace_p - pace_c|`
/// minutes per km. The tolerance at each coarse point is widened by that
/// drift over one coarse step, so any fine-resolution hit lies within one
/// coarse step of a flagged point.
pub(crate) fn coarse_candidates(
    prev: &EventField<'_>,
    curr: &EventField<'_>,
    seg_lo: f64,
    seg_hi: f64,
    coarse_step: f64,
    window_secs: f64,
) -> Vec<f64> {
    let mut prev_t = Vec::with_capacity(prev.len());
    let mut curr_t = Vec::with_capacity(curr.len());

    sample_grid(seg_lo, seg_hi, coarse_step)
        .into_iter()
        .filter(|&km| {
            prev.arrivals_at(km, &mut prev_t);
            curr.arrivals_at(km, &mut curr_t);
            prev_t.iter().zip(&prev.paces).any(|(&tp, &pp)| {
                curr_t.iter().zip(&curr.paces).any(|(&tc, &pc)| {
                    let drift_secs = (pp - pc).abs() * coarse_step * 60.0;
                    (tp - tc).abs() * 60.0 <= window_secs + drift_secs + FILTER_EPS_SECS
                })
            })
        })
        .collect()
}

/// Expand every candidate into `[km - coarse_step, km + coarse_step]`,
/// clipped to the segment, and merge overlapping or touching intervals.
pub(crate) fn merge_ranges(
    candidates: &[f64],
    coarse_step: f64,
    seg_lo: f64,
    seg_hi: f64,
) -> Vec<(f64, f64)> {
    let mut ranges: Vec<(f64, f64)> = candidates
        .iter()
        .map(|&km| {
            (
                (km - coarse_step).max(seg_lo),
                (km + coarse_step).min(seg_hi),
            )
        })
        .collect();
    ranges.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(ranges.len());
    for (lo, hi) in ranges {
        match merged.last_mut() {
            Some(last) if lo <= last.1 => last.1 = last.1.max(hi),
            _ => merged.push((lo, hi)),
        }
    }
    merged
}

/// Fine-grid indices (relative to `seg_lo`) covered by the merged ranges.
///
/// Indices, not kilometres, are returned so the fine scan samples exactly
/// the points a full-resolution scan would.
pub(crate) fn fine_indices(
    ranges: &[(f64, f64)],
    seg_lo: f64,
    step: f64,
    grid_len: usize,
) -> Vec<usize> {
    let last = grid_len.saturating_sub(1);
    let mut indices: Vec<usize> = Vec::new();
    for &(lo, hi) in ranges {
        // Same end-point slack as `grid_len`, so a range ending at the
        // segment end reaches the last grid index
        let first = ((lo - seg_lo - 1e-9) / step).ceil().max(0.0) as usize;
        let end = (((hi - seg_lo + 1e-9) / step).floor().max(0.0) as usize).min(last);
        if first > end {
            continue;
        }
        let from = match indices.last() {
            Some(&prev) if prev >= first => prev + 1,
            _ => first,
        };
        indices.extend(from..=end);
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_touching_ranges() {
        let merged = merge_ranges(&[0.5, 1.0, 3.0], 0.5, 0.0, 4.0);
        assert_eq!(merged, vec![(0.0, 1.5), (2.5, 3.5)]);
    }

    #[test]
    fn clips_ranges_to_segment() {
        let merged = merge_ranges(&[0.0, 2.0], 0.25, 0.0, 2.0);
        assert_eq!(merged, vec![(0.0, 0.25), (1.75, 2.0)]);
    }

    #[test]
    fn fine_indices_are_deduplicated_and_sorted() {
        let idx = fine_indices(&[(0.0, 0.05), (0.05, 0.1)], 0.0, 0.01, 101);
        assert_eq!(idx, (0..=10).collect::<Vec<_>>());
    }

    #[test]
    fn fine_indices_respect_grid_end() {
        let idx = fine_indices(&[(0.9, 1.2)], 0.0, 0.1, 11);
        assert_eq!(idx, vec![9, 10]);
    }
}
