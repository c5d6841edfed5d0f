//! Constant-pace model.
//!
//! A runner's position over time is linear: the arrival time at `km` is
//! `start + pace * km`, with start in minutes since midnight and pace in
//! minutes per kilometre. Everything downstream (overlap detection and
//! density sampling) is built on these two functions.

use crate::{CongestionError, Result, StartTimes};

/// Minutes since midnight at which a runner with `pace` reaches `km`.
#[inline]
pub fn arrival_time(start_min: f64, pace: f64, km: f64) -> f64 {
    start_min + pace * km
}

/// Arrival-time interval over `[km_from, km_to]`.
///
/// The interval is returned ordered (`lo <= hi`) even if the bounds are given
/// in reverse.
#[inline]
pub fn arrival_interval(start_min: f64, pace: f64, km_from: f64, km_to: f64) -> (f64, f64) {
    let a = arrival_time(start_min, pace, km_from);
    let b = arrival_time(start_min, pace, km_to);
    if a <= b { (a, b) } else { (b, a) }
}

/// Parse `Event=minutes_since_midnight` items into a start-time map.
///
/// # Example
/// ```
/// use run_congestion::parse_start_times;
/// let starts = parse_start_times(&["Full=420", " 10K = 440"]).unwrap();
/// assert_eq!(starts.get("10K"), Some(440.0));
/// ```
pub fn parse_start_times<S: AsRef<str>>(items: &[S]) -> Result<StartTimes> {
    let mut start_times = StartTimes::new();
    for item in items {
        let item = item.as_ref();
        let (event, minutes) = item
            .split_once('=')
            .ok_or_else(|| CongestionError::InvalidStartTime(item.to_string()))?;
        let event = event.trim();
        if event.is_empty() {
            return Err(CongestionError::InvalidStartTime(item.to_string()));
        }
        let minutes: f64 = minutes
            .trim()
            .parse()
            .map_err(|_| CongestionError::InvalidStartTime(item.to_string()))?;
        if !minutes.is_finite() {
            return Err(CongestionError::InvalidStartTime(item.to_string()));
        }
        start_times.insert(event, minutes);
    }
    Ok(start_times)
}

/// Format minutes since midnight as `HH:MM:SS`, rounded to whole seconds.
///
/// ```
/// use run_congestion::format_clock;
/// assert_eq!(format_clock(425.5), "07:05:30");
/// ```
pub fn format_clock(minutes: f64) -> String {
    let total_seconds = (minutes * 60.0).round().max(0.0) as u64;
    let hours = total_seconds / 3600;
    let mins = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    format!("{hours:02}:{mins:02}:{secs:02}")
}

/// Sample positions `from, from + step, ...` up to and including `to`.
///
/// Positions are computed as `from + i * step` from an integer index so two
/// grids with the same origin and step produce bit-identical kilometres.
/// A degenerate range (`to <= from`) or a non-positive step yields the single
/// point `from`.
pub(crate) fn sample_grid(from: f64, to: f64, step: f64) -> Vec<f64> {
    let count = grid_len(from, to, step);
    (0..count).map(|i| from + i as f64 * step).collect()
}

/// Number of points `sample_grid` produces for the same arguments.
pub(crate) fn grid_len(from: f64, to: f64, step: f64) -> usize {
    if !step.is_finite() || step <= 0.0 || to <= from {
        return 1;
    }
    // Small epsilon keeps an exactly representable end point inside the grid
    ((to - from + 1e-9) / step).floor() as usize + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_includes_end_point() {
        let grid = sample_grid(0.0, 1.0, 0.1);
        assert_eq!(grid.len(), 11);
        assert!((grid[10] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn grid_stops_before_overshooting() {
        let grid = sample_grid(0.0, 1.0, 0.3);
        assert_eq!(grid.len(), 4);
        assert!(grid.iter().all(|&km| km <= 1.0 + 1e-9));
    }

    #[test]
    fn degenerate_grid_is_single_point() {
        assert_eq!(sample_grid(2.5, 2.5, 0.01), vec![2.5]);
        assert_eq!(sample_grid(2.5, 3.0, 0.0), vec![2.5]);
        assert_eq!(sample_grid(3.0, 2.5, 0.1), vec![3.0]);
    }
}
