//! Stress tests on generated race fields
//!
//! Run with: cargo test --features synthetic --test synthetic_stress

#![cfg(feature = "synthetic")]

use run_congestion::synthetic::{SyntheticRace, random_pace_table};
use run_congestion::{
    AnalysisConfig, DetectionConfig, ExecutionMode, StartTimes, analyze_overlaps,
    detect_segment_overlap, detect_segment_overlap_full_scan,
};
use std::time::Instant;

#[test]
fn test_three_event_race_analysis() {
    let field = SyntheticRace::three_event(500, 42).generate();
    let started = Instant::now();
    let report = analyze_overlaps(
        &field.pace,
        &field.segments,
        &field.start_times,
        &AnalysisConfig::default(),
    )
    .unwrap();

    println!(
        "3 x 500 runners, {} records in {:?}",
        report.records.len(),
        started.elapsed()
    );
    assert!(report.skipped.is_empty());
    assert!(!report.records.is_empty());
    for record in &report.records {
        assert_eq!(record.total_prev, 500);
        assert_eq!(record.total_curr, 500);
        assert!(record.peak_congestion_ratio <= 1.0);
    }
}

#[test]
fn test_sequential_and_parallel_agree_at_scale() {
    let field = SyntheticRace::three_event(300, 7).generate();
    let parallel = analyze_overlaps(
        &field.pace,
        &field.segments,
        &field.start_times,
        &AnalysisConfig::default(),
    )
    .unwrap();
    let config = AnalysisConfig {
        execution_mode: ExecutionMode::Sequential,
        ..Default::default()
    };
    let sequential =
        analyze_overlaps(&field.pace, &field.segments, &field.start_times, &config).unwrap();
    assert_eq!(parallel.records, sequential.records);
}

#[test]
fn test_coarse_fine_matches_full_scan_on_random_fields() {
    let cfg = DetectionConfig {
        step_km: 0.02,
        ..Default::default()
    };
    for seed in 0..8 {
        let pace = random_pace_table(&["A", "B"], 150, (3.5, 8.0), seed);
        let gap = seed as f64 * 1.5;
        let fast = detect_segment_overlap(&pace, "A", "B", 0.0, gap, 0.0, 4.0, &cfg);
        let full = detect_segment_overlap_full_scan(&pace, "A", "B", 0.0, gap, 0.0, 4.0, &cfg)
            .unwrap();
        match fast {
            None => assert_eq!(full.cumulative_overlap_events, 0, "seed {seed}"),
            Some(fast) => {
                assert_eq!(fast.cumulative_overlap_events, full.cumulative_overlap_events, "seed {seed}");
                assert_eq!(fast.peak_congestion, full.peak_congestion, "seed {seed}");
                assert_eq!(fast.unique_overlapping_pairs, full.unique_overlapping_pairs, "seed {seed}");
                assert_eq!(fast.first_overlap, full.first_overlap, "seed {seed}");
            }
        }
    }
}

#[test]
fn test_wide_gap_finds_nothing() {
    let field = SyntheticRace::two_event(1000, 120.0, 3).generate();
    let starts: &StartTimes = &field.start_times;
    let result = detect_segment_overlap(
        &field.pace,
        "A",
        "B",
        starts.get("A").unwrap(),
        starts.get("B").unwrap(),
        0.0,
        5.0,
        &DetectionConfig::default(),
    );
    // B starts two hours later: the pre-filter leaves nobody in reach
    assert!(result.is_none_or(|r| !r.has_overlap()));
}
