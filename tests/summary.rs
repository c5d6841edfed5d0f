//! Tests for summary records and ranking

use run_congestion::{
    DetectionConfig, OverlapSegment, PaceTable, RankBy, Runner, SummaryRecord,
    build_summary_record, detect_segment_overlap, rank_records, render_summary,
};

fn record(name: &str, ratio: f64, intensity: u64) -> SummaryRecord {
    let pace = PaceTable::new(vec![
        Runner::new("A", "a1", 6.0, 10.0),
        Runner::new("B", "b1", 5.0, 10.0),
    ]);
    let cfg = DetectionConfig {
        step_km: 0.1,
        ..Default::default()
    };
    let segment = OverlapSegment::new("A", "B", 0.0, 1.0).with_description(name);
    let result = detect_segment_overlap(&pace, "A", "B", 0.0, 0.9, 0.0, 1.0, &cfg).unwrap();
    let mut record = build_summary_record(&segment, &result, 0.0, 0.9, &cfg);
    record.peak_congestion_ratio = ratio;
    record.intensity = intensity;
    record
}

fn order(records: &[SummaryRecord]) -> Vec<&str> {
    records.iter().map(|r| r.description.as_str()).collect()
}

#[test]
fn test_peak_ratio_ranks_acute_first() {
    let mut records = vec![record("low", 0.3, 500), record("high", 0.8, 10)];
    rank_records(&mut records, RankBy::PeakRatio);
    assert_eq!(order(&records), vec!["high", "low"]);
}

#[test]
fn test_intensity_ignores_ratio() {
    let mut records = vec![record("low", 0.3, 500), record("high", 0.8, 10)];
    rank_records(&mut records, RankBy::Intensity);
    assert_eq!(order(&records), vec!["low", "high"]);
}

#[test]
fn test_ranking_is_stable() {
    let mut records = vec![
        record("first", 0.5, 1),
        record("second", 0.5, 1),
        record("top", 0.9, 1),
        record("third", 0.5, 1),
    ];
    rank_records(&mut records, RankBy::PeakRatio);
    assert_eq!(order(&records), vec!["top", "first", "second", "third"]);

    rank_records(&mut records, RankBy::Intensity);
    assert_eq!(order(&records), vec!["top", "first", "second", "third"]);
}

#[test]
fn test_record_fields() {
    let r = record("Bridge", 1.0, 11);
    assert_eq!(r.prev_event, "A");
    assert_eq!(r.curr_event, "B");
    assert_eq!(r.segment, "0.00km-1.00km");
    assert_eq!(r.total_prev + r.total_curr, 2);
    assert_eq!(r.first_overlap_time, "00:00:00");
    assert_eq!(r.first_overlap_km, Some(0.0));
    assert_eq!(r.first_overlap_prev_runner, "a1");
    assert_eq!(r.distinct_pairs, 1);
}

#[test]
fn test_intensity_per_km_uses_segment_length() {
    let pace = PaceTable::new(vec![
        Runner::new("A", "a1", 6.0, 10.0),
        Runner::new("B", "b1", 5.0, 10.0),
    ]);
    let cfg = DetectionConfig {
        step_km: 0.1,
        ..Default::default()
    };
    let segment = OverlapSegment::new("A", "B", 0.0, 0.5);
    let result = detect_segment_overlap(&pace, "A", "B", 0.0, 0.9, 0.0, 0.5, &cfg).unwrap();
    let r = build_summary_record(&segment, &result, 0.0, 0.9, &cfg);
    // Six sampled steps, one pair each
    assert_eq!(r.intensity, 6);
    assert!((r.intensity_per_km - 12.0).abs() < 1e-9);
}

#[test]
fn test_render_summary_lines() {
    let mut records = vec![record("Bridge", 0.25, 12_345), record("", 0.5, 7)];
    rank_records(&mut records, RankBy::PeakRatio);
    let text = render_summary(&records, RankBy::PeakRatio);
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(
        lines[0],
        "Interaction Intensity Summary - ranked by peak congestion ratio (acute bottlenecks):"
    );
    assert!(lines[1].starts_with("01. A vs B 0.00km-1.00km: PeakRatio=50.00%"));
    assert!(lines[2].starts_with("02. A vs B 0.00km-1.00km (Bridge): PeakRatio=25.00%"));
    assert!(lines[2].contains("Intensity=12,345"));
}

#[test]
fn test_render_empty_summary() {
    assert_eq!(render_summary(&[], RankBy::Intensity), "");
}

#[test]
fn test_rank_by_parsing() {
    assert_eq!("peak_ratio".parse::<RankBy>().unwrap(), RankBy::PeakRatio);
    assert_eq!("Intensity".parse::<RankBy>().unwrap(), RankBy::Intensity);
    assert!("loudness".parse::<RankBy>().is_err());
    assert_eq!(RankBy::Intensity.to_string(), "intensity");
    assert_eq!(
        serde_json::to_string(&RankBy::PeakRatio).unwrap(),
        "\"peak_ratio\""
    );
}
