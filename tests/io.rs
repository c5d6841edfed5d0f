//! Tests for CSV loading and summary export

use run_congestion::io::{
    SUMMARY_HEADERS, read_overlap_segments, read_overlaps_csv, read_pace_csv, read_pace_table,
    write_summary_csv, write_summary_csv_path,
};
use run_congestion::{
    AnalysisConfig, CongestionError, OverlapSegment, StartTimes, analyze_overlaps,
};
use std::fs;
use tempfile::tempdir;

const PACE_CSV: &str = "\
event,runner_id,pace,distance
Full,f1,6.0,42.2
Full,f2,6.0,42.2
10K,t1,5.0,10.0
10K,t2,5.0,10.0
";

const OVERLAPS_CSV: &str = "\
event,start,end,overlapswith,description
Full,0.0,1.0,10K,Start straight
Full,4.0,5.0,10K,
";

#[test]
fn test_read_pace_table() {
    let table = read_pace_table(PACE_CSV.as_bytes()).unwrap();
    assert_eq!(table.len(), 4);
    assert_eq!(table.events(), vec!["10K", "Full"]);
    assert_eq!(table.event_count("Full"), 2);
    assert_eq!(table.runners()[2].pace, 5.0);
}

#[test]
fn test_read_overlaps_with_description() {
    let segments = read_overlap_segments(OVERLAPS_CSV.as_bytes()).unwrap();
    assert_eq!(
        segments[0],
        OverlapSegment::new("Full", "10K", 0.0, 1.0).with_description("Start straight")
    );
    assert_eq!(segments[1].description, "");
}

#[test]
fn test_description_column_is_optional() {
    let segments =
        read_overlap_segments("Event,Start,End,OverlapsWith\nFull,0,2.5,Half\n".as_bytes())
            .unwrap();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].overlaps_with, "Half");
    assert_eq!(segments[0].end_km, 2.5);
}

#[test]
fn test_non_numeric_pace_reports_line() {
    let csv = "event,runner_id,pace,distance\n10K,1,5.5,10\n10K,2,fast,10\n";
    let err = read_pace_table(csv.as_bytes()).unwrap_err();
    match err {
        CongestionError::InvalidNumber {
            line, column, value, ..
        } => {
            assert_eq!(line, 3);
            assert_eq!(column, "pace");
            assert_eq!(value, "fast");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_overlaps_missing_columns() {
    let err = read_overlap_segments("event,start,end\nFull,0,1\n".as_bytes()).unwrap_err();
    assert!(err.is_input_error());
    assert!(err.to_string().contains("overlapswith"));
}

#[test]
fn test_files_round_trip_through_analysis() {
    let dir = tempdir().unwrap();
    let pace_path = dir.path().join("runners.csv");
    let overlaps_path = dir.path().join("overlaps.csv");
    let summary_path = dir.path().join("summary.csv");
    fs::write(&pace_path, PACE_CSV).unwrap();
    fs::write(&overlaps_path, OVERLAPS_CSV).unwrap();

    let pace = read_pace_csv(&pace_path).unwrap();
    let segments = read_overlaps_csv(&overlaps_path).unwrap();
    let starts: StartTimes = [("Full", 0.0), ("10K", 0.9)].into_iter().collect();
    let report = analyze_overlaps(&pace, &segments, &starts, &AnalysisConfig::default()).unwrap();

    write_summary_csv_path(&summary_path, &report.records).unwrap();
    let written = fs::read_to_string(&summary_path).unwrap();
    let mut lines = written.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("prev_event,curr_event,segment,description"));
    assert_eq!(lines.count(), report.records.len());
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    let err = read_pace_csv(dir.path().join("absent.csv")).unwrap_err();
    assert!(matches!(err, CongestionError::Io(_)));
    assert!(!err.is_input_error());
}

#[test]
fn test_empty_summary_still_has_header() {
    let mut out = Vec::new();
    write_summary_csv(&mut out, &[]).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text, format!("{}\n", SUMMARY_HEADERS.join(",")));
}

#[test]
fn test_summary_header_matches_record_fields() {
    let pace = read_pace_table(PACE_CSV.as_bytes()).unwrap();
    let segments = read_overlap_segments(OVERLAPS_CSV.as_bytes()).unwrap();
    let starts: StartTimes = [("Full", 0.0), ("10K", 0.9)].into_iter().collect();
    let report = analyze_overlaps(&pace, &segments, &starts, &AnalysisConfig::default()).unwrap();
    assert!(!report.records.is_empty());

    let mut out = Vec::new();
    write_summary_csv(&mut out, &report.records).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().next(), Some(SUMMARY_HEADERS.join(",").as_str()));
}

#[test]
fn test_non_positive_pace_is_rejected() {
    for bad in ["0", "-5", "0.0"] {
        let csv = format!("event,runner_id,pace,distance\nA,1,5.0,10\nA,2,{bad},10\n");
        match read_pace_table(csv.as_bytes()).unwrap_err() {
            CongestionError::InvalidNumber { line, column, value, .. } => {
                assert_eq!(line, 3);
                assert_eq!(column, "pace");
                assert_eq!(value, bad);
            }
            other => panic!("unexpected error for pace {bad}: {other}"),
        }
    }
}
