//! Tests for segment selection and overlap-table validation

use run_congestion::{
    CongestionError, OverlapSegment, SegmentSelection, StartTimes, ValidationIssue,
    filter_overlap_segments, validate_overlap_segments,
};

fn declared() -> Vec<OverlapSegment> {
    vec![
        OverlapSegment::new("10K", "Half", 0.0, 2.74).with_description("Start"),
        OverlapSegment::new("10K", "Half", 5.81, 8.10).with_description("Bridge"),
        OverlapSegment::new("Full", "10K", 29.03, 37.0).with_description("Loop"),
    ]
}

#[test]
fn test_parse_selection() {
    let sel: SegmentSelection = "10K:5.81-8.10".parse().unwrap();
    assert_eq!(sel, SegmentSelection::new("10K", 5.81, 8.10));

    let en_dash: SegmentSelection = " Full : 29.03\u{2013}37.00 ".parse().unwrap();
    assert_eq!(en_dash, SegmentSelection::new("Full", 29.03, 37.0));
}

#[test]
fn test_parse_selection_errors() {
    for bad in ["10K", "10K:5.81", ":1-2", "10K:a-2"] {
        let err = bad.parse::<SegmentSelection>().unwrap_err();
        assert!(
            matches!(err, CongestionError::InvalidSegmentSpec { .. }),
            "{bad} should be rejected"
        );
    }
}

#[test]
fn test_empty_selection_keeps_all() {
    assert_eq!(filter_overlap_segments(&declared(), &[]).unwrap(), declared());
}

#[test]
fn test_selection_keeps_intersecting_rows() {
    let selections = vec![
        SegmentSelection::new("10K", 6.0, 7.0),
        SegmentSelection::new("10K", 8.0, 9.0),
    ];
    let kept = filter_overlap_segments(&declared(), &selections).unwrap();
    // Both selections hit the Bridge row; it is kept once
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].description, "Bridge");
}

#[test]
fn test_touching_ranges_intersect() {
    let sel = SegmentSelection::new("10K", 2.74, 3.0);
    assert!(sel.intersects(0.0, 2.74));
    assert!(!sel.intersects(3.01, 4.0));
}

#[test]
fn test_misses_list_valid_ranges() {
    let selections = vec![
        SegmentSelection::new("10K", 3.0, 4.0),
        SegmentSelection::new("Relay", 0.0, 1.0),
    ];
    let err = filter_overlap_segments(&declared(), &selections).unwrap_err();
    let CongestionError::SegmentSelection { messages } = err else {
        panic!("expected a selection error");
    };
    let text = messages.join("\n");
    assert!(text.contains("- 10K:3.00-4.00"));
    assert!(text.contains("No overlapping range for 10K (3.00-4.00)"));
    assert!(text.contains("   - 10K:0.00-2.74 (Start)"));
    assert!(text.contains("   - 10K:5.81-8.10 (Bridge)"));
    assert!(text.contains("No such event in overlaps: Relay"));
}

#[test]
fn test_validation_flags_direction_and_duplicates() {
    let starts: StartTimes = [("Full", 420.0), ("10K", 440.0), ("Half", 460.0)]
        .into_iter()
        .collect();
    let mut rows = declared();
    rows.push(OverlapSegment::new("Half", "10K", 1.0, 2.0));
    rows.push(OverlapSegment::new("10K", "Half", 0.0, 2.74));

    let issues = validate_overlap_segments(&rows, &starts);
    assert_eq!(issues.len(), 2);
    assert!(matches!(
        &issues[0],
        ValidationIssue::WrongDirection { event, .. } if event == "Half"
    ));
    assert!(matches!(
        &issues[1],
        ValidationIssue::Duplicate { occurrences: 2, .. }
    ));
    assert!(issues[1].to_string().contains("duplicated 2 times"));
}

#[test]
fn test_validation_clean_table() {
    let starts: StartTimes = [("Full", 420.0), ("10K", 440.0), ("Half", 460.0)]
        .into_iter()
        .collect();
    assert!(validate_overlap_segments(&declared(), &starts).is_empty());
}
