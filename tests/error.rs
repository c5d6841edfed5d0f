//! Tests for error display and classification

use run_congestion::{CongestionError, OptionExt, parse_start_times};

#[test]
fn test_missing_columns_display() {
    let err = CongestionError::MissingColumns {
        table: "pace",
        missing: vec!["distance".to_string()],
        found: vec!["event".to_string(), "pace".to_string()],
    };
    let msg = err.to_string();
    assert!(msg.starts_with("pace table is missing required columns"));
    assert!(msg.contains("\"distance\""));
    assert!(err.is_input_error());
}

#[test]
fn test_selection_error_lists_every_message() {
    let err = CongestionError::SegmentSelection {
        messages: vec!["Requested segments:".to_string(), "- 10K:1.00-2.00".to_string()],
    };
    assert!(err.to_string().ends_with("Requested segments:\n- 10K:1.00-2.00"));
}

#[test]
fn test_parameter_errors_are_not_input_errors() {
    assert!(!CongestionError::InvalidParameter("step_km".to_string()).is_input_error());
    assert!(!CongestionError::EmptySteps.is_input_error());
    assert!(
        !CongestionError::UnknownEvent {
            event: "Relay".to_string()
        }
        .is_input_error()
    );
}

#[test]
fn test_option_ext_names_event() {
    let found: Option<f64> = Some(420.0);
    assert_eq!(found.ok_or_unknown_event("Full").unwrap(), 420.0);

    let err = None::<f64>.ok_or_unknown_event("Relay").unwrap_err();
    assert_eq!(err.to_string(), "event 'Relay' has no start time");
}

#[test]
fn test_json_errors_convert() {
    let err: CongestionError = serde_json::from_str::<u32>("nope").unwrap_err().into();
    assert!(matches!(err, CongestionError::Json(_)));
}

#[test]
fn test_start_time_error_keeps_input() {
    let err = parse_start_times(&["Full:420"]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid start time spec 'Full:420', expected Event=minutes_since_midnight"
    );
}
