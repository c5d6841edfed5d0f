//! Unified error handling.
//!
//! Only malformed input structure is an error. "No overlap found" and
//! "no runners present" are ordinary values (`None` or a zero result) and
//! never surface here.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CongestionError>;

#[derive(Error, Debug)]
pub enum CongestionError {
    /// A table is missing one or more required columns.
    #[error("{table} table is missing required columns {missing:?} (found: {found:?})")]
    MissingColumns {
        table: &'static str,
        missing: Vec<String>,
        found: Vec<String>,
    },

    /// A cell that must be numeric could not be parsed.
    #[error("{table} table line {line}: column '{column}' has non-numeric value '{value}'")]
    InvalidNumber {
        table: &'static str,
        line: u64,
        column: String,
        value: String,
    },

    #[error("invalid start time spec '{0}', expected Event=minutes_since_midnight")]
    InvalidStartTime(String),

    /// Raised only in strict mode; the default policy skips the row.
    #[error("event '{event}' has no start time")]
    UnknownEvent { event: String },

    #[error("invalid segment spec '{spec}': {reason}")]
    InvalidSegmentSpec { spec: String, reason: String },

    /// A segment selection did not match the declared overlap rows.
    #[error("requested segments did not match declared overlap segments:\n{}", messages.join("\n"))]
    SegmentSelection { messages: Vec<String> },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("no density steps to roll up")]
    EmptySteps,

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CongestionError {
    /// Whether the error comes from malformed input data rather than
    /// from the environment (I/O) or from parameters.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CongestionError::MissingColumns { .. }
                | CongestionError::InvalidNumber { .. }
                | CongestionError::InvalidStartTime(_)
                | CongestionError::InvalidSegmentSpec { .. }
                | CongestionError::SegmentSelection { .. }
                | CongestionError::Csv(_)
        )
    }
}

/// Extension for turning missing lookups into crate errors.
pub trait OptionExt<T> {
    /// Map `None` to [`CongestionError::UnknownEvent`].
    fn ok_or_unknown_event(self, event: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_unknown_event(self, event: &str) -> Result<T> {
        self.ok_or_else(|| CongestionError::UnknownEvent {
            event: event.to_string(),
        })
    }
}
