use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("{field} is missing")]
    MissingDate { field: &'static str },
    #[error("{field} '{value}' is not a valid date (expected YYYY-MM-DD)")]
    InvalidDate { field: &'static str, value: String },
    #[error("period ends on {end} before it starts on {start}")]
    InvertedPeriod { start: NaiveDate, end: NaiveDate },
    #[error("more than one period is marked current: {0:?}")]
    MultipleCurrentPeriods(Vec<String>),
    #[error("grade {id}: grade_kind {kind} requires {expected}")]
    GradeValueMismatch {
        id: String,
        kind: String,
        expected: &'static str,
    },
    #[error("grade {id}: numeric value {value} outside 0..=100")]
    NumericOutOfRange { id: String, value: f64 },
    #[error("unknown {what} '{value}'")]
    UnknownLabel { what: &'static str, value: String },
}
