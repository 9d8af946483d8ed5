//! Payload decoders for each console response the harvester understands.
//!
//! Decoders are pure: they take the raw body and return typed values or an
//! [`ExtractError`]. Deciding what to do with a failure is left to the caller.

pub mod dominant_release;
pub mod issues;
pub mod launch_time;
pub mod metrics_report;
pub mod play_anrs;

use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is missing {0}")]
    MissingField(&'static str),

    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

/// Read a count that the consoles send either as a JSON number or a numeric string.
/// Absent or null counts are zero.
pub(crate) fn count(value: Option<&Value>, field: &'static str) -> ExtractResult<u64> {
    match value {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n.as_u64().ok_or_else(|| ExtractError::InvalidValue {
            field,
            value: n.to_string(),
        }),
        Some(Value::String(s)) => s.trim().parse::<u64>().map_err(|_| ExtractError::InvalidValue {
            field,
            value: s.clone(),
        }),
        Some(other) => Err(ExtractError::InvalidValue {
            field,
            value: other.to_string(),
        }),
    }
}

/// Read a float sent either as a JSON number or a numeric string
pub(crate) fn float(value: Option<&Value>, field: &'static str) -> ExtractResult<f64> {
    match value {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| ExtractError::InvalidValue {
            field,
            value: n.to_string(),
        }),
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| ExtractError::InvalidValue {
            field,
            value: s.clone(),
        }),
        Some(other) => Err(ExtractError::InvalidValue {
            field,
            value: other.to_string(),
        }),
    }
}

/// Calendar date of an RFC 3339 timestamp, in the timestamp's own offset
pub(crate) fn timestamp_date(raw: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.date_naive())
}
