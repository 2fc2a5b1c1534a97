/// Observation, SeriesCandidate, EconError
/// core data structures and error handling
///
/// Core data types for the metro economic dashboard service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no logic beyond trivial accessors and no I/O.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Provider constants
// ---------------------------------------------------------------------------

/// Value the provider publishes for a period with no data.
pub const MISSING_VALUE_SENTINEL: &str = ".";

/// Text rendered in place of a missing value in tables and summaries.
pub const MISSING_CELL: &str = "\u{2014}";

// ---------------------------------------------------------------------------
// Observation types
// ---------------------------------------------------------------------------

/// A single cleaned data point of a series.
///
/// Dates are day-granular calendar dates; the provider reports monthly and
/// quarterly series on the first day of the period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

impl Observation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// One entry of the provider's `observations[]` array, exactly as sent.
///
/// `value` is a string because the provider uses `"."` for missing data.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawObservation {
    pub date: String,
    pub value: String,
}

impl RawObservation {
    pub fn new(date: &str, value: &str) -> Self {
        Self {
            date: date.to_string(),
            value: value.to_string(),
        }
    }
}

/// A series record returned by the provider's search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesCandidate {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub seasonal_adjustment: Option<String>,
}

impl SeriesCandidate {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            frequency: None,
            units: None,
            seasonal_adjustment: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when configuring, fetching or processing series.
///
/// A discovery miss (search returned nothing) is deliberately not an error:
/// the resolver reports it as `Ok(None)` and the region renders as no data.
#[derive(Debug, Clone, PartialEq)]
pub enum EconError {
    /// Missing API key or unreadable configuration. Blocks all fetching.
    Configuration(String),
    /// Non-2xx HTTP response from the provider.
    Http(u16),
    /// The request never produced a response (DNS, TLS, timeout, ...).
    Transport(String),
    /// The response body could not be deserialized.
    Parse(String),
    /// The indicator key is not in the registry.
    UnknownIndicator(String),
    /// The region code is not in the registry.
    UnknownRegion(String),
    /// The run finished but some requests or regions failed.
    Incomplete(String),
}

impl std::fmt::Display for EconError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EconError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            EconError::Http(code) => write!(f, "HTTP error: {}", code),
            EconError::Transport(msg) => write!(f, "Transport error: {}", msg),
            EconError::Parse(msg) => write!(f, "Parse error: {}", msg),
            EconError::UnknownIndicator(key) => write!(f, "Unknown indicator: {}", key),
            EconError::UnknownRegion(code) => write!(f, "Unknown region: {}", code),
            EconError::Incomplete(msg) => write!(f, "Incomplete: {}", msg),
        }
    }
}

impl std::error::Error for EconError {}

/// The request URL is stripped: FRED URLs carry the API key.
impl From<reqwest::Error> for EconError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => EconError::Http(status.as_u16()),
            None => EconError::Transport(err.without_url().to_string()),
        }
    }
}

impl From<serde_json::Error> for EconError {
    fn from(err: serde_json::Error) -> Self {
        EconError::Parse(err.to_string())
    }
}
