/// FRED (Federal Reserve Economic Data) API Client
///
/// Retrieves series metadata and observations from the St. Louis Fed's
/// public API. Only two endpoints are used:
///
/// - `series/search` for discovery of series ids that cannot be derived
///   from a naming pattern
/// - `series/observations` for the data itself
///
/// API Documentation: https://fred.stlouisfed.org/docs/api/fred/

use serde::Deserialize;
use std::time::Duration;

use crate::config::Config;
use crate::ingest::SeriesProvider;
use crate::logging::{self, Component};
use crate::model::{EconError, RawObservation, SeriesCandidate};

// ============================================================================
// FRED API Response Structures
// ============================================================================

/// `series/search` response. The field name really is `seriess`.
#[derive(Debug, Deserialize)]
pub struct FredSearchResponse {
    #[serde(default)]
    pub seriess: Vec<SeriesCandidate>,
}

/// `series/observations` response.
#[derive(Debug, Deserialize)]
pub struct FredObservationsResponse {
    pub observations: Vec<RawObservation>,
}

/// Body FRED sends alongside 4xx statuses.
#[derive(Debug, Deserialize)]
pub struct FredErrorResponse {
    pub error_code: u16,
    pub error_message: String,
}

// ============================================================================
// URL Construction
// ============================================================================

/// Builds the search URL. `search_text` is percent-encoded.
pub fn build_search_url(
    base_url: &str,
    search_text: &str,
    limit: u32,
    api_key: &str,
) -> Result<reqwest::Url, EconError> {
    let limit = limit.to_string();
    reqwest::Url::parse_with_params(
        &format!("{}/series/search", base_url.trim_end_matches('/')),
        &[
            ("search_text", search_text),
            ("limit", limit.as_str()),
            ("api_key", api_key),
            ("file_type", "json"),
        ],
    )
    .map_err(|e| EconError::Configuration(format!("invalid base URL '{}': {}", base_url, e)))
}

/// Builds the observations URL for one series id.
pub fn build_observations_url(
    base_url: &str,
    series_id: &str,
    api_key: &str,
) -> Result<reqwest::Url, EconError> {
    reqwest::Url::parse_with_params(
        &format!("{}/series/observations", base_url.trim_end_matches('/')),
        &[
            ("series_id", series_id),
            ("api_key", api_key),
            ("file_type", "json"),
        ],
    )
    .map_err(|e| EconError::Configuration(format!("invalid base URL '{}': {}", base_url, e)))
}

/// The URL with the `api_key` value masked, safe for logs.
pub fn redact_api_key(url: &reqwest::Url) -> String {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "api_key" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

// ============================================================================
// Response Parsing
// ============================================================================

pub fn parse_search_response(body: &str) -> Result<Vec<SeriesCandidate>, EconError> {
    let response: FredSearchResponse = serde_json::from_str(body)?;
    Ok(response.seriess)
}

pub fn parse_observations_response(body: &str) -> Result<Vec<RawObservation>, EconError> {
    let response: FredObservationsResponse = serde_json::from_str(body)?;
    Ok(response.observations)
}

/// Extracts FRED's error message from a failed response body, if any.
pub fn parse_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<FredErrorResponse>(body)
        .ok()
        .map(|e| format!("{} ({})", e.error_message, e.error_code))
}

// ============================================================================
// API Client
// ============================================================================

/// Blocking FRED client. Cheap to share by reference across threads.
pub struct FredClient {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl FredClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, EconError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EconError::Configuration(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Builds a client from configuration. Fails without an API key.
    pub fn from_config(config: &Config) -> Result<Self, EconError> {
        let api_key = config.api_key()?;
        Self::new(
            &config.fred.base_url,
            api_key,
            Duration::from_secs(config.fred.timeout_secs),
        )
    }

    /// GETs `url` and returns the body of a 2xx response.
    fn get_body(&self, url: reqwest::Url) -> Result<String, EconError> {
        let redacted = redact_api_key(&url);
        logging::debug(Component::Fred, None, &format!("GET {}", redacted));

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| match EconError::from(e) {
                EconError::Transport(msg) => EconError::Transport(format!("{} ({})", msg, redacted)),
                other => other,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            if let Some(message) = parse_error_message(&body) {
                logging::debug(Component::Fred, None, &format!("{} -> {}", redacted, message));
            }
            return Err(EconError::Http(status.as_u16()));
        }

        Ok(response.text()?)
    }
}

impl SeriesProvider for FredClient {
    fn search(&self, search_text: &str, limit: u32) -> Result<Vec<SeriesCandidate>, EconError> {
        let url = build_search_url(&self.base_url, search_text, limit, &self.api_key)?;
        let body = self.get_body(url)?;
        parse_search_response(&body)
    }

    fn observations(&self, series_id: &str) -> Result<Vec<RawObservation>, EconError> {
        let url = build_observations_url(&self.base_url, series_id, &self.api_key)?;
        let body = self.get_body(url)?;
        parse_observations_response(&body)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_BASE_URL;

    #[test]
    fn test_search_url_encodes_query_text() {
        let url = build_search_url(
            DEFAULT_BASE_URL,
            "Atlanta–Sandy Springs–Roswell, GA Unemployment Rate",
            10,
            "KEY",
        )
        .expect("default base URL is valid");

        assert_eq!(url.path(), "/fred/series/search");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&(
            "search_text".to_string(),
            "Atlanta–Sandy Springs–Roswell, GA Unemployment Rate".to_string()
        )));
        assert!(pairs.contains(&("limit".to_string(), "10".to_string())));
        assert!(pairs.contains(&("file_type".to_string(), "json".to_string())));
        assert!(!url.as_str().contains(' '), "spaces must be encoded");
    }

    #[test]
    fn test_observations_url_tolerates_trailing_slash() {
        let url = build_observations_url("https://api.stlouisfed.org/fred/", "ACTLISCOU33100", "KEY")
            .unwrap();
        assert_eq!(url.path(), "/fred/series/observations");
        assert!(url.as_str().contains("series_id=ACTLISCOU33100"));
    }

    #[test]
    fn test_invalid_base_url_is_configuration_error() {
        let result = build_observations_url("not a url", "X", "KEY");
        assert!(matches!(result, Err(EconError::Configuration(_))));
    }

    #[test]
    fn test_redact_api_key_masks_only_the_key() {
        let url = build_observations_url(DEFAULT_BASE_URL, "ACTLISCOU33100", "secret").unwrap();
        let redacted = redact_api_key(&url);
        assert!(!redacted.contains("secret"));
        assert!(redacted.contains("series_id=ACTLISCOU33100"));
    }

    #[test]
    fn test_parse_search_response() {
        let body = r#"{
            "realtime_start": "2024-05-01",
            "count": 2,
            "seriess": [
                {"id": "LAUMT131206000000003", "title": "Unemployment Rate in Atlanta-Sandy Springs-Roswell, GA (MSA)",
                 "frequency": "Monthly", "units": "Percent", "seasonal_adjustment": "Not Seasonally Adjusted"},
                {"id": "ATLA013UR", "title": "Unemployment Rate in Atlanta"}
            ]
        }"#;
        let candidates = parse_search_response(body).expect("valid search body");
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].id, "LAUMT131206000000003");
        assert_eq!(candidates[0].frequency.as_deref(), Some("Monthly"));
    }

    #[test]
    fn test_parse_search_response_without_results() {
        assert!(parse_search_response(r#"{"count": 0}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_observations_response_keeps_sentinels() {
        // Cleaning happens in the fetcher, not here.
        let body = r#"{"observations": [
            {"realtime_start": "2024-05-01", "realtime_end": "2024-05-01", "date": "2024-01-01", "value": "100"},
            {"realtime_start": "2024-05-01", "realtime_end": "2024-05-01", "date": "2024-02-01", "value": "."}
        ]}"#;
        let raw = parse_observations_response(body).unwrap();
        assert_eq!(raw, vec![
            RawObservation::new("2024-01-01", "100"),
            RawObservation::new("2024-02-01", "."),
        ]);
    }

    #[test]
    fn test_parse_observations_response_rejects_garbage() {
        let result = parse_observations_response("<html>Service Unavailable</html>");
        assert!(matches!(result, Err(EconError::Parse(_))));
    }

    #[test]
    fn test_parse_error_message() {
        let body = r#"{"error_code":400,"error_message":"Bad Request.  The series does not exist."}"#;
        assert_eq!(
            parse_error_message(body).as_deref(),
            Some("Bad Request.  The series does not exist. (400)")
        );
        assert!(parse_error_message("").is_none());
    }

    #[test]
    fn test_client_requires_api_key() {
        let config = Config::default();
        assert!(matches!(
            FredClient::from_config(&config),
            Err(EconError::Configuration(_))
        ));
    }

    #[test]
    fn test_transport_error_never_carries_api_key() {
        // Nothing listens on port 1, so the request fails before any response.
        let client = FredClient::new("http://127.0.0.1:1/fred", "SECRETKEY123", Duration::from_secs(2))
            .expect("client should build");

        let err = client
            .observations("ACTLISCOU33100")
            .expect_err("connection must be refused");

        let message = err.to_string();
        assert!(matches!(err, EconError::Transport(_)), "got {:?}", err);
        assert!(!message.contains("SECRETKEY123"), "key leaked: {}", message);
        assert!(message.contains("api_key=***"), "redacted URL expected: {}", message);
    }
}
