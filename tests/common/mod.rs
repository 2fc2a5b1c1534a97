#![allow(dead_code)]

use econmon_service::ingest::SeriesProvider;
use econmon_service::model::{EconError, RawObservation, SeriesCandidate};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory provider that records every request it receives.
pub struct MockProvider {
    pub search_results: HashMap<String, Vec<SeriesCandidate>>,
    pub series: HashMap<String, Vec<RawObservation>>,
    pub errors: HashMap<String, u16>,
    pub search_errors: HashMap<String, u16>,
    pub searches: Mutex<Vec<String>>,
    pub fetches: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            search_results: HashMap::new(),
            series: HashMap::new(),
            errors: HashMap::new(),
            search_errors: HashMap::new(),
            searches: Mutex::new(Vec::new()),
            fetches: Mutex::new(Vec::new()),
        }
    }

    pub fn with_search(mut self, query: &str, candidates: &[(&str, &str)]) -> Self {
        let candidates = candidates
            .iter()
            .map(|(id, title)| SeriesCandidate::new(id, title))
            .collect();
        self.search_results.insert(query.to_string(), candidates);
        self
    }

    pub fn with_series(mut self, series_id: &str, rows: &[(&str, &str)]) -> Self {
        let raw = rows.iter().map(|(d, v)| RawObservation::new(d, v)).collect();
        self.series.insert(series_id.to_string(), raw);
        self
    }

    /// Monthly observations for `months` starting January `year`.
    pub fn with_monthly(self, series_id: &str, year: i32, months: u32, base: f64) -> Self {
        let rows: Vec<(String, String)> = (0..months)
            .map(|i| {
                let y = year + (i / 12) as i32;
                let m = i % 12 + 1;
                (format!("{:04}-{:02}-01", y, m), format!("{}", base + i as f64))
            })
            .collect();
        let borrowed: Vec<(&str, &str)> =
            rows.iter().map(|(d, v)| (d.as_str(), v.as_str())).collect();
        self.with_series(series_id, &borrowed)
    }

    pub fn with_error(mut self, series_id: &str, status: u16) -> Self {
        self.errors.insert(series_id.to_string(), status);
        self
    }

    /// Makes the search for `query` fail with `status`.
    pub fn with_search_error(mut self, query: &str, status: u16) -> Self {
        self.search_errors.insert(query.to_string(), status);
        self
    }

    pub fn search_log(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }

    pub fn fetch_log(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }
}

impl SeriesProvider for MockProvider {
    fn search(&self, search_text: &str, _limit: u32) -> Result<Vec<SeriesCandidate>, EconError> {
        self.searches.lock().unwrap().push(search_text.to_string());
        if let Some(status) = self.search_errors.get(search_text) {
            return Err(EconError::Http(*status));
        }
        Ok(self.search_results.get(search_text).cloned().unwrap_or_default())
    }

    fn observations(&self, series_id: &str) -> Result<Vec<RawObservation>, EconError> {
        self.fetches.lock().unwrap().push(series_id.to_string());
        if let Some(status) = self.errors.get(series_id) {
            return Err(EconError::Http(*status));
        }
        // FRED answers 400 for unknown series ids.
        self.series.get(series_id).cloned().ok_or(EconError::Http(400))
    }
}
