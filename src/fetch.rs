/// Series fetching, cleaning and the session series cache.
///
/// Raw provider records are turned into a chronologically sorted sequence of
/// `Observation`s: missing-value sentinels are dropped (never transformed),
/// the indicator's value transform is applied to everything that remains,
/// and duplicate dates collapse to the last record seen.

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

use crate::indicators::Indicator;
use crate::ingest::SeriesProvider;
use crate::logging::{self, Component};
use crate::model::{EconError, MISSING_VALUE_SENTINEL, Observation, RawObservation};

// ---------------------------------------------------------------------------
// Cleaning
// ---------------------------------------------------------------------------

/// Cleans raw records for one series.
///
/// Records with the `"."` sentinel are dropped silently. Records whose date
/// or value does not parse are dropped with a warning; one malformed row
/// should not cost the whole series.
pub fn clean_observations(
    series_id: &str,
    raw: &[RawObservation],
    transform: Option<fn(f64) -> f64>,
) -> Vec<Observation> {
    let mut by_date: HashMap<NaiveDate, f64> = HashMap::with_capacity(raw.len());
    let mut malformed = 0usize;

    for record in raw {
        let value = record.value.trim();
        if value == MISSING_VALUE_SENTINEL {
            continue;
        }

        let date = match NaiveDate::parse_from_str(record.date.trim(), "%Y-%m-%d") {
            Ok(d) => d,
            Err(_) => {
                malformed += 1;
                continue;
            }
        };
        let value: f64 = match value.parse() {
            Ok(v) if f64::is_finite(v) => v,
            _ => {
                malformed += 1;
                continue;
            }
        };

        let value = match transform {
            Some(f) => f(value),
            None => value,
        };
        by_date.insert(date, value);
    }

    if malformed > 0 {
        logging::warn(
            Component::Fred,
            Some(series_id),
            &format!("dropped {} malformed observation(s)", malformed),
        );
    }

    let mut cleaned: Vec<Observation> = by_date
        .into_iter()
        .map(|(date, value)| Observation::new(date, value))
        .collect();
    cleaned.sort_by_key(|o| o.date);
    cleaned
}

// ---------------------------------------------------------------------------
// Fetching
// ---------------------------------------------------------------------------

/// Fetches and cleans one series. Not retried on failure.
pub fn fetch_series<P: SeriesProvider + ?Sized>(
    provider: &P,
    series_id: &str,
    indicator: &Indicator,
) -> Result<Vec<Observation>, EconError> {
    let raw = provider.observations(series_id)?;
    let cleaned = clean_observations(series_id, &raw, indicator.transform_value);
    logging::debug(
        Component::Fred,
        Some(series_id),
        &format!("{} raw -> {} cleaned observations", raw.len(), cleaned.len()),
    );
    Ok(cleaned)
}

/// Fetches every id not in `already_cached`, one thread per series.
///
/// Each id is fetched at most once even if it appears several times (two
/// regions may share a series). Failures are returned per id and never
/// abort the other fetches.
pub fn fetch_missing<P: SeriesProvider + ?Sized>(
    provider: &P,
    series_ids: &[String],
    already_cached: &HashSet<String>,
    indicator: &Indicator,
) -> Vec<(String, Result<Vec<Observation>, EconError>)> {
    let mut seen = HashSet::new();
    let pending: Vec<&String> = series_ids
        .iter()
        .filter(|id| !already_cached.contains(*id))
        .filter(|id| seen.insert(id.as_str()))
        .collect();

    std::thread::scope(|scope| {
        let handles: Vec<_> = pending
            .iter()
            .map(|id| {
                let id = (*id).clone();
                scope.spawn(move || {
                    let result = fetch_series(provider, &id, indicator);
                    (id, result)
                })
            })
            .collect();

        handles
            .into_iter()
            .zip(pending.iter())
            .map(|(handle, id)| {
                handle.join().unwrap_or_else(|_| {
                    ((*id).clone(), Err(EconError::Transport("fetch thread panicked".to_string())))
                })
            })
            .collect()
    })
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// Series id → cleaned observations, for the lifetime of one indicator.
///
/// Keyed by series id rather than by indicator and region, so two regions
/// that resolve to the same id share one entry.
#[derive(Debug, Clone, Default)]
pub struct SeriesCache {
    entries: HashMap<String, Vec<Observation>>,
}

impl SeriesCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, series_id: &str) -> bool {
        self.entries.contains_key(series_id)
    }

    pub fn get(&self, series_id: &str) -> Option<&[Observation]> {
        self.entries.get(series_id).map(Vec::as_slice)
    }

    /// Inserts a series unless it is already cached. Returns whether it was
    /// inserted; cached series are never replaced.
    pub fn insert(&mut self, series_id: &str, observations: Vec<Observation>) -> bool {
        if self.entries.contains_key(series_id) {
            return false;
        }
        self.entries.insert(series_id.to_string(), observations);
        true
    }

    pub fn ids(&self) -> HashSet<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::find_indicator;
    use crate::model::SeriesCandidate;
    use std::sync::Mutex;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    struct StubProvider {
        series: HashMap<String, Vec<RawObservation>>,
        calls: Mutex<Vec<String>>,
    }

    impl StubProvider {
        fn new() -> Self {
            Self { series: HashMap::new(), calls: Mutex::new(Vec::new()) }
        }

        fn with(mut self, id: &str, rows: &[(&str, &str)]) -> Self {
            let raw = rows.iter().map(|(d, v)| RawObservation::new(d, v)).collect();
            self.series.insert(id.to_string(), raw);
            self
        }
    }

    impl SeriesProvider for StubProvider {
        fn search(&self, _: &str, _: u32) -> Result<Vec<SeriesCandidate>, EconError> {
            Ok(Vec::new())
        }

        fn observations(&self, series_id: &str) -> Result<Vec<RawObservation>, EconError> {
            self.calls.lock().unwrap().push(series_id.to_string());
            self.series.get(series_id).cloned().ok_or(EconError::Http(400))
        }
    }

    #[test]
    fn test_sentinel_rows_are_dropped() {
        let raw = vec![
            RawObservation::new("2024-01-01", "100"),
            RawObservation::new("2024-02-01", "."),
        ];
        let cleaned = clean_observations("ACTLISCOU33100", &raw, None);
        assert_eq!(cleaned, vec![Observation::new(date("2024-01-01"), 100.0)]);
    }

    #[test]
    fn test_output_is_sorted_ascending() {
        let raw = vec![
            RawObservation::new("2024-03-01", "3"),
            RawObservation::new("2024-01-01", "1"),
            RawObservation::new("2024-02-01", "2"),
        ];
        let cleaned = clean_observations("X", &raw, None);
        let dates: Vec<NaiveDate> = cleaned.iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![date("2024-01-01"), date("2024-02-01"), date("2024-03-01")]);
    }

    #[test]
    fn test_duplicate_dates_collapse_to_last_record() {
        let raw = vec![
            RawObservation::new("2024-01-01", "1"),
            RawObservation::new("2024-01-01", "2"),
        ];
        let cleaned = clean_observations("X", &raw, None);
        assert_eq!(cleaned, vec![Observation::new(date("2024-01-01"), 2.0)]);
    }

    #[test]
    fn test_transform_applies_only_to_retained_rows() {
        let emp = find_indicator("EMP_RATE").unwrap();
        let raw = vec![
            RawObservation::new("2024-01-01", "5.0"),
            RawObservation::new("2024-02-01", "."),
        ];
        let cleaned = clean_observations("LAUMT131206000000003", &raw, emp.transform_value);
        assert_eq!(cleaned, vec![Observation::new(date("2024-01-01"), 95.0)]);
    }

    #[test]
    fn test_malformed_rows_are_dropped() {
        let raw = vec![
            RawObservation::new("2024-01-01", "n/a"),
            RawObservation::new("January", "4"),
            RawObservation::new("2024-03-01", "NaN"),
            RawObservation::new("2024-04-01", " 7.5 "),
        ];
        let cleaned = clean_observations("X", &raw, None);
        assert_eq!(cleaned, vec![Observation::new(date("2024-04-01"), 7.5)]);
    }

    #[test]
    fn test_fetch_missing_skips_cached_and_duplicate_ids() {
        let provider = StubProvider::new()
            .with("A", &[("2024-01-01", "1")])
            .with("B", &[("2024-01-01", "2")]);
        let housing = find_indicator("HOUSING").unwrap();
        let cached: HashSet<String> = ["A".to_string()].into_iter().collect();
        let ids = vec!["A".to_string(), "B".to_string(), "B".to_string()];

        let results = fetch_missing(&provider, &ids, &cached, housing);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "B");
        assert_eq!(provider.calls.lock().unwrap().as_slice(), ["B".to_string()]);
    }

    #[test]
    fn test_fetch_missing_tolerates_partial_failure() {
        let provider = StubProvider::new().with("A", &[("2024-01-01", "1")]);
        let housing = find_indicator("HOUSING").unwrap();
        let ids = vec!["A".to_string(), "MISSING".to_string()];

        let results: HashMap<_, _> = fetch_missing(&provider, &ids, &HashSet::new(), housing)
            .into_iter()
            .collect();

        assert!(results["A"].is_ok());
        assert_eq!(results["MISSING"], Err(EconError::Http(400)));
    }

    #[test]
    fn test_cache_never_replaces_entries() {
        let mut cache = SeriesCache::new();
        assert!(cache.insert("A", vec![Observation::new(date("2024-01-01"), 1.0)]));
        assert!(!cache.insert("A", Vec::new()));
        assert_eq!(cache.get("A").map(|s| s.len()), Some(1));
        cache.clear();
        assert!(cache.is_empty());
    }
}
