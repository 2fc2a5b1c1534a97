//! Alignment of several series onto one date axis.
//!
//! Series published by different programs rarely share a calendar: one
//! metro may be missing a month another has. Alignment takes the sorted
//! union of every date and gives each region one slot per date, holding
//! `None` where that region has no observation. Missing is never zero;
//! line charts skip or bridge the gap and tables render an em dash.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use crate::colors::region_color;
use crate::model::Observation;
use crate::regions::Region;

/// Dates kept in the recent window used by comparison views.
pub const RECENT_WINDOW: usize = 12;

/// Rows shown when a single region is selected.
pub const SINGLE_TABLE_ROWS: usize = 50;

/// One region's series going into alignment. `observations` is `None` when
/// the region has no series (discovery miss or failed fetch).
#[derive(Debug, Clone, Copy)]
pub struct SeriesInput<'a> {
    pub region: &'a Region,
    pub observations: Option<&'a [Observation]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionValues {
    pub region_code: String,
    pub region_name: String,
    pub color: String,
    /// One slot per axis date.
    pub values: Vec<Option<f64>>,
}

/// A dense date axis plus per-region values.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AlignedSeries {
    pub dates: Vec<NaiveDate>,
    pub per_region: Vec<RegionValues>,
}

impl AlignedSeries {
    /// The last `n` axis dates, with every region sliced to match.
    pub fn recent_window(&self, n: usize) -> AlignedSeries {
        let start = self.dates.len().saturating_sub(n);
        AlignedSeries {
            dates: self.dates[start..].to_vec(),
            per_region: self
                .per_region
                .iter()
                .map(|r| RegionValues {
                    values: r.values[start..].to_vec(),
                    ..r.clone()
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Sorted union of all dates in all inputs.
pub fn unified_dates(inputs: &[SeriesInput<'_>]) -> Vec<NaiveDate> {
    inputs
        .iter()
        .filter_map(|input| input.observations)
        .flat_map(|obs| obs.iter().map(|o| o.date))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Full-history alignment. Region order follows `inputs`.
pub fn align(inputs: &[SeriesInput<'_>]) -> AlignedSeries {
    let dates = unified_dates(inputs);

    let per_region = inputs
        .iter()
        .map(|input| {
            let lookup: HashMap<NaiveDate, f64> = input
                .observations
                .unwrap_or_default()
                .iter()
                .map(|o| (o.date, o.value))
                .collect();
            RegionValues {
                region_code: input.region.code.to_string(),
                region_name: input.region.name.to_string(),
                color: region_color(input.region.code),
                values: dates.iter().map(|d| lookup.get(d).copied()).collect(),
            }
        })
        .collect();

    AlignedSeries { dates, per_region }
}

// ---------------------------------------------------------------------------
// Tables and summaries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub date: NaiveDate,
    /// One cell per selected region, in selection order.
    pub values: Vec<Option<f64>>,
}

/// The table the presentation layer shows under the charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum TableView {
    /// Nothing selected.
    Empty,
    /// One region: its own most recent observations, oldest first.
    Single {
        region_code: String,
        rows: Vec<Observation>,
    },
    /// Several regions: the recent window pivoted by region, oldest first.
    Multi {
        region_codes: Vec<String>,
        rows: Vec<TableRow>,
    },
}

pub fn build_table(inputs: &[SeriesInput<'_>], aligned: &AlignedSeries) -> TableView {
    match inputs {
        [] => TableView::Empty,
        [only] => {
            let observations = only.observations.unwrap_or_default();
            let start = observations.len().saturating_sub(SINGLE_TABLE_ROWS);
            TableView::Single {
                region_code: only.region.code.to_string(),
                rows: observations[start..].to_vec(),
            }
        }
        _ => {
            let recent = aligned.recent_window(RECENT_WINDOW);
            let rows = recent
                .dates
                .iter()
                .enumerate()
                .map(|(i, date)| TableRow {
                    date: *date,
                    values: recent.per_region.iter().map(|r| r.values[i]).collect(),
                })
                .collect();
            TableView::Multi {
                region_codes: recent.per_region.iter().map(|r| r.region_code.clone()).collect(),
                rows,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestValue {
    pub region_code: String,
    pub region_name: String,
    pub latest: Option<Observation>,
}

/// Most recent observation per region, in input order.
pub fn latest_values(inputs: &[SeriesInput<'_>]) -> Vec<LatestValue> {
    inputs
        .iter()
        .map(|input| LatestValue {
            region_code: input.region.code.to_string(),
            region_name: input.region.name.to_string(),
            latest: input.observations.and_then(|obs| obs.last().copied()),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regions::find_region;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn monthly(year: i32, months: std::ops::RangeInclusive<u32>, base: f64) -> Vec<Observation> {
        months
            .map(|m| Observation::new(NaiveDate::from_ymd_opt(year, m, 1).unwrap(), base + m as f64))
            .collect()
    }

    #[test]
    fn test_union_of_dates_is_sorted_and_deduplicated() {
        let miami = find_region("33100").unwrap();
        let tampa = find_region("45300").unwrap();
        let a = vec![
            Observation::new(date("2024-01-01"), 1.0),
            Observation::new(date("2024-03-01"), 3.0),
        ];
        let b = vec![
            Observation::new(date("2024-02-01"), 20.0),
            Observation::new(date("2024-03-01"), 30.0),
        ];
        let inputs = [
            SeriesInput { region: miami, observations: Some(a.as_slice()) },
            SeriesInput { region: tampa, observations: Some(b.as_slice()) },
        ];

        let aligned = align(&inputs);

        assert_eq!(aligned.dates, vec![date("2024-01-01"), date("2024-02-01"), date("2024-03-01")]);
        assert_eq!(aligned.per_region[0].values, vec![Some(1.0), None, Some(3.0)]);
        assert_eq!(aligned.per_region[1].values, vec![None, Some(20.0), Some(30.0)]);
    }

    #[test]
    fn test_region_without_series_is_all_missing() {
        let miami = find_region("33100").unwrap();
        let atlanta = find_region("12060").unwrap();
        let a = monthly(2024, 1..=3, 0.0);
        let inputs = [
            SeriesInput { region: miami, observations: Some(a.as_slice()) },
            SeriesInput { region: atlanta, observations: None },
        ];

        let aligned = align(&inputs);

        assert_eq!(aligned.per_region[1].values, vec![None, None, None]);
        assert_eq!(aligned.per_region[1].region_code, "12060");
    }

    #[test]
    fn test_alignment_is_idempotent() {
        let miami = find_region("33100").unwrap();
        let tampa = find_region("45300").unwrap();
        let a = monthly(2023, 1..=12, 0.0);
        let b = monthly(2024, 1..=6, 100.0);
        let inputs = [
            SeriesInput { region: miami, observations: Some(a.as_slice()) },
            SeriesInput { region: tampa, observations: Some(b.as_slice()) },
        ];

        assert_eq!(align(&inputs), align(&inputs));
    }

    #[test]
    fn test_adding_a_region_never_removes_dates() {
        let miami = find_region("33100").unwrap();
        let tampa = find_region("45300").unwrap();
        let a = monthly(2024, 1..=6, 0.0);
        let b = monthly(2024, 4..=9, 0.0);

        let before = unified_dates(&[SeriesInput { region: miami, observations: Some(a.as_slice()) }]);
        let after = unified_dates(&[
            SeriesInput { region: miami, observations: Some(a.as_slice()) },
            SeriesInput { region: tampa, observations: Some(b.as_slice()) },
        ]);

        assert!(before.iter().all(|d| after.contains(d)));
        assert_eq!(after.len(), 9);
    }

    #[test]
    fn test_recent_window_keeps_last_dates() {
        let miami = find_region("33100").unwrap();
        let a = monthly(2023, 1..=12, 0.0);
        let b = monthly(2024, 1..=6, 0.0);
        let all: Vec<Observation> = a.into_iter().chain(b).collect();
        let aligned = align(&[SeriesInput { region: miami, observations: Some(all.as_slice()) }]);

        let recent = aligned.recent_window(RECENT_WINDOW);

        assert_eq!(recent.dates.len(), 12);
        assert_eq!(recent.dates[0], date("2023-07-01"));
        assert_eq!(recent.dates[11], date("2024-06-01"));
        assert_eq!(recent.per_region[0].values.len(), 12);
    }

    #[test]
    fn test_recent_window_shorter_than_window() {
        let miami = find_region("33100").unwrap();
        let a = monthly(2024, 1..=3, 0.0);
        let aligned = align(&[SeriesInput { region: miami, observations: Some(a.as_slice()) }]);
        assert_eq!(aligned.recent_window(RECENT_WINDOW), aligned);
    }

    #[test]
    fn test_single_region_table_caps_at_fifty_rows() {
        let miami = find_region("33100").unwrap();
        let series: Vec<Observation> = (0..60)
            .map(|i| Observation::new(date("2019-01-01") + chrono::Days::new(i * 31), i as f64))
            .collect();
        let inputs = [SeriesInput { region: miami, observations: Some(series.as_slice()) }];

        let table = build_table(&inputs, &align(&inputs));

        match table {
            TableView::Single { region_code, rows } => {
                assert_eq!(region_code, "33100");
                assert_eq!(rows.len(), SINGLE_TABLE_ROWS);
                assert_eq!(rows.last().map(|o| o.value), Some(59.0));
            }
            other => panic!("expected single table, got {:?}", other),
        }
    }

    #[test]
    fn test_two_regions_pivot_last_twelve_dates() {
        let miami = find_region("33100").unwrap();
        let tampa = find_region("45300").unwrap();
        let a = monthly(2023, 1..=12, 0.0);
        let b: Vec<Observation> = monthly(2023, 6..=12, 0.0)
            .into_iter()
            .chain(monthly(2024, 1..=5, 0.0))
            .collect();
        let inputs = [
            SeriesInput { region: miami, observations: Some(a.as_slice()) },
            SeriesInput { region: tampa, observations: Some(b.as_slice()) },
        ];

        let table = build_table(&inputs, &align(&inputs));

        match table {
            TableView::Multi { region_codes, rows } => {
                assert_eq!(region_codes, vec!["33100".to_string(), "45300".to_string()]);
                assert_eq!(rows.len(), RECENT_WINDOW);
                assert_eq!(rows[0].date, date("2023-06-01"));
                assert_eq!(rows[11].date, date("2024-05-01"));
                // Miami stops in December 2023.
                assert_eq!(rows[11].values[0], None);
                assert_eq!(rows[11].values[1], Some(5.0));
            }
            other => panic!("expected multi table, got {:?}", other),
        }
    }

    #[test]
    fn test_no_selection_is_empty_table() {
        assert_eq!(build_table(&[], &AlignedSeries::default()), TableView::Empty);
    }

    #[test]
    fn test_latest_values() {
        let miami = find_region("33100").unwrap();
        let atlanta = find_region("12060").unwrap();
        let a = monthly(2024, 1..=3, 0.0);
        let inputs = [
            SeriesInput { region: miami, observations: Some(a.as_slice()) },
            SeriesInput { region: atlanta, observations: None },
        ];

        let latest = latest_values(&inputs);

        assert_eq!(latest[0].latest, Some(Observation::new(date("2024-03-01"), 3.0)));
        assert_eq!(latest[1].latest, None);
    }

    #[test]
    fn test_table_serializes_with_mode_tag() {
        let json = serde_json::to_value(TableView::Empty).unwrap();
        assert_eq!(json["mode"], "empty");
    }
}
