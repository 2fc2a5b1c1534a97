//! Series Verification Module
//!
//! Checks one indicator against the live provider for every registered
//! region: does the (indicator, region) pair resolve to a series id, and
//! does that series return usable observations?
//!
//! Use this after adding regions, overrides or indicators to find
//! registry entries that point at nothing.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::fetch;
use crate::indicators::{self, Indicator};
use crate::ingest::SeriesProvider;
use crate::logging::{self, Component};
use crate::model::EconError;
use crate::regions::{REGION_REGISTRY, Region};
use crate::resolve::{Resolution, SeriesResolver};

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub indicator_key: String,
    pub results: Vec<RegionVerification>,
    pub summary: VerificationSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub working: usize,
    pub partial: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionVerification {
    pub region_code: String,
    pub name: String,
    pub status: VerificationStatus,
    pub resolution: Option<Resolution>,
    pub series_id: Option<String>,
    pub observation_count: usize,
    pub latest_date: Option<NaiveDate>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum VerificationStatus {
    /// Resolved and returned at least one usable observation.
    Success,
    /// Resolved, but every observation was missing or malformed.
    PartialSuccess,
    Failed,
}

// ============================================================================
// Region Verification
// ============================================================================

pub fn verify_region<P: SeriesProvider + ?Sized>(
    provider: &P,
    resolver: &mut SeriesResolver,
    indicator: &Indicator,
    region: &Region,
) -> RegionVerification {
    let mut result = RegionVerification {
        region_code: region.code.to_string(),
        name: region.name.to_string(),
        status: VerificationStatus::Failed,
        resolution: None,
        series_id: None,
        observation_count: 0,
        latest_date: None,
        error_message: None,
    };

    // Test 1: resolve a series id
    let resolved = match resolver.resolve(provider, indicator, region) {
        Ok(resolved) => resolved,
        Err(e) => {
            result.error_message = Some(format!("Resolution failed: {}", e));
            return result;
        }
    };
    result.resolution = Some(resolved.via);

    let Some(series_id) = resolved.series_id else {
        result.error_message = Some("No series found by discovery".to_string());
        return result;
    };
    result.series_id = Some(series_id.clone());

    // Test 2: fetch and clean observations
    match fetch::fetch_series(provider, &series_id, indicator) {
        Ok(observations) => {
            result.observation_count = observations.len();
            result.latest_date = observations.last().map(|o| o.date);
            result.status = if observations.is_empty() {
                VerificationStatus::PartialSuccess
            } else {
                VerificationStatus::Success
            };
        }
        Err(e) => {
            result.error_message = Some(format!("Fetch failed: {}", e));
        }
    }

    result
}

pub fn summarize(results: &[RegionVerification]) -> VerificationSummary {
    let mut summary = VerificationSummary {
        total: results.len(),
        ..VerificationSummary::default()
    };
    for result in results {
        match result.status {
            VerificationStatus::Success => summary.working += 1,
            VerificationStatus::PartialSuccess => summary.partial += 1,
            VerificationStatus::Failed => summary.failed += 1,
        }
    }
    summary
}

// ============================================================================
// Full Verification Runner
// ============================================================================

/// Verifies every registered region for one indicator, in registry order.
pub fn run_full_verification<P: SeriesProvider + ?Sized>(
    provider: &P,
    indicator_key: &str,
    search_limit: u32,
) -> Result<VerificationReport, EconError> {
    let indicator = indicators::find_indicator(indicator_key)
        .ok_or_else(|| EconError::UnknownIndicator(indicator_key.to_string()))?;
    let mut resolver = SeriesResolver::new(search_limit);

    let results: Vec<RegionVerification> = REGION_REGISTRY
        .iter()
        .map(|region| {
            let result = verify_region(provider, &mut resolver, indicator, region);
            if let Some(err) = &result.error_message {
                logging::warn(Component::System, Some(region.code), err);
            }
            result
        })
        .collect();

    let summary = summarize(&results);
    logging::log_batch_summary(
        Component::System,
        summary.total,
        summary.working + summary.partial,
        summary.failed,
    );

    Ok(VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        indicator_key: indicator.key.to_string(),
        results,
        summary,
    })
}
