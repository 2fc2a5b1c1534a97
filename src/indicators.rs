/// Indicator registry: how each dashboard indicator maps onto provider series.
///
/// Every indicator either derives its series id from a fixed naming pattern
/// around the CBSA code, or needs discovery through the provider's search
/// endpoint because the id embeds information the CBSA code alone does not
/// carry (e.g. the state FIPS prefix of LAUS metro series).
///
/// Extending the dashboard with a new indicator means adding an entry to
/// `INDICATOR_REGISTRY`, and optionally hand-curated rows to
/// `SERIES_OVERRIDES`; no new code paths.

use crate::model::SeriesCandidate;
use crate::regions::Region;

// ---------------------------------------------------------------------------
// Indicator definition
// ---------------------------------------------------------------------------

/// Context handed to an indicator's pick function.
pub struct PickContext<'a> {
    pub indicator_key: &'a str,
    pub region: &'a Region,
}

/// Computation rules for one indicator. Immutable, compiled in.
pub struct Indicator {
    /// Unique key, e.g. "HOUSING".
    pub key: &'static str,
    /// Human-readable label for chart titles.
    pub label: &'static str,
    /// Deterministic region code → series id template.
    /// `None` for indicators that can only be resolved through discovery.
    pub series_id_for_cbsa: Option<fn(&str) -> String>,
    /// Applied to every retained raw value after fetching.
    pub transform_value: Option<fn(f64) -> f64>,
    /// Display formatting of a (transformed) value.
    pub value_formatter: fn(f64) -> String,
    /// Whether the id must be found through the search endpoint.
    pub needs_discovery: bool,
    /// Region display name → search query.
    pub search_text: Option<fn(&str) -> String>,
    /// Candidate list → chosen series id.
    pub pick_series: Option<fn(&[SeriesCandidate], &PickContext<'_>) -> Option<String>>,
}

impl Indicator {
    /// Applies `transform_value` if defined, otherwise passes through.
    pub fn transform(&self, raw: f64) -> f64 {
        match self.transform_value {
            Some(f) => f(raw),
            None => raw,
        }
    }

    pub fn format(&self, value: f64) -> String {
        (self.value_formatter)(value)
    }

    /// Formats an optional value, rendering missing values as an em dash.
    pub fn format_cell(&self, value: Option<f64>) -> String {
        value
            .map(|v| self.format(v))
            .unwrap_or_else(|| crate::model::MISSING_CELL.to_string())
    }
}

impl std::fmt::Debug for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Indicator")
            .field("key", &self.key)
            .field("needs_discovery", &self.needs_discovery)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Id templates
// ---------------------------------------------------------------------------

fn active_listings_id(code: &str) -> String {
    format!("ACTLISCOU{}", code)
}

fn median_listing_price_id(code: &str) -> String {
    format!("MEDLISPRI{}", code)
}

fn median_days_on_market_id(code: &str) -> String {
    format!("MEDDAYONMAR{}", code)
}

// ---------------------------------------------------------------------------
// Discovery helpers
// ---------------------------------------------------------------------------

fn unemployment_search_text(region_name: &str) -> String {
    format!("{} Unemployment Rate", region_name)
}

/// Picks the best candidate satisfying `matches`, falling back to the first
/// candidate when none does. Among matching candidates, one whose id embeds
/// the region code wins. Returns `None` only for an empty list.
pub fn pick_matching_or_first(
    candidates: &[SeriesCandidate],
    context: &PickContext<'_>,
    matches: fn(&SeriesCandidate) -> bool,
) -> Option<String> {
    let matching: Vec<&SeriesCandidate> = candidates.iter().filter(|c| matches(c)).collect();

    matching
        .iter()
        .find(|c| c.id.contains(context.region.code))
        .or_else(|| matching.first())
        .copied()
        .or_else(|| candidates.first())
        .map(|c| c.id.clone())
}

/// LAUS metro series: `LAUMT` + state FIPS + CBSA + measure code.
fn is_laus_unemployment_rate(candidate: &SeriesCandidate) -> bool {
    candidate.id.starts_with("LAUMT") && candidate.title.contains("Unemployment Rate")
}

fn pick_laus_unemployment_rate(
    candidates: &[SeriesCandidate],
    context: &PickContext<'_>,
) -> Option<String> {
    pick_matching_or_first(candidates, context, is_laus_unemployment_rate)
}

// ---------------------------------------------------------------------------
// Transforms and formatters
// ---------------------------------------------------------------------------

/// Implied employment rate from an unemployment rate.
fn employment_from_unemployment(rate: f64) -> f64 {
    100.0 - rate
}

fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

fn format_count(value: f64) -> String {
    group_thousands(value)
}

fn format_dollars(value: f64) -> String {
    format!("${}", group_thousands(value))
}

fn format_days(value: f64) -> String {
    format!("{:.0} days", value)
}

/// Rounds to an integer and inserts `,` every three digits.
pub fn group_thousands(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if rounded < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub static INDICATOR_REGISTRY: &[Indicator] = &[
    Indicator {
        key: "HOUSING",
        label: "Active Listing Count",
        series_id_for_cbsa: Some(active_listings_id),
        transform_value: None,
        value_formatter: format_count,
        needs_discovery: false,
        search_text: None,
        pick_series: None,
    },
    Indicator {
        key: "MEDIAN_PRICE",
        label: "Median Listing Price",
        series_id_for_cbsa: Some(median_listing_price_id),
        transform_value: None,
        value_formatter: format_dollars,
        needs_discovery: false,
        search_text: None,
        pick_series: None,
    },
    Indicator {
        key: "DAYS_ON_MARKET",
        label: "Median Days on Market",
        series_id_for_cbsa: Some(median_days_on_market_id),
        transform_value: None,
        value_formatter: format_days,
        needs_discovery: false,
        search_text: None,
        pick_series: None,
    },
    Indicator {
        key: "UNEMP_RATE",
        label: "Unemployment Rate",
        series_id_for_cbsa: None,
        transform_value: None,
        value_formatter: format_percent,
        needs_discovery: true,
        search_text: Some(unemployment_search_text),
        pick_series: Some(pick_laus_unemployment_rate),
    },
    Indicator {
        key: "EMP_RATE",
        label: "Employment Rate (100 - Unemployment Rate)",
        series_id_for_cbsa: None,
        transform_value: Some(employment_from_unemployment),
        value_formatter: format_percent,
        needs_discovery: true,
        search_text: Some(unemployment_search_text),
        pick_series: Some(pick_laus_unemployment_rate),
    },
];

/// Hand-curated `INDICATOR|REGION` → series id exceptions for cases where
/// the pattern or search is known to pick the wrong series.
pub static SERIES_OVERRIDES: &[(&str, &str)] = &[
    ("HOUSING|33100", "ACTLISCOU33100"),
    ("HOUSING|45300", "ACTLISCOU45300"),
    ("UNEMP_RATE|35620", "NEWY636URN"),
    ("EMP_RATE|35620", "NEWY636URN"),
    ("UNEMP_RATE|31080", "LOSA106URN"),
    ("EMP_RATE|31080", "LOSA106URN"),
];

/// The key used by the override table and the resolved-id map.
pub fn series_key(indicator_key: &str, region_code: &str) -> String {
    format!("{}|{}", indicator_key, region_code)
}

pub fn find_indicator(key: &str) -> Option<&'static Indicator> {
    INDICATOR_REGISTRY.iter().find(|i| i.key == key)
}

pub fn override_for(indicator_key: &str, region_code: &str) -> Option<&'static str> {
    let key = series_key(indicator_key, region_code);
    SERIES_OVERRIDES
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, id)| *id)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
