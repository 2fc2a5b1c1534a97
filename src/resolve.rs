/// Series resolution: (indicator, region) → provider series id.
///
/// Resolution order, first match wins:
///   1. hand-curated override (`indicators::SERIES_OVERRIDES`)
///   2. an id already resolved for the same key this session
///   3. discovery through the provider search, for indicators that need it
///   4. the indicator's deterministic id template
///
/// Only discovery outcomes are remembered per key, misses included, so a metro
/// the provider has nothing for is searched once per session and then
/// renders as "no data". Transport and HTTP failures are not misses: they
/// are returned to the caller and nothing is remembered.

use serde::Serialize;
use std::collections::HashMap;

use crate::indicators::{self, Indicator, PickContext, pick_matching_or_first, series_key};
use crate::ingest::SeriesProvider;
use crate::logging::{self, Component};
use crate::model::{EconError, SeriesCandidate};
use crate::regions::Region;

/// How a series id was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Resolution {
    Override,
    Cached,
    Pattern,
    Discovered,
    /// Discovery ran and found nothing; there is no series for this key.
    Miss,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSeries {
    pub region_code: String,
    pub series_id: Option<String>,
    pub via: Resolution,
}

/// Session-scoped resolved-id map plus the discovery settings.
#[derive(Debug, Clone)]
pub struct SeriesResolver {
    resolved: HashMap<String, Option<String>>,
    search_limit: u32,
}

impl SeriesResolver {
    pub fn new(search_limit: u32) -> Self {
        Self {
            resolved: HashMap::new(),
            search_limit,
        }
    }

    /// Forgets every resolved id. Called when the indicator changes.
    pub fn clear(&mut self) {
        self.resolved.clear();
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    /// The remembered outcome for a key: `Some(None)` is a remembered miss.
    pub fn lookup(&self, indicator_key: &str, region_code: &str) -> Option<&Option<String>> {
        self.resolved.get(&series_key(indicator_key, region_code))
    }

    /// Resolution steps that need no network: override, cache, pattern.
    /// Returns `None` when discovery is required.
    pub fn resolve_local(&self, indicator: &Indicator, region: &Region) -> Option<ResolvedSeries> {
        let resolved = |series_id: Option<String>, via: Resolution| ResolvedSeries {
            region_code: region.code.to_string(),
            series_id,
            via,
        };

        if let Some(id) = indicators::override_for(indicator.key, region.code) {
            return Some(resolved(Some(id.to_string()), Resolution::Override));
        }

        if let Some(known) = self.lookup(indicator.key, region.code) {
            let via = if known.is_some() { Resolution::Cached } else { Resolution::Miss };
            return Some(resolved(known.clone(), via));
        }

        if indicator.needs_discovery {
            return None;
        }

        match indicator.series_id_for_cbsa {
            Some(template) => Some(resolved(Some(template(region.code)), Resolution::Pattern)),
            None => Some(resolved(None, Resolution::Miss)),
        }
    }

    /// Resolves a single key, discovering if needed.
    pub fn resolve<P: SeriesProvider + ?Sized>(
        &mut self,
        provider: &P,
        indicator: &Indicator,
        region: &Region,
    ) -> Result<ResolvedSeries, EconError> {
        if let Some(local) = self.resolve_local(indicator, region) {
            self.remember(indicator, &local);
            return Ok(local);
        }

        let found = discover(provider, indicator, region, self.search_limit)?;
        let result = discovered(region, found);
        self.remember(indicator, &result);
        Ok(result)
    }

    /// Resolves every region, running the discoveries concurrently.
    ///
    /// Results come back in the order of `regions`. A failed discovery
    /// leaves its key unresolved so a later refresh tries again.
    pub fn resolve_all<P: SeriesProvider + ?Sized>(
        &mut self,
        provider: &P,
        indicator: &Indicator,
        regions: &[&Region],
    ) -> Vec<Result<ResolvedSeries, EconError>> {
        let mut results: Vec<Option<Result<ResolvedSeries, EconError>>> =
            Vec::with_capacity(regions.len());
        let mut to_discover: Vec<(usize, &Region)> = Vec::new();

        for (i, region) in regions.iter().enumerate() {
            match self.resolve_local(indicator, region) {
                Some(local) => results.push(Some(Ok(local))),
                None => {
                    results.push(None);
                    to_discover.push((i, *region));
                }
            }
        }

        if !to_discover.is_empty() {
            let limit = self.search_limit;
            let outcomes: Vec<(usize, &Region, Result<Option<String>, EconError>)> =
                std::thread::scope(|scope| {
                    let handles: Vec<_> = to_discover
                        .iter()
                        .map(|&(i, region)| {
                            let handle =
                                scope.spawn(move || discover(provider, indicator, region, limit));
                            (i, region, handle)
                        })
                        .collect();

                    handles
                        .into_iter()
                        .map(|(i, region, handle)| {
                            let outcome = handle.join().unwrap_or_else(|_| {
                                Err(EconError::Transport("discovery thread panicked".to_string()))
                            });
                            (i, region, outcome)
                        })
                        .collect()
                });

            for (i, region, outcome) in outcomes {
                results[i] = Some(outcome.map(|found| discovered(region, found)));
            }
        }

        let results: Vec<Result<ResolvedSeries, EconError>> = results
            .into_iter()
            .map(|r| r.unwrap_or_else(|| Err(EconError::Transport("resolution skipped".to_string()))))
            .collect();

        for result in results.iter().flatten() {
            self.remember(indicator, result);
        }

        results
    }

    /// Adds every outcome `other` knows and this resolver does not.
    /// Existing entries win; a resolved key is never re-resolved.
    pub fn absorb(&mut self, other: SeriesResolver) {
        for (key, id) in other.resolved {
            self.resolved.entry(key).or_insert(id);
        }
    }

    fn remember(&mut self, indicator: &Indicator, result: &ResolvedSeries) {
        // Overrides and templates are recomputed on every call so they
        // keep reporting how the id was built; only searches are stored.
        if matches!(result.via, Resolution::Override | Resolution::Pattern) {
            return;
        }
        self.resolved
            .entry(series_key(indicator.key, &result.region_code))
            .or_insert_with(|| result.series_id.clone());
    }
}

fn discovered(region: &Region, found: Option<String>) -> ResolvedSeries {
    let via = if found.is_some() { Resolution::Discovered } else { Resolution::Miss };
    ResolvedSeries {
        region_code: region.code.to_string(),
        series_id: found,
        via,
    }
}

fn accept_any(_: &SeriesCandidate) -> bool {
    true
}

/// Runs one search and applies the indicator's pick function.
///
/// An empty candidate list is `Ok(None)`. Without a pick function the
/// first candidate wins.
pub fn discover<P: SeriesProvider + ?Sized>(
    provider: &P,
    indicator: &Indicator,
    region: &Region,
    limit: u32,
) -> Result<Option<String>, EconError> {
    let query = match indicator.search_text {
        Some(text) => text(region.name),
        None => region.name.to_string(),
    };

    let candidates = provider.search(&query, limit).inspect_err(|e| {
        logging::log_fred_failure(region.code, &format!("search '{}'", query), e);
    })?;

    let context = PickContext {
        indicator_key: indicator.key,
        region,
    };
    let picked = match indicator.pick_series {
        Some(pick) => pick(&candidates, &context),
        None => pick_matching_or_first(&candidates, &context, accept_any),
    };

    match &picked {
        Some(id) => logging::debug(
            Component::Resolver,
            Some(region.code),
            &format!("{} discovered {} among {} candidate(s)", indicator.key, id, candidates.len()),
        ),
        None => logging::info(
            Component::Resolver,
            Some(region.code),
            &format!("{}: no series found for '{}'", indicator.key, query),
        ),
    }

    Ok(picked)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
