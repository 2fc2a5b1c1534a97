/// Dashboard session: selection state, pipeline state machine and the
/// view handed to presentation.
///
/// Every derived value (resolved ids, cached series, aligned views) is a
/// function of the selection and what has been fetched so far; nothing is
/// recomputed implicitly. `refresh` runs the pipeline once, `view` derives
/// the presentation shapes on demand.
///
/// # Generations
/// Changing the indicator invalidates every resolved id and cached series
/// and bumps the session generation. Work is carried out in batches tagged
/// with the generation they were started under; `apply` drops any batch
/// whose generation is no longer current, so a slow discovery for the old
/// indicator can never write into the new indicator's state.

use serde::Serialize;
use std::collections::HashSet;

use crate::analysis::alignment::{
    self, AlignedSeries, LatestValue, RECENT_WINDOW, SeriesInput, TableView,
};
use crate::fetch::{self, SeriesCache};
use crate::indicators::{self, Indicator};
use crate::ingest::SeriesProvider;
use crate::logging::{self, Component};
use crate::model::{EconError, Observation};
use crate::regions::{self, Region};
use crate::resolve::{ResolvedSeries, SeriesResolver};

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    /// Accepting changes, nothing in flight.
    Idle,
    Resolving,
    Fetching,
    Ready,
    /// The last batch had at least one failure. Partial data stays usable.
    Error,
    /// No API key; nothing will be fetched until configuration is fixed.
    Unconfigured,
}

// ---------------------------------------------------------------------------
// Batches
// ---------------------------------------------------------------------------

/// A unit of pipeline work prepared by `Session::begin_batch`.
///
/// A batch owns snapshots of what the session knew when it started, so it
/// can be executed anywhere without borrowing the session.
#[derive(Debug)]
pub struct Batch {
    generation: u64,
    indicator: &'static Indicator,
    regions: Vec<&'static Region>,
    resolver: SeriesResolver,
    cached_ids: HashSet<String>,
    resolutions: Vec<Result<ResolvedSeries, EconError>>,
}

impl Batch {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Resolves a series id for every region in the batch.
    pub fn resolve<P: SeriesProvider + ?Sized>(&mut self, provider: &P) {
        self.resolutions = self
            .resolver
            .resolve_all(provider, self.indicator, &self.regions);
    }

    /// Fetches every resolved series that was not cached at batch start.
    pub fn fetch<P: SeriesProvider + ?Sized>(self, provider: &P) -> BatchOutcome {
        let ids: Vec<String> = self
            .resolutions
            .iter()
            .flatten()
            .filter_map(|r| r.series_id.clone())
            .collect();

        let fetched = fetch::fetch_missing(provider, &ids, &self.cached_ids, self.indicator);

        BatchOutcome {
            generation: self.generation,
            regions: self.regions,
            resolver: self.resolver,
            resolutions: self.resolutions,
            fetched,
        }
    }

    /// Both phases back to back.
    pub fn execute<P: SeriesProvider + ?Sized>(mut self, provider: &P) -> BatchOutcome {
        self.resolve(provider);
        self.fetch(provider)
    }
}

/// Everything a batch learned, waiting to be applied to the session.
#[derive(Debug)]
pub struct BatchOutcome {
    pub generation: u64,
    regions: Vec<&'static Region>,
    resolver: SeriesResolver,
    pub resolutions: Vec<Result<ResolvedSeries, EconError>>,
    pub fetched: Vec<(String, Result<Vec<Observation>, EconError>)>,
}

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

/// What the presentation layer receives. No other data crosses over.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub indicator_key: String,
    pub indicator_label: String,
    pub state: PipelineState,
    pub error: Option<String>,
    /// Full history, for the trend chart.
    pub trend: AlignedSeries,
    /// Last `RECENT_WINDOW` dates, for comparison charts.
    pub recent: AlignedSeries,
    pub latest: Vec<LatestValue>,
    pub table: TableView,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Session {
    indicator: &'static Indicator,
    regions: Vec<&'static Region>,
    resolver: SeriesResolver,
    cache: SeriesCache,
    generation: u64,
    state: PipelineState,
    error: Option<String>,
}

impl Session {
    pub fn new(indicator_key: &str, search_limit: u32) -> Result<Self, EconError> {
        let indicator = indicators::find_indicator(indicator_key)
            .ok_or_else(|| EconError::UnknownIndicator(indicator_key.to_string()))?;

        Ok(Self {
            indicator,
            regions: Vec::new(),
            resolver: SeriesResolver::new(search_limit),
            cache: SeriesCache::new(),
            generation: 0,
            state: PipelineState::Idle,
            error: None,
        })
    }

    pub fn indicator(&self) -> &'static Indicator {
        self.indicator
    }

    pub fn selected_regions(&self) -> &[&'static Region] {
        &self.regions
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cache(&self) -> &SeriesCache {
        &self.cache
    }

    pub fn resolver(&self) -> &SeriesResolver {
        &self.resolver
    }

    // --- Selection --------------------------------------------------------

    /// Switches indicator. Resolved ids and cached series are indicator
    /// scoped, so both are dropped and the generation moves on. Selecting
    /// the current indicator again changes nothing.
    pub fn set_indicator(&mut self, indicator_key: &str) -> Result<(), EconError> {
        let indicator = indicators::find_indicator(indicator_key)
            .ok_or_else(|| EconError::UnknownIndicator(indicator_key.to_string()))?;
        if indicator.key == self.indicator.key {
            return Ok(());
        }

        self.indicator = indicator;
        self.resolver.clear();
        self.cache.clear();
        self.generation += 1;
        self.accept_changes();

        logging::info(
            Component::Session,
            None,
            &format!("indicator -> {} (generation {})", indicator.key, self.generation),
        );
        Ok(())
    }

    /// Appends a region to the selection. Returns `false` if already selected.
    pub fn select_region(&mut self, code: &str) -> Result<bool, EconError> {
        let region =
            regions::find_region(code).ok_or_else(|| EconError::UnknownRegion(code.to_string()))?;
        if self.regions.iter().any(|r| r.code == region.code) {
            return Ok(false);
        }
        self.regions.push(region);
        self.accept_changes();
        Ok(true)
    }

    /// Removes a region from the selection. Its cached series stays.
    pub fn deselect_region(&mut self, code: &str) -> bool {
        let before = self.regions.len();
        self.regions.retain(|r| r.code != code);
        let removed = self.regions.len() != before;
        if removed {
            self.accept_changes();
        }
        removed
    }

    /// Replaces the selection, keeping the given order.
    pub fn set_regions(&mut self, codes: &[&str]) -> Result<(), EconError> {
        let mut selected: Vec<&'static Region> = Vec::with_capacity(codes.len());
        for code in codes {
            let region = regions::find_region(code)
                .ok_or_else(|| EconError::UnknownRegion(code.to_string()))?;
            if !selected.iter().any(|r| r.code == region.code) {
                selected.push(region);
            }
        }
        self.regions = selected;
        self.accept_changes();
        Ok(())
    }

    /// Back to idle after a selection change. The error flag clears too;
    /// the next refresh decides afresh. Unconfigured is sticky.
    fn accept_changes(&mut self) {
        if self.state != PipelineState::Unconfigured {
            self.state = PipelineState::Idle;
            self.error = None;
        }
    }

    /// Puts the session in the configuration-error state. Nothing is
    /// fetched afterwards.
    pub fn mark_unconfigured(&mut self, err: &EconError) {
        logging::error(Component::Session, None, &err.to_string());
        self.state = PipelineState::Unconfigured;
        self.error = Some(err.to_string());
    }

    // --- Pipeline ---------------------------------------------------------

    /// Starts a batch for the current selection, or `None` when the
    /// session is unconfigured.
    pub fn begin_batch(&mut self) -> Option<Batch> {
        if self.state == PipelineState::Unconfigured {
            return None;
        }
        self.state = PipelineState::Resolving;
        self.error = None;

        Some(Batch {
            generation: self.generation,
            indicator: self.indicator,
            regions: self.regions.clone(),
            resolver: self.resolver.clone(),
            cached_ids: self.cache.ids(),
            resolutions: Vec::new(),
        })
    }

    /// Records that a current batch moved on to fetching.
    pub fn note_fetching(&mut self, batch: &Batch) {
        if batch.generation == self.generation && self.state == PipelineState::Resolving {
            self.state = PipelineState::Fetching;
        }
    }

    /// Merges a finished batch into the session. Returns `false` and
    /// changes nothing if the batch belongs to an older generation.
    pub fn apply(&mut self, outcome: BatchOutcome) -> bool {
        if outcome.generation != self.generation {
            logging::debug(
                Component::Session,
                None,
                &format!(
                    "discarding batch from generation {} (current {})",
                    outcome.generation, self.generation
                ),
            );
            return false;
        }

        self.resolver.absorb(outcome.resolver);

        let mut failures: Vec<String> = Vec::new();
        for (result, region) in outcome.resolutions.iter().zip(outcome.regions.iter()) {
            if let Err(e) = result {
                failures.push(format!("{}: {}", region.code, e));
            }
        }

        let total = outcome.fetched.len();
        let mut fetched_ok = 0usize;
        for (series_id, result) in outcome.fetched {
            match result {
                Ok(observations) => {
                    fetched_ok += 1;
                    logging::debug(
                        Component::Cache,
                        Some(&series_id),
                        &format!("cached {} observations", observations.len()),
                    );
                    self.cache.insert(&series_id, observations);
                }
                Err(e) => {
                    logging::log_fred_failure(&series_id, "fetch observations", &e);
                    failures.push(format!("{}: {}", series_id, e));
                }
            }
        }
        if total > 0 {
            logging::log_batch_summary(Component::Fred, total, fetched_ok, total - fetched_ok);
        }

        if failures.is_empty() {
            self.state = PipelineState::Ready;
            self.error = None;
        } else {
            self.state = PipelineState::Error;
            self.error = Some(format!(
                "{} request(s) failed: {}",
                failures.len(),
                failures.join("; ")
            ));
        }
        true
    }

    /// Runs resolve and fetch for the current selection on this thread.
    /// A no-op when unconfigured.
    pub fn refresh<P: SeriesProvider + ?Sized>(&mut self, provider: &P) -> PipelineState {
        let Some(mut batch) = self.begin_batch() else {
            return self.state;
        };
        batch.resolve(provider);
        self.note_fetching(&batch);
        let outcome = batch.fetch(provider);
        self.apply(outcome);
        self.state
    }

    // --- Derived views ----------------------------------------------------

    /// The series id currently known for a region, without any I/O.
    pub fn series_id_for(&self, region: &Region) -> Option<String> {
        self.resolver
            .resolve_local(self.indicator, region)
            .and_then(|r| r.series_id)
    }

    /// Cached observations for a selected region, if any.
    pub fn observations_for(&self, region: &Region) -> Option<&[Observation]> {
        self.series_id_for(region)
            .and_then(|id| self.cache.get(&id))
    }

    pub fn view(&self) -> DashboardView {
        let inputs: Vec<SeriesInput<'_>> = self
            .regions
            .iter()
            .map(|&region| SeriesInput {
                region,
                observations: self.observations_for(region),
            })
            .collect();

        let trend = alignment::align(&inputs);
        let recent = trend.recent_window(RECENT_WINDOW);
        let table = alignment::build_table(&inputs, &trend);

        DashboardView {
            indicator_key: self.indicator.key.to_string(),
            indicator_label: self.indicator.label.to_string(),
            state: self.state,
            error: self.error.clone(),
            latest: alignment::latest_values(&inputs),
            trend,
            recent,
            table,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
