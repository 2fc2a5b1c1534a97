/// Data provider access.
///
/// Submodules:
/// - `fred` — HTTP client for the FRED series search and observations API.
///
/// The rest of the crate talks to the provider only through
/// `SeriesProvider`, so resolution and fetching can be exercised against an
/// in-memory provider in tests.

pub mod fred;

use crate::model::{EconError, RawObservation, SeriesCandidate};

/// The two read-only provider endpoints the dashboard depends on.
///
/// Implementations must be shareable across threads: discovery and fetches
/// for every selected region are fanned out concurrently.
pub trait SeriesProvider: Sync {
    /// Full-text search over the provider catalogue.
    fn search(&self, search_text: &str, limit: u32) -> Result<Vec<SeriesCandidate>, EconError>;

    /// Raw observations of one series, in whatever order the provider sends.
    fn observations(&self, series_id: &str) -> Result<Vec<RawObservation>, EconError>;
}
