//! Metro economic dashboard service.
//!
//! Resolves (indicator, metro) selections to FRED series, fetches and
//! cleans their observations, and aligns them onto a shared date axis for
//! charts and tables.

pub mod analysis;
pub mod cli;
pub mod colors;
pub mod config;
pub mod fetch;
pub mod indicators;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod regions;
pub mod resolve;
pub mod session;
pub mod verify;
