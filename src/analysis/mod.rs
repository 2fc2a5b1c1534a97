/// Data organization for presentation.
///
/// This module turns cached series into the shapes the presentation layer
/// consumes. It performs no I/O and owns no state.
///
/// Submodules:
/// - `alignment` — unified date axis, recent window, table pivots and
///   latest-value summaries.

pub mod alignment;
