//! Ordered, optionally parallel export of a sampled tick range.

/// Export job, options, report, and the pipeline driver.
pub mod pipeline;
/// Sequence-keyed reorder buffer.
pub mod reorder;
