//! Tick-indexed timeline: parser records, sampling-rate detection and the random-access index.

/// Tick-ordered index, rounds and event lookups.
pub mod index;
/// Sampling-rate detection.
pub mod rate;
/// Parser-facing record types.
pub mod record;
