//! Frame resolution: the pure tick → world-state projection and its bounded cache.

/// Bounded, pin-aware frame cache.
pub mod cache;
/// Resolved frame value types.
pub mod frame;
/// The pure frame resolver.
pub mod resolver;
