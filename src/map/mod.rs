//! Map calibration and world ↔ image projection.

/// Map profiles and the built-in catalog.
pub mod catalog;
/// Affine world ↔ image transform.
pub mod transform;
