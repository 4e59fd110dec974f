//! Live playback: transport control, refresh pacing, and the interactive render loop.

/// Transport state machine.
pub mod controller;
/// Display-refresh pacing.
pub mod pacing;
/// Interactive playback loop.
pub mod session;
