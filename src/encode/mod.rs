//! Encoding sinks.
//!
//! Sinks consume rendered frames in tick order and are driven by the export pipeline.

/// `ffmpeg`-based sink (MP4 output via system `ffmpeg`).
pub mod ffmpeg;
/// Animated GIF sink.
pub mod gif;
/// PNG stills and PNG-sequence sink.
pub mod png;
/// Generic frame sink trait and the in-memory sink.
pub mod sink;
