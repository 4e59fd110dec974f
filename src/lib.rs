//! tickreel is a tick-indexed replay engine for recorded tactical-shooter matches.
//!
//! It turns a parsed match into radar frames, either live or as video:
//!
//! - Index a [`MatchRecording`] into a [`TimelineIndex`]
//! - Bind it to a map through a [`ReplayEngine`]
//! - Drive a [`PlaybackSession`] or stream an [`ExportJob`] into a [`FrameSink`]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod foundation;

/// Engine facade tying the index, map projection and backends together.
pub mod engine;
/// Frame sinks: ffmpeg, GIF, PNG sequences and in-memory capture.
pub mod encode;
/// Ordered batch export.
pub mod export;
/// Map calibration and world ↔ image projection.
pub mod map;
/// Live playback: transport, pacing and the interactive loop.
pub mod playback;
/// Rendering backends and the shared radar painter.
pub mod render;
/// Frame resolution and caching.
pub mod resolve;
/// Tick-indexed timeline over parsed match records.
pub mod timeline;

pub use crate::foundation::core::{
    Affine, BezPath, Canvas, Fps, Point, Rect, Rgba8, Tick, TickRange, Vec2, WorldPos,
};
pub use crate::foundation::error::{ConfigError, IndexError, ReelError, ReelResult, RenderError};

pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::gif::{GifSink, GifSinkOpts};
pub use crate::encode::png::{PngSequenceSink, save_png};
pub use crate::encode::sink::{FrameSink, InMemorySink, SinkConfig};
pub use crate::engine::{EngineOpts, ReplayEngine};
pub use crate::export::pipeline::{
    CancelToken, ExportJob, ExportOpts, ExportPipeline, ExportReport,
};
pub use crate::map::catalog::{MapCatalog, MapProfile};
pub use crate::map::transform::CoordinateTransform;
pub use crate::playback::controller::{PlaybackController, PlaybackState};
pub use crate::playback::pacing::FramePacer;
pub use crate::playback::session::{
    Clock, DisplaySurface, InputSource, MemorySurface, PlaybackSession, SessionStats,
    SystemClock, TransportCommand,
};
pub use crate::render::backend::{
    BackendKind, BatchBackend, FrameRGBA, InteractiveBackend, RenderBackend, RenderSettings,
    create_backend,
};
pub use crate::resolve::cache::{CacheStats, FrameCache};
pub use crate::resolve::frame::ResolvedFrame;
pub use crate::resolve::resolver::{FrameResolver, ResolverConfig};
pub use crate::timeline::index::{Round, RoundSummary, TimelineIndex, UtilityDurations};
pub use crate::timeline::record::{BombState, MatchRecording};
