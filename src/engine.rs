use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;

use crate::encode::png::save_png;
use crate::encode::sink::FrameSink;
use crate::export::pipeline::{CancelToken, ExportJob, ExportOpts, ExportPipeline, ExportReport};
use crate::foundation::core::{Canvas, Tick};
use crate::foundation::error::{ReelError, ReelResult};
use crate::map::catalog::MapCatalog;
use crate::map::transform::CoordinateTransform;
use crate::playback::pacing::FramePacer;
use crate::playback::session::PlaybackSession;
use crate::render::backend::{
    Backdrop, BatchBackend, FrameRGBA, InteractiveBackend, RenderBackend, RenderSettings,
};
use crate::resolve::cache::{DEFAULT_CACHE_CAPACITY, FrameCache};
use crate::resolve::frame::ResolvedFrame;
use crate::resolve::resolver::{FrameResolver, ResolverConfig};
use crate::timeline::index::{RoundSummary, TimelineIndex, UtilityDurations};
use crate::timeline::record::MatchRecording;

/// Engine-wide options.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineOpts {
    /// Frame cache capacity for playback sessions and export jobs. The
    /// `TICKREEL_FRAME_CACHE_CAPACITY` environment variable overrides it.
    pub cache_capacity: usize,
    /// Output canvas.
    pub canvas: Canvas,
    /// Resolver tuning.
    pub resolver: ResolverConfig,
    /// Utility lifetimes applied when the index is built.
    pub durations: UtilityDurations,
    /// Rendering options shared by both backends.
    pub render: RenderSettings,
    /// Export scheduling.
    pub export: ExportOpts,
}

impl Default for EngineOpts {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            canvas: Canvas::default(),
            resolver: ResolverConfig::default(),
            durations: UtilityDurations::default(),
            render: RenderSettings::default(),
            export: ExportOpts::default(),
        }
    }
}

impl EngineOpts {
    /// Load options from a JSON file; missing fields keep their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let f = std::fs::File::open(path)
            .with_context(|| format!("failed to open engine options '{}'", path.display()))?;
        serde_json::from_reader(std::io::BufReader::new(f)).map_err(|e| {
            ReelError::serde(format!("parse engine options '{}': {e}", path.display()))
        })
    }
}

/// Replay engine for one match: index, map projection and render configuration.
///
/// Everything here is immutable after construction. Playback sessions and export jobs each get
/// their own [`FrameCache`].
#[derive(Debug)]
pub struct ReplayEngine {
    resolver: FrameResolver,
    transform: CoordinateTransform,
    settings: RenderSettings,
    opts: EngineOpts,
    cache_capacity: usize,
}

impl ReplayEngine {
    /// Index `recording` and bind it to its map profile from `catalog`.
    pub fn from_recording(
        recording: &MatchRecording,
        catalog: &MapCatalog,
        opts: EngineOpts,
    ) -> ReelResult<Self> {
        let index = TimelineIndex::build(recording, &opts.durations)?;
        Self::new(Arc::new(index), catalog, opts)
    }

    /// Read a recording from a JSON file and index it.
    pub fn open(
        recording: impl AsRef<Path>,
        catalog: &MapCatalog,
        opts: EngineOpts,
    ) -> ReelResult<Self> {
        let rec = MatchRecording::from_path(recording)?;
        Self::from_recording(&rec, catalog, opts)
    }

    /// Bind an existing index to its map profile. An unknown map is a configuration error.
    #[tracing::instrument(skip_all, fields(map = %index.map_name()))]
    pub fn new(
        index: Arc<TimelineIndex>,
        catalog: &MapCatalog,
        opts: EngineOpts,
    ) -> ReelResult<Self> {
        let profile = catalog.get(index.map_name())?;
        let transform = CoordinateTransform::new(profile, opts.canvas)?;

        let mut settings = opts.render.clone();
        if settings.backdrop.is_none() {
            let path = settings
                .backdrop_path
                .clone()
                .or_else(|| profile.backdrop.clone());
            if let Some(path) = path {
                settings.backdrop = Some(Arc::new(Backdrop::load(&path)?));
                tracing::debug!(path = %path.display(), "loaded radar backdrop");
            }
        }

        let cache_capacity = FrameCache::capacity_from_env(opts.cache_capacity).max(1);
        let resolver = FrameResolver::new(index, opts.resolver);
        tracing::info!(
            ticks = resolver.index().len(),
            rate = resolver.index().tick_rate().per_sec(),
            rounds = resolver.index().rounds().len(),
            "replay engine ready"
        );
        Ok(Self {
            resolver,
            transform,
            settings,
            opts,
            cache_capacity,
        })
    }

    /// The timeline index.
    pub fn index(&self) -> &TimelineIndex {
        self.resolver.index()
    }

    /// The frame resolver.
    pub fn resolver(&self) -> &FrameResolver {
        &self.resolver
    }

    /// World ↔ image projection for the configured canvas.
    pub fn transform(&self) -> &CoordinateTransform {
        &self.transform
    }

    /// Render settings with the backdrop decoded.
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Options the engine was built with.
    pub fn opts(&self) -> &EngineOpts {
        &self.opts
    }

    /// Effective frame cache capacity after the environment override.
    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity
    }

    /// Per-round digests.
    pub fn round_summaries(&self) -> Vec<RoundSummary> {
        self.index().round_summaries()
    }

    /// Resolved world state at `tick` (clamped).
    pub fn resolve(&self, tick: Tick) -> ResolvedFrame {
        self.resolver.resolve(tick)
    }

    /// Render one still frame with the batch backend.
    #[tracing::instrument(skip(self))]
    pub fn render_single_frame(&self, tick: Tick) -> ReelResult<FrameRGBA> {
        let frame = self.resolver.resolve(tick);
        let mut backend = BatchBackend::new(self.settings.clone());
        Ok(backend.render(&frame, &self.transform)?)
    }

    /// Render `tick` and write it as a PNG.
    pub fn save_png(&self, tick: Tick, path: impl AsRef<Path>) -> ReelResult<()> {
        let frame = self.render_single_frame(tick)?;
        save_png(path, &frame)
    }

    /// Export `job` into `sink` with batch backends.
    ///
    /// The job range is clipped to the timeline; a range entirely outside it is rejected. The
    /// job gets a fresh frame cache that is dropped when it finishes.
    pub fn export(
        &self,
        job: &ExportJob,
        sink: &mut dyn FrameSink,
        cancel: &CancelToken,
    ) -> ReelResult<ExportReport> {
        let range = job.range.intersect(self.index().range());
        if range.is_empty() {
            return Err(ReelError::validation(format!(
                "export range {}..{} lies outside the timeline",
                job.range.start.0, job.range.end.0
            )));
        }
        let job = ExportJob::new(range, job.interval)?;
        let cache = FrameCache::new(self.cache_capacity);
        let pipeline = ExportPipeline::new(
            &self.resolver,
            &cache,
            &self.transform,
            self.settings.background,
            self.opts.export.clone(),
        );
        let settings = self.settings.clone();
        pipeline.export(&job, move || BatchBackend::new(settings.clone()), sink, cancel)
    }

    /// Interactive playback session paced by `pacer`, paused at the first tick.
    pub fn playback_session(&self, pacer: FramePacer) -> PlaybackSession {
        let backend = InteractiveBackend::with_budget(self.settings.clone(), pacer.interval());
        PlaybackSession::new(
            self.resolver.clone(),
            self.transform.clone(),
            Box::new(backend),
            self.cache_capacity,
            pacer,
            self.settings.background,
        )
    }
}

#[cfg(test)]
#[path = "../tests/unit/engine.rs"]
mod tests;
