use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::foundation::core::{Canvas, Rgba8};
use crate::foundation::error::RenderError;
use crate::map::transform::CoordinateTransform;
use crate::render::cpu::RadarPainter;
use crate::render::style::DEFAULT_BACKGROUND;
use crate::resolve::frame::ResolvedFrame;

/// A rendered frame as RGBA8 pixels.
///
/// Frames are **premultiplied alpha**. The `premultiplied` flag is included to make this explicit
/// at API boundaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// A frame filled with `color`.
    pub fn blank(canvas: Canvas, color: Rgba8) -> Self {
        let px = color.to_premul_array();
        let mut data = vec![0u8; canvas.rgba_len()];
        for chunk in data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
        Self {
            width: canvas.width,
            height: canvas.height,
            data,
            premultiplied: true,
        }
    }

    /// Premultiplied pixel at `(x, y)`, if inside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Decoded radar backdrop image (straight-alpha RGBA8).
#[derive(Clone, Debug, PartialEq)]
pub struct Backdrop {
    pub(crate) image: image::RgbaImage,
}

impl Backdrop {
    /// Decode a backdrop image from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|e| RenderError::Backdrop(format!("{}: {e}", path.display())))?
            .to_rgba8();
        Self::from_image(image)
    }

    /// Wrap an already decoded image.
    pub fn from_image(image: image::RgbaImage) -> Result<Self, RenderError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(RenderError::Backdrop("backdrop image is empty".to_owned()));
        }
        Ok(Self { image })
    }

    /// Source dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Rendering options shared by both backends.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Canvas fill behind everything.
    pub background: Rgba8,
    /// Multiplier on the player marker radius.
    pub marker_scale: f64,
    /// Draw the yaw wedge in front of living players.
    pub view_direction: bool,
    /// Draw seat numbers inside player markers.
    pub seat_numbers: bool,
    /// Backdrop image path (used by the engine to decode `backdrop`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backdrop_path: Option<PathBuf>,
    /// Decoded backdrop, drawn over the radar square.
    #[serde(skip)]
    pub backdrop: Option<Arc<Backdrop>>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            background: DEFAULT_BACKGROUND,
            marker_scale: 1.0,
            view_direction: true,
            seat_numbers: true,
            backdrop_path: None,
            backdrop: None,
        }
    }
}

/// Which backend variant to construct.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// Live display surface with a per-frame budget.
    Interactive,
    /// Frame buffers destined for encoding; no wall-clock budget.
    Batch,
}

/// A renderer turning a [`ResolvedFrame`] into pixels.
///
/// Both variants draw through the same painter, so the same `(frame, transform)` pair yields the
/// same bytes regardless of which backend produced it.
pub trait RenderBackend: Send {
    /// Variant of this backend.
    fn kind(&self) -> BackendKind;

    /// Render `frame` projected through `transform`.
    fn render(
        &mut self,
        frame: &ResolvedFrame,
        transform: &CoordinateTransform,
    ) -> Result<FrameRGBA, RenderError>;

    /// Wall-clock budget per frame, if the backend has one.
    fn frame_budget(&self) -> Option<Duration> {
        None
    }
}

/// Default interactive budget (one 60 Hz refresh).
pub const DEFAULT_FRAME_BUDGET: Duration = Duration::from_nanos(16_666_667);

/// Interactive render timing counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InteractiveStats {
    /// Frames rendered.
    pub frames: u64,
    /// Frames whose render time exceeded the budget.
    pub overruns: u64,
    /// Duration of the most recent render.
    pub last_render: Duration,
}

/// Backend for live playback. Renders are timed against a refresh budget; an overrun is counted
/// and reported, and the session's pacer drops the missed refresh slots.
pub struct InteractiveBackend {
    painter: RadarPainter,
    budget: Duration,
    stats: InteractiveStats,
}

impl InteractiveBackend {
    /// Interactive backend with the default 60 Hz budget.
    pub fn new(settings: RenderSettings) -> Self {
        Self::with_budget(settings, DEFAULT_FRAME_BUDGET)
    }

    /// Interactive backend with an explicit per-frame budget.
    pub fn with_budget(settings: RenderSettings, budget: Duration) -> Self {
        Self {
            painter: RadarPainter::new(settings),
            budget,
            stats: InteractiveStats::default(),
        }
    }

    /// Timing counters.
    pub fn stats(&self) -> InteractiveStats {
        self.stats
    }
}

impl RenderBackend for InteractiveBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Interactive
    }

    fn render(
        &mut self,
        frame: &ResolvedFrame,
        transform: &CoordinateTransform,
    ) -> Result<FrameRGBA, RenderError> {
        let started = Instant::now();
        let out = self.painter.paint(frame, transform);
        let elapsed = started.elapsed();
        self.stats.frames += 1;
        self.stats.last_render = elapsed;
        if elapsed > self.budget {
            self.stats.overruns += 1;
            tracing::debug!(
                tick = frame.tick().0,
                elapsed_us = elapsed.as_micros() as u64,
                budget_us = self.budget.as_micros() as u64,
                "interactive frame over budget"
            );
        }
        out
    }

    fn frame_budget(&self) -> Option<Duration> {
        Some(self.budget)
    }
}

/// Backend for export: no budget, reuses its scratch state across frames.
pub struct BatchBackend {
    painter: RadarPainter,
}

impl BatchBackend {
    /// Create a batch backend.
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            painter: RadarPainter::new(settings),
        }
    }
}

impl RenderBackend for BatchBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Batch
    }

    fn render(
        &mut self,
        frame: &ResolvedFrame,
        transform: &CoordinateTransform,
    ) -> Result<FrameRGBA, RenderError> {
        self.painter.paint(frame, transform)
    }
}

/// Create a backend of the requested kind.
pub fn create_backend(kind: BackendKind, settings: &RenderSettings) -> Box<dyn RenderBackend> {
    match kind {
        BackendKind::Interactive => Box::new(InteractiveBackend::new(settings.clone())),
        BackendKind::Batch => Box::new(BatchBackend::new(settings.clone())),
    }
}
