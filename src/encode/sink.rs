use std::path::Path;

use anyhow::Context as _;

use crate::foundation::core::{Fps, Rgba8, Tick, TickRange};
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::mul_div255_u16;
use crate::render::backend::FrameRGBA;
use crate::timeline::rate::TickRate;

/// Configuration provided to a [`FrameSink`] at the start of an export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Map the match was played on.
    pub map: String,
    /// Exported tick range.
    pub ticks: TickRange,
    /// Sampling rate of the recording.
    pub tick_rate: TickRate,
    /// Ticks between consecutive frames.
    pub interval: u32,
}

impl SinkConfig {
    /// Output frame rate: tick rate over sampling interval.
    pub fn fps(&self) -> ReelResult<Fps> {
        Fps::new(self.tick_rate.0, self.interval)
    }

    /// Frame duration in milliseconds as `(numerator, denominator)`.
    pub fn frame_ms(&self) -> ReelResult<(u32, u32)> {
        let fps = self.fps()?;
        let numer = fps
            .den
            .checked_mul(1000)
            .ok_or_else(|| ReelError::validation("frame duration overflows u32 milliseconds"))?;
        Ok((numer, fps.num))
    }

    /// Bytes in one straight RGBA8 frame of this size.
    pub(crate) fn rgba_len(&self) -> usize {
        (self.width as usize) * (self.height as usize) * 4
    }
}

/// Sink contract for consuming rendered frames in timeline order.
///
/// Ordering contract: `push_frame` is called in strictly increasing [`Tick`] order.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()>;
    /// Push one frame in strictly increasing tick order.
    fn push_frame(&mut self, tick: Tick, frame: &FrameRGBA) -> ReelResult<()>;
    /// Called once after the last frame is pushed, including after cancellation.
    fn end(&mut self) -> ReelResult<()>;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    ended: bool,
    /// Frames in timeline order.
    pub(crate) frames: Vec<(Tick, FrameRGBA)>,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the sink configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg.clone()
    }

    /// Borrow the captured frames.
    pub fn frames(&self) -> &[(Tick, FrameRGBA)] {
        &self.frames
    }

    /// Ticks of the captured frames, in push order.
    pub fn ticks(&self) -> Vec<Tick> {
        self.frames.iter().map(|(t, _)| *t).collect()
    }

    /// Return `true` once `end` has been called.
    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()> {
        self.cfg = Some(cfg);
        self.ended = false;
        self.frames.clear();
        Ok(())
    }

    fn push_frame(&mut self, tick: Tick, frame: &FrameRGBA) -> ReelResult<()> {
        self.frames.push((tick, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> ReelResult<()> {
        self.ended = true;
        Ok(())
    }
}

/// Composite every pixel of `frame` over an opaque `background`, yielding RGB triples.
///
/// Handles both premultiplied and straight frames.
pub(crate) fn flatten_rgb(
    frame: &FrameRGBA,
    background: Rgba8,
) -> impl Iterator<Item = [u8; 3]> + '_ {
    let bg = [background.r, background.g, background.b].map(u16::from);
    let premultiplied = frame.premultiplied;
    frame.data.chunks_exact(4).map(move |px| {
        let a = u16::from(px[3]);
        let inv = 255 - a;
        std::array::from_fn(|i| {
            let c = u16::from(px[i]);
            let c = if premultiplied { c } else { mul_div255_u16(c, a) };
            (c + mul_div255_u16(bg[i], inv)).min(255) as u8
        })
    })
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Reject a frame whose size disagrees with the sink configuration.
pub(crate) fn check_frame(cfg: &SinkConfig, frame: &FrameRGBA) -> ReelResult<()> {
    if frame.width != cfg.width || frame.height != cfg.height {
        return Err(ReelError::validation(format!(
            "frame size mismatch: got {}x{}, expected {}x{}",
            frame.width, frame.height, cfg.width, cfg.height
        )));
    }
    if frame.data.len() != cfg.rgba_len() {
        return Err(ReelError::validation(
            "frame.data size mismatch with width*height*4",
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
