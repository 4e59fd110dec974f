use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::encode::sink::{FrameSink, SinkConfig, ensure_parent_dir};
use crate::foundation::core::Tick;
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::backend::FrameRGBA;

/// Convert a frame to straight-alpha RGBA8 bytes.
pub fn to_straight_rgba8(frame: &FrameRGBA) -> Vec<u8> {
    if !frame.premultiplied {
        return frame.data.clone();
    }
    let mut out = frame.data.clone();
    for px in out.chunks_exact_mut(4) {
        let a = u32::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
    out
}

/// Write `frame` as a PNG file, creating parent directories as needed.
pub fn save_png(path: impl AsRef<Path>, frame: &FrameRGBA) -> ReelResult<()> {
    let path = path.as_ref();
    if frame.data.len() != (frame.width as usize) * (frame.height as usize) * 4 {
        return Err(ReelError::validation(
            "frame.data size mismatch with width*height*4",
        ));
    }
    ensure_parent_dir(path)?;
    image::save_buffer_with_format(
        path,
        &to_straight_rgba8(frame),
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

/// Sink writing one `frame_<tick>.png` per pushed frame into a directory.
#[derive(Debug)]
pub struct PngSequenceSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
    last_tick: Option<Tick>,
    started: bool,
}

impl PngSequenceSink {
    /// Sink writing into `dir` (created on `begin`).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
            last_tick: None,
            started: false,
        }
    }

    /// File name used for `tick`.
    pub fn file_name(tick: Tick) -> String {
        format!("frame_{:08}.png", tick.0)
    }

    /// Paths written so far, in order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl FrameSink for PngSequenceSink {
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()> {
        if cfg.width == 0 || cfg.height == 0 {
            return Err(ReelError::validation("png sink width/height must be non-zero"));
        }
        std::fs::create_dir_all(&self.dir).with_context(|| {
            format!("failed to create output directory '{}'", self.dir.display())
        })?;
        self.written.clear();
        self.last_tick = None;
        self.started = true;
        Ok(())
    }

    fn push_frame(&mut self, tick: Tick, frame: &FrameRGBA) -> ReelResult<()> {
        if !self.started {
            return Err(ReelError::encode("png sink not started"));
        }
        if let Some(last) = self.last_tick
            && tick <= last
        {
            return Err(ReelError::encode(format!(
                "png sink received out-of-order {tick} after {last}"
            )));
        }
        let path = self.dir.join(Self::file_name(tick));
        save_png(&path, frame)?;
        self.last_tick = Some(tick);
        self.written.push(path);
        Ok(())
    }

    fn end(&mut self) -> ReelResult<()> {
        self.started = false;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/png.rs"]
mod tests;
