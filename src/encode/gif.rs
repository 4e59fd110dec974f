use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::Context as _;
use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};

use crate::encode::sink::{FrameSink, SinkConfig, check_frame, ensure_parent_dir, flatten_rgb};
use crate::foundation::core::{Rgba8, Tick};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::backend::FrameRGBA;

/// GIF stores delays in hundredths of a second and most viewers stretch anything shorter than
/// two of them.
const MIN_SMOOTH_DELAY_MS: f64 = 20.0;

/// Options for [`GifSink`] output.
#[derive(Clone, Debug)]
pub struct GifSinkOpts {
    /// Output GIF file path.
    pub out_path: PathBuf,
    /// Opaque color frames are flattened onto.
    pub background: Rgba8,
    /// Palette quantization speed, 1 (best) to 30 (fastest).
    pub speed: i32,
    /// Loop the animation forever instead of playing once.
    pub looping: bool,
}

impl GifSinkOpts {
    /// Create options for writing an animated GIF to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            background: Rgba8::opaque(0, 0, 0),
            speed: 10,
            looping: true,
        }
    }
}

/// Sink writing an animated GIF, one frame per exported tick.
pub struct GifSink {
    opts: GifSinkOpts,
    encoder: Option<GifEncoder<BufWriter<File>>>,
    file: Option<File>,
    cfg: Option<SinkConfig>,
    delay: Delay,
    last_tick: Option<Tick>,
    frames: u64,
}

impl GifSink {
    /// Create a sink writing to `opts.out_path`.
    pub fn new(opts: GifSinkOpts) -> Self {
        Self {
            opts,
            encoder: None,
            file: None,
            cfg: None,
            delay: Delay::from_numer_denom_ms(0, 1),
            last_tick: None,
            frames: 0,
        }
    }

    /// Frames written since `begin`.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl FrameSink for GifSink {
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()> {
        if cfg.width == 0 || cfg.height == 0 {
            return Err(ReelError::validation("gif sink width/height must be non-zero"));
        }
        if cfg.width > u32::from(u16::MAX) || cfg.height > u32::from(u16::MAX) {
            return Err(ReelError::validation(format!(
                "gif frames are limited to {0}x{0} pixels",
                u16::MAX
            )));
        }
        let (numer, denom) = cfg.frame_ms()?;
        let frame_ms = f64::from(numer) / f64::from(denom);
        if frame_ms < MIN_SMOOTH_DELAY_MS {
            tracing::warn!(
                frame_ms,
                "gif frame delay below 20ms, most viewers will play it slower"
            );
        }

        let path = &self.opts.out_path;
        ensure_parent_dir(path)?;
        let file = File::create(path)
            .with_context(|| format!("failed to create gif '{}'", path.display()))?;
        let sync = file
            .try_clone()
            .with_context(|| format!("failed to clone gif handle '{}'", path.display()))?;
        let speed = self.opts.speed.clamp(1, 30);
        let mut encoder = GifEncoder::new_with_speed(BufWriter::new(file), speed);
        if self.opts.looping {
            encoder
                .set_repeat(Repeat::Infinite)
                .map_err(|e| ReelError::encode(format!("gif repeat: {e}")))?;
        }

        tracing::debug!(
            path = %path.display(),
            width = cfg.width,
            height = cfg.height,
            frame_ms,
            "gif started"
        );
        self.delay = Delay::from_numer_denom_ms(numer, denom);
        self.encoder = Some(encoder);
        self.file = Some(sync);
        self.cfg = Some(cfg);
        self.last_tick = None;
        self.frames = 0;
        Ok(())
    }

    fn push_frame(&mut self, tick: Tick, frame: &FrameRGBA) -> ReelResult<()> {
        let (Some(cfg), Some(encoder)) = (self.cfg.as_ref(), self.encoder.as_mut()) else {
            return Err(ReelError::encode("gif sink not started"));
        };
        if let Some(last) = self.last_tick
            && tick <= last
        {
            return Err(ReelError::encode(format!(
                "gif sink received out-of-order {tick} after {last}"
            )));
        }
        check_frame(cfg, frame)?;

        let rgba: Vec<u8> = flatten_rgb(frame, self.opts.background)
            .flat_map(|[r, g, b]| [r, g, b, 255])
            .collect();
        let image = RgbaImage::from_raw(cfg.width, cfg.height, rgba)
            .ok_or_else(|| ReelError::encode("gif frame buffer has the wrong length"))?;
        encoder
            .encode_frame(Frame::from_parts(image, 0, 0, self.delay))
            .map_err(|e| ReelError::encode(format!("gif encode failed at {tick}: {e}")))?;

        self.last_tick = Some(tick);
        self.frames += 1;
        Ok(())
    }

    fn end(&mut self) -> ReelResult<()> {
        let encoder = self
            .encoder
            .take()
            .ok_or_else(|| ReelError::encode("gif sink not started"))?;
        self.cfg = None;
        // The trailer is written when the encoder drops.
        drop(encoder);
        if let Some(file) = self.file.take() {
            file.sync_all().with_context(|| {
                format!("failed to flush gif '{}'", self.opts.out_path.display())
            })?;
        }
        tracing::debug!(
            path = %self.opts.out_path.display(),
            frames = self.frames,
            "gif finished"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/gif.rs"]
mod tests;
