use std::ffi::OsString;
use std::io::{Read as _, Write as _};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use crate::encode::sink::{FrameSink, SinkConfig, check_frame, ensure_parent_dir, flatten_rgb};
use crate::foundation::core::{Rgba8, Tick};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::backend::FrameRGBA;

/// Options for [`FfmpegSink`] MP4 output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output MP4 file path.
    pub out_path: PathBuf,
    /// Overwrite output file if it already exists.
    pub overwrite: bool,
    /// Opaque color frames are flattened onto.
    pub background: Rgba8,
    /// x264 constant rate factor.
    pub crf: u8,
}

impl FfmpegSinkOpts {
    /// Create options for outputting an MP4 to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            background: Rgba8::opaque(0, 0, 0),
            crf: 20,
        }
    }
}

/// Sink that streams radar frames into the system `ffmpeg` as an H.264 MP4.
///
/// Frames are flattened onto the background and piped as `rgb24`. yuv420p needs even
/// dimensions, so an odd canvas side loses its last pixel row or column. The match, tick range
/// and sampling interval are written to the container metadata.
///
/// Dropping a sink that was started but not ended kills the encoder.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,
    encoder: Option<Encoder>,
    cfg: Option<SinkConfig>,
    scratch: Vec<u8>,
    last_tick: Option<Tick>,
    frames: u64,
}

impl FfmpegSink {
    /// Create a new sink that streams into `ffmpeg`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            encoder: None,
            cfg: None,
            scratch: Vec::new(),
            last_tick: None,
            frames: 0,
        }
    }

    /// Arguments passed to `ffmpeg` for an export described by `cfg`.
    pub fn args(&self, cfg: &SinkConfig) -> ReelResult<Vec<OsString>> {
        let fps = cfg.fps()?;
        let mut args: Vec<OsString> = Vec::new();
        let mut arg = |a: &str| args.push(OsString::from(a));

        arg(if self.opts.overwrite { "-y" } else { "-n" });
        arg("-hide_banner");
        arg("-loglevel");
        arg("error");

        // Raw input options go before `-i`.
        arg("-f");
        arg("rawvideo");
        arg("-pix_fmt");
        arg("rgb24");
        arg("-s");
        arg(&format!("{}x{}", cfg.width, cfg.height));
        arg("-framerate");
        arg(&format!("{}/{}", fps.num, fps.den));
        arg("-i");
        arg("pipe:0");

        arg("-an");
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            arg("-vf");
            arg("crop=trunc(iw/2)*2:trunc(ih/2)*2:0:0");
        }
        arg("-c:v");
        arg("libx264");
        arg("-crf");
        arg(&self.opts.crf.to_string());
        arg("-pix_fmt");
        arg("yuv420p");
        arg("-metadata");
        arg(&format!(
            "title={} ticks {}..{}",
            cfg.map, cfg.ticks.start.0, cfg.ticks.end.0
        ));
        arg("-metadata");
        arg(&format!(
            "comment=every {} ticks at {} ticks/s",
            cfg.interval, cfg.tick_rate.0
        ));
        arg("-movflags");
        arg("+faststart");

        args.push(self.opts.out_path.clone().into_os_string());
        Ok(args)
    }

    /// Tear down a running encoder after a failed write and build the error to report.
    fn fail(&mut self, cause: std::io::Error) -> ReelError {
        self.cfg = None;
        let log = self.encoder.take().map(Encoder::abort).unwrap_or_default();
        ReelError::encode(format!("ffmpeg stopped accepting frames ({cause}): {log}"))
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()> {
        if self.encoder.is_some() {
            return Err(ReelError::encode("ffmpeg sink already started"));
        }
        if cfg.width < 2 || cfg.height < 2 {
            return Err(ReelError::validation(
                "ffmpeg sink needs a canvas of at least 2x2 pixels",
            ));
        }
        let args = self.args(&cfg)?;

        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(ReelError::validation(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(ReelError::encode(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let encoder = Encoder::spawn(&args)?;
        tracing::debug!(
            path = %self.opts.out_path.display(),
            map = %cfg.map,
            width = cfg.width,
            height = cfg.height,
            tick_rate = cfg.tick_rate.0,
            interval = cfg.interval,
            "ffmpeg started"
        );

        self.scratch = Vec::with_capacity(cfg.rgba_len() / 4 * 3);
        self.encoder = Some(encoder);
        self.cfg = Some(cfg);
        self.last_tick = None;
        self.frames = 0;
        Ok(())
    }

    fn push_frame(&mut self, tick: Tick, frame: &FrameRGBA) -> ReelResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| ReelError::encode("ffmpeg sink not started"))?;
        if let Some(last) = self.last_tick
            && tick <= last
        {
            return Err(ReelError::encode(format!(
                "ffmpeg sink received out-of-order {tick} after {last}"
            )));
        }
        check_frame(cfg, frame)?;
        self.last_tick = Some(tick);

        self.scratch.clear();
        self.scratch
            .extend(flatten_rgb(frame, self.opts.background).flatten());

        let Some(encoder) = self.encoder.as_mut() else {
            return Err(ReelError::encode("ffmpeg sink is already finalized"));
        };
        if let Err(e) = encoder.stdin.write_all(&self.scratch) {
            return Err(self.fail(e));
        }
        self.frames += 1;
        Ok(())
    }

    fn end(&mut self) -> ReelResult<()> {
        let encoder = self
            .encoder
            .take()
            .ok_or_else(|| ReelError::encode("ffmpeg sink not started"))?;
        self.cfg = None;
        encoder.finish()?;
        tracing::debug!(
            path = %self.opts.out_path.display(),
            frames = self.frames,
            "ffmpeg finished"
        );
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            let log = encoder.abort();
            tracing::warn!(
                path = %self.opts.out_path.display(),
                frames = self.frames,
                stderr = %log,
                "ffmpeg sink dropped before end, encoder killed"
            );
        }
    }
}

/// A running `ffmpeg` process with its stdin and a thread draining stderr.
struct Encoder {
    child: Child,
    stdin: ChildStdin,
    stderr: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
}

impl Encoder {
    fn spawn(args: &[OsString]) -> ReelResult<Self> {
        let mut child = Command::new("ffmpeg")
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ReelError::encode(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;

        let Some(stdin) = child.stdin.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ReelError::encode("failed to open ffmpeg stdin"));
        };
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut bytes = Vec::new();
                pipe.read_to_end(&mut bytes)?;
                Ok(bytes)
            })
        });
        Ok(Self {
            child,
            stdin,
            stderr,
        })
    }

    /// Close stdin and wait for ffmpeg to write the trailer.
    fn finish(self) -> ReelResult<()> {
        let Self {
            mut child,
            stdin,
            stderr,
        } = self;
        drop(stdin);
        let status = child
            .wait()
            .map_err(|e| ReelError::encode(format!("failed to wait for ffmpeg to finish: {e}")))?;
        let log = collect_stderr(stderr);
        if !status.success() {
            return Err(ReelError::encode(format!(
                "ffmpeg exited with status {status}: {log}"
            )));
        }
        Ok(())
    }

    /// Close stdin, kill ffmpeg and reap it. Returns what it logged.
    fn abort(self) -> String {
        let Self {
            mut child,
            stdin,
            stderr,
        } = self;
        drop(stdin);
        if let Err(e) = child.kill() {
            tracing::debug!(error = %e, "ffmpeg already exited");
        }
        if let Err(e) = child.wait() {
            tracing::warn!(error = %e, "failed to reap ffmpeg");
        }
        collect_stderr(stderr)
    }
}

fn collect_stderr(drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>) -> String {
    match drain.map(JoinHandle::join) {
        None => String::new(),
        Some(Ok(Ok(bytes))) => String::from_utf8_lossy(&bytes).trim().to_owned(),
        Some(Ok(Err(e))) => format!("<stderr unreadable: {e}>"),
        Some(Err(_)) => "<stderr drain thread panicked>".to_owned(),
    }
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
