use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};

use rayon::prelude::*;
use xxhash_rust::xxh3::Xxh3;

use crate::encode::sink::{FrameSink, SinkConfig};
use crate::export::reorder::ReorderBuffer;
use crate::foundation::core::{Rgba8, Tick, TickRange};
use crate::foundation::error::{ReelError, ReelResult, RenderError};
use crate::map::transform::CoordinateTransform;
use crate::render::backend::{FrameRGBA, RenderBackend};
use crate::resolve::cache::FrameCache;
use crate::resolve::resolver::FrameResolver;

const MAX_REORDER_BUFFER_BYTES: u64 = 128 * 1024 * 1024;
const DIGEST_SEED: u64 = 0x7c1c_5e3a_d0f2_9b41;

/// Options controlling export behavior.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ExportOpts {
    /// Render ticks in parallel on a dedicated rayon pool.
    pub parallel: bool,
    /// Override the number of rayon worker threads. `None` uses rayon defaults.
    pub threads: Option<usize>,
    /// Frames dispatched per parallel batch (also bounds the reorder buffer).
    pub chunk_size: usize,
    /// Bounded channel capacity between render workers and the writer thread.
    pub channel_capacity: usize,
}

impl Default for ExportOpts {
    fn default() -> Self {
        Self {
            parallel: false,
            threads: None,
            chunk_size: 64,
            channel_capacity: 4,
        }
    }
}

/// A tick range sampled at a fixed interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportJob {
    /// Ticks to export (start inclusive, end exclusive).
    pub range: TickRange,
    /// Sampling interval in ticks (1 = every tick).
    pub interval: u64,
}

impl ExportJob {
    /// Validated export job.
    pub fn new(range: TickRange, interval: u64) -> ReelResult<Self> {
        if interval == 0 {
            return Err(ReelError::validation("export interval must be >= 1 tick"));
        }
        if range.is_empty() {
            return Err(ReelError::validation("export range must be non-empty"));
        }
        Ok(Self { range, interval })
    }

    /// Sampled ticks, strictly increasing.
    pub fn ticks(&self) -> impl Iterator<Item = Tick> {
        self.range.sampled(self.interval)
    }

    /// Number of frames this job produces.
    pub fn frame_count(&self) -> u64 {
        self.range.sample_count(self.interval)
    }
}

/// Shared flag for stopping an export at the next frame boundary.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Return `true` once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Outcome of an export.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct ExportReport {
    /// Frames the job asked for.
    pub frames_total: u64,
    /// Frames handed to the sink (including substitutes).
    pub frames_written: u64,
    /// Frames whose render failed and were substituted.
    pub frames_failed: u64,
    /// Ticks of the failed frames.
    pub failed_ticks: Vec<Tick>,
    /// The export stopped early on request.
    pub cancelled: bool,
    /// xxh3 digest over every written `(tick, pixels)` pair.
    pub digest: u64,
}

#[derive(Debug)]
struct FrameMsg {
    seq: u64,
    tick: Tick,
    frame: Result<Arc<FrameRGBA>, RenderError>,
}

/// Drives a batch backend over an [`ExportJob`] and writes frames in tick order.
///
/// Resolution goes through the job's [`FrameCache`]; rendering may run in parallel. A frame that
/// fails to render is replaced by the last good frame (or a blank background frame if none exists
/// yet) and counted, never aborting the export.
pub struct ExportPipeline<'a> {
    resolver: &'a FrameResolver,
    cache: &'a FrameCache,
    transform: &'a CoordinateTransform,
    background: Rgba8,
    opts: ExportOpts,
}

impl<'a> ExportPipeline<'a> {
    /// Create a pipeline over shared resolution state.
    pub fn new(
        resolver: &'a FrameResolver,
        cache: &'a FrameCache,
        transform: &'a CoordinateTransform,
        background: Rgba8,
        opts: ExportOpts,
    ) -> Self {
        Self {
            resolver,
            cache,
            transform,
            background,
            opts,
        }
    }

    /// Export `job` into `sink`, creating one backend per worker with `make_backend`.
    #[tracing::instrument(skip(self, make_backend, sink, cancel), fields(start = job.range.start.0, end = job.range.end.0, interval = job.interval))]
    pub fn export<F, B>(
        &self,
        job: &ExportJob,
        make_backend: F,
        sink: &mut dyn FrameSink,
        cancel: &CancelToken,
    ) -> ReelResult<ExportReport>
    where
        F: Fn() -> B + Sync + Send,
        B: RenderBackend,
    {
        let ticks: Vec<Tick> = job.ticks().collect();
        let total = ticks.len() as u64;
        if total == 0 {
            return Err(ReelError::validation("export produces no frames"));
        }

        let canvas = self.transform.canvas();
        let interval: u32 = job
            .interval
            .try_into()
            .map_err(|_| ReelError::validation("export interval exceeds u32"))?;
        let index = self.resolver.index();
        let cfg = SinkConfig {
            width: canvas.width,
            height: canvas.height,
            map: index.map_name().to_owned(),
            ticks: job.range,
            tick_rate: index.tick_rate(),
            interval,
        };
        cfg.fps()?;

        let bytes_per_frame = (canvas.rgba_len() as u64).max(1);
        let max_chunk_by_mem = (MAX_REORDER_BUFFER_BYTES / bytes_per_frame).max(1);
        let chunk_size = (self.opts.chunk_size.max(1) as u64)
            .min(max_chunk_by_mem)
            .min(total);
        let cap = self.opts.channel_capacity.max(1);

        let pool = if self.opts.parallel {
            Some(build_thread_pool(self.opts.threads)?)
        } else {
            None
        };

        let blank = Arc::new(FrameRGBA::blank(canvas, self.background));

        std::thread::scope(|scope| -> ReelResult<ExportReport> {
            let (tx, rx) = mpsc::sync_channel::<FrameMsg>(cap);
            let sink_ref: &mut dyn FrameSink = sink;

            let writer = scope.spawn(move || -> ReelResult<ExportReport> {
                sink_ref.begin(cfg)?;

                let mut report = ExportReport {
                    frames_total: total,
                    ..ExportReport::default()
                };
                let mut digest = Xxh3::with_seed(DIGEST_SEED);
                let mut last_good: Option<Arc<FrameRGBA>> = None;
                let mut pending = ReorderBuffer::new(0);

                for msg in rx {
                    if !pending.push(msg.seq, (msg.tick, msg.frame)) {
                        return Err(ReelError::encode(format!(
                            "duplicate frame for sequence {}",
                            msg.seq
                        )));
                    }
                    while let Some((_, (tick, result))) = pending.pop_ready() {
                        let frame = match result {
                            Ok(frame) => {
                                last_good = Some(Arc::clone(&frame));
                                frame
                            }
                            Err(e) => {
                                tracing::warn!(tick = tick.0, error = %e, "frame render failed, holding last frame");
                                report.frames_failed += 1;
                                report.failed_ticks.push(tick);
                                last_good.clone().unwrap_or_else(|| Arc::clone(&blank))
                            }
                        };
                        sink_ref.push_frame(tick, &frame)?;
                        digest.update(&tick.0.to_le_bytes());
                        digest.update(&frame.data);
                        report.frames_written += 1;
                    }
                }

                sink_ref.end()?;
                report.digest = digest.digest();
                Ok(report)
            });

            let produced = match pool.as_ref() {
                Some(pool) => self.produce_parallel(
                    pool, &ticks, chunk_size, &make_backend, &tx, cancel,
                ),
                None => self.produce_sequential(&ticks, &make_backend, &tx, cancel),
            };
            drop(tx);

            let written = writer
                .join()
                .map_err(|_| ReelError::encode("export writer thread panicked"))?;

            // A writer failure closes the channel, so report it ahead of the producer's send error.
            let mut report = written?;
            produced?;

            report.cancelled = report.frames_written < total && cancel.is_cancelled();
            tracing::info!(
                frames_total = report.frames_total,
                frames_written = report.frames_written,
                frames_failed = report.frames_failed,
                cancelled = report.cancelled,
                "export finished"
            );
            Ok(report)
        })
    }

    fn render_one<B: RenderBackend>(&self, backend: &mut B, seq: u64, tick: Tick) -> FrameMsg {
        let resolved = self.cache.get(tick, self.resolver);
        let frame = backend.render(&resolved, self.transform).map(Arc::new);
        FrameMsg { seq, tick, frame }
    }

    fn produce_sequential<F, B>(
        &self,
        ticks: &[Tick],
        make_backend: &F,
        tx: &mpsc::SyncSender<FrameMsg>,
        cancel: &CancelToken,
    ) -> ReelResult<()>
    where
        F: Fn() -> B,
        B: RenderBackend,
    {
        let mut backend = make_backend();
        for (seq, &tick) in ticks.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(tick = tick.0, "export cancelled");
                break;
            }
            tx.send(self.render_one(&mut backend, seq as u64, tick))
                .map_err(|_| ReelError::encode("export writer is not accepting frames"))?;
        }
        Ok(())
    }

    fn produce_parallel<F, B>(
        &self,
        pool: &rayon::ThreadPool,
        ticks: &[Tick],
        chunk_size: u64,
        make_backend: &F,
        tx: &mpsc::SyncSender<FrameMsg>,
        cancel: &CancelToken,
    ) -> ReelResult<()>
    where
        F: Fn() -> B + Sync + Send,
        B: RenderBackend,
    {
        let total = ticks.len() as u64;
        let mut chunk_start = 0u64;
        while chunk_start < total {
            if cancel.is_cancelled() {
                tracing::info!(tick = ticks[chunk_start as usize].0, "export cancelled");
                break;
            }
            let chunk_end = (chunk_start + chunk_size).min(total);
            let tx = tx.clone();
            pool.install(|| {
                (chunk_start..chunk_end).into_par_iter().try_for_each_init(
                    make_backend,
                    move |backend, seq| -> ReelResult<()> {
                        // Cancelled mid-chunk: leave a gap, the writer stops at it.
                        if cancel.is_cancelled() {
                            return Ok(());
                        }
                        let msg = self.render_one(backend, seq, ticks[seq as usize]);
                        tx.send(msg).map_err(|_| {
                            ReelError::encode("export writer is not accepting frames")
                        })
                    },
                )
            })?;
            chunk_start = chunk_end;
        }
        Ok(())
    }
}

fn build_thread_pool(threads: Option<usize>) -> ReelResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(ReelError::validation("export 'threads' must be >= 1 when set"));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| ReelError::validation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/export/pipeline.rs"]
mod tests;
