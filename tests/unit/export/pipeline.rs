use super::*;
use crate::encode::sink::InMemorySink;
use crate::foundation::core::{Canvas, Fps, WorldPos};
use crate::map::catalog::MapCatalog;
use crate::render::backend::{BackendKind, BatchBackend, RenderSettings};
use crate::resolve::frame::ResolvedFrame;
use crate::resolve::resolver::ResolverConfig;
use crate::timeline::index::TimelineIndex;
use crate::timeline::record::{
    MatchRecording, PlayerId, PlayerSnapshot, Team, TickRecord, WeaponId,
};

struct Fixture {
    resolver: FrameResolver,
    transform: CoordinateTransform,
}

fn fixture() -> Fixture {
    let ticks = (0..640u64)
        .map(|i| TickRecord {
            tick: Tick(i),
            time: i as f64 / 64.0,
            players: vec![PlayerSnapshot {
                player: PlayerId(1),
                name: "runner".to_owned(),
                team: Team::T,
                position: WorldPos::new(-500.0 + i as f64 * 4.0, 0.0, 0.0),
                yaw: 0.0,
                pitch: 0.0,
                alive: true,
                health: 100,
                flash: 0.0,
                weapon: WeaponId(7),
            }],
            utility: Vec::new(),
            kills: Vec::new(),
            bomb: None,
            projectiles: Vec::new(),
        })
        .collect();
    let rec = MatchRecording {
        map: "de_dust2".to_owned(),
        ticks,
        rounds: Vec::new(),
    };
    let index = Arc::new(TimelineIndex::from_recording(&rec).unwrap());
    let catalog = MapCatalog::builtin();
    Fixture {
        resolver: FrameResolver::new(index, ResolverConfig::default()),
        transform: CoordinateTransform::new(catalog.get("de_dust2").unwrap(), Canvas::square(32))
            .unwrap(),
    }
}

/// Batch backend that fails on chosen ticks and can trip a cancel token.
struct Flaky {
    inner: BatchBackend,
    fail: Vec<u64>,
    cancel_at: Option<(u64, CancelToken)>,
}

impl Flaky {
    fn new(fail: Vec<u64>) -> Self {
        Self {
            inner: BatchBackend::new(RenderSettings::default()),
            fail,
            cancel_at: None,
        }
    }
}

impl RenderBackend for Flaky {
    fn kind(&self) -> BackendKind {
        BackendKind::Batch
    }

    fn render(
        &mut self,
        frame: &ResolvedFrame,
        transform: &CoordinateTransform,
    ) -> Result<FrameRGBA, RenderError> {
        if let Some((at, token)) = &self.cancel_at
            && frame.tick().0 == *at
        {
            token.cancel();
        }
        if self.fail.contains(&frame.tick().0) {
            return Err(RenderError::Backend {
                tick: frame.tick(),
                reason: "injected".to_owned(),
            });
        }
        self.inner.render(frame, transform)
    }
}

fn run(
    fx: &Fixture,
    opts: ExportOpts,
    job: ExportJob,
    fail: Vec<u64>,
) -> (ExportReport, InMemorySink) {
    let cache = FrameCache::new(16);
    let pipeline = ExportPipeline::new(
        &fx.resolver,
        &cache,
        &fx.transform,
        Rgba8::opaque(0, 0, 0),
        opts,
    );
    let mut sink = InMemorySink::new();
    let report = pipeline
        .export(&job, || Flaky::new(fail.clone()), &mut sink, &CancelToken::new())
        .unwrap();
    (report, sink)
}

fn job(start: u64, end: u64, interval: u64) -> ExportJob {
    ExportJob::new(TickRange::new(Tick(start), Tick(end)).unwrap(), interval).unwrap()
}

#[test]
fn writes_sampled_ticks_in_order() {
    let fx = fixture();
    let (report, sink) = run(&fx, ExportOpts::default(), job(0, 640, 64), Vec::new());
    let expected: Vec<Tick> = (0..10).map(|i| Tick(i * 64)).collect();
    assert_eq!(sink.ticks(), expected);
    assert_eq!(report.frames_total, 10);
    assert_eq!(report.frames_written, 10);
    assert_eq!(report.frames_failed, 0);
    assert!(!report.cancelled);
    assert!(sink.is_ended());
    assert_eq!(
        sink.config().map(|c| (c.width, c.fps().unwrap(), c.map)),
        Some((32, Fps { num: 64, den: 64 }, "de_dust2".to_owned()))
    );
}

#[test]
fn parallel_export_matches_sequential() {
    let fx = fixture();
    let (seq_report, seq_sink) = run(&fx, ExportOpts::default(), job(0, 640, 8), Vec::new());
    let par_opts = ExportOpts {
        parallel: true,
        threads: Some(4),
        chunk_size: 7,
        channel_capacity: 2,
    };
    let (par_report, par_sink) = run(&fx, par_opts, job(0, 640, 8), Vec::new());
    assert_eq!(seq_report, par_report);
    assert_eq!(seq_sink.frames(), par_sink.frames());
}

#[test]
fn failed_frames_hold_the_last_good_frame() {
    let fx = fixture();
    let (report, sink) = run(&fx, ExportOpts::default(), job(0, 640, 64), vec![128, 192]);
    assert_eq!(report.frames_failed, 2);
    assert_eq!(report.failed_ticks, vec![Tick(128), Tick(192)]);
    assert_eq!(report.frames_written, 10);
    let frames = sink.frames();
    assert_eq!(frames[2].0, Tick(128));
    assert_eq!(frames[2].1, frames[1].1);
    assert_eq!(frames[3].1, frames[1].1);
    assert_ne!(frames[4].1, frames[1].1);
}

#[test]
fn first_frame_failure_substitutes_blank_background() {
    let fx = fixture();
    let (report, sink) = run(&fx, ExportOpts::default(), job(0, 640, 320), vec![0]);
    assert_eq!(report.frames_failed, 1);
    assert_eq!(
        sink.frames()[0].1,
        FrameRGBA::blank(Canvas::square(32), Rgba8::opaque(0, 0, 0))
    );
}

#[test]
fn cancellation_keeps_the_flushed_prefix() {
    let fx = fixture();
    let cache = FrameCache::new(16);
    let pipeline = ExportPipeline::new(
        &fx.resolver,
        &cache,
        &fx.transform,
        Rgba8::opaque(0, 0, 0),
        ExportOpts::default(),
    );
    let cancel = CancelToken::new();
    let mut sink = InMemorySink::new();
    let report = pipeline
        .export(
            &job(0, 640, 64),
            || Flaky {
                cancel_at: Some((192, cancel.clone())),
                ..Flaky::new(Vec::new())
            },
            &mut sink,
            &cancel,
        )
        .unwrap();
    assert!(report.cancelled);
    assert_eq!(report.frames_written, 4);
    assert_eq!(sink.ticks().last(), Some(&Tick(192)));
    assert!(sink.is_ended());
}

#[test]
fn invalid_jobs_are_rejected() {
    let range = TickRange::new(Tick(0), Tick(10)).unwrap();
    assert!(ExportJob::new(range, 0).is_err());
    assert!(ExportJob::new(TickRange::new(Tick(5), Tick(5)).unwrap(), 1).is_err());
    assert_eq!(ExportJob::new(range, 3).unwrap().frame_count(), 4);
}
