use std::cell::Cell;

use super::*;
use crate::foundation::core::{Canvas, WorldPos};
use crate::foundation::error::RenderError;
use crate::map::catalog::MapCatalog;
use crate::render::backend::{BackendKind, BatchBackend, RenderSettings};
use crate::resolve::frame::ResolvedFrame;
use crate::resolve::resolver::ResolverConfig;
use crate::timeline::index::TimelineIndex;
use crate::timeline::record::{
    MatchRecording, PlayerId, PlayerSnapshot, Team, TickRecord, WeaponId,
};
use std::sync::Arc;

const BG: Rgba8 = Rgba8::opaque(24, 26, 31);

fn resolver() -> FrameResolver {
    let ticks = (0..400u64)
        .map(|i| TickRecord {
            tick: Tick(i),
            time: i as f64 / 64.0,
            players: vec![PlayerSnapshot {
                player: PlayerId(3),
                name: "lurker".to_owned(),
                team: Team::Ct,
                position: WorldPos::new(-1000.0 + i as f64 * 6.0, 500.0, 0.0),
                yaw: 90.0,
                pitch: 0.0,
                alive: true,
                health: 100,
                flash: 0.0,
                weapon: WeaponId(1),
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
    FrameResolver::new(
        Arc::new(TimelineIndex::from_recording(&rec).unwrap()),
        ResolverConfig::default(),
    )
}

fn transform() -> CoordinateTransform {
    let catalog = MapCatalog::builtin();
    CoordinateTransform::new(catalog.get("de_dust2").unwrap(), Canvas::square(32)).unwrap()
}

/// Backend that fails on chosen ticks.
struct FailOn {
    inner: BatchBackend,
    ticks: Vec<u64>,
}

impl RenderBackend for FailOn {
    fn kind(&self) -> BackendKind {
        BackendKind::Interactive
    }

    fn render(
        &mut self,
        frame: &ResolvedFrame,
        transform: &CoordinateTransform,
    ) -> Result<FrameRGBA, RenderError> {
        if self.ticks.contains(&frame.tick().0) {
            return Err(RenderError::Backend {
                tick: frame.tick(),
                reason: "injected".to_owned(),
            });
        }
        self.inner.render(frame, transform)
    }
}

fn session(fail: Vec<u64>) -> PlaybackSession {
    PlaybackSession::new(
        resolver(),
        transform(),
        Box::new(FailOn {
            inner: BatchBackend::new(RenderSettings::default()),
            ticks: fail,
        }),
        64,
        FramePacer::new(Duration::from_millis(16)),
        BG,
    )
}

/// Clock that jumps straight to each deadline.
struct FakeClock {
    now: Cell<Instant>,
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.now.get()
    }

    fn sleep_until(&self, deadline: Instant) {
        if deadline > self.now.get() {
            self.now.set(deadline);
        }
    }
}

/// Input that yields one scripted batch per poll.
struct Script(VecDeque<Vec<TransportCommand>>);

impl InputSource for Script {
    fn poll(&mut self) -> Vec<TransportCommand> {
        self.0.pop_front().unwrap_or_default()
    }
}

#[test]
fn paused_session_renders_the_current_tick_once() {
    let mut s = session(Vec::new());
    let mut surface = MemorySurface::new();
    let t0 = Instant::now();
    let first = s.step(t0, &mut surface).unwrap();
    assert!(first.rendered);
    assert_eq!(first.tick, Tick(0));
    let second = s.step(t0 + Duration::from_millis(16), &mut surface).unwrap();
    assert!(!second.rendered);
    assert_eq!(second.advanced, 0);
    assert_eq!(surface.presented(), &[Tick(0)]);
    assert_eq!(s.cache().pinned(), Some(Tick(0)));
}

#[test]
fn playing_advances_by_wall_clock_delta() {
    let mut s = session(Vec::new());
    let mut surface = MemorySurface::new();
    let t0 = Instant::now();
    s.apply(TransportCommand::Play);
    s.step(t0, &mut surface).unwrap();
    let out = s.step(t0 + Duration::from_millis(50), &mut surface).unwrap();
    assert_eq!(out.advanced, 3);
    assert_eq!(out.tick, Tick(3));
    assert_eq!(out.state, PlaybackState::Playing(1.0));
    assert_eq!(s.cache().pinned(), Some(Tick(3)));
}

#[test]
fn render_failure_holds_the_previous_frame() {
    let mut s = session(vec![3]);
    let mut surface = MemorySurface::new();
    let t0 = Instant::now();
    s.apply(TransportCommand::Play);
    s.step(t0, &mut surface).unwrap();
    let good = surface.last_frame().cloned().unwrap();
    let out = s.step(t0 + Duration::from_millis(50), &mut surface).unwrap();
    assert!(out.held);
    assert!(s.controller().is_playing());
    assert_eq!(surface.last_frame(), Some(&good));
    assert_eq!(s.stats().render_failures, 1);
}

#[test]
fn failure_before_any_frame_presents_blank_background() {
    let mut s = session(vec![0]);
    let mut surface = MemorySurface::new();
    let out = s.step(Instant::now(), &mut surface).unwrap();
    assert!(out.held);
    assert_eq!(
        surface.last_frame(),
        Some(&FrameRGBA::blank(Canvas::square(32), BG))
    );
}

#[test]
fn commands_drive_the_controller() {
    let mut s = session(Vec::new());
    s.apply(TransportCommand::SeekAbsolute(Duration::from_secs(2)));
    assert_eq!(s.controller().current_tick(), Tick(128));
    s.apply(TransportCommand::SeekRelative(-1.0));
    assert_eq!(s.controller().current_tick(), Tick(64));
    s.apply(TransportCommand::SetSpeed(2.0));
    s.apply(TransportCommand::TogglePlay);
    assert_eq!(s.controller().state(), PlaybackState::Playing(2.0));
    s.apply(TransportCommand::JumpToRound(1));
    assert_eq!(s.controller().current_tick(), Tick(64));
    assert!(!s.is_stopped());
    s.apply(TransportCommand::Stop);
    assert!(s.is_stopped());
}

#[test]
fn run_paces_frames_and_unpins_on_stop() {
    let mut s = session(Vec::new());
    let mut surface = MemorySurface::new();
    let clock = FakeClock {
        now: Cell::new(Instant::now()),
    };
    let mut script = Script(VecDeque::from(vec![vec![TransportCommand::Play]]));
    for _ in 0..9 {
        script.0.push_back(Vec::new());
    }
    script.0.push_back(vec![TransportCommand::Stop]);

    let stats = s.run(&clock, &mut script, &mut surface).unwrap();
    assert_eq!(stats.steps, 10);
    assert_eq!(stats.frames_rendered, 10);
    assert_eq!(stats.dropped_slots, 0);
    // 9 refresh slots of 16 ms at 64 ticks/s.
    assert_eq!(surface.presented().last(), Some(&Tick(9)));
    assert_eq!(s.cache().pinned(), None);
}

#[test]
fn closed_channel_stops_the_session() {
    let (tx, mut rx) = mpsc::channel();
    tx.send(TransportCommand::Play).unwrap();
    drop(tx);
    assert_eq!(
        rx.poll(),
        vec![TransportCommand::Play, TransportCommand::Stop]
    );
}
