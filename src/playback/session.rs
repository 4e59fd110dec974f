use std::collections::VecDeque;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::foundation::core::{Rgba8, Tick};
use crate::foundation::error::ReelResult;
use crate::map::transform::CoordinateTransform;
use crate::playback::controller::{PlaybackController, PlaybackState};
use crate::playback::pacing::FramePacer;
use crate::render::backend::{FrameRGBA, RenderBackend};
use crate::resolve::cache::{CacheStats, FrameCache};
use crate::resolve::resolver::FrameResolver;

/// User transport input for a playback session.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportCommand {
    /// Start playing.
    Play,
    /// Pause.
    Pause,
    /// Toggle play/pause.
    TogglePlay,
    /// Seek to a time from the start.
    SeekAbsolute(Duration),
    /// Seek by signed seconds.
    SeekRelative(f64),
    /// Jump to a round number (clamped).
    JumpToRound(u32),
    /// Jump to the next round.
    NextRound,
    /// Jump to the previous round.
    PrevRound,
    /// Change playback speed (clamped).
    SetSpeed(f64),
    /// End the session at the next frame boundary.
    Stop,
}

/// Time source for the interactive loop. Tests substitute a synthetic clock.
pub trait Clock {
    /// Current instant.
    fn now(&self) -> Instant;
    /// Suspend until `deadline`.
    fn sleep_until(&self, deadline: Instant);
}

/// Wall clock backed by `std::thread::sleep`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep_until(&self, deadline: Instant) {
        let wait = deadline.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
    }
}

/// Non-blocking source of transport commands.
pub trait InputSource {
    /// Commands received since the previous poll.
    fn poll(&mut self) -> Vec<TransportCommand>;
}

impl InputSource for VecDeque<TransportCommand> {
    fn poll(&mut self) -> Vec<TransportCommand> {
        self.drain(..).collect()
    }
}

impl InputSource for mpsc::Receiver<TransportCommand> {
    fn poll(&mut self) -> Vec<TransportCommand> {
        let mut out = Vec::new();
        loop {
            match self.try_recv() {
                Ok(cmd) => out.push(cmd),
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    out.push(TransportCommand::Stop);
                    break;
                }
            }
        }
        out
    }
}

/// Live display target.
pub trait DisplaySurface {
    /// Show `frame` for `tick`.
    fn present(&mut self, tick: Tick, frame: &FrameRGBA) -> ReelResult<()>;
}

/// Surface that records what was presented.
#[derive(Debug, Default)]
pub struct MemorySurface {
    presented: Vec<Tick>,
    last: Option<FrameRGBA>,
}

impl MemorySurface {
    /// Empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticks in presentation order.
    pub fn presented(&self) -> &[Tick] {
        &self.presented
    }

    /// Most recently presented frame.
    pub fn last_frame(&self) -> Option<&FrameRGBA> {
        self.last.as_ref()
    }
}

impl DisplaySurface for MemorySurface {
    fn present(&mut self, tick: Tick, frame: &FrameRGBA) -> ReelResult<()> {
        self.presented.push(tick);
        self.last = Some(frame.clone());
        Ok(())
    }
}

/// What one loop iteration did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepOutcome {
    /// Tick on screen after the step.
    pub tick: Tick,
    /// Ticks the controller advanced.
    pub advanced: u64,
    /// A new frame was rendered and presented.
    pub rendered: bool,
    /// Rendering failed and the previous frame was presented again.
    pub held: bool,
    /// Transport state after the step.
    pub state: PlaybackState,
}

/// Counters for a finished [`PlaybackSession::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Loop iterations.
    pub steps: u64,
    /// Frames rendered and presented.
    pub frames_rendered: u64,
    /// Frames that failed to render.
    pub render_failures: u64,
    /// Refresh slots the pacer skipped.
    pub dropped_slots: u64,
    /// Frame cache counters.
    pub cache: CacheStats,
}

/// Single-threaded interactive playback loop.
///
/// Owns its [`FrameCache`] for the session's lifetime and pins the tick on screen. Each step
/// advances the controller by the measured wall-clock delta, resolves, renders, and presents.
pub struct PlaybackSession {
    controller: PlaybackController,
    resolver: FrameResolver,
    cache: FrameCache,
    transform: CoordinateTransform,
    backend: Box<dyn RenderBackend>,
    pacer: FramePacer,
    background: Rgba8,
    last_now: Option<Instant>,
    last_frame: Option<FrameRGBA>,
    shown_tick: Option<Tick>,
    stats: SessionStats,
    stopped: bool,
}

impl PlaybackSession {
    /// Assemble a session. The session's cache is created here and dropped with it.
    pub fn new(
        resolver: FrameResolver,
        transform: CoordinateTransform,
        backend: Box<dyn RenderBackend>,
        cache_capacity: usize,
        pacer: FramePacer,
        background: Rgba8,
    ) -> Self {
        Self {
            controller: PlaybackController::new(resolver.index_arc()),
            resolver,
            cache: FrameCache::new(cache_capacity),
            transform,
            backend,
            pacer,
            background,
            last_now: None,
            last_frame: None,
            shown_tick: None,
            stats: SessionStats::default(),
            stopped: false,
        }
    }

    /// Transport state machine.
    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    /// Mutable transport state machine.
    pub fn controller_mut(&mut self) -> &mut PlaybackController {
        &mut self.controller
    }

    /// The session's frame cache.
    pub fn cache(&self) -> &FrameCache {
        &self.cache
    }

    /// Counters so far.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            dropped_slots: self.pacer.dropped(),
            cache: self.cache.stats(),
            ..self.stats
        }
    }

    /// Return `true` once a [`TransportCommand::Stop`] was applied.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Apply one transport command.
    pub fn apply(&mut self, cmd: TransportCommand) {
        let c = &mut self.controller;
        match cmd {
            TransportCommand::Play => c.play(),
            TransportCommand::Pause => c.pause(),
            TransportCommand::TogglePlay => c.toggle(),
            TransportCommand::SeekAbsolute(t) => {
                c.seek_absolute(t);
            }
            TransportCommand::SeekRelative(d) => {
                c.seek_relative(d);
            }
            TransportCommand::JumpToRound(n) => {
                c.jump_to_round(n);
            }
            TransportCommand::NextRound => {
                c.next_round();
            }
            TransportCommand::PrevRound => {
                c.prev_round();
            }
            TransportCommand::SetSpeed(s) => c.set_speed(s),
            TransportCommand::Stop => self.stopped = true,
        }
    }

    /// Run one loop iteration at wall-clock instant `now`.
    ///
    /// A render failure presents the previous frame again (or a blank background before the
    /// first success) and playback continues.
    pub fn step(
        &mut self,
        now: Instant,
        surface: &mut dyn DisplaySurface,
    ) -> ReelResult<StepOutcome> {
        let delta = self
            .last_now
            .map(|prev| now.saturating_duration_since(prev))
            .unwrap_or(Duration::ZERO);
        self.last_now = Some(now);
        self.stats.steps += 1;

        let advanced = self.controller.advance(delta);
        let tick = self.controller.current_tick();
        self.cache.pin(tick);

        let mut outcome = StepOutcome {
            tick,
            advanced,
            rendered: false,
            held: false,
            state: self.controller.state(),
        };
        if self.shown_tick == Some(tick) {
            return Ok(outcome);
        }

        let resolved = self.cache.get(tick, &self.resolver);
        match self.backend.render(&resolved, &self.transform) {
            Ok(frame) => {
                surface.present(tick, &frame)?;
                self.last_frame = Some(frame);
                self.shown_tick = Some(tick);
                self.stats.frames_rendered += 1;
                outcome.rendered = true;
            }
            Err(e) => {
                tracing::warn!(tick = tick.0, error = %e, "frame render failed, holding last frame");
                self.stats.render_failures += 1;
                let held = match self.last_frame.as_ref() {
                    Some(f) => f.clone(),
                    None => FrameRGBA::blank(self.transform.canvas(), self.background),
                };
                surface.present(tick, &held)?;
                outcome.held = true;
            }
        }
        Ok(outcome)
    }

    /// Drive the loop until a stop command arrives.
    ///
    /// Each iteration polls input, steps, then sleeps until the pacer's next refresh slot.
    #[tracing::instrument(skip_all)]
    pub fn run(
        &mut self,
        clock: &dyn Clock,
        input: &mut dyn InputSource,
        surface: &mut dyn DisplaySurface,
    ) -> ReelResult<SessionStats> {
        self.pacer.reset();
        self.last_now = None;
        while !self.stopped {
            for cmd in input.poll() {
                self.apply(cmd);
            }
            if self.stopped {
                break;
            }
            self.step(clock.now(), surface)?;
            let deadline = self.pacer.next_deadline(clock.now());
            clock.sleep_until(deadline);
        }
        self.cache.unpin();
        let stats = self.stats();
        tracing::info!(
            steps = stats.steps,
            frames = stats.frames_rendered,
            failures = stats.render_failures,
            dropped = stats.dropped_slots,
            "playback session ended"
        );
        Ok(stats)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/session.rs"]
mod tests;
