use std::sync::Arc;
use std::time::Duration;

use crate::foundation::core::Tick;
use crate::foundation::error::IndexError;
use crate::timeline::index::{Round, TimelineIndex};

/// Slowest playback speed.
pub const MIN_SPEED: f64 = 0.25;
/// Fastest playback speed.
pub const MAX_SPEED: f64 = 4.0;
/// Largest wall-clock delta a single [`PlaybackController::advance`] call honors.
pub const ADVANCE_CEILING: Duration = Duration::from_millis(100);

/// Transport state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlaybackState {
    /// Stopped on the current tick.
    Paused,
    /// Advancing at the given speed multiplier.
    Playing(f64),
}

/// Playback state machine over a [`TimelineIndex`].
///
/// Position is kept as fractional ticks past the first tick so slow speeds accumulate across
/// small wall-clock deltas.
#[derive(Clone, Debug)]
pub struct PlaybackController {
    index: Arc<TimelineIndex>,
    playing: bool,
    speed: f64,
    position: f64,
}

impl PlaybackController {
    /// Paused at the first tick, speed 1.0.
    pub fn new(index: Arc<TimelineIndex>) -> Self {
        Self {
            index,
            playing: false,
            speed: 1.0,
            position: 0.0,
        }
    }

    /// Timeline being played.
    pub fn index(&self) -> &TimelineIndex {
        &self.index
    }

    /// Current transport state.
    pub fn state(&self) -> PlaybackState {
        if self.playing {
            PlaybackState::Playing(self.speed)
        } else {
            PlaybackState::Paused
        }
    }

    /// Return `true` while playing.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Speed that applies while playing.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Start playing from the current tick.
    pub fn play(&mut self) {
        self.playing = true;
    }

    /// Stop on the current tick.
    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Switch between playing and paused.
    pub fn toggle(&mut self) {
        self.playing = !self.playing;
    }

    /// Set the playback speed, clamped to `[MIN_SPEED, MAX_SPEED]`. Non-finite values are
    /// ignored.
    pub fn set_speed(&mut self, speed: f64) {
        if !speed.is_finite() {
            tracing::warn!(speed, "ignoring non-finite playback speed");
            return;
        }
        self.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
    }

    /// Tick currently selected.
    pub fn current_tick(&self) -> Tick {
        self.index.first_tick().offset(self.position.floor() as u64)
    }

    /// Time of the current tick, measured from the first tick.
    pub fn current_time(&self) -> Duration {
        Duration::from_secs_f64(self.index.time_of(self.current_tick()).max(0.0))
    }

    /// Round containing the current tick.
    pub fn current_round(&self) -> Result<Round, IndexError> {
        self.index.round_containing(self.current_tick())
    }

    /// Select `tick` (clamped into the timeline).
    pub fn seek_to_tick(&mut self, tick: Tick) -> Tick {
        let tick = self.index.clamp(tick);
        self.position = tick.since(self.index.first_tick()) as f64;
        tick
    }

    /// Seek to time `t` from the first tick; clamps at both ends.
    pub fn seek_absolute(&mut self, t: Duration) -> Tick {
        let tick = self.index.tick_at_time(t);
        self.seek_to_tick(tick)
    }

    /// Seek by `delta_secs` relative to the current time; clamps at both ends.
    pub fn seek_relative(&mut self, delta_secs: f64) -> Tick {
        if !delta_secs.is_finite() {
            tracing::warn!(delta_secs, "ignoring non-finite relative seek");
            return self.current_tick();
        }
        let now = self.index.time_of(self.current_tick());
        let tick = self.index.tick_at_secs(now + delta_secs);
        self.seek_to_tick(tick)
    }

    /// Seek to the start of round `number`, clamped to the first/last round.
    ///
    /// Returns `None` (and leaves the position unchanged) when the match has no rounds.
    pub fn jump_to_round(&mut self, number: u32) -> Option<Round> {
        let round = self.index.round_clamped(number)?;
        self.seek_to_tick(round.start);
        Some(round)
    }

    /// Seek to the start of the round after the current one.
    ///
    /// On the last round this returns that round and leaves the playhead where it is. Between
    /// rounds it moves to the next round to start, if any.
    pub fn next_round(&mut self) -> Option<Round> {
        let tick = self.current_tick();
        match self.index.round_containing(tick) {
            Ok(r) => Some(self.step_to(r, self.index.next_round(r))),
            Err(_) => {
                let target = self.index.first_round_after(tick)?;
                self.seek_to_tick(target.start);
                Some(target)
            }
        }
    }

    /// Seek to the start of the round before the current one.
    ///
    /// On the first round this returns that round and leaves the playhead where it is. Between
    /// rounds it moves to the start of the last round that already ended, if any.
    pub fn prev_round(&mut self) -> Option<Round> {
        let tick = self.current_tick();
        match self.index.round_containing(tick) {
            Ok(r) => Some(self.step_to(r, self.index.prev_round(r))),
            Err(_) => {
                let target = self.index.last_round_before(tick)?;
                self.seek_to_tick(target.start);
                Some(target)
            }
        }
    }

    fn step_to(&mut self, current: Round, target: Round) -> Round {
        if target.ordinal != current.ordinal {
            self.seek_to_tick(target.start);
        }
        target
    }

    /// Most ticks one `advance` call can move at the current speed.
    pub fn max_ticks_per_advance(&self) -> u64 {
        (ADVANCE_CEILING.as_secs_f64() * self.speed * self.index.tick_rate().per_sec()).ceil()
            as u64
    }

    /// Advance by a wall-clock delta while playing.
    ///
    /// The delta is clamped to [`ADVANCE_CEILING`] before conversion. Reaching the last tick
    /// pauses on it. Returns the number of ticks moved.
    pub fn advance(&mut self, wall_delta: Duration) -> u64 {
        if !self.playing {
            return 0;
        }
        let before = self.current_tick();
        let delta = wall_delta.min(ADVANCE_CEILING);
        let ticks = delta.as_secs_f64() * self.speed * self.index.tick_rate().per_sec();
        let last = self.index.last_tick().since(self.index.first_tick()) as f64;

        self.position += ticks;
        if self.position >= last {
            self.position = last;
            self.playing = false;
            tracing::debug!(tick = self.index.last_tick().0, "playback reached end");
        }
        self.current_tick().since(before)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/controller.rs"]
mod tests;
