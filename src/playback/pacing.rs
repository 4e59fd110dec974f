use std::time::{Duration, Instant};

/// Display-refresh scheduler for the interactive loop.
///
/// Deadlines sit on a fixed grid of `interval` slots. When a frame overruns, every slot that
/// already passed is dropped and the next future slot is returned, so the loop never builds a
/// backlog.
#[derive(Clone, Debug)]
pub struct FramePacer {
    interval: Duration,
    next: Option<Instant>,
    dropped: u64,
}

impl FramePacer {
    /// Pacer with a fixed refresh interval (minimum 1 ms).
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            next: None,
            dropped: 0,
        }
    }

    /// Pacer for a display refreshing `hz` times per second.
    pub fn from_refresh_hz(hz: f64) -> Self {
        let hz = if hz.is_finite() && hz > 0.0 { hz } else { 60.0 };
        Self::new(Duration::from_secs_f64(1.0 / hz))
    }

    /// Refresh interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Slots skipped because a frame finished after them.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Forget the grid; the next call starts a fresh one at `now`.
    pub fn reset(&mut self) {
        self.next = None;
    }

    /// Deadline for the next frame, given that the current frame finished at `now`.
    pub fn next_deadline(&mut self, now: Instant) -> Instant {
        let deadline = match self.next {
            None => now + self.interval,
            Some(prev) if now < prev => prev,
            Some(prev) => {
                let late = now.duration_since(prev).as_nanos();
                let slots = late / self.interval.as_nanos() + 1;
                let missed = (slots - 1) as u64;
                if missed > 0 {
                    self.dropped += missed;
                    tracing::debug!(missed, "frame pacer dropped refresh slots");
                }
                prev + self.interval * (slots as u32)
            }
        };
        self.next = Some(deadline);
        deadline
    }
}
