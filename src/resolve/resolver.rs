use std::sync::Arc;

use crate::foundation::core::Tick;
use crate::foundation::math::linear_fade;
use crate::resolve::frame::{
    ActiveUtility, BombMarker, KillMarker, PlayerState, ProjectileState, ResolvedFrame,
};
use crate::timeline::index::TimelineIndex;
use crate::timeline::record::BombState;

/// Resolver tuning.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// How long kill markers stay on screen, in seconds.
    pub kill_marker_secs: f64,
    /// Sampled positions kept behind a grenade in flight (including the current one).
    pub trail_samples: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            kill_marker_secs: 3.0,
            trail_samples: 8,
        }
    }
}

/// Pure `tick → ResolvedFrame` projection over a [`TimelineIndex`].
///
/// Holds no mutable state; one resolver can be shared by any number of threads.
#[derive(Clone, Debug)]
pub struct FrameResolver {
    index: Arc<TimelineIndex>,
    kill_window: u64,
    trail_samples: usize,
}

impl FrameResolver {
    /// Create a resolver over `index`.
    pub fn new(index: Arc<TimelineIndex>, cfg: ResolverConfig) -> Self {
        let kill_window = index
            .tick_rate()
            .secs_to_ticks(cfg.kill_marker_secs.max(0.0))
            .max(1);
        Self {
            index,
            kill_window,
            trail_samples: cfg.trail_samples.max(1),
        }
    }

    /// The underlying index.
    pub fn index(&self) -> &TimelineIndex {
        &self.index
    }

    /// Shared handle to the underlying index.
    pub fn index_arc(&self) -> Arc<TimelineIndex> {
        Arc::clone(&self.index)
    }

    /// Kill marker decay window, in ticks.
    pub fn kill_window_ticks(&self) -> u64 {
        self.kill_window
    }

    /// Resolve the world at `tick` (clamped into the timeline).
    ///
    /// Players use their most recent snapshot at or before the tick; utility uses half-open
    /// `[activation, expiry)` windows; kills stay visible for the decay window. A carried bomb is
    /// drawn on its carrier.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn resolve(&self, tick: Tick) -> ResolvedFrame {
        let index = &*self.index;
        let tick = index.clamp(tick);

        let mut players: Vec<PlayerState> = index
            .tracks()
            .iter()
            .filter_map(|track| {
                let (at, snap) = track.latest_sample_at(tick)?;
                Some(PlayerState {
                    player: track.player,
                    name: track.name.clone(),
                    team: snap.team,
                    seat: track.seat,
                    position: snap.position,
                    yaw: snap.yaw,
                    pitch: snap.pitch,
                    alive: snap.alive,
                    health: snap.health,
                    flash: snap.flash.clamp(0.0, 1.0),
                    weapon: snap.weapon,
                    staleness: tick.since(at),
                })
            })
            .collect();
        players.sort_by_key(|p| (p.team, p.seat, p.player));

        let utility = index
            .utility_active_at(tick)
            .map(|u| {
                let life = u.expiry.since(u.activation);
                ActiveUtility {
                    age: tick.since(u.activation),
                    remaining: linear_fade(tick.since(u.activation), life),
                    event: u.clone(),
                }
            })
            .collect();

        let kills = index
            .kills_within(tick, self.kill_window)
            .iter()
            .map(|k| {
                let age = tick.since(k.tick);
                KillMarker {
                    kill: k.clone(),
                    age,
                    opacity: linear_fade(age, self.kill_window),
                    position: index.position_of(k.victim, k.tick),
                }
            })
            .collect();

        let bomb = index.bomb_at(tick).map(|(at, b)| {
            let on_carrier = (b.state == BombState::Carried)
                .then_some(b.carrier)
                .flatten()
                .and_then(|c| players.iter().find(|p| p.player == c && p.alive));
            BombMarker {
                state: b.state,
                position: on_carrier.map_or(b.position, |p| p.position),
                carrier: b.carrier,
                staleness: tick.since(at),
            }
        });

        let projectiles = index
            .projectiles_in_flight(tick)
            .filter_map(|p| {
                let trail: Vec<_> = p
                    .trail_at(tick, self.trail_samples)
                    .iter()
                    .map(|(_, pos)| *pos)
                    .collect();
                Some(ProjectileState {
                    id: p.id,
                    kind: p.kind,
                    thrower: p.thrower,
                    position: *trail.last()?,
                    trail,
                })
            })
            .collect();

        ResolvedFrame {
            tick,
            players,
            utility,
            kills,
            bomb,
            projectiles,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/resolve/resolver.rs"]
mod tests;
