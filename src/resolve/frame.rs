use crate::foundation::core::{Tick, WorldPos};
use crate::timeline::index::{KillEvent, UtilityEvent};
use crate::timeline::record::{BombState, PlayerId, Team, UtilityKind, WeaponId};

/// One player as shown at a resolved tick.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerState {
    /// Player identity.
    pub player: PlayerId,
    /// Display name.
    pub name: String,
    /// Team at this tick.
    pub team: Team,
    /// Stable 1-based seat number.
    pub seat: u8,
    /// World position.
    pub position: WorldPos,
    /// View yaw in degrees.
    pub yaw: f64,
    /// View pitch in degrees.
    pub pitch: f64,
    /// Alive flag.
    pub alive: bool,
    /// Health points.
    pub health: u8,
    /// Flash blindness (0..=1).
    pub flash: f64,
    /// Equipped weapon.
    pub weapon: WeaponId,
    /// Ticks since this snapshot was recorded (0 when recorded at exactly this tick).
    pub staleness: u64,
}

/// A utility effect visible at a resolved tick.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveUtility {
    /// The effect.
    pub event: UtilityEvent,
    /// Ticks since activation.
    pub age: u64,
    /// Remaining lifetime fraction (1 at activation, towards 0 at expiry).
    pub remaining: f64,
}

/// A transient kill marker.
#[derive(Clone, Debug, PartialEq)]
pub struct KillMarker {
    /// The kill.
    pub kill: KillEvent,
    /// Ticks since the kill.
    pub age: u64,
    /// Marker opacity, fading linearly over the decay window.
    pub opacity: f64,
    /// Victim position at the kill tick, when known.
    pub position: Option<WorldPos>,
}

/// The bomb as shown at a resolved tick.
#[derive(Clone, Debug, PartialEq)]
pub struct BombMarker {
    /// Lifecycle state.
    pub state: BombState,
    /// Drawn position. A carried bomb follows its carrier's resolved position.
    pub position: WorldPos,
    /// Carrier while carried.
    pub carrier: Option<PlayerId>,
    /// Ticks since the state was reported.
    pub staleness: u64,
}

/// A grenade in flight at a resolved tick.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectileState {
    /// Parser entity id.
    pub id: u32,
    /// Grenade category.
    pub kind: UtilityKind,
    /// Thrower, when known.
    pub thrower: Option<PlayerId>,
    /// Latest sampled position.
    pub position: WorldPos,
    /// Recent sampled positions, oldest first, ending at `position`.
    pub trail: Vec<WorldPos>,
}

/// Fully resolved world state at one tick.
///
/// Only [`FrameResolver`](crate::FrameResolver) constructs these, so interactive playback and
/// exports always draw the same state for the same tick.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedFrame {
    pub(crate) tick: Tick,
    pub(crate) players: Vec<PlayerState>,
    pub(crate) utility: Vec<ActiveUtility>,
    pub(crate) kills: Vec<KillMarker>,
    pub(crate) bomb: Option<BombMarker>,
    pub(crate) projectiles: Vec<ProjectileState>,
}

impl ResolvedFrame {
    /// Tick this frame was resolved at.
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Players ordered by team, then seat.
    pub fn players(&self) -> &[PlayerState] {
        &self.players
    }

    /// Active utility, in activation order.
    pub fn utility(&self) -> &[ActiveUtility] {
        &self.utility
    }

    /// Kill markers inside the decay window, oldest first.
    pub fn kills(&self) -> &[KillMarker] {
        &self.kills
    }

    /// The bomb, when its state is known at this tick.
    pub fn bomb(&self) -> Option<&BombMarker> {
        self.bomb.as_ref()
    }

    /// Grenades in flight, in launch order.
    pub fn projectiles(&self) -> &[ProjectileState] {
        &self.projectiles
    }

    /// Living players on `team`.
    pub fn alive_count(&self, team: Team) -> usize {
        self.players
            .iter()
            .filter(|p| p.team == team && p.alive)
            .count()
    }
}
