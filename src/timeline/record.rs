//! Records handed over by the match parser.
//!
//! A [`MatchRecording`] is the decoded, ordered tick stream of one match plus its round markers
//! and map name. It is the JSON-facing boundary object; [`TimelineIndex`](crate::TimelineIndex)
//! validates it and builds the queryable index.

use anyhow::Context as _;

use crate::foundation::core::{Tick, WorldPos};
use crate::foundation::error::{ReelError, ReelResult};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Stable player identifier (entity/account id assigned by the parser).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

/// Weapon definition index.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct WeaponId(pub u16);

/// Team affiliation.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum Team {
    /// Counter-terrorists.
    #[serde(alias = "CT", alias = "ct")]
    Ct,
    /// Terrorists.
    #[serde(alias = "T", alias = "t")]
    T,
}

/// State of one player at one tick.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlayerSnapshot {
    /// Player identity.
    pub player: PlayerId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Team affiliation.
    pub team: Team,
    /// World position.
    pub position: WorldPos,
    /// View yaw in degrees (0 = +x, counter-clockwise).
    #[serde(default)]
    pub yaw: f64,
    /// View pitch in degrees.
    #[serde(default)]
    pub pitch: f64,
    /// Whether the player is alive.
    pub alive: bool,
    /// Health points (0..=100).
    #[serde(default)]
    pub health: u8,
    /// Flash blindness intensity (0.0..=1.0).
    #[serde(default)]
    pub flash: f64,
    /// Equipped weapon.
    #[serde(default)]
    pub weapon: WeaponId,
}

/// Grenade/utility category.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum UtilityKind {
    /// Smoke grenade.
    Smoke,
    /// Flashbang.
    Flash,
    /// Molotov / incendiary grenade.
    #[serde(alias = "molotov")]
    Incendiary,
    /// HE grenade.
    #[serde(alias = "he")]
    Explosive,
}

impl UtilityKind {
    /// All kinds, in drawing order (area effects first).
    pub const ALL: [UtilityKind; 4] = [
        UtilityKind::Smoke,
        UtilityKind::Incendiary,
        UtilityKind::Explosive,
        UtilityKind::Flash,
    ];

    /// Lower-case name used in summaries and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            UtilityKind::Smoke => "smoke",
            UtilityKind::Flash => "flash",
            UtilityKind::Incendiary => "incendiary",
            UtilityKind::Explosive => "explosive",
        }
    }
}

/// A utility detonation as reported by the parser (expiry is derived at index time).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UtilityDetonation {
    /// Utility category.
    pub kind: UtilityKind,
    /// Detonation position.
    pub origin: WorldPos,
    /// Thrower, when known.
    #[serde(default)]
    pub thrower: Option<PlayerId>,
}

/// A kill reported at some tick.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct KillRecord {
    /// Killer, absent for world/fall damage.
    #[serde(default)]
    pub killer: Option<PlayerId>,
    /// Victim.
    pub victim: PlayerId,
    /// Weapon used.
    #[serde(default)]
    pub weapon: WeaponId,
    /// Whether the kill was a headshot.
    #[serde(default)]
    pub headshot: bool,
}

/// Lifecycle state of the bomb.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BombState {
    /// Held by a terrorist.
    Carried,
    /// Lying on the ground.
    Dropped,
    /// Planted and ticking.
    Planted,
    /// Defused after a plant.
    Defused,
    /// Detonated.
    Exploded,
}

impl BombState {
    /// Return `true` for plant outcomes that end the bomb's movement for the round.
    pub fn is_planted_or_later(self) -> bool {
        matches!(
            self,
            BombState::Planted | BombState::Defused | BombState::Exploded
        )
    }

    /// Lower-case name used in summaries and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            BombState::Carried => "carried",
            BombState::Dropped => "dropped",
            BombState::Planted => "planted",
            BombState::Defused => "defused",
            BombState::Exploded => "exploded",
        }
    }
}

/// Bomb state reported at one tick.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BombSnapshot {
    /// Lifecycle state.
    pub state: BombState,
    /// Bomb position (the carrier's position while carried).
    pub position: WorldPos,
    /// Carrier while [`BombState::Carried`].
    #[serde(default)]
    pub carrier: Option<PlayerId>,
}

/// A grenade in flight, sampled by the parser between throw and detonation.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProjectileSnapshot {
    /// Parser entity id of the projectile. Ids may be reused by later throws.
    pub id: u32,
    /// Grenade category.
    pub kind: UtilityKind,
    /// Current position.
    pub position: WorldPos,
    /// Thrower, when known.
    #[serde(default)]
    pub thrower: Option<PlayerId>,
}

/// Everything recorded at one tick.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TickRecord {
    /// Tick number.
    pub tick: Tick,
    /// Wall-clock timestamp in seconds since recording start.
    pub time: f64,
    /// Player snapshots recorded at this tick (may be sparse).
    #[serde(default)]
    pub players: Vec<PlayerSnapshot>,
    /// Utility detonations activating at this tick.
    #[serde(default)]
    pub utility: Vec<UtilityDetonation>,
    /// Kills happening at this tick.
    #[serde(default)]
    pub kills: Vec<KillRecord>,
    /// Bomb state, when reported at this tick (may be sparse).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bomb: Option<BombSnapshot>,
    /// Grenades in flight at this tick.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projectiles: Vec<ProjectileSnapshot>,
}

/// Round boundary marker: `[start, end)` in ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RoundMarker {
    /// Round number, strictly increasing across the match.
    pub number: u32,
    /// First tick of the round.
    pub start: Tick,
    /// First tick after the round.
    pub end: Tick,
}

/// Decoded match handed over by the parser.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MatchRecording {
    /// Map identifier used to select the coordinate transform.
    pub map: String,
    /// Ordered, gapless tick stream.
    pub ticks: Vec<TickRecord>,
    /// Round boundaries.
    #[serde(default)]
    pub rounds: Vec<RoundMarker>,
}

impl MatchRecording {
    /// Parse a recording from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> ReelResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| ReelError::serde(format!("parse match recording JSON: {e}")))
    }

    /// Parse a recording from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let f = File::open(path)
            .with_context(|| format!("failed to open match recording '{}'", path.display()))?;
        Self::from_reader(BufReader::new(f))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/record.rs"]
mod tests;
