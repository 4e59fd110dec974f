use crate::foundation::core::Rgba8;
use crate::timeline::record::{BombState, Team, UtilityKind};

/// Counter-terrorist marker color.
pub const CT_COLOR: Rgba8 = Rgba8::opaque(93, 151, 222);
/// Terrorist marker color.
pub const T_COLOR: Rgba8 = Rgba8::opaque(230, 168, 60);
/// Marker outline and seat-number color.
pub const INK: Rgba8 = Rgba8::opaque(18, 18, 22);
/// Kill marker color.
pub const KILL_COLOR: Rgba8 = Rgba8::opaque(226, 45, 45);
/// Flash-blindness overlay color.
pub const FLASH_TINT: Rgba8 = Rgba8::opaque(255, 255, 255);

/// Default canvas background.
pub const DEFAULT_BACKGROUND: Rgba8 = Rgba8::opaque(24, 26, 31);

/// Player marker radius on a 1024 px canvas.
pub const BASE_MARKER_RADIUS_PX: f64 = 7.0;

/// Opacity of dead-player crosses.
pub const DEAD_OPACITY: f64 = 0.55;

/// Bomb half-size relative to the player marker radius.
pub const BOMB_SCALE: f64 = 0.7;

/// Grenade-in-flight radius relative to the player marker radius.
pub const PROJECTILE_SCALE: f64 = 0.45;

/// Ticks per planted-bomb pulse.
pub const BOMB_PULSE_TICKS: u64 = 64;

/// Fixed visual for one utility type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UtilityStyle {
    /// Fill color (alpha is the peak opacity).
    pub color: Rgba8,
    /// Effect radius in world units.
    pub radius_units: f64,
}

/// Marker color for `team`.
pub fn team_color(team: Team) -> Rgba8 {
    match team {
        Team::Ct => CT_COLOR,
        Team::T => T_COLOR,
    }
}

/// Visual for `kind`.
pub fn utility_style(kind: UtilityKind) -> UtilityStyle {
    match kind {
        UtilityKind::Smoke => UtilityStyle {
            color: Rgba8::new(200, 200, 205, 190),
            radius_units: 144.0,
        },
        UtilityKind::Incendiary => UtilityStyle {
            color: Rgba8::new(240, 96, 24, 150),
            radius_units: 120.0,
        },
        UtilityKind::Explosive => UtilityStyle {
            color: Rgba8::new(250, 70, 40, 120),
            radius_units: 350.0,
        },
        UtilityKind::Flash => UtilityStyle {
            color: Rgba8::new(255, 255, 240, 170),
            radius_units: 100.0,
        },
    }
}

/// Bomb marker color for `state`.
pub fn bomb_color(state: BombState) -> Rgba8 {
    match state {
        BombState::Carried | BombState::Dropped => Rgba8::opaque(235, 52, 52),
        BombState::Planted => Rgba8::opaque(255, 30, 30),
        BombState::Defused => Rgba8::opaque(70, 200, 110),
        BombState::Exploded => Rgba8::opaque(255, 150, 30),
    }
}

/// Solid color of a grenade in flight.
pub fn projectile_color(kind: UtilityKind) -> Rgba8 {
    let c = utility_style(kind).color;
    Rgba8::opaque(c.r, c.g, c.b)
}

/// Opacity multiplier for an effect with `remaining` lifetime fraction.
///
/// Smokes and fires hold steady and fade over their final fifth; bursts fade out across their
/// whole (short) lifetime.
pub fn utility_opacity(kind: UtilityKind, remaining: f64) -> f64 {
    let remaining = remaining.clamp(0.0, 1.0);
    match kind {
        UtilityKind::Smoke | UtilityKind::Incendiary => (remaining * 5.0).min(1.0),
        UtilityKind::Explosive | UtilityKind::Flash => remaining,
    }
}

/// Player marker radius for a canvas whose short side is `short_side` pixels.
pub fn marker_radius_px(short_side: u32, marker_scale: f64) -> f64 {
    (BASE_MARKER_RADIUS_PX * f64::from(short_side) / 1024.0 * marker_scale).max(2.0)
}
