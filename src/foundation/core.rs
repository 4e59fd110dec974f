use crate::foundation::error::{ReelError, ReelResult};

pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

/// Absolute tick number as recorded by the match parser.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct Tick(pub u64);

impl Tick {
    /// Tick `delta` positions later, saturating at `u64::MAX`.
    pub fn offset(self, delta: u64) -> Self {
        Self(self.0.saturating_add(delta))
    }

    /// Number of ticks between `earlier` and `self` (zero when `earlier` is later).
    pub fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::fmt::Display for Tick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tick {}", self.0)
    }
}

/// Half-open tick range `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TickRange {
    /// Inclusive range start.
    pub start: Tick,
    /// Exclusive range end.
    pub end: Tick,
}

impl TickRange {
    /// Create a validated range with `start <= end`.
    pub fn new(start: Tick, end: Tick) -> ReelResult<Self> {
        if start.0 > end.0 {
            return Err(ReelError::validation("TickRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    /// Number of ticks contained in the range.
    pub fn len_ticks(self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    /// Return `true` when the range has no ticks.
    pub fn is_empty(self) -> bool {
        self.start.0 == self.end.0
    }

    /// Return `true` when `t` is inside `[start, end)`.
    pub fn contains(self, t: Tick) -> bool {
        self.start.0 <= t.0 && t.0 < self.end.0
    }

    /// Clamp a tick into this range.
    ///
    /// Empty ranges clamp to `start`.
    pub fn clamp(self, t: Tick) -> Tick {
        if self.is_empty() {
            return self.start;
        }
        let max_inclusive = self.end.0.saturating_sub(1);
        Tick(t.0.clamp(self.start.0, max_inclusive))
    }

    /// Intersection of two ranges; empty (at `self.start`) when disjoint.
    pub fn intersect(self, other: TickRange) -> TickRange {
        let start = self.start.0.max(other.start.0);
        let end = self.end.0.min(other.end.0);
        if start >= end {
            return TickRange {
                start: self.start,
                end: self.start,
            };
        }
        TickRange {
            start: Tick(start),
            end: Tick(end),
        }
    }

    /// Ticks sampled every `interval` ticks starting at `start`.
    pub fn sampled(self, interval: u64) -> impl Iterator<Item = Tick> {
        let step = interval.max(1) as usize;
        (self.start.0..self.end.0).step_by(step).map(Tick)
    }

    /// Number of ticks yielded by [`TickRange::sampled`].
    pub fn sample_count(self, interval: u64) -> u64 {
        self.len_ticks().div_ceil(interval.max(1))
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> ReelResult<Self> {
        if den == 0 {
            return Err(ReelError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(ReelError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Square canvas of `side` pixels.
    pub fn square(side: u32) -> Self {
        Self {
            width: side,
            height: side,
        }
    }

    /// Byte length of a tightly packed RGBA8 buffer for this canvas.
    pub fn rgba_len(self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(4)
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::square(1024)
    }
}

/// Position in map world units.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WorldPos {
    /// East/west axis.
    pub x: f64,
    /// North/south axis.
    pub y: f64,
    /// Height.
    #[serde(default)]
    pub z: f64,
}

impl WorldPos {
    /// Construct a world position.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Planar (x, y) projection.
    pub fn planar(self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Return `true` when all coordinates are finite.
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Straight-alpha RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8 {
    /// Construct a color from channel values.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color.
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Same color with alpha scaled by `opacity` (clamped to `0..=1`).
    pub fn with_opacity(self, opacity: f64) -> Self {
        let o = opacity.clamp(0.0, 1.0);
        Self {
            a: ((f64::from(self.a) * o).round()) as u8,
            ..self
        }
    }

    /// Channels as an array.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Premultiplied channels as an array.
    pub fn to_premul_array(self) -> [u8; 4] {
        let a = u16::from(self.a);
        let premul = |c: u8| crate::foundation::math::mul_div255_u8(u16::from(c), a);
        [premul(self.r), premul(self.g), premul(self.b), self.a]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
