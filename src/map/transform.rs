use crate::foundation::core::{Affine, Canvas, Point, Rect, WorldPos};
use crate::foundation::error::ConfigError;
use crate::map::catalog::MapProfile;

/// Per-map affine mapping between world units and output-image pixels.
///
/// World → radar pixels uses the map calibration (top-left world origin, world units per radar
/// pixel, optional y flip); radar pixels are then scaled uniformly to fit the output canvas and
/// centered. Fixed at construction, never mutated.
#[derive(Clone, Debug, PartialEq)]
pub struct CoordinateTransform {
    map: String,
    canvas: Canvas,
    forward: Affine,
    inverse: Affine,
    px_per_unit: f64,
    radar_rect: Rect,
}

impl CoordinateTransform {
    /// Build the transform for `profile` rendered onto `canvas`.
    pub fn new(profile: &MapProfile, canvas: Canvas) -> Result<Self, ConfigError> {
        profile.validate()?;
        if canvas.width == 0 || canvas.height == 0 {
            return Err(ConfigError::InvalidProfile {
                map: profile.name.clone(),
                reason: format!("canvas {}x{} is empty", canvas.width, canvas.height),
            });
        }

        let inv_scale = 1.0 / profile.scale;
        let (d, f) = if profile.flip_y {
            (-inv_scale, profile.origin_y * inv_scale)
        } else {
            (inv_scale, -profile.origin_y * inv_scale)
        };
        let world_to_radar = Affine::new([
            inv_scale,
            0.0,
            0.0,
            d,
            -profile.origin_x * inv_scale,
            f,
        ]);

        let (w, h) = (f64::from(canvas.width), f64::from(canvas.height));
        let fit = w.min(h) / profile.radar_size;
        let pad = ((w - profile.radar_size * fit) / 2.0, (h - profile.radar_size * fit) / 2.0);
        let forward = Affine::translate(pad) * Affine::scale(fit) * world_to_radar;

        Ok(Self {
            map: profile.name.clone(),
            canvas,
            forward,
            inverse: forward.inverse(),
            px_per_unit: fit * inv_scale,
            radar_rect: Rect::new(
                pad.0,
                pad.1,
                pad.0 + profile.radar_size * fit,
                pad.1 + profile.radar_size * fit,
            ),
        })
    }

    /// Map this transform was built for.
    pub fn map_name(&self) -> &str {
        &self.map
    }

    /// Output canvas.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Forward affine (world → image).
    pub fn affine(&self) -> Affine {
        self.forward
    }

    /// Project a world position to image pixels. Height is ignored.
    pub fn world_to_image(&self, pos: WorldPos) -> Point {
        self.forward * pos.planar()
    }

    /// Inverse projection: image pixels to planar world coordinates.
    pub fn image_to_world(&self, px: Point) -> Point {
        self.inverse * px
    }

    /// Image-space rectangle covered by the radar image.
    pub fn radar_rect(&self) -> Rect {
        self.radar_rect
    }

    /// Length of `units` world units in output pixels.
    pub fn world_len_to_px(&self, units: f64) -> f64 {
        units * self.px_per_unit
    }
}

#[cfg(test)]
#[path = "../../tests/unit/map/transform.rs"]
mod tests;
