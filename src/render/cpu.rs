use kurbo::Shape as _;

use crate::foundation::core::{BezPath, Canvas, Point, Rect, Rgba8, Tick, Vec2};
use crate::foundation::error::RenderError;
use crate::foundation::math::mul_div255_u16;
use crate::map::transform::CoordinateTransform;
use crate::render::backend::{Backdrop, FrameRGBA, RenderSettings};
use crate::render::glyphs::number_cells;
use crate::render::style::{
    BOMB_PULSE_TICKS, BOMB_SCALE, DEAD_OPACITY, FLASH_TINT, INK, KILL_COLOR, PROJECTILE_SCALE,
    bomb_color, marker_radius_px, projectile_color, team_color, utility_opacity, utility_style,
};
use crate::resolve::frame::{
    ActiveUtility, BombMarker, KillMarker, PlayerState, ProjectileState, ResolvedFrame,
};
use crate::timeline::record::{BombState, UtilityKind};

const CURVE_TOLERANCE: f64 = 0.1;
const RING_SEGMENTS: usize = 48;

/// Canvas-sized premultiplied base image: background plus placed backdrop.
struct BaseLayer {
    canvas: Canvas,
    radar: Rect,
    data: Vec<u8>,
}

/// `vello_cpu` radar painter shared by the interactive and batch backends.
///
/// Overlays are rasterized into a transparent pixmap and composited over a cached base layer.
pub(crate) struct RadarPainter {
    settings: RenderSettings,
    base: Option<BaseLayer>,
}

impl RadarPainter {
    pub(crate) fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            base: None,
        }
    }

    pub(crate) fn paint(
        &mut self,
        frame: &ResolvedFrame,
        transform: &CoordinateTransform,
    ) -> Result<FrameRGBA, RenderError> {
        let canvas = transform.canvas();
        let invalid = || RenderError::InvalidCanvas {
            width: canvas.width,
            height: canvas.height,
        };
        if canvas.width == 0 || canvas.height == 0 {
            return Err(invalid());
        }
        let width_u16: u16 = canvas.width.try_into().map_err(|_| invalid())?;
        let height_u16: u16 = canvas.height.try_into().map_err(|_| invalid())?;

        self.ensure_base(canvas, transform.radar_rect())?;

        let mut ctx = vello_cpu::RenderContext::new(width_u16, height_u16);
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        let marker_r = marker_radius_px(
            canvas.width.min(canvas.height),
            self.settings.marker_scale.max(0.1),
        );
        let tick = frame.tick();

        // Lingering area effects first, bursts on top of them.
        for kind in UtilityKind::ALL {
            for u in frame.utility().iter().filter(|u| u.event.kind == kind) {
                draw_utility(&mut ctx, u, transform, tick)?;
            }
        }
        for p in frame.projectiles() {
            draw_projectile(&mut ctx, p, transform, marker_r, tick)?;
        }
        for p in frame.players().iter().filter(|p| !p.alive) {
            draw_dead_player(&mut ctx, p, transform, marker_r, tick)?;
        }
        // A loose or planted bomb sits under the players, a carried one on top of its carrier.
        let bomb = frame.bomb();
        if let Some(b) = bomb.filter(|b| b.state != BombState::Carried) {
            draw_bomb(&mut ctx, b, transform, marker_r, tick)?;
        }
        for p in frame.players().iter().filter(|p| p.alive) {
            draw_player(&mut ctx, p, transform, marker_r, &self.settings, tick)?;
        }
        if let Some(b) = bomb.filter(|b| b.state == BombState::Carried) {
            draw_bomb(&mut ctx, b, transform, marker_r, tick)?;
        }
        for k in frame.kills() {
            draw_kill(&mut ctx, k, transform, marker_r, tick)?;
        }

        ctx.flush();
        let mut overlay = vello_cpu::Pixmap::new(width_u16, height_u16);
        ctx.render_to_pixmap(&mut overlay);

        let base = self.base.as_ref().ok_or_else(invalid)?;
        let mut data = base.data.clone();
        over_in_place(&mut data, overlay.data_as_u8_slice())?;

        Ok(FrameRGBA {
            width: canvas.width,
            height: canvas.height,
            data,
            premultiplied: true,
        })
    }

    fn ensure_base(&mut self, canvas: Canvas, radar: Rect) -> Result<(), RenderError> {
        if let Some(b) = &self.base
            && b.canvas == canvas
            && b.radar == radar
        {
            return Ok(());
        }

        let bg = self.settings.background.to_premul_array();
        let mut data = vec![0u8; canvas.rgba_len()];
        for px in data.chunks_exact_mut(4) {
            px.copy_from_slice(&bg);
        }
        if let Some(backdrop) = self.settings.backdrop.as_deref() {
            place_backdrop(&mut data, canvas, radar, backdrop)?;
        }
        self.base = Some(BaseLayer {
            canvas,
            radar,
            data,
        });
        Ok(())
    }
}

fn place_backdrop(
    dst: &mut [u8],
    canvas: Canvas,
    radar: Rect,
    backdrop: &Backdrop,
) -> Result<(), RenderError> {
    let w = radar.width().round();
    let h = radar.height().round();
    if !(w.is_finite() && h.is_finite()) || w < 1.0 || h < 1.0 {
        return Err(RenderError::Backdrop(format!(
            "radar area {w}x{h} is empty"
        )));
    }
    let (w, h) = (w as u32, h as u32);
    let scaled = image::imageops::resize(
        &backdrop.image,
        w,
        h,
        image::imageops::FilterType::Triangle,
    );

    let x0 = radar.x0.round() as i64;
    let y0 = radar.y0.round() as i64;
    let src_row = w as usize * 4;
    let mut src = vec![0u8; src_row * h as usize];
    for (s, px) in src.chunks_exact_mut(4).zip(scaled.pixels()) {
        s.copy_from_slice(&Rgba8::new(px[0], px[1], px[2], px[3]).to_premul_array());
    }

    for row in 0..h as i64 {
        let y = y0 + row;
        if y < 0 || y >= i64::from(canvas.height) {
            continue;
        }
        let col_start = (-x0).max(0);
        let col_end = (i64::from(canvas.width) - x0).min(i64::from(w));
        if col_start >= col_end {
            continue;
        }
        let s0 = row as usize * src_row + col_start as usize * 4;
        let s1 = row as usize * src_row + col_end as usize * 4;
        let d0 = (y as usize * canvas.width as usize + (x0 + col_start) as usize) * 4;
        let d1 = d0 + (s1 - s0);
        over_in_place(&mut dst[d0..d1], &src[s0..s1])?;
    }
    Ok(())
}

fn draw_utility(
    ctx: &mut vello_cpu::RenderContext,
    u: &ActiveUtility,
    transform: &CoordinateTransform,
    tick: Tick,
) -> Result<(), RenderError> {
    let style = utility_style(u.event.kind);
    let center = finite(
        transform.world_to_image(u.event.origin),
        "utility origin",
        tick,
    )?;
    let r = transform.world_len_to_px(style.radius_units);
    let color = style
        .color
        .with_opacity(utility_opacity(u.event.kind, u.remaining));
    if color.a == 0 {
        return Ok(());
    }
    set_color(ctx, color);
    ctx.fill_path(&circle(center, r));
    Ok(())
}

fn draw_projectile(
    ctx: &mut vello_cpu::RenderContext,
    p: &ProjectileState,
    transform: &CoordinateTransform,
    marker_r: f64,
    tick: Tick,
) -> Result<(), RenderError> {
    let color = projectile_color(p.kind);
    let r = marker_r * PROJECTILE_SCALE;
    // Older trail samples are smaller and fainter.
    let n = p.trail.len();
    for (i, pos) in p.trail.iter().enumerate().take(n.saturating_sub(1)) {
        let at = finite(transform.world_to_image(*pos), "projectile trail", tick)?;
        let f = (i + 1) as f64 / n as f64;
        set_color(ctx, color.with_opacity(0.6 * f));
        ctx.fill_path(&circle(at, (r * 0.6 * f).max(0.75)));
    }
    let center = finite(transform.world_to_image(p.position), "projectile", tick)?;
    set_color(ctx, INK);
    ctx.fill_path(&circle(center, r + 1.0));
    set_color(ctx, color);
    ctx.fill_path(&circle(center, r));
    Ok(())
}

fn draw_bomb(
    ctx: &mut vello_cpu::RenderContext,
    b: &BombMarker,
    transform: &CoordinateTransform,
    marker_r: f64,
    tick: Tick,
) -> Result<(), RenderError> {
    let mut center = finite(transform.world_to_image(b.position), "bomb", tick)?;
    let mut half = marker_r * BOMB_SCALE;
    if b.state == BombState::Carried {
        // Small badge on the carrier's upper-right edge.
        half *= 0.6;
        center += Vec2::new(marker_r * 0.8, -marker_r * 0.8);
    }
    if b.state == BombState::Planted {
        let phase = (b.staleness % BOMB_PULSE_TICKS) as f64 / BOMB_PULSE_TICKS as f64;
        let outer = marker_r * (1.2 + 1.4 * phase);
        set_color(ctx, bomb_color(b.state).with_opacity(0.8 * (1.0 - phase)));
        ctx.fill_path(&ring(center, outer, outer - (marker_r * 0.3).max(1.0)));
    }
    set_color(ctx, INK);
    ctx.fill_rect(&rect_to_cpu(square(center, half + 1.0)));
    set_color(ctx, bomb_color(b.state));
    ctx.fill_rect(&rect_to_cpu(square(center, half)));
    Ok(())
}

fn draw_player(
    ctx: &mut vello_cpu::RenderContext,
    p: &PlayerState,
    transform: &CoordinateTransform,
    r: f64,
    settings: &RenderSettings,
    tick: Tick,
) -> Result<(), RenderError> {
    let center = finite(transform.world_to_image(p.position), "player", tick)?;

    if settings.view_direction {
        let dir = view_direction(p, transform, tick)?;
        let side = Vec2::new(-dir.y, dir.x);
        let mut wedge = BezPath::new();
        wedge.move_to(center + dir * (r * 2.4));
        wedge.line_to(center + side * (r * 0.75));
        wedge.line_to(center - side * (r * 0.75));
        wedge.close_path();
        set_color(ctx, team_color(p.team).with_opacity(0.8));
        ctx.fill_path(&bezpath_to_cpu(&wedge));
    }

    set_color(ctx, INK);
    ctx.fill_path(&circle(center, r + 1.5));
    set_color(ctx, team_color(p.team));
    ctx.fill_path(&circle(center, r));

    if p.flash > 0.0 {
        set_color(ctx, FLASH_TINT.with_opacity(p.flash * 0.85));
        ctx.fill_path(&circle(center, r));
    }

    if settings.seat_numbers {
        let cell = (r * 0.3).max(1.0);
        set_color(ctx, INK);
        for cell_rect in number_cells(u32::from(p.seat), center, cell) {
            ctx.fill_rect(&rect_to_cpu(cell_rect));
        }
    }
    Ok(())
}

fn draw_dead_player(
    ctx: &mut vello_cpu::RenderContext,
    p: &PlayerState,
    transform: &CoordinateTransform,
    r: f64,
    tick: Tick,
) -> Result<(), RenderError> {
    let center = finite(transform.world_to_image(p.position), "dead player", tick)?;
    set_color(ctx, team_color(p.team).with_opacity(DEAD_OPACITY));
    ctx.fill_path(&cross(center, r * 0.9, r * 0.3));
    Ok(())
}

fn draw_kill(
    ctx: &mut vello_cpu::RenderContext,
    k: &KillMarker,
    transform: &CoordinateTransform,
    r: f64,
    tick: Tick,
) -> Result<(), RenderError> {
    let Some(pos) = k.position else {
        return Ok(());
    };
    let center = finite(transform.world_to_image(pos), "kill marker", tick)?;
    let opacity = k.opacity.clamp(0.0, 1.0) as f32;
    if opacity <= 0.0 {
        return Ok(());
    }
    set_color(ctx, KILL_COLOR);
    if opacity < 1.0 {
        ctx.push_opacity_layer(opacity);
    }
    ctx.fill_path(&cross(center, r * 1.4, r * 0.35));
    if opacity < 1.0 {
        ctx.pop_layer();
    }
    Ok(())
}

/// Unit view vector in image space. Projecting through the transform keeps it correct for
/// flipped maps.
fn view_direction(
    p: &PlayerState,
    transform: &CoordinateTransform,
    tick: Tick,
) -> Result<Vec2, RenderError> {
    let yaw = p.yaw.to_radians();
    let origin = transform.world_to_image(p.position);
    let ahead = transform.world_to_image(crate::foundation::core::WorldPos::new(
        p.position.x + yaw.cos() * 64.0,
        p.position.y + yaw.sin() * 64.0,
        p.position.z,
    ));
    let d = ahead - origin;
    let len = d.hypot();
    if !(len.is_finite() && len > 0.0) {
        return Err(RenderError::NonFinite {
            what: "view direction",
            tick,
        });
    }
    Ok(d / len)
}

fn finite(p: Point, what: &'static str, tick: Tick) -> Result<Point, RenderError> {
    if p.x.is_finite() && p.y.is_finite() {
        Ok(p)
    } else {
        Err(RenderError::NonFinite { what, tick })
    }
}

fn set_color(ctx: &mut vello_cpu::RenderContext, c: Rgba8) {
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a));
}

fn circle(center: Point, r: f64) -> vello_cpu::kurbo::BezPath {
    bezpath_to_cpu(&kurbo::Circle::new(center, r).to_path(CURVE_TOLERANCE))
}

fn square(center: Point, half: f64) -> Rect {
    Rect::new(
        center.x - half,
        center.y - half,
        center.x + half,
        center.y + half,
    )
}

/// Annulus as an outer polygon plus a reversed inner one, so non-zero filling leaves the hole.
fn ring(center: Point, outer: f64, inner: f64) -> vello_cpu::kurbo::BezPath {
    let mut path = BezPath::new();
    for (radius, sign) in [(outer, 1.0), (inner.max(0.0), -1.0)] {
        for i in 0..RING_SEGMENTS {
            let a = sign * std::f64::consts::TAU * i as f64 / RING_SEGMENTS as f64;
            let p = center + Vec2::new(a.cos(), a.sin()) * radius;
            if i == 0 {
                path.move_to(p);
            } else {
                path.line_to(p);
            }
        }
        path.close_path();
    }
    bezpath_to_cpu(&path)
}

/// An "X" made of two bars of half-length `arm` and half-width `half_w`.
fn cross(center: Point, arm: f64, half_w: f64) -> vello_cpu::kurbo::BezPath {
    let mut path = BezPath::new();
    for dir in [Vec2::new(1.0, 1.0), Vec2::new(1.0, -1.0)] {
        let d = dir / dir.hypot();
        let n = Vec2::new(-d.y, d.x) * half_w;
        let a = center - d * arm;
        let b = center + d * arm;
        path.move_to(a + n);
        path.line_to(b + n);
        path.line_to(b - n);
        path.line_to(a - n);
        path.close_path();
    }
    bezpath_to_cpu(&path)
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

/// Premultiplied source-over of `src` onto `dst`.
fn over_in_place(dst: &mut [u8], src: &[u8]) -> Result<(), RenderError> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(RenderError::Backdrop(
            "composite expects equal-length rgba8 buffers".to_owned(),
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let sa = u16::from(s[3]);
        if sa == 0 {
            continue;
        }
        if sa == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255 - sa;
        for i in 0..4 {
            let v = u16::from(s[i]) + mul_div255_u16(u16::from(d[i]), inv);
            d[i] = v.min(255) as u8;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
