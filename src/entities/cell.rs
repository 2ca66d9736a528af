use rand::Rng;

use crate::{
    canvas::Canvas,
    entity::{Entity, FrameContext},
    math::{Color, Rect, Vector2},
};

const MIN_RADIUS: f32 = 8.0;
const MAX_RADIUS: f32 = 24.0;
const MIN_SPEED: f32 = 60.0;
const MAX_SPEED: f32 = 240.0;
const MIN_LIFE_MS: f64 = 4_000.0;
const MAX_LIFE_MS: f64 = 12_000.0;

/// Lifetime remaining below which the cell starts fading to black.
const DIM_THRESHOLD_MS: f64 = 1_500.0;

const BOX_ALPHA: u8 = 0x88;

/// A colored circle that bounces off the window edges and, when given a
/// lifetime, fades out and despawns itself.
#[derive(Clone, Debug)]
pub struct Cell {
    pos: Vector2,
    velocity: Vector2,
    speed: f32,
    radius: f32,
    color: Color,
    life_ms: Option<f64>,
    draw_box: bool,
}

impl Cell {
    /// Randomized cell inside `bounds`. The radius is clamped to the half
    /// extent of the bounds, so cramped windows still spawn valid cells.
    pub fn spawn(bounds: Rect) -> Self {
        let mut rng = rand::rng();

        let max_radius = MAX_RADIUS
            .min(bounds.w as f32 / 2.0)
            .min(bounds.h as f32 / 2.0)
            .max(1.0);
        let min_radius = MIN_RADIUS.min(max_radius);
        let radius = rng.random_range(min_radius..=max_radius);

        let x_min = bounds.x as f32 + radius;
        let x_max = (bounds.right() as f32 - radius).max(x_min);
        let y_min = bounds.y as f32 + radius;
        let y_max = (bounds.bottom() as f32 - radius).max(y_min);
        let x = rng.random_range(x_min..=x_max);
        let y = rng.random_range(y_min..=y_max);
        let angle = rng.random_range(0.0..std::f32::consts::TAU);

        Self {
            pos: Vector2::new(x, y),
            velocity: Vector2::from_angle(angle),
            speed: rng.random_range(MIN_SPEED..=MAX_SPEED),
            radius,
            color: Color::rgb(
                rng.random_range(0x40..=0xFF),
                rng.random_range(0x40..=0xFF),
                rng.random_range(0x40..=0xFF),
            ),
            life_ms: Some(rng.random_range(MIN_LIFE_MS..=MAX_LIFE_MS)),
            draw_box: rng.random_bool(0.5),
        }
    }

    /// Deterministic constructor. `velocity` is normalized; its magnitude is
    /// carried by `speed` alone.
    pub fn with_params(
        pos: Vector2,
        velocity: Vector2,
        speed: f32,
        radius: f32,
        color: Color,
        life_ms: Option<f64>,
    ) -> Self {
        Self {
            pos,
            velocity: velocity.normalized(),
            speed,
            radius,
            color,
            life_ms,
            draw_box: false,
        }
    }

    pub fn position(&self) -> Vector2 {
        self.pos
    }

    pub fn velocity(&self) -> Vector2 {
        self.velocity
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn life_ms(&self) -> Option<f64> {
        self.life_ms
    }

    pub fn set_draw_box(&mut self, draw_box: bool) {
        self.draw_box = draw_box;
    }

    /// The circle's axis-aligned bounding box.
    fn bounding_box(&self) -> Rect {
        let r = self.radius;
        Rect::new(
            (self.pos.x - r).floor() as i32,
            (self.pos.y - r).floor() as i32,
            (r * 2.0).ceil() as i32,
            (r * 2.0).ceil() as i32,
        )
    }

    /// Draw color after lifetime dimming.
    fn draw_color(&self) -> Color {
        match self.life_ms {
            Some(life) if life < DIM_THRESHOLD_MS => {
                let t = 1.0 - (life / DIM_THRESHOLD_MS) as f32;
                self.color.lerp(Color::BLACK.with_alpha(self.color.a), t)
            }
            _ => self.color,
        }
    }

    fn reflect(&mut self, bounds: Rect) {
        let r = self.radius;

        if self.pos.x - r < bounds.x as f32 {
            self.pos.x = bounds.x as f32 + r;
            self.velocity.x = -self.velocity.x;
        } else if self.pos.x + r > bounds.right() as f32 {
            self.pos.x = bounds.right() as f32 - r;
            self.velocity.x = -self.velocity.x;
        }

        if self.pos.y - r < bounds.y as f32 {
            self.pos.y = bounds.y as f32 + r;
            self.velocity.y = -self.velocity.y;
        } else if self.pos.y + r > bounds.bottom() as f32 {
            self.pos.y = bounds.bottom() as f32 - r;
            self.velocity.y = -self.velocity.y;
        }
    }
}

impl Entity for Cell {
    fn update(&mut self, delta_ms: f64, ctx: &mut FrameContext) {
        let step = self.speed * (delta_ms / 1000.0) as f32;
        self.pos += self.velocity * step;
        self.reflect(ctx.bounds);

        if let Some(life) = &mut self.life_ms {
            *life -= delta_ms;
            if *life <= 0.0 {
                ctx.despawn_self();
            }
        }
    }

    fn draw(&self, canvas: &mut Canvas) {
        let color = self.draw_color();

        if self.draw_box {
            canvas.fill_rect(self.bounding_box(), Color::MAGENTA.with_alpha(BOX_ALPHA));
        }

        canvas.fill_circle(
            self.pos.x.round() as i32,
            self.pos.y.round() as i32,
            self.radius.round() as i32,
            color,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: Rect = Rect {
        x: 0,
        y: 0,
        w: 1280,
        h: 720,
    };

    fn update_once(cell: &mut Cell, delta_ms: f64) -> FrameContext {
        let mut ctx = FrameContext::new(BOUNDS);
        cell.update(delta_ms, &mut ctx);
        ctx
    }

    #[test]
    fn straight_move_covers_speed_times_delta() {
        let mut cell = Cell::with_params(
            Vector2::new(640.0, 360.0),
            Vector2::new(1.0, 0.0),
            120.0,
            16.0,
            Color::RED,
            None,
        );

        update_once(&mut cell, 1000.0);

        assert!((cell.position().x - 760.0).abs() < 1e-3);
        assert!((cell.position().y - 360.0).abs() < 1e-3);
    }

    #[test]
    fn overshoot_clamps_to_edge_and_flips_velocity() {
        // one 100 ms step at 160 px/s from x=1270 pushes the circle past the
        // right edge; it must come to rest exactly touching it
        let mut cell = Cell::with_params(
            Vector2::new(1270.0, 360.0),
            Vector2::new(1.0, 0.0),
            160.0,
            16.0,
            Color::RED,
            None,
        );

        update_once(&mut cell, 100.0);

        assert!((cell.position().x - 1264.0).abs() < 1e-3);
        assert!(cell.velocity().x < 0.0);
    }

    #[test]
    fn top_left_corner_reflects_both_axes() {
        let mut cell = Cell::with_params(
            Vector2::new(10.0, 10.0),
            Vector2::new(-1.0, -1.0),
            100.0,
            16.0,
            Color::RED,
            None,
        );

        update_once(&mut cell, 100.0);

        assert!((cell.position().x - 16.0).abs() < 1e-3);
        assert!((cell.position().y - 16.0).abs() < 1e-3);
        assert!(cell.velocity().x > 0.0);
        assert!(cell.velocity().y > 0.0);
    }

    #[test]
    fn lifetime_decreases_and_expiry_requests_despawn() {
        let mut cell = Cell::with_params(
            Vector2::new(640.0, 360.0),
            Vector2::new(1.0, 0.0),
            0.0,
            16.0,
            Color::RED,
            Some(100.0),
        );

        let ctx = update_once(&mut cell, 40.0);
        assert!(ctx.pending_despawns().is_empty());
        assert!((cell.life_ms().unwrap() - 60.0).abs() < 1e-6);

        let ctx = update_once(&mut cell, 80.0);
        assert_eq!(ctx.pending_despawns().len(), 1);
        assert!(cell.life_ms().unwrap() <= 0.0);
    }

    #[test]
    fn draw_color_dims_near_expiry() {
        let mut cell = Cell::with_params(
            Vector2::ZERO,
            Vector2::new(1.0, 0.0),
            0.0,
            16.0,
            Color::rgb(200, 100, 50),
            Some(DIM_THRESHOLD_MS / 2.0),
        );
        cell.pos = Vector2::new(640.0, 360.0);

        let dimmed = cell.draw_color();
        assert!(dimmed.r < 200);
        assert!(dimmed.g < 100);
        assert!(dimmed.b < 50);

        cell.life_ms = Some(MAX_LIFE_MS);
        assert_eq!(cell.draw_color(), Color::rgb(200, 100, 50));
    }

    #[test]
    fn spawn_fits_cramped_bounds() {
        let tiny = Rect::with_size(20, 20);
        for _ in 0..20 {
            let cell = Cell::spawn(tiny);
            let r = cell.radius();
            assert!(r <= 10.0);
            assert!(cell.position().x - r >= -1e-3);
            assert!(cell.position().x + r <= 20.0 + 1e-3);
            assert!(cell.position().y - r >= -1e-3);
            assert!(cell.position().y + r <= 20.0 + 1e-3);
        }

        // degenerate bounds, as after shrinking the window to a sliver
        let sliver = Rect::with_size(1, 1);
        let cell = Cell::spawn(sliver);
        assert!(cell.radius() >= 1.0);
    }

    #[test]
    fn spawn_lands_inside_bounds() {
        for _ in 0..50 {
            let cell = Cell::spawn(BOUNDS);
            let r = cell.radius();
            assert!(cell.position().x - r >= BOUNDS.x as f32);
            assert!(cell.position().x + r <= BOUNDS.right() as f32);
            assert!(cell.position().y - r >= BOUNDS.y as f32);
            assert!(cell.position().y + r <= BOUNDS.bottom() as f32);
            assert!((cell.velocity().length() - 1.0).abs() < 1e-4);
        }
    }
}
