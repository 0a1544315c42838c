use super::{Animation, AnimationError, FrameContext};
use crate::{models::Color, surface::Surface};

/// Frames between two rounds of new ripples
pub const SEED_INTERVAL: u64 = 60;
/// Displacement of a new ripple
pub const SEED_HEIGHT: f32 = 500.;
/// Distance from the grid edges at which ripples may appear
const SEED_MARGIN: usize = 2;

/// Damped finite-difference wave simulation over two height fields
///
/// `fields[current]` holds the latest step, the other field the step before it. A step writes
/// the new heights over the older field and flips `current`; buffers are never copied.
#[derive(Debug, Clone)]
pub struct Ripple {
    width: usize,
    height: usize,
    dampening: f32,
    fields: [Vec<f32>; 2],
    current: usize,
    rng: fastrand::Rng,
}

impl Ripple {
    pub fn new(width: usize, height: usize, dampening: f32, rng: fastrand::Rng) -> Self {
        Self {
            width,
            height,
            dampening,
            fields: [vec![0.; width * height], vec![0.; width * height]],
            current: 0,
            rng,
        }
    }

    pub fn current(&self) -> &[f32] {
        &self.fields[self.current]
    }

    pub fn previous(&self) -> &[f32] {
        &self.fields[1 - self.current]
    }

    pub fn height_at(&self, x: usize, y: usize) -> f32 {
        self.current()[y * self.width + x]
    }

    /// Displace a cell of the latest field, which the next step propagates to its neighbours
    pub fn seed(&mut self, x: usize, y: usize, value: f32) {
        if x < self.width && y < self.height {
            let width = self.width;
            self.fields[self.current][y * width + x] = value;
        }
    }

    pub fn reset(&mut self) {
        for field in &mut self.fields {
            field.fill(0.);
        }
    }

    fn seed_random(&mut self, count: u32) {
        if self.width <= 2 * SEED_MARGIN + 1 || self.height <= 2 * SEED_MARGIN + 1 {
            return;
        }

        for _ in 0..count {
            let x = self.rng.usize(SEED_MARGIN..self.width - SEED_MARGIN - 1);
            let y = self.rng.usize(SEED_MARGIN..self.height - SEED_MARGIN - 1);
            self.seed(x, y, SEED_HEIGHT);
        }
    }

    /// Advance the simulation by one step. Border cells are never updated.
    pub fn step(&mut self) {
        let width = self.width;
        let [a, b] = &mut self.fields;
        let (latest, older) = if self.current == 0 {
            (&*a, b)
        } else {
            (&*b, a)
        };

        for y in 1..self.height.saturating_sub(1) {
            for x in 1..width.saturating_sub(1) {
                let i = y * width + x;
                let sum = latest[i - width] + latest[i + width] + latest[i - 1] + latest[i + 1];
                older[i] = (sum * 0.5 - older[i]) * self.dampening;
            }
        }

        self.current = 1 - self.current;
    }
}

impl Animation for Ripple {
    fn draw(&mut self, ctx: &FrameContext, surface: &mut Surface) -> Result<(), AnimationError> {
        if ctx.frame % SEED_INTERVAL == 0 {
            // Higher speeds add more ripples per round
            self.seed_random(ctx.speed);
        }

        self.step();

        let white = ctx.settings.white;
        for y in 1..self.height.saturating_sub(1) {
            for x in 1..self.width.saturating_sub(1) {
                let h = self.height_at(x, y);

                if !h.is_finite() {
                    self.reset();
                    return Err(AnimationError::NonFinite { x, y });
                }

                let gray = h.floor().clamp(0., 255.) as u8;
                surface.set_pixel(x, y, Color::new(gray, gray, gray, white));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animations::test_context;

    fn ripple() -> Ripple {
        Ripple::new(15, 16, 0.99, fastrand::Rng::with_seed(0))
    }

    #[test]
    fn still_water_stays_still() {
        let mut ripple = ripple();
        ripple.step();

        assert!(ripple.current().iter().all(|&h| h == 0.));
        assert!(ripple.previous().iter().all(|&h| h == 0.));
    }

    #[test]
    fn seed_spreads_to_neighbours_only() {
        let mut ripple = ripple();
        ripple.seed(5, 6, 500.);
        ripple.step();

        for y in 0..16 {
            for x in 0..15 {
                let h = ripple.height_at(x, y);
                let adjacent = (x == 5 && (y == 5 || y == 7)) || (y == 6 && (x == 4 || x == 6));

                if adjacent {
                    assert!((h - 500. * 0.5 * 0.99).abs() < 1e-3, "({}, {}) = {}", x, y, h);
                } else {
                    assert_eq!(h, 0., "({}, {})", x, y);
                }
            }
        }

        // The seeded field is now the older one
        assert_eq!(ripple.previous()[6 * 15 + 5], 500.);
    }

    #[test]
    fn borders_are_never_updated() {
        let mut ripple = ripple();
        ripple.seed(1, 1, 500.);
        ripple.seed(13, 14, 500.);

        for _ in 0..10 {
            ripple.step();
        }

        for x in 0..15 {
            assert_eq!(ripple.height_at(x, 0), 0.);
            assert_eq!(ripple.height_at(x, 15), 0.);
        }
        for y in 0..16 {
            assert_eq!(ripple.height_at(0, y), 0.);
            assert_eq!(ripple.height_at(14, y), 0.);
        }
    }

    #[test]
    fn energy_dissipates() {
        let mut ripple = ripple();
        ripple.seed(7, 8, 500.);

        let energy = |r: &Ripple| r.current().iter().map(|h| h.abs()).sum::<f32>();
        for _ in 0..2000 {
            ripple.step();
        }

        assert!(energy(&ripple) < 500.);
    }

    #[test]
    fn non_finite_heights_reset_the_field() {
        let mut ripple = ripple();
        let mut surface = Surface::new(15, 16);
        let ctx = test_context(1, Default::default());

        ripple.seed(5, 6, f32::INFINITY);
        assert!(matches!(
            ripple.draw(&ctx, &mut surface),
            Err(AnimationError::NonFinite { .. })
        ));
        assert!(ripple.current().iter().all(|&h| h == 0.));
        assert!(ripple.previous().iter().all(|&h| h == 0.));

        // The reset field simulates normally again
        ripple.seed(5, 6, 500.);
        ripple.draw(&ctx, &mut surface).unwrap();
        assert!((ripple.height_at(5, 5) - 500. * 0.5 * 0.99).abs() < 1e-3);
    }

    #[test]
    fn seeds_every_interval() {
        let mut ripple = ripple();
        let mut surface = Surface::new(15, 16);

        ripple
            .draw(&test_context(1, Default::default()), &mut surface)
            .unwrap();
        assert!(ripple.current().iter().all(|&h| h == 0.));

        ripple
            .draw(&test_context(SEED_INTERVAL, Default::default()), &mut surface)
            .unwrap();
        assert!(ripple.current().iter().any(|&h| h > 0.));

        // Heights are shown as grayscale on the interior
        let lit = surface
            .pixels()
            .iter()
            .filter(|c| c.into_components().0 > 0)
            .count();
        assert!(lit > 0);
    }
}
