use embedded_graphics::pixelcolor::Rgb888;

use super::{Animation, AnimationError, FrameContext, HEX_HEIGHT_RATIO};
use crate::surface::Surface;

/// Peak radius of the pulsing circle
const CIRCLE_AMPLITUDE: f32 = 4.;
/// Peak edge length of the pulsing square, relative to half the grid height
const SQUARE_SCALE: f32 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Circle,
    Square,
}

impl Shape {
    /// Stroke colour used while the direct colour is black
    pub fn default_color(self) -> Rgb888 {
        match self {
            Shape::Circle => Rgb888::new(0x00, 0x00, 0x99),
            Shape::Square => Rgb888::new(0x99, 0x00, 0x00),
        }
    }
}

/// Oscillation factor in `[0, 2]`
///
/// The phase is computed in `f64` so that consecutive frames stay distinct after days of uptime.
pub fn pulse_factor(frame: u64, speed: u32) -> f32 {
    ((frame as f64 * 0.1 * speed as f64).sin() + 1.0) as f32
}

/// Shape outline growing and shrinking around the grid centre
///
/// The outline is stroked in the direct colour, or in [`Shape::default_color`] when the direct
/// colour is black.
#[derive(Debug, Clone)]
pub struct Pulse {
    shape: Shape,
}

impl Pulse {
    pub fn new(shape: Shape) -> Self {
        Self { shape }
    }
}

impl Animation for Pulse {
    fn draw(&mut self, ctx: &FrameContext, surface: &mut Surface) -> Result<(), AnimationError> {
        let s = pulse_factor(ctx.frame, ctx.speed);
        let color = match (ctx.settings.red, ctx.settings.green, ctx.settings.blue) {
            (0, 0, 0) => self.shape.default_color(),
            (red, green, blue) => Rgb888::new(red, green, blue),
        };
        let half_width = surface.width() as f32 * 0.5;
        let half_height = surface.height() as f32 * 0.5;

        match self.shape {
            Shape::Circle => {
                let r = s * CIRCLE_AMPLITUDE;
                surface.stroke_ellipse((half_width, half_height), r, r * HEX_HEIGHT_RATIO, color);
            }
            Shape::Square => {
                let r = s * half_height * SQUARE_SCALE;
                let rh = r * 0.5;
                surface.stroke_rect(
                    (half_width - rh, half_height - rh),
                    r,
                    r * HEX_HEIGHT_RATIO,
                    color,
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{animations::test_context, models::LampSettings};

    fn settings() -> LampSettings {
        LampSettings {
            red: 0,
            green: 0,
            blue: 153,
            ..Default::default()
        }
    }

    fn extent(surface: &Surface) -> Option<(usize, usize, usize, usize)> {
        let mut result: Option<(usize, usize, usize, usize)> = None;
        for y in 0..surface.height() {
            for x in 0..surface.width() {
                let (_, _, b, _) = surface.get_pixel(x, y).unwrap().into_components();
                if b != 0 {
                    result = Some(match result {
                        None => (x, y, x, y),
                        Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                    });
                }
            }
        }
        result
    }

    #[test]
    fn factor_oscillates_between_zero_and_two() {
        assert!((pulse_factor(0, 1) - 1.).abs() < 1e-6);
        for frame in 0..200 {
            let s = pulse_factor(frame, 2);
            assert!((0. ..=2.).contains(&s));
        }
    }

    #[test]
    fn factor_keeps_moving_after_long_runs() {
        let frame = 1 << 24;
        assert_ne!(pulse_factor(frame, 1), pulse_factor(frame + 1, 1));
        assert_ne!(pulse_factor(frame * 64, 3), pulse_factor(frame * 64 + 1, 3));
    }

    #[test]
    fn black_direct_color_uses_shape_color() {
        for (shape, expected) in [(Shape::Circle, (0, 0, 0x99, 0)), (Shape::Square, (0x99, 0, 0, 0))] {
            let mut surface = Surface::new(15, 16);
            Pulse::new(shape)
                .draw(&test_context(5, LampSettings::default()), &mut surface)
                .unwrap();

            let lit: Vec<_> = surface
                .pixels()
                .iter()
                .map(|pixel| pixel.into_components())
                .filter(|&(r, g, b, _)| r != 0 || g != 0 || b != 0)
                .collect();

            assert!(!lit.is_empty());
            assert!(lit.iter().all(|&color| color == expected));
        }
    }

    #[test]
    fn circle_is_wider_than_tall() {
        let mut surface = Surface::new(15, 16);
        let mut pulse = Pulse::new(Shape::Circle);

        // sin(16 * 0.1) is close to 1, the circle is near its peak radius
        pulse.draw(&test_context(16, settings()), &mut surface).unwrap();

        let (x0, y0, x1, y1) = extent(&surface).expect("nothing drawn");
        assert!(x1 - x0 > y1 - y0);
        assert!(x1 - x0 >= 14);
    }

    #[test]
    fn square_uses_direct_color() {
        let mut surface = Surface::new(15, 16);
        let mut pulse = Pulse::new(Shape::Square);

        pulse.draw(&test_context(5, settings()), &mut surface).unwrap();

        let (x0, y0, _, _) = extent(&surface).expect("nothing drawn");
        assert_eq!(
            surface.get_pixel(x0, y0).unwrap().into_components(),
            (0, 0, 153, 0)
        );
    }
}
