use palette::{Mix, Srgb};

use crate::models::Color;

/// Horizontal linear gradient with evenly distributed colour stops
#[derive(Debug, Clone)]
pub struct Gradient {
    start: f32,
    end: f32,
    stops: Vec<(f32, Srgb<f32>)>,
}

impl Gradient {
    /// Gradient from `start` to `end` (in surface columns) through `colors`, stop `i` at `i / len`
    pub fn new(start: f32, end: f32, colors: &[(u8, u8, u8)]) -> Self {
        let step = 1. / colors.len().max(1) as f32;

        Self {
            start,
            end,
            stops: colors
                .iter()
                .enumerate()
                .map(|(i, &(r, g, b))| (step * i as f32, Srgb::new(r, g, b).into_format()))
                .collect(),
        }
    }

    /// Red, orange, yellow, green, blue, indigo, violet across `width` columns
    pub fn rainbow(width: f32) -> Self {
        Self::new(
            0.,
            width,
            &[
                (255, 0, 0),
                (255, 165, 0),
                (255, 255, 0),
                (0, 128, 0),
                (0, 0, 255),
                (75, 0, 130),
                (238, 130, 238),
            ],
        )
    }

    /// Colour at column `x`. The white channel is left at zero.
    pub fn color_at(&self, x: f32) -> Color {
        let t = if self.end > self.start {
            (x - self.start) / (self.end - self.start)
        } else {
            0.
        };

        let color = match self.stops.iter().position(|&(offset, _)| offset > t) {
            Some(0) => self.stops[0].1,
            Some(next) => {
                let (from_offset, from) = self.stops[next - 1];
                let (to_offset, to) = self.stops[next];
                from.mix(to, (t - from_offset) / (to_offset - from_offset))
            }
            None => match self.stops.last() {
                Some(&(_, last)) => last,
                None => Srgb::new(0., 0., 0.),
            },
        };

        let (r, g, b) = color.into_format::<u8>().into_components();
        Color::new(r, g, b, 0)
    }
}
