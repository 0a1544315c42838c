//! In-memory frame surface animations draw into

use std::convert::Infallible;

use embedded_graphics::{
    geometry::Dimensions,
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::{BinaryColor, Rgb888, RgbColor},
    prelude::*,
    primitives::{Ellipse, PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};

use crate::models::Color;

mod gradient;
pub use gradient::*;

/// Unwrap the result of drawing to an infallible target
fn infallible<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

/// Row-major W x H buffer of 4-channel colours
#[derive(Debug, Clone)]
pub struct Surface {
    width: usize,
    height: usize,
    data: Vec<Color>,
}

impl Surface {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![Color::new(0, 0, 0, 0); width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self, color: Color) {
        self.data.fill(color);
    }

    /// Write a pixel. Writes outside of the surface are ignored.
    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = color;
        }
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> Option<Color> {
        if x < self.width && y < self.height {
            Some(self.data[y * self.width + x])
        } else {
            None
        }
    }

    pub fn pixels(&self) -> &[Color] {
        &self.data
    }

    /// Stroke a 1px axis-aligned ellipse
    pub fn stroke_ellipse(&mut self, center: (f32, f32), radius_x: f32, radius_y: f32, color: Rgb888) {
        let top_left = Point::new(
            (center.0 - radius_x).round() as i32,
            (center.1 - radius_y).round() as i32,
        );
        let size = Size::new(
            (2. * radius_x).round().max(0.) as u32,
            (2. * radius_y).round().max(0.) as u32,
        );

        infallible(
            Ellipse::new(top_left, size)
                .into_styled(PrimitiveStyle::with_stroke(color, 1))
                .draw(self),
        );
    }

    /// Stroke a 1px axis-aligned rectangle
    pub fn stroke_rect(&mut self, top_left: (f32, f32), width: f32, height: f32, color: Rgb888) {
        let top_left = Point::new(top_left.0.round() as i32, top_left.1.round() as i32);
        let size = Size::new(width.round().max(0.) as u32, height.round().max(0.) as u32);

        infallible(
            Rectangle::new(top_left, size)
                .into_styled(PrimitiveStyle::with_stroke(color, 1))
                .draw(self),
        );
    }

    /// Width in pixels of `text` rendered with the surface font
    pub fn text_width(text: &str) -> u32 {
        Text::with_baseline(
            text,
            Point::zero(),
            MonoTextStyle::new(&FONT_6X10, BinaryColor::On),
            Baseline::Alphabetic,
        )
        .bounding_box()
        .size
        .width
    }

    /// Render `text` with its baseline at `(x, baseline)`, filling glyphs with `gradient`
    pub fn fill_text(&mut self, text: &str, x: i32, baseline: i32, gradient: &Gradient) {
        let mut target = GradientFill {
            surface: self,
            gradient,
        };

        infallible(
            Text::with_baseline(
                text,
                Point::new(x, baseline),
                MonoTextStyle::new(&FONT_6X10, BinaryColor::On),
                Baseline::Alphabetic,
            )
            .draw(&mut target),
        );
    }

    fn put(&mut self, point: Point, color: Color) {
        if point.x >= 0 && point.y >= 0 {
            self.set_pixel(point.x as usize, point.y as usize, color);
        }
    }
}

impl OriginDimensions for Surface {
    fn size(&self) -> Size {
        Size::new(self.width as u32, self.height as u32)
    }
}

impl DrawTarget for Surface {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.put(point, Color::new(color.r(), color.g(), color.b(), 0));
        }

        Ok(())
    }
}

/// Draw target that paints every lit pixel with the gradient colour at its column
struct GradientFill<'s> {
    surface: &'s mut Surface,
    gradient: &'s Gradient,
}

impl OriginDimensions for GradientFill<'_> {
    fn size(&self) -> Size {
        self.surface.size()
    }
}

impl DrawTarget for GradientFill<'_> {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if color.is_on() {
                let color = self.gradient.color_at(point.x as f32 + 0.5);
                self.surface.put(point, color);
            }
        }

        Ok(())
    }
}
