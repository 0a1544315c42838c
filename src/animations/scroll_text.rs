use super::{Animation, AnimationError, FrameContext};
use crate::surface::{Gradient, Surface};

/// Rainbow-filled text scrolling right to left
#[derive(Debug, Clone)]
pub struct ScrollText {
    text: String,
    text_width: f32,
    scroll_x: f32,
    baseline: i32,
    gradient: Gradient,
}

impl ScrollText {
    pub fn new(text: &str, width: usize, height: usize) -> Self {
        Self {
            text: text.to_owned(),
            text_width: Surface::text_width(text) as f32,
            scroll_x: 0.,
            baseline: (height as f32 * 0.75) as i32,
            gradient: Gradient::rainbow(width as f32),
        }
    }

    /// Left edge of the text, in grid columns
    pub fn scroll_x(&self) -> f32 {
        self.scroll_x
    }
}

impl Animation for ScrollText {
    fn draw(&mut self, ctx: &FrameContext, surface: &mut Surface) -> Result<(), AnimationError> {
        self.scroll_x -= 0.5 * ctx.speed as f32;
        if self.scroll_x < -self.text_width {
            self.scroll_x = surface.width() as f32;
        }

        surface.fill_text(
            &self.text,
            self.scroll_x.floor() as i32,
            self.baseline,
            &self.gradient,
        );

        Ok(())
    }
}
