use super::{Animation, AnimationError, FrameContext};
use crate::surface::Surface;

/// Fills the grid with the direct colour
#[derive(Debug, Default, Clone, Copy)]
pub struct Solid;

impl Animation for Solid {
    fn draw(&mut self, ctx: &FrameContext, surface: &mut Surface) -> Result<(), AnimationError> {
        surface.clear(ctx.settings.color());
        Ok(())
    }
}
