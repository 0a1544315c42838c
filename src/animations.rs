//! Frame generators for each lamp pattern

use thiserror::Error;

use crate::{
    models::{self, LampSettings, Pattern},
    surface::Surface,
};

mod hue_sweep;
pub use hue_sweep::*;

mod noise;
pub use noise::*;

mod pulse;
pub use pulse::*;

mod ripple;
pub use ripple::*;

mod scroll_text;
pub use scroll_text::*;

mod solid;
pub use solid::*;

/// Distance between parallel sides of a regular hexagon with a long diagonal of 1
///
/// Scaling vertical extents by this ratio makes shapes look isotropic on the hex-packed panel.
pub const HEX_HEIGHT_RATIO: f32 = 0.866_025_4;

#[derive(Debug, Error)]
pub enum AnimationError {
    #[error("non-finite sample at ({x}, {y})")]
    NonFinite { x: usize, y: usize },
}

/// Inputs sampled once per frame
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    /// Frame counter, incremented before each frame is drawn
    pub frame: u64,
    pub settings: LampSettings,
    pub speed: u32,
}

/// Animation drawing into the logical grid
pub trait Animation: Send {
    fn draw(&mut self, ctx: &FrameContext, surface: &mut Surface) -> Result<(), AnimationError>;
}

/// Animation writing packed pixel words directly in physical LED order
pub trait StripAnimation: Send {
    fn draw(&mut self, ctx: &FrameContext, strip: &mut [u32]) -> Result<(), AnimationError>;
}

pub enum ActiveAnimation<'a> {
    Surface(&'a mut dyn Animation),
    Strip(&'a mut dyn StripAnimation),
}

/// One instance of every pattern generator
///
/// Generators keep their state while another pattern is active.
pub struct Animations {
    solid: Solid,
    rainbow: HueSweep,
    circle: Pulse,
    square: Pulse,
    text: ScrollText,
    noise: NoiseField,
    ripple: Ripple,
}

impl Animations {
    pub fn new(config: &models::Animation, width: usize, height: usize) -> Self {
        let mut rng = fastrand::Rng::new();

        Self {
            solid: Solid,
            rainbow: HueSweep::default(),
            circle: Pulse::new(Shape::Circle),
            square: Pulse::new(Shape::Square),
            text: ScrollText::new(&config.text, width, height),
            noise: NoiseField::new(
                Perlin::new(&mut rng),
                config.noise_increment,
                config.noise_z_increment,
            ),
            ripple: Ripple::new(width, height, config.dampening, rng),
        }
    }

    pub fn get_mut(&mut self, pattern: Pattern) -> ActiveAnimation<'_> {
        match pattern {
            Pattern::Solid => ActiveAnimation::Surface(&mut self.solid),
            Pattern::Rainbow => ActiveAnimation::Strip(&mut self.rainbow),
            Pattern::Circle => ActiveAnimation::Surface(&mut self.circle),
            Pattern::Square => ActiveAnimation::Surface(&mut self.square),
            Pattern::Text => ActiveAnimation::Surface(&mut self.text),
            Pattern::Noise => ActiveAnimation::Surface(&mut self.noise),
            Pattern::Ripple => ActiveAnimation::Surface(&mut self.ripple),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_context(frame: u64, settings: LampSettings) -> FrameContext {
    FrameContext {
        frame,
        settings,
        speed: 1,
    }
}
