use super::{AnimationError, FrameContext, StripAnimation};
use crate::color::colorwheel;

/// Rainbow rotating along the physical strip
#[derive(Debug, Default, Clone)]
pub struct HueSweep {
    offset: u8,
}

impl HueSweep {
    pub fn offset(&self) -> u8 {
        self.offset
    }
}

impl StripAnimation for HueSweep {
    fn draw(&mut self, _ctx: &FrameContext, strip: &mut [u32]) -> Result<(), AnimationError> {
        for (i, pixel) in strip.iter_mut().enumerate() {
            // Truncation is the mod 256 of the wheel index
            *pixel = colorwheel(self.offset.wrapping_add(i as u8));
        }

        self.offset = self.offset.wrapping_add(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animations::test_context;

    #[test]
    fn sweep_rotates_by_one_led_per_tick() {
        let mut sweep = HueSweep::default();
        let ctx = test_context(1, Default::default());
        let mut first = vec![0u32; 96];
        let mut second = vec![0u32; 96];

        sweep.draw(&ctx, &mut first).unwrap();
        sweep.draw(&ctx, &mut second).unwrap();

        assert_eq!(first[0], colorwheel(0));
        assert_eq!(first[85], colorwheel(85));
        assert_eq!(&second[..95], &first[1..]);
        assert_eq!(sweep.offset(), 2);
    }

    #[test]
    fn offset_wraps() {
        let mut sweep = HueSweep::default();
        let ctx = test_context(1, Default::default());
        let mut strip = vec![0u32; 300];

        for _ in 0..256 {
            sweep.draw(&ctx, &mut strip).unwrap();
        }

        assert_eq!(sweep.offset(), 0);
        // Indices beyond 255 wrap around the wheel
        assert_eq!(strip[256], strip[0]);
    }
}
