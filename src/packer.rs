//! Conversion of the frame surface into the hardware pixel buffer

use crate::{color::pack_color, mapping::AddressMap, surface::Surface};

/// Fixed-length buffer of packed pixel words, in physical LED order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    data: Vec<u32>,
}

impl PixelBuffer {
    pub fn new(led_count: usize) -> Self {
        Self {
            data: vec![0; led_count],
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u32] {
        &mut self.data
    }
}

/// Maps surface pixels onto physical LEDs
#[derive(Debug, Clone, Copy)]
pub struct Packer {
    map: AddressMap,
}

impl Packer {
    pub fn new(map: AddressMap) -> Self {
        Self { map }
    }

    /// Pack every addressed cell of `surface` into `buffer`
    ///
    /// The white channel of the surface is ignored: every LED gets the global `white` level.
    /// Unaddressed cells are skipped.
    pub fn pack(&self, surface: &Surface, white: u8, buffer: &mut PixelBuffer) {
        debug_assert_eq!(buffer.len(), self.map.led_count());

        for (x, y, led) in self.map.iter() {
            if let (Some(color), Some(slot)) = (surface.get_pixel(x, y), buffer.data.get_mut(led)) {
                *slot = pack_color(color, white);
            }
        }
    }
}
