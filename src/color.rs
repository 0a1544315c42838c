//! Packed pixel words and colour helpers

use std::fmt::Write;

use crate::models::Color;

/// Pack 4 channels into a hardware pixel word: white in the top byte, then red, green, blue
pub const fn pack_rgbw(r: u8, g: u8, b: u8, w: u8) -> u32 {
    ((w as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
}

/// Pack a colour without its white channel
pub const fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    pack_rgbw(r, g, b, 0)
}

/// Split a pixel word into `(r, g, b, w)`
pub const fn unpack_rgbw(word: u32) -> (u8, u8, u8, u8) {
    (
        (word >> 16) as u8,
        (word >> 8) as u8,
        word as u8,
        (word >> 24) as u8,
    )
}

/// Pixel word for a colour, replacing its white channel with `white`
pub fn pack_color(color: Color, white: u8) -> u32 {
    let (r, g, b, _) = color.into_components();
    pack_rgbw(r, g, b, white)
}

/// Scale every channel of a pixel word by `brightness`, as SK6812 driver libraries do
pub fn scale_brightness(word: u32, brightness: u8) -> u32 {
    let scale = brightness as u32 + 1;
    let (r, g, b, w) = unpack_rgbw(word);
    let scaled = |c: u8| ((c as u32 * scale) >> 8) as u8;
    pack_rgbw(scaled(r), scaled(g), scaled(b), scaled(w))
}

/// 256-step colour wheel: red through blue, blue through green, green through red.
///
/// Each of the three 85-wide bands ramps two channels by 3 per step. The input is inverted
/// first, so `0`, `85` and `170` land exactly on pure red, green and blue.
pub const fn colorwheel(pos: u8) -> u32 {
    let pos = 255 - pos;
    if pos < 85 {
        pack_rgb(255 - pos * 3, 0, pos * 3)
    } else if pos < 170 {
        let pos = pos - 85;
        pack_rgb(0, pos * 3, 255 - pos * 3)
    } else {
        let pos = pos - 170;
        pack_rgb(pos * 3, 255 - pos * 3, 0)
    }
}

pub trait AnsiDisplayExt {
    /// Append one truecolor block per pixel word to `buf`
    fn to_ansi_truecolor(self, buf: &mut String);
}

impl<T: Iterator<Item = u32>> AnsiDisplayExt for T {
    fn to_ansi_truecolor(self, buf: &mut String) {
        for word in self {
            let (red, green, blue, _) = unpack_rgbw(word);

            // ok: writing to a String doesn't fail
            write!(buf, "\x1B[38;2;{};{};{}m█", red, green, blue).ok();
        }

        buf.push_str("\x1B[0m");
    }
}
