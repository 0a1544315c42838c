use super::{Animation, AnimationError, FrameContext};
use crate::{models::Color, surface::Surface};

const PERLIN_YWRAPB: u32 = 4;
const PERLIN_YWRAP: u32 = 1 << PERLIN_YWRAPB;
const PERLIN_ZWRAPB: u32 = 8;
const PERLIN_ZWRAP: u32 = 1 << PERLIN_ZWRAPB;
const PERLIN_SIZE: u32 = 4095;
/// Period of the lattice along z: `zi << PERLIN_ZWRAPB` only keeps 4 bits of `zi`
const PERLIN_Z_PERIOD: f32 = ((PERLIN_SIZE + 1) >> PERLIN_ZWRAPB) as f32;

/// Amplitude falloff between noise octaves
pub const NOISE_FALLOFF: f32 = 0.618_033_99;

fn scaled_cosine(i: f32) -> f32 {
    0.5 * (1.0 - (i * std::f32::consts::PI).cos())
}

/// Multi-octave 3D value noise over a random lattice, with cosine interpolation
///
/// Samples lie in `[0, 1)` as long as the octave amplitudes sum to at most 1.
#[derive(Debug, Clone)]
pub struct Perlin {
    lattice: Vec<f32>,
    octaves: u32,
    falloff: f32,
}

impl Perlin {
    pub fn new(rng: &mut fastrand::Rng) -> Self {
        Self {
            lattice: (0..=PERLIN_SIZE).map(|_| rng.f32()).collect(),
            octaves: 4,
            falloff: 0.5,
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::new(&mut fastrand::Rng::with_seed(seed))
    }

    /// Number of octaves and per-octave amplitude falloff
    pub fn set_detail(&mut self, octaves: u32, falloff: f32) {
        self.octaves = octaves.max(1);
        self.falloff = falloff.clamp(0., 1.);
    }

    fn at(&self, offset: u32) -> f32 {
        self.lattice[(offset & PERLIN_SIZE) as usize]
    }

    pub fn sample(&self, x: f32, y: f32, z: f32) -> f32 {
        let (x, y, z) = (x.abs(), y.abs(), z.abs());

        // Only the low 12 bits of the lattice coordinates are used, wrapping is harmless
        let mut xi = x.floor() as u32;
        let mut yi = y.floor() as u32;
        let mut zi = z.floor() as u32;
        let mut xf = x - x.floor();
        let mut yf = y - y.floor();
        let mut zf = z - z.floor();

        let mut r = 0.;
        let mut ampl = 0.5;

        for _ in 0..self.octaves {
            let mut of = xi
                .wrapping_add(yi.wrapping_shl(PERLIN_YWRAPB))
                .wrapping_add(zi.wrapping_shl(PERLIN_ZWRAPB));

            let rxf = scaled_cosine(xf);
            let ryf = scaled_cosine(yf);

            let mut n1 = self.at(of);
            n1 += rxf * (self.at(of.wrapping_add(1)) - n1);
            let mut n2 = self.at(of.wrapping_add(PERLIN_YWRAP));
            n2 += rxf * (self.at(of.wrapping_add(PERLIN_YWRAP + 1)) - n2);
            n1 += ryf * (n2 - n1);

            of = of.wrapping_add(PERLIN_ZWRAP);
            n2 = self.at(of);
            n2 += rxf * (self.at(of.wrapping_add(1)) - n2);
            let mut n3 = self.at(of.wrapping_add(PERLIN_YWRAP));
            n3 += rxf * (self.at(of.wrapping_add(PERLIN_YWRAP + 1)) - n3);
            n2 += ryf * (n3 - n2);

            n1 += scaled_cosine(zf) * (n2 - n1);

            r += n1 * ampl;
            ampl *= self.falloff;

            xi = xi.wrapping_shl(1);
            xf *= 2.;
            yi = yi.wrapping_shl(1);
            yf *= 2.;
            zi = zi.wrapping_shl(1);
            zf *= 2.;

            if xf >= 1. {
                xi = xi.wrapping_add(1);
                xf -= 1.;
            }
            if yf >= 1. {
                yi = yi.wrapping_add(1);
                yf -= 1.;
            }
            if zf >= 1. {
                zi = zi.wrapping_add(1);
                zf -= 1.;
            }
        }

        r
    }
}

/// Grayscale noise drifting along the z axis
#[derive(Debug, Clone)]
pub struct NoiseField {
    perlin: Perlin,
    increment: f32,
    z_increment: f32,
    zoff: f32,
}

impl NoiseField {
    pub fn new(perlin: Perlin, increment: f32, z_increment: f32) -> Self {
        Self {
            perlin,
            increment,
            z_increment,
            zoff: 0.,
        }
    }

    pub fn zoff(&self) -> f32 {
        self.zoff
    }
}

impl Animation for NoiseField {
    fn draw(&mut self, ctx: &FrameContext, surface: &mut Surface) -> Result<(), AnimationError> {
        // Higher speeds add octaves for a busier pattern
        self.perlin.set_detail(2 + ctx.speed, NOISE_FALLOFF);

        for x in 0..surface.width() {
            let xoff = (x + 1) as f32 * self.increment;

            for y in 0..surface.height() {
                let yoff = (y + 1) as f32 * self.increment;
                let bright = self.perlin.sample(xoff, yoff, self.zoff) * 255.;

                if !bright.is_finite() {
                    return Err(AnimationError::NonFinite { x, y });
                }

                let gray = bright.floor().clamp(0., 255.) as u8;
                surface.set_pixel(x, y, Color::new(gray, gray, gray, ctx.settings.white));
            }
        }

        self.zoff = (self.zoff.rem_euclid(PERLIN_Z_PERIOD) + self.z_increment)
            .rem_euclid(PERLIN_Z_PERIOD);
        Ok(())
    }
}
