use serde_derive::{Deserialize, Serialize};
use strum_macros::{Display, EnumCount, EnumIter, EnumString, FromRepr, IntoStaticStr};
use thiserror::Error;

use super::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown pattern id {0}")]
pub struct UnknownPattern(pub u8);

/// Animation selected by the control plane
///
/// The discriminant is the id carried by the Pattern parameter.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumCount,
    EnumIter,
    EnumString,
    FromRepr,
    IntoStaticStr,
)]
#[serde(try_from = "u8", into = "u8")]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum Pattern {
    Solid = 0,
    Rainbow = 1,
    Circle = 2,
    Square = 3,
    Text = 4,
    Noise = 5,
    Ripple = 6,
}

impl Pattern {
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Next pattern in id order, wrapping around
    pub fn next(self) -> Self {
        Self::from_repr((self.id() + 1) % <Self as strum::EnumCount>::COUNT as u8)
            .unwrap_or(Self::Solid)
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Self::Rainbow
    }
}

impl TryFrom<u8> for Pattern {
    type Error = UnknownPattern;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_repr(value).ok_or(UnknownPattern(value))
    }
}

impl From<Pattern> for u8 {
    fn from(pattern: Pattern) -> Self {
        pattern.id()
    }
}

/// Externally settable lamp parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LampSettings {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub white: u8,
    pub pattern: Pattern,
    pub power: bool,
    pub brightness: u8,
}

impl LampSettings {
    /// Direct colour, with the white level in the alpha channel
    pub fn color(&self) -> Color {
        Color::new(self.red, self.green, self.blue, self.white)
    }
}

impl Default for LampSettings {
    fn default() -> Self {
        Self {
            red: 0,
            green: 0,
            blue: 0,
            white: 100,
            pattern: Pattern::default(),
            power: false,
            brightness: 226,
        }
    }
}
