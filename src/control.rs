//! Externally writable lamp parameters

use parse_display::Display;
use strum_macros::{EnumIter, FromRepr};
use thiserror::Error;

use crate::models::{LampSettings, Pattern, UnknownPattern};

/// Parameter addressed by a control write or read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, FromRepr)]
#[display(style = "lowercase")]
#[repr(u8)]
pub enum ParamKind {
    Color = 1,
    Brightness = 2,
    Power = 3,
    Pattern = 4,
}

impl ParamKind {
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Exact payload length a write must carry
    pub fn payload_len(self) -> usize {
        match self {
            ParamKind::Color => 4,
            ParamKind::Brightness | ParamKind::Power | ParamKind::Pattern => 1,
        }
    }

    /// Validate a raw write payload
    pub fn decode(self, payload: &[u8]) -> Result<ParamWrite, WriteError> {
        if payload.len() != self.payload_len() {
            return Err(WriteError::InvalidLength {
                kind: self,
                expected: self.payload_len(),
                actual: payload.len(),
            });
        }

        Ok(match self {
            ParamKind::Color => ParamWrite::Color {
                red: payload[0],
                green: payload[1],
                blue: payload[2],
                white: payload[3],
            },
            ParamKind::Brightness => ParamWrite::Brightness(payload[0]),
            ParamKind::Power => ParamWrite::Power(payload[0] != 0),
            ParamKind::Pattern => ParamWrite::Pattern(Pattern::try_from(payload[0])?),
        })
    }

    /// Last applied value, encoded like a write payload
    pub fn read(self, settings: &LampSettings) -> Vec<u8> {
        match self {
            ParamKind::Color => vec![
                settings.red,
                settings.green,
                settings.blue,
                settings.white,
            ],
            ParamKind::Brightness => vec![settings.brightness],
            ParamKind::Power => vec![settings.power as u8],
            ParamKind::Pattern => vec![settings.pattern.id()],
        }
    }
}

/// A validated parameter write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamWrite {
    Color {
        red: u8,
        green: u8,
        blue: u8,
        white: u8,
    },
    Brightness(u8),
    Power(bool),
    Pattern(Pattern),
}

/// State machine edge taken by a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Settings changed without affecting the power state or the active pattern
    Parameters,
    Brightness(u8),
    PowerOn,
    PowerOff,
    PatternChanged { from: Pattern, to: Pattern },
    Unchanged,
}

impl ParamWrite {
    pub fn apply(&self, settings: &mut LampSettings) -> Transition {
        match *self {
            ParamWrite::Color {
                red,
                green,
                blue,
                white,
            } => {
                settings.red = red;
                settings.green = green;
                settings.blue = blue;
                settings.white = white;
                Transition::Parameters
            }
            ParamWrite::Brightness(brightness) => {
                settings.brightness = brightness;
                Transition::Brightness(brightness)
            }
            ParamWrite::Power(power) => match (settings.power, power) {
                (false, true) => {
                    settings.power = true;
                    Transition::PowerOn
                }
                (true, false) => {
                    settings.power = false;
                    Transition::PowerOff
                }
                _ => Transition::Unchanged,
            },
            ParamWrite::Pattern(pattern) => {
                let from = std::mem::replace(&mut settings.pattern, pattern);
                if from == pattern {
                    Transition::Unchanged
                } else {
                    Transition::PatternChanged { from, to: pattern }
                }
            }
        }
    }
}

/// Acknowledgement returned for every write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromRepr)]
#[repr(u8)]
pub enum Ack {
    #[display("success")]
    Success = 0x00,
    #[display("invalid attribute length")]
    InvalidLength = 0x0D,
    #[display("unlikely error")]
    InternalError = 0x0E,
}

impl Ack {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl<T> From<&Result<T, WriteError>> for Ack {
    fn from(result: &Result<T, WriteError>) -> Self {
        match result {
            Ok(_) => Ack::Success,
            Err(error) => error.ack(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriteError {
    #[error("invalid {kind} payload: expected {expected} bytes, got {actual}")]
    InvalidLength {
        kind: ParamKind,
        expected: usize,
        actual: usize,
    },
    #[error(transparent)]
    UnknownPattern(#[from] UnknownPattern),
    #[error("the lamp is no longer running")]
    Stopped,
}

impl WriteError {
    pub fn ack(&self) -> Ack {
        match self {
            WriteError::InvalidLength { .. } => Ack::InvalidLength,
            WriteError::UnknownPattern(_) | WriteError::Stopped => Ack::InternalError,
        }
    }
}
