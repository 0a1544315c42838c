use ambassador::{delegatable_trait, Delegate};
use derive_more::From;
use serde_derive::{Deserialize, Serialize};
use strum_macros::IntoStaticStr;
use validator::Validate;

use super::default_false;

/// Channel order of a 4-channel LED strip on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorOrder {
    Rgbw,
    Grbw,
    Brgw,
    Wrgb,
    Wgrb,
}

impl ColorOrder {
    /// Reorder a `(r, g, b, w)` tuple into wire order
    pub fn reorder_from_rgbw(&self, (r, g, b, w): (u8, u8, u8, u8)) -> [u8; 4] {
        match self {
            ColorOrder::Rgbw => [r, g, b, w],
            ColorOrder::Grbw => [g, r, b, w],
            ColorOrder::Brgw => [b, r, g, w],
            ColorOrder::Wrgb => [w, r, g, b],
            ColorOrder::Wgrb => [w, g, r, b],
        }
    }
}

impl Default for ColorOrder {
    fn default() -> Self {
        Self::Grbw
    }
}

#[delegatable_trait]
pub trait DeviceConfig: Sync + Send {
    fn hardware_led_count(&self) -> usize;

    fn color_order(&self) -> ColorOrder {
        ColorOrder::default()
    }

    fn rewrite_time(&self) -> Option<std::time::Duration> {
        None
    }

    fn latch_time(&self) -> std::time::Duration {
        Default::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DummyDeviceMode {
    Text,
    Ansi,
    Silent,
}

impl Default for DummyDeviceMode {
    fn default() -> Self {
        Self::Ansi
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Dummy {
    #[validate(range(min = 1))]
    pub hardware_led_count: u32,
    pub rewrite_time: u32,
    pub mode: DummyDeviceMode,
}

impl DeviceConfig for Dummy {
    fn hardware_led_count(&self) -> usize {
        self.hardware_led_count as _
    }

    fn rewrite_time(&self) -> Option<std::time::Duration> {
        if self.rewrite_time == 0 {
            None
        } else {
            Some(std::time::Duration::from_millis(self.rewrite_time as _))
        }
    }
}

impl Default for Dummy {
    fn default() -> Self {
        Self {
            hardware_led_count: 96,
            rewrite_time: 0,
            mode: Default::default(),
        }
    }
}

fn default_spi_rate() -> u32 {
    3_000_000
}

fn default_spi_rewrite_time() -> u32 {
    1000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Sk6812Spi {
    #[serde(default = "Default::default")]
    pub color_order: ColorOrder,
    #[validate(range(min = 1))]
    pub hardware_led_count: u32,
    #[serde(default = "default_false")]
    pub invert: bool,
    #[serde(default = "Default::default")]
    pub latch_time: u32,
    pub output: String,
    #[serde(default = "default_spi_rate")]
    #[validate(range(min = 100_000))]
    pub rate: u32,
    #[serde(default = "default_spi_rewrite_time")]
    pub rewrite_time: u32,
}

impl DeviceConfig for Sk6812Spi {
    fn hardware_led_count(&self) -> usize {
        self.hardware_led_count as _
    }

    fn color_order(&self) -> ColorOrder {
        self.color_order
    }

    fn rewrite_time(&self) -> Option<std::time::Duration> {
        if self.rewrite_time == 0 {
            None
        } else {
            Some(std::time::Duration::from_millis(self.rewrite_time as _))
        }
    }

    fn latch_time(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.latch_time as _)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, IntoStaticStr, Delegate, From)]
#[serde(rename_all = "lowercase", tag = "type")]
#[delegate(DeviceConfig)]
pub enum Device {
    Dummy(Dummy),
    Sk6812Spi(Sk6812Spi),
}

impl Default for Device {
    fn default() -> Self {
        Self::Dummy(Dummy::default())
    }
}

impl Validate for Device {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        match self {
            Device::Dummy(device) => device.validate(),
            Device::Sk6812Spi(device) => device.validate(),
        }
    }
}
