use async_trait::async_trait;
use thiserror::Error;

use crate::{
    color::scale_brightness,
    models::{self, ColorOrder, DeviceConfig},
};

mod common;

// Device implementation modules

mod dummy;
mod sk6812spi;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("expected {expected} LED words, got {actual}")]
    LedCount { expected: usize, actual: usize },
}

/// Static description of the strip handed to a device when it is configured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripLayout {
    pub led_count: usize,
    pub color_order: ColorOrder,
    pub brightness: u8,
}

#[async_trait]
pub(crate) trait DeviceImpl: Send {
    /// Push packed RGBW words to the hardware
    ///
    /// # Panics
    ///
    /// Implementations are allowed to panic if led_data.len() != led_count. The [Device] wrapper
    /// is responsible for ensuring the given slice is the right size.
    async fn render(&mut self, led_data: &[u32]) -> Result<(), DeviceError>;

    /// Update the device implementation's temporal data. For devices that require regular rewrites
    /// (regardless of actual changes in the LED data), this should return a future that performs
    /// the required work.
    async fn update(&mut self) -> Result<(), DeviceError>;
}

pub struct Device {
    name: &'static str,
    layout: StripLayout,
    inner: Box<dyn DeviceImpl>,
    scaled: Vec<u32>,
}

impl Device {
    fn build_inner(config: models::Device) -> Result<Box<dyn DeviceImpl>, DeviceError> {
        let inner: Box<dyn DeviceImpl> = match config {
            models::Device::Dummy(dummy) => Box::new(dummy::DummyDevice::new(dummy)?),
            models::Device::Sk6812Spi(sk6812spi) => {
                Box::new(sk6812spi::Sk6812SpiDevice::new(sk6812spi)?)
            }
        };

        Ok(inner)
    }

    #[instrument(skip(config))]
    pub fn new(config: models::Device, brightness: u8) -> Result<Self, DeviceError> {
        let name: &'static str = (&config).into();
        let layout = StripLayout {
            led_count: config.hardware_led_count(),
            color_order: config.color_order(),
            brightness,
        };

        let inner = Self::build_inner(config)?;
        info!(device = %name, led_count = %layout.led_count, "configured device");

        Ok(Self::from_impl(name, layout, inner))
    }

    pub(crate) fn from_impl(
        name: &'static str,
        layout: StripLayout,
        inner: Box<dyn DeviceImpl>,
    ) -> Self {
        Self {
            name,
            layout,
            inner,
            scaled: vec![0; layout.led_count],
        }
    }

    pub fn layout(&self) -> &StripLayout {
        &self.layout
    }

    pub fn set_brightness(&mut self, brightness: u8) {
        self.layout.brightness = brightness;
    }

    #[instrument(skip(led_data))]
    pub async fn render(&mut self, led_data: &[u32]) -> Result<(), DeviceError> {
        if led_data.len() != self.layout.led_count {
            return Err(DeviceError::LedCount {
                expected: self.layout.led_count,
                actual: led_data.len(),
            });
        }

        let brightness = self.layout.brightness;
        for (dst, src) in self.scaled.iter_mut().zip(led_data) {
            *dst = scale_brightness(*src, brightness);
        }

        self.inner.render(&self.scaled).await
    }

    #[instrument]
    pub async fn update(&mut self) -> Result<(), DeviceError> {
        self.inner.update().await
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device").field("name", &self.name).finish()
    }
}
