use async_trait::async_trait;
use spidev::{SpiModeFlags, Spidev, SpidevOptions, SpidevTransfer};

use super::{common::*, DeviceError};
use crate::{color::unpack_rgbw, models};

pub type Sk6812SpiDevice = Rewriter<Sk6812SpiImpl>;

pub struct Sk6812SpiImpl {
    dev: SpiPort,
    notified_error: bool,
    buf: Vec<u8>,
    data_len: usize,
}

/// Every SPI byte carries two data bits
const SPI_BYTES_PER_COLOUR: usize = 4;
const SPI_BYTES_PER_LED: usize = 4 * SPI_BYTES_PER_COLOUR;
/// Minimum low time between frames, 80µs at the default rate
const SPI_FRAME_END_LATCH_BYTES: usize = 30;
const BITPAIR_TO_BYTE: [u8; 4] = [0b10001000, 0b10001100, 0b11001000, 0b11001100];

/// SPI device, opened on first use
struct SpiPort {
    config: models::Sk6812Spi,
    dev: Option<Spidev>,
}

impl SpiPort {
    fn open(config: &models::Sk6812Spi) -> Result<Spidev, DeviceError> {
        let mut dev = Spidev::open(&config.output)?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(config.rate)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        dev.configure(&options)?;

        info!(path = %config.output, rate = %config.rate, "initialized SPI device");
        Ok(dev)
    }

    fn try_init(&mut self) -> Result<&Spidev, DeviceError> {
        let dev = match self.dev.take() {
            Some(dev) => dev,
            None => Self::open(&self.config)?,
        };

        Ok(self.dev.insert(dev))
    }
}

/// Number of zero bytes covering `latch_time` at `rate` bits per second
fn latch_bytes(config: &models::Sk6812Spi) -> usize {
    use models::DeviceConfig;

    let from_time =
        (config.latch_time().as_micros() as u64 * config.rate as u64 / 8_000_000) as usize;
    from_time.max(SPI_FRAME_END_LATCH_BYTES)
}

/// Encode packed words into SPI bytes, returning the number of data bytes written
fn encode(buf: &mut [u8], color_order: models::ColorOrder, led_data: &[u32]) -> usize {
    let mut ptr = 0;
    for led in led_data {
        for channel in color_order.reorder_from_rgbw(unpack_rgbw(*led)) {
            let mut bits = channel;
            for j in (0..SPI_BYTES_PER_COLOUR).rev() {
                buf[ptr + j] = BITPAIR_TO_BYTE[(bits & 0x3) as usize];
                bits >>= 2;
            }

            ptr += SPI_BYTES_PER_COLOUR;
        }
    }

    ptr
}

#[async_trait]
impl WritingDevice for Sk6812SpiImpl {
    type Config = models::Sk6812Spi;

    fn new(config: &models::Sk6812Spi) -> Result<Self, DeviceError> {
        let data_len = config.hardware_led_count as usize * SPI_BYTES_PER_LED;
        let buf = vec![0; data_len + latch_bytes(config)];

        let mut dev = SpiPort {
            config: config.clone(),
            dev: None,
        };

        // Try to open the device early
        if let Err(error) = dev.try_init() {
            warn!(%error, path = %config.output, "failed to initialize SPI device, will try again later");
        }

        Ok(Self {
            dev,
            notified_error: false,
            buf,
            data_len,
        })
    }

    async fn set_led_data(
        &mut self,
        config: &Self::Config,
        led_data: &[u32],
    ) -> Result<(), DeviceError> {
        let written = encode(&mut self.buf[..self.data_len], config.color_order, led_data);
        self.buf[written..].fill(0);

        if config.invert {
            for byte in &mut self.buf {
                *byte = !*byte;
            }
        }

        Ok(())
    }

    async fn write(&mut self) -> Result<(), DeviceError> {
        let mut transfer = SpidevTransfer::write(&self.buf);

        match self.dev.try_init() {
            Ok(dev) => {
                self.notified_error = false;
                dev.transfer(&mut transfer)?;
            }
            Err(err) => {
                if !self.notified_error {
                    self.notified_error = true;
                    error!(error = %err, "failed to initialize SPI device");
                }
            }
        }

        Ok(())
    }
}
