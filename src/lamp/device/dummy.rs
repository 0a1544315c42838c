use async_trait::async_trait;

use super::{common::*, DeviceError};
use crate::{
    color::{unpack_rgbw, AnsiDisplayExt},
    models,
};

pub type DummyDevice = Rewriter<DummyDeviceImpl>;

pub struct DummyDeviceImpl {
    leds: Vec<u32>,
    mode: models::DummyDeviceMode,
    ansi_buf: String,
}

#[async_trait]
impl WritingDevice for DummyDeviceImpl {
    type Config = models::Dummy;

    fn new(config: &Self::Config) -> Result<Self, DeviceError> {
        Ok(Self {
            leds: vec![0; config.hardware_led_count as _],
            mode: config.mode,
            ansi_buf: String::new(),
        })
    }

    async fn set_led_data(
        &mut self,
        _config: &Self::Config,
        led_data: &[u32],
    ) -> Result<(), DeviceError> {
        self.leds.copy_from_slice(led_data);
        Ok(())
    }

    async fn write(&mut self) -> Result<(), DeviceError> {
        match self.mode {
            models::DummyDeviceMode::Text => {
                for (i, led) in self.leds.iter().enumerate() {
                    let (red, green, blue, white) = unpack_rgbw(*led);
                    info!(
                        led = %format_args!("{:3}", i),
                        red = %format_args!("{:3}", red),
                        green = %format_args!("{:3}", green),
                        blue = %format_args!("{:3}", blue),
                        white = %format_args!("{:3}", white),
                    );
                }
            }

            models::DummyDeviceMode::Ansi => {
                self.ansi_buf.clear();
                self.leds.iter().copied().to_ansi_truecolor(&mut self.ansi_buf);
                info!("{}", &self.ansi_buf);
            }

            models::DummyDeviceMode::Silent => {
                trace!(leds = self.leds.len(), "dummy write");
            }
        }

        Ok(())
    }
}
