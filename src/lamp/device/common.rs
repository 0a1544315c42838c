use async_trait::async_trait;
use tokio::time::Instant;

use super::{DeviceError, DeviceImpl};
use crate::models::DeviceConfig;

/// Device that buffers a frame and then pushes it in a separate step
#[async_trait]
pub trait WritingDevice: Send + Sized {
    type Config: DeviceConfig;

    fn new(config: &Self::Config) -> Result<Self, DeviceError>;

    async fn set_led_data(
        &mut self,
        config: &Self::Config,
        led_data: &[u32],
    ) -> Result<(), DeviceError>;

    async fn write(&mut self) -> Result<(), DeviceError>;
}

/// Writes every new frame immediately and repeats the last one every `rewrite_time`
pub struct Rewriter<D: WritingDevice> {
    inner: D,
    config: D::Config,
    last_write_time: Option<Instant>,
}

impl<D: WritingDevice> Rewriter<D> {
    pub fn new(config: D::Config) -> Result<Self, DeviceError> {
        Ok(Self {
            inner: D::new(&config)?,
            config,
            last_write_time: None,
        })
    }

    async fn write(&mut self) -> Result<(), DeviceError> {
        self.inner.write().await?;
        self.last_write_time = Some(Instant::now());
        Ok(())
    }
}

#[async_trait]
impl<D: WritingDevice> DeviceImpl for Rewriter<D> {
    async fn render(&mut self, led_data: &[u32]) -> Result<(), DeviceError> {
        self.inner.set_led_data(&self.config, led_data).await?;
        self.write().await
    }

    async fn update(&mut self) -> Result<(), DeviceError> {
        match (self.config.rewrite_time(), self.last_write_time) {
            (Some(rewrite_time), Some(last_write_time)) => {
                tokio::time::sleep_until(last_write_time + rewrite_time).await;
                self.write().await
            }
            // Nothing was rendered yet, or the device holds its state
            _ => futures::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use super::*;
    use crate::models::Dummy;

    static WRITES: AtomicUsize = AtomicUsize::new(0);

    struct CountingDevice;

    #[async_trait]
    impl WritingDevice for CountingDevice {
        type Config = Dummy;

        fn new(_config: &Self::Config) -> Result<Self, DeviceError> {
            Ok(Self)
        }

        async fn set_led_data(
            &mut self,
            _config: &Self::Config,
            _led_data: &[u32],
        ) -> Result<(), DeviceError> {
            Ok(())
        }

        async fn write(&mut self) -> Result<(), DeviceError> {
            WRITES.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rewrites_last_frame() {
        let mut device = Rewriter::<CountingDevice>::new(Dummy {
            rewrite_time: 100,
            ..Default::default()
        })
        .unwrap();

        // No rewrite before the first frame
        let idle = tokio::time::timeout(Duration::from_secs(1), device.update()).await;
        assert!(idle.is_err());
        assert_eq!(WRITES.load(Ordering::SeqCst), 0);

        device.render(&[0; 96]).await.unwrap();
        assert_eq!(WRITES.load(Ordering::SeqCst), 1);

        let start = Instant::now();
        device.update().await.unwrap();
        assert_eq!(WRITES.load(Ordering::SeqCst), 2);
        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}
