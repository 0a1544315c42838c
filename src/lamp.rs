//! Lamp state machine and render scheduler

use std::time::Duration;

use thiserror::Error;
use tokio::{
    select,
    sync::{mpsc, oneshot},
    time::{Instant, Interval, MissedTickBehavior},
};

use crate::{
    animations::{ActiveAnimation, Animations, FrameContext},
    control::{ParamKind, Transition, WriteError},
    mapping::AddressMap,
    models::{Color, Config, DeviceConfig, LampSettings, Pattern},
    packer::{Packer, PixelBuffer},
    surface::Surface,
};

pub mod device;
pub use device::{Device, DeviceError, StripLayout};

#[derive(Debug, Error)]
pub enum LampError {
    #[error("device drives {actual} LEDs but the address map covers {expected}")]
    LedCountMismatch { expected: usize, actual: usize },
    #[error("device error: {0}")]
    Device(#[from] DeviceError),
}

/// Owns the lamp settings, the active animation and the output device
///
/// All parameter writes are processed between two frames, and only the animation selected by
/// the current settings is ever drawn.
pub struct Lamp {
    name: String,
    settings: LampSettings,
    speed: u32,
    frame: u64,
    period: Duration,
    surface: Surface,
    animations: Animations,
    packer: Packer,
    buffer: PixelBuffer,
    device: LampDevice,
    handle_rx: mpsc::Receiver<LampMessage>,
}

impl Lamp {
    pub fn new(config: &Config) -> Result<(Self, LampHandle), LampError> {
        let map = AddressMap::hex_panel();
        check_led_count(&map, config.device.hardware_led_count())?;

        let device = Device::new(config.device.clone(), config.settings.brightness)?;
        Self::with_device(config, map, device)
    }

    pub(crate) fn with_device(
        config: &Config,
        map: AddressMap,
        device: Device,
    ) -> Result<(Self, LampHandle), LampError> {
        check_led_count(&map, device.layout().led_count)?;

        let (tx, handle_rx) = mpsc::channel(8);

        Ok((
            Self {
                name: config.name.clone(),
                settings: config.settings,
                speed: config.animation.speed,
                frame: 0,
                period: config.render.period(),
                surface: Surface::new(map.width(), map.height()),
                animations: Animations::new(&config.animation, map.width(), map.height()),
                packer: Packer::new(map),
                buffer: PixelBuffer::new(map.led_count()),
                device: Ok(device).into(),
                handle_rx,
            },
            LampHandle { tx },
        ))
    }

    pub fn settings(&self) -> &LampSettings {
        &self.settings
    }

    /// Synthesize, pack and transmit one frame
    async fn tick(&mut self) {
        let start = Instant::now();
        self.frame += 1;

        let ctx = FrameContext {
            frame: self.frame,
            settings: self.settings,
            speed: self.speed,
        };

        match self.animations.get_mut(self.settings.pattern) {
            ActiveAnimation::Surface(animation) => {
                self.surface.clear(Color::new(0, 0, 0, 0));

                if let Err(error) = animation.draw(&ctx, &mut self.surface) {
                    warn!(%error, pattern = %ctx.settings.pattern, "animation update failed");
                    self.surface.clear(Color::new(0, 0, 0, 0));
                }

                self.packer
                    .pack(&self.surface, self.settings.white, &mut self.buffer);
            }

            ActiveAnimation::Strip(animation) => {
                if let Err(error) = animation.draw(&ctx, self.buffer.as_mut_slice()) {
                    warn!(%error, pattern = %ctx.settings.pattern, "animation update failed");
                    self.buffer.clear();
                }
            }
        }

        self.device.render(&self.buffer).await;

        let elapsed = start.elapsed();
        if elapsed > self.period {
            warn!(frame = %self.frame, ?elapsed, period = ?self.period, "frame overran its period");
        } else {
            trace!(frame = %self.frame, ?elapsed, "rendered frame");
        }
    }

    /// Transmit an all-zero frame
    async fn blank(&mut self) {
        self.buffer.clear();
        self.device.render(&self.buffer).await;
    }

    async fn write(
        &mut self,
        kind: ParamKind,
        payload: &[u8],
        ticker: &mut Interval,
    ) -> Result<(), WriteError> {
        let write = kind.decode(payload).map_err(|error| {
            warn!(%error, %kind, "rejected parameter write");
            error
        })?;

        info!(%kind, ?write, "parameter write");

        match write.apply(&mut self.settings) {
            Transition::Parameters | Transition::Unchanged => {}
            Transition::Brightness(brightness) => {
                self.device.set_brightness(brightness);
            }
            Transition::PowerOn => {
                debug!(pattern = %self.settings.pattern, "lamp on");
                ticker.reset_immediately();
            }
            Transition::PowerOff => {
                debug!("lamp off");
                self.blank().await;
            }
            Transition::PatternChanged { from, to } => {
                debug!(%from, %to, "pattern changed");
            }
        }

        Ok(())
    }

    async fn next_pattern(&mut self, ticker: &mut Interval) -> Pattern {
        let next = self.settings.pattern.next();
        let payload = [next.id()];

        // ok: the id of a known pattern always decodes
        self.write(ParamKind::Pattern, &payload, ticker).await.ok();
        self.settings.pattern
    }

    async fn handle_message(&mut self, message: LampMessage, ticker: &mut Interval) -> LampControl {
        // ok: the lamp shouldn't care if the receiver dropped

        match message {
            LampMessage::Write(kind, payload, tx) => {
                let result = self.write(kind, &payload, ticker).await;
                tx.send(result).ok();
            }
            LampMessage::Read(kind, tx) => {
                tx.send(kind.read(&self.settings)).ok();
            }
            LampMessage::NextPattern(tx) => {
                let pattern = self.next_pattern(ticker).await;
                tx.send(pattern).ok();
            }
            LampMessage::Settings(tx) => {
                tx.send(self.settings).ok();
            }
            LampMessage::Stop(tx) => {
                tx.send(()).ok();
                return LampControl::Break;
            }
        }

        LampControl::Continue
    }

    #[instrument]
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            pattern = %self.settings.pattern,
            power = %self.settings.power,
            period = ?self.period,
            "starting lamp"
        );

        if !self.settings.power {
            self.blank().await;
        }

        loop {
            select! {
                _ = ticker.tick(), if self.settings.power => {
                    self.tick().await;
                },
                update = self.device.update() => {
                    trace!("device update");

                    if let Err(error) = update {
                        // A device update shouldn't error, disable it
                        error!(error = %error, "device update failed, disabling device");
                        self.device.inner = Err(error);
                    }
                },
                message = self.handle_rx.recv() => {
                    trace!(message = ?message, "handle_rx msg");

                    if let Some(message) = message {
                        if LampControl::Break == self.handle_message(message, &mut ticker).await {
                            break;
                        }
                    } else {
                        // All handles were dropped
                        break;
                    }
                }
            }
        }

        info!("lamp stopped");
    }
}

impl std::fmt::Debug for Lamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lamp").field("name", &self.name).finish()
    }
}

fn check_led_count(map: &AddressMap, actual: usize) -> Result<(), LampError> {
    if map.led_count() == actual {
        Ok(())
    } else {
        Err(LampError::LedCountMismatch {
            expected: map.led_count(),
            actual,
        })
    }
}

/// A wrapper for a device that may have failed
struct LampDevice {
    inner: Result<Device, DeviceError>,
}

impl LampDevice {
    async fn update(&mut self) -> Result<(), DeviceError> {
        if let Ok(device) = &mut self.inner {
            device.update().await
        } else {
            futures::future::pending::<()>().await;
            Ok(())
        }
    }

    async fn render(&mut self, buffer: &PixelBuffer) {
        if let Ok(device) = &mut self.inner {
            if let Err(error) = device.render(buffer.as_slice()).await {
                error!(%error, "failed to render frame");
            }
        }
    }

    fn set_brightness(&mut self, brightness: u8) {
        if let Ok(device) = &mut self.inner {
            device.set_brightness(brightness);
        }
    }
}

impl From<Result<Device, DeviceError>> for LampDevice {
    fn from(inner: Result<Device, DeviceError>) -> Self {
        Self { inner }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LampControl {
    Continue,
    Break,
}

#[derive(Debug)]
enum LampMessage {
    Write(ParamKind, Vec<u8>, oneshot::Sender<Result<(), WriteError>>),
    Read(ParamKind, oneshot::Sender<Vec<u8>>),
    NextPattern(oneshot::Sender<Pattern>),
    Settings(oneshot::Sender<LampSettings>),
    Stop(oneshot::Sender<()>),
}

#[derive(Debug, Clone)]
pub struct LampHandle {
    tx: mpsc::Sender<LampMessage>,
}

#[derive(Debug, Error)]
pub enum LampHandleError {
    #[error("the lamp is no longer running")]
    Dropped,
}

impl<T> From<mpsc::error::SendError<T>> for LampHandleError {
    fn from(_: mpsc::error::SendError<T>) -> Self {
        Self::Dropped
    }
}

impl From<oneshot::error::RecvError> for LampHandleError {
    fn from(_: oneshot::error::RecvError) -> Self {
        Self::Dropped
    }
}

impl From<LampHandleError> for WriteError {
    fn from(_: LampHandleError) -> Self {
        Self::Stopped
    }
}

impl LampHandle {
    /// Apply a raw parameter write, returning once the lamp acknowledged it
    pub async fn write(&self, kind: ParamKind, payload: Vec<u8>) -> Result<(), WriteError> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(LampMessage::Write(kind, payload, tx))
            .await
            .map_err(LampHandleError::from)?;
        rx.await.map_err(LampHandleError::from)?
    }

    /// Last applied value of a parameter
    pub async fn read(&self, kind: ParamKind) -> Result<Vec<u8>, LampHandleError> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(LampMessage::Read(kind, tx)).await?;
        Ok(rx.await?)
    }

    /// Advance to the next pattern, wrapping around after the last one
    pub async fn next_pattern(&self) -> Result<Pattern, LampHandleError> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(LampMessage::NextPattern(tx)).await?;
        Ok(rx.await?)
    }

    pub async fn settings(&self) -> Result<LampSettings, LampHandleError> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(LampMessage::Settings(tx)).await?;
        Ok(rx.await?)
    }

    pub async fn stop(&self) -> Result<(), LampHandleError> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(LampMessage::Stop(tx)).await?;
        Ok(rx.await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{color::pack_rgbw, lamp::device::tests::CaptureDevice, models};

    fn spawn_with(config: &Config, capture: &CaptureDevice) -> LampHandle {
        let (lamp, handle) = Lamp::with_device(
            config,
            AddressMap::hex_panel(),
            capture.clone().into_device(96, 255),
        )
        .unwrap();

        tokio::spawn(lamp.run());
        handle
    }

    fn spawn_lamp(settings: LampSettings) -> (LampHandle, CaptureDevice, Config) {
        let config = Config {
            settings,
            ..Default::default()
        };

        let capture = CaptureDevice::default();
        let handle = spawn_with(&config, &capture);
        (handle, capture, config)
    }

    /// Output of a surface pattern at a given frame, rendered outside of the lamp
    fn expected_frame(config: &Config, settings: LampSettings, frame: u64) -> Vec<u32> {
        let map = AddressMap::hex_panel();
        let mut animations = Animations::new(&config.animation, map.width(), map.height());
        let mut surface = Surface::new(map.width(), map.height());
        let mut buffer = PixelBuffer::new(map.led_count());

        let ctx = FrameContext {
            frame,
            settings,
            speed: config.animation.speed,
        };

        match animations.get_mut(settings.pattern) {
            ActiveAnimation::Surface(animation) => {
                surface.clear(Color::new(0, 0, 0, 0));
                animation.draw(&ctx, &mut surface).unwrap();
                Packer::new(map).pack(&surface, settings.white, &mut buffer);
            }
            ActiveAnimation::Strip(_) => panic!("not a surface pattern"),
        }

        buffer.as_slice().to_vec()
    }

    async fn run_frames(config: &Config, count: u32) {
        tokio::time::sleep(config.render.period() * count).await;
    }

    fn on(pattern: Pattern) -> LampSettings {
        LampSettings {
            red: 200,
            green: 40,
            blue: 10,
            white: 30,
            pattern,
            power: true,
            brightness: 255,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn pattern_switch_leaves_one_animation() {
        let settings = on(Pattern::Solid);
        let (handle, capture, config) = spawn_lamp(settings);

        run_frames(&config, 3).await;

        // Both writes are queued before the lamp handles either of them
        let (first, second) = tokio::join!(
            handle.write(ParamKind::Pattern, vec![2]),
            handle.write(ParamKind::Pattern, vec![3]),
        );
        first.unwrap();
        second.unwrap();
        assert!(capture.take().len() >= 3);

        run_frames(&config, 10).await;
        let frames = capture.take();
        assert!(frames.len() >= 9);

        // Every frame rendered after the switch comes from the square pattern
        let square = LampSettings {
            pattern: Pattern::Square,
            ..settings
        };
        let square_frames: Vec<_> = (1..=40)
            .map(|n| expected_frame(&config, square, n))
            .collect();

        for frame in &frames {
            assert!(square_frames.contains(frame));
        }

        handle.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn power_toggle_resumes_pattern() {
        let (handle, capture, config) = spawn_lamp(on(Pattern::Solid));
        let lit = vec![pack_rgbw(200, 40, 10, 30); 96];

        run_frames(&config, 3).await;
        assert!(capture.take().iter().all(|frame| *frame == lit));

        handle.write(ParamKind::Power, vec![0]).await.unwrap();
        assert_eq!(capture.take().last(), Some(&vec![0; 96]));

        // The blank frame is only sent once
        run_frames(&config, 10).await;
        assert!(capture.take().is_empty());

        // Writes while off are applied but not rendered
        handle.write(ParamKind::Brightness, vec![255]).await.unwrap();
        run_frames(&config, 3).await;
        assert!(capture.take().is_empty());

        handle.write(ParamKind::Power, vec![1]).await.unwrap();
        run_frames(&config, 3).await;
        let frames = capture.take();
        assert!(!frames.is_empty());
        assert!(frames.iter().all(|frame| *frame == lit));
        assert_eq!(handle.settings().await.unwrap().pattern, Pattern::Solid);

        handle.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn failing_animation_still_transmits() {
        let mut config = Config {
            settings: on(Pattern::Ripple),
            ..Default::default()
        };
        config.animation.dampening = f32::NAN;

        let capture = CaptureDevice::default();
        let handle = spawn_with(&config, &capture);

        // Every ripple step fails: frames keep coming, cleared to the white level
        run_frames(&config, 10).await;
        let frames = capture.take();
        assert!(frames.len() >= 10);
        assert!(frames
            .iter()
            .all(|frame| *frame == vec![pack_rgbw(0, 0, 0, 30); 96]));

        // The scheduler is still alive for the next pattern
        handle.write(ParamKind::Pattern, vec![0]).await.unwrap();
        capture.take();
        run_frames(&config, 2).await;
        assert_eq!(
            capture.take().last(),
            Some(&vec![pack_rgbw(200, 40, 10, 30); 96])
        );

        handle.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn overrun_skips_missed_ticks() {
        let config = Config {
            settings: on(Pattern::Solid),
            ..Default::default()
        };

        // Every frame takes one and a half periods to send
        let capture = CaptureDevice::slow(config.render.period() * 3 / 2);
        let handle = spawn_with(&config, &capture);

        run_frames(&config, 20).await;
        let count = capture.take().len();

        // Missed ticks are dropped: one frame every other period, no catching up
        assert!((9..=11).contains(&count), "{} frames in 20 periods", count);

        handle.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn starts_dark_when_off() {
        let (handle, capture, config) = spawn_lamp(LampSettings::default());

        run_frames(&config, 5).await;
        assert_eq!(capture.take(), vec![vec![0; 96]]);

        handle.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_color_write_is_idempotent() {
        let (handle, capture, config) = spawn_lamp(on(Pattern::Solid));

        handle
            .write(ParamKind::Color, vec![1, 2, 3, 4])
            .await
            .unwrap();
        let first_read = handle.read(ParamKind::Color).await.unwrap();
        capture.take();
        run_frames(&config, 2).await;
        let first_frames = capture.take();

        handle
            .write(ParamKind::Color, vec![1, 2, 3, 4])
            .await
            .unwrap();
        let second_read = handle.read(ParamKind::Color).await.unwrap();
        run_frames(&config, 2).await;
        let second_frames = capture.take();

        assert_eq!(first_read, vec![1, 2, 3, 4]);
        assert_eq!(first_read, second_read);
        assert_eq!(first_frames.last(), second_frames.last());
        assert_eq!(
            second_frames.last(),
            Some(&vec![pack_rgbw(1, 2, 3, 4); 96])
        );

        handle.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_writes_keep_state() {
        let settings = on(Pattern::Noise);
        let (handle, _capture, _config) = spawn_lamp(settings);

        let error = handle
            .write(ParamKind::Color, vec![1, 2, 3])
            .await
            .unwrap_err();
        assert_eq!(error.ack(), crate::control::Ack::InvalidLength);

        let error = handle.write(ParamKind::Pattern, vec![42]).await.unwrap_err();
        assert_eq!(error.ack(), crate::control::Ack::InternalError);

        assert_eq!(handle.settings().await.unwrap(), settings);
        assert_eq!(handle.read(ParamKind::Pattern).await.unwrap(), vec![5]);

        handle.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn next_pattern_wraps() {
        let (handle, _capture, _config) = spawn_lamp(on(Pattern::Ripple));

        assert_eq!(handle.next_pattern().await.unwrap(), Pattern::Solid);
        assert_eq!(handle.next_pattern().await.unwrap(), Pattern::Rainbow);

        handle.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_lamp_reports_internal_error() {
        let (handle, _capture, _config) = spawn_lamp(LampSettings::default());
        handle.stop().await.unwrap();

        let error = handle.write(ParamKind::Power, vec![1]).await.unwrap_err();
        assert_eq!(error, WriteError::Stopped);
        assert!(handle.read(ParamKind::Power).await.is_err());
    }

    #[test]
    fn refuses_mismatched_led_count() {
        let config = Config {
            device: models::Device::Dummy(models::Dummy {
                hardware_led_count: 95,
                ..Default::default()
            }),
            ..Default::default()
        };

        assert!(matches!(
            Lamp::new(&config),
            Err(LampError::LedCountMismatch {
                expected: 96,
                actual: 95
            })
        ));
    }
}
