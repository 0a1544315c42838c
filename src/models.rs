use std::net::IpAddr;

use serde_derive::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

mod devices;
pub use devices::*;

mod settings;
pub use settings::*;

/// RGB colour with the white level stored in the alpha slot
pub type Color = palette::rgb::LinSrgba<u8>;

fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct Render {
    #[validate(range(min = 1, max = 240))]
    pub frame_rate: u32,
}

impl Render {
    pub fn period(&self) -> std::time::Duration {
        std::time::Duration::from_micros(1_000_000 / self.frame_rate.max(1) as u64)
    }
}

impl Default for Render {
    fn default() -> Self {
        Self { frame_rate: 30 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct Animation {
    #[validate(range(min = 1, max = 16))]
    pub speed: u32,
    #[validate(length(min = 1, max = 64))]
    pub text: String,
    #[validate(range(min = 0.0, max = 1.0))]
    pub noise_increment: f32,
    #[validate(range(min = 0.0, max = 1.0))]
    pub noise_z_increment: f32,
    #[validate(range(min = 0.0, max = 1.0))]
    pub dampening: f32,
}

impl Default for Animation {
    fn default() -> Self {
        Self {
            speed: 1,
            text: "Hello !".to_owned(),
            noise_increment: 0.01,
            noise_z_increment: 0.02,
            dampening: 0.99,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct ControlServer {
    #[serde(default = "default_true")]
    pub enable: bool,
    pub bind: IpAddr,
    #[validate(range(min = 1024))]
    pub port: u16,
}

impl ControlServer {
    pub fn address(&self) -> std::net::SocketAddr {
        (self.bind, self.port).into()
    }
}

impl Default for ControlServer {
    fn default() -> Self {
        Self {
            enable: true,
            bind: IpAddr::from([127, 0, 0, 1]),
            port: 19500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    pub name: String,
    #[validate(nested)]
    pub device: Device,
    #[validate(nested)]
    pub render: Render,
    #[validate(nested)]
    pub animation: Animation,
    pub settings: LampSettings,
    #[validate(nested)]
    pub control_server: ControlServer,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "Heks".to_owned(),
            device: Device::default(),
            render: Render::default(),
            animation: Animation::default(),
            settings: LampSettings::default(),
            control_server: ControlServer::default(),
        }
    }
}

impl Config {
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn load_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        use tokio::io::AsyncReadExt;

        let mut file = tokio::fs::File::open(path).await?;
        let mut full = String::new();
        file.read_to_string(&mut full).await?;

        Self::from_toml(&full)
    }

    pub fn to_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
