//! Runtime configuration read from a TOML file.
//!
//! Every field has a default, so a config file only needs to mention what it
//! changes:
//!
//! ```toml
//! debug = true
//! channel = "normal"
//!
//! [window]
//! title = "deferred"
//!
//! [pacing]
//! mode = "limited"
//! fps = 60
//! ```

use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::{
    data_structures::gbuffer::{DEFAULT_GBUFFER_SIZE, GBufferChannel},
    flow::FramePacing,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "deferred-ngin".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GBufferConfig {
    pub width: u32,
    pub height: u32,
    pub clear_color: [f64; 4],
}

impl Default for GBufferConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_GBUFFER_SIZE[0],
            height: DEFAULT_GBUFFER_SIZE[1],
            clear_color: [0.0, 0.3, 0.4, 1.0],
        }
    }
}

impl GBufferConfig {
    pub fn size(&self) -> [u32; 2] {
        [self.width, self.height]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub clear_color: [f64; 4],
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
    /// World units per second.
    pub speed: f32,
    /// Radians per pixel of mouse motion.
    pub sensitivity: f32,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_deg: 45.0,
            near: 0.1,
            far: 100.0,
            speed: 4.0,
            sensitivity: 0.003,
            position: [0.0, 0.0, 5.0],
            rotation: [0.0, 0.0, 0.0],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub position: [f32; 3],
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            position: [4.0, 6.0, 6.0],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub gbuffer: GBufferConfig,
    pub screen: ScreenConfig,
    pub camera: CameraConfig,
    pub light: LightConfig,
    pub pacing: FramePacing,
    /// Enables debug logging.
    pub debug: bool,
    /// Channel visualized at startup.
    pub channel: GBufferChannel,
}

impl Config {
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Like [`Config::load`] but a missing file is `Ok(None)`.
    pub fn load_optional(path: impl AsRef<Path>) -> anyhow::Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        Self::load(path).map(Some)
    }

    /// Like [`Config::load`] but falls back to the defaults.
    ///
    /// Reports through `log`, so install a logger first or use
    /// [`crate::flow::run_with_config_file`].
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load_optional(path) {
            Ok(Some(config)) => config,
            Ok(None) => {
                log::info!("No config at {}, using defaults", path.display());
                Self::default()
            }
            Err(err) => {
                log::warn!("{:#}. Using defaults.", err);
                Self::default()
            }
        }
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string(self)?)
    }
}

pub(crate) fn to_color(rgba: [f64; 4]) -> wgpu::Color {
    wgpu::Color {
        r: rgba[0],
        g: rgba[1],
        b: rgba[2],
        a: rgba[3],
    }
}
