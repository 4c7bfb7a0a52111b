//! Demo configuration
//!
//! Every section has defaults that reproduce the stock scene, so a config
//! file only needs to name the values it changes:
//!
//! ```toml
//! assets_dir = "assets"
//!
//! [window]
//! width = 1600
//! vsync = false
//!
//! [shadow]
//! resolution = 4096
//! ```

use std::{
    f32::consts::{FRAC_PI_2, FRAC_PI_4},
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Vantage".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
        }
    }
}

/// Fly camera parameters; the aspect ratio comes from the window.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    /// Vertical field of view in radians.
    pub fov: f32,
    pub near_clip: f32,
    pub far_clip: f32,
    /// World units per second.
    pub move_speed: f32,
    /// Radians per pixel of mouse movement.
    pub look_speed: f32,
    pub active: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, -5.0],
            fov: FRAC_PI_4,
            near_clip: 0.01,
            far_clip: 100.0,
            move_speed: 5.0,
            look_speed: 0.002,
            active: false,
        }
    }
}

impl CameraConfig {
    pub fn with_position(mut self, position: [f32; 3]) -> Self {
        self.position = position;
        self
    }

    pub fn with_fov(mut self, fov: f32) -> Self {
        self.fov = fov;
        self
    }

    pub fn with_move_speed(mut self, move_speed: f32) -> Self {
        self.move_speed = move_speed;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

/// Fixed orthographic shadow caster.
///
/// The light looks from `light_position` at `target`; the projection covers a
/// `projection_size` square between `near_clip` and `far_clip`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    pub resolution: u32,
    pub light_position: [f32; 3],
    pub target: [f32; 3],
    pub projection_size: f32,
    pub near_clip: f32,
    pub far_clip: f32,
    /// Constant depth bias in depth-buffer units.
    pub depth_bias: i32,
    pub slope_scaled_bias: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            resolution: 2048,
            light_position: [0.0, 20.0, -20.0],
            target: [0.0, 0.0, 0.0],
            projection_size: 28.0,
            near_clip: 1.0,
            far_clip: 100.0,
            depth_bias: 100,
            slope_scaled_bias: 1.0,
        }
    }
}

impl ShadowConfig {
    pub fn with_resolution(mut self, resolution: u32) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_light_position(mut self, light_position: [f32; 3]) -> Self {
        self.light_position = light_position;
        self
    }

    pub fn with_projection_size(mut self, projection_size: f32) -> Self {
        self.projection_size = projection_size;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub window: WindowConfig,
    /// Root for `models/`, `textures/` and `skies/`.
    pub assets_dir: PathBuf,
    pub background: [f32; 4],
    pub ambient: [f32; 3],
    pub shadow: ShadowConfig,
    pub cameras: Vec<CameraConfig>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            assets_dir: PathBuf::from("assets"),
            background: [0.4, 0.6, 0.75, 1.0],
            ambient: [0.1, 0.1, 0.25],
            shadow: ShadowConfig::default(),
            cameras: vec![
                CameraConfig::default()
                    .with_position([-3.0, 2.0, -20.0])
                    .with_active(true),
                CameraConfig::default()
                    .with_position([1.5, 0.0, -3.0])
                    .with_fov(FRAC_PI_2)
                    .with_move_speed(3.0),
                CameraConfig::default()
                    .with_position([0.0, 2.0, -5.0])
                    .with_fov(FRAC_PI_2)
                    .with_move_speed(3.0),
            ],
        }
    }
}

impl DemoConfig {
    /// Reads and parses a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn with_assets_dir(mut self, assets_dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = assets_dir.into();
        self
    }

    pub fn with_shadow(mut self, shadow: ShadowConfig) -> Self {
        self.shadow = shadow;
        self
    }

    pub fn with_cameras(mut self, cameras: Vec<CameraConfig>) -> Self {
        self.cameras = cameras;
        self
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.window.width.max(1) as f32 / self.window.height.max(1) as f32
    }
}
