use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ExportError, Result};

/// Environment variable that overrides [`PathsConfig::body_model_dir`].
///
/// Only read by [`Config::apply_env_overrides`], which the binary calls once at
/// startup. Nothing inside the pipeline consults the environment.
pub const BODY_MODEL_DIR_ENV: &str = "SMPLX_MODEL_DIR";

/// Main configuration for retarget-render
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Filesystem locations
    pub paths: PathsConfig,

    /// Video rendering defaults
    pub render: RenderSettings,

    /// Trajectory and table export settings
    pub export: ExportConfig,

    /// Camera tracking profile per robot, keyed by robot identifier
    pub robots: BTreeMap<String, RobotProfile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            render: RenderSettings::default(),
            export: ExportConfig::default(),
            robots: default_robot_profiles(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply process environment overrides. Call once, before the config is
    /// handed to the service.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Some(dir) = std::env::var_os(BODY_MODEL_DIR_ENV) {
            self.paths.body_model_dir = PathBuf::from(dir);
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.render.validate()?;
        self.export.validate()?;

        if self.robots.is_empty() {
            return Err(ConfigError::MissingKey { key: "robots".to_string() }.into());
        }

        for (name, profile) in &self.robots {
            profile.validate(name)?;
        }

        if !self.robots.contains_key(&self.export.default_robot) {
            return Err(ConfigError::InvalidValue {
                key: "export.default_robot".to_string(),
                value: self.export.default_robot.clone()
            }.into());
        }

        Ok(())
    }

    /// Look up the camera profile of a robot
    pub fn robot_profile(&self, robot: &str) -> Result<&RobotProfile> {
        self.robots.get(robot).ok_or_else(|| {
            let known: Vec<&str> = self.robots.keys().map(String::as_str).collect();
            ExportError::invalid_configuration(format!(
                "unknown robot '{}'. Configured robots: {}",
                robot,
                known.join(", ")
            ))
        })
    }
}

/// Filesystem locations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathsConfig {
    /// Directory holding the SMPL-X body model files
    pub body_model_dir: PathBuf,

    /// Directory receiving generated artifacts, shared by all requests
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            body_model_dir: PathBuf::from("assets/body_models"),
            output_dir: PathBuf::from("videos"),
        }
    }
}

/// Video rendering defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderSettings {
    /// Default output width in pixels
    pub width: u32,

    /// Default output height in pixels
    pub height: u32,

    /// Camera elevation in degrees (negative looks down)
    pub camera_elevation: f64,

    /// Camera azimuth in degrees
    pub camera_azimuth: f64,

    /// Vertical field of view of the tracking camera in degrees
    pub fov_y: f64,

    /// Encoder binary invoked for mp4 output
    pub ffmpeg_binary: String,

    /// Video codec passed to the encoder
    pub codec: String,

    /// Quality setting (0-100, higher is better)
    pub quality: u8,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 540,
            height: 960,
            camera_elevation: -10.0,
            camera_azimuth: 270.0,
            fov_y: 45.0,
            ffmpeg_binary: "ffmpeg".to_string(),
            codec: "libx264".to_string(),
            quality: 85,
        }
    }
}

impl RenderSettings {
    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidValue {
                key: "render.size".to_string(),
                value: format!("{}x{}", self.width, self.height)
            }.into());
        }

        if !(1.0..180.0).contains(&self.fov_y) {
            return Err(ConfigError::InvalidValue {
                key: "render.fov_y".to_string(),
                value: self.fov_y.to_string()
            }.into());
        }

        if self.quality > 100 {
            return Err(ConfigError::InvalidValue {
                key: "render.quality".to_string(),
                value: self.quality.to_string()
            }.into());
        }

        Ok(())
    }
}

/// Trajectory and table export settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportConfig {
    /// Frame rate the source motion is resampled to
    pub target_fps: u32,

    /// Robot used when a request does not name one
    pub default_robot: String,

    /// The only robot whose joint layout the CSV export understands
    pub csv_robot: String,

    /// Joint count the CSV layout expects for `csv_robot`
    pub csv_dof: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            target_fps: 30,
            default_robot: "unitree_g1".to_string(),
            csv_robot: "unitree_g1".to_string(),
            csv_dof: 29,
        }
    }
}

impl ExportConfig {
    fn validate(&self) -> Result<()> {
        if self.target_fps == 0 {
            return Err(ConfigError::InvalidValue {
                key: "export.target_fps".to_string(),
                value: self.target_fps.to_string()
            }.into());
        }

        if self.csv_dof == 0 {
            return Err(ConfigError::InvalidValue {
                key: "export.csv_dof".to_string(),
                value: self.csv_dof.to_string()
            }.into());
        }

        Ok(())
    }
}

/// How the tracking camera follows one robot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RobotProfile {
    /// Body the camera looks at every frame
    pub base_link: String,

    /// Camera distance from the base link in meters
    pub camera_distance: f64,
}

impl RobotProfile {
    pub fn new<S: Into<String>>(base_link: S, camera_distance: f64) -> Self {
        Self { base_link: base_link.into(), camera_distance }
    }

    fn validate(&self, robot: &str) -> Result<()> {
        if self.base_link.trim().is_empty() {
            return Err(ConfigError::MissingKey {
                key: format!("robots.{}.base_link", robot)
            }.into());
        }

        if !(self.camera_distance.is_finite() && self.camera_distance > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: format!("robots.{}.camera_distance", robot),
                value: self.camera_distance.to_string()
            }.into());
        }

        Ok(())
    }
}

fn default_robot_profiles() -> BTreeMap<String, RobotProfile> {
    [
        ("unitree_g1", RobotProfile::new("pelvis", 2.0)),
        ("unitree_g1_with_hands", RobotProfile::new("pelvis", 2.0)),
        ("unitree_h1", RobotProfile::new("pelvis", 3.0)),
        ("booster_t1", RobotProfile::new("Waist", 2.0)),
        ("fourier_n1", RobotProfile::new("base_link", 2.0)),
    ]
    .into_iter()
    .map(|(name, profile)| (name.to_string(), profile))
    .collect()
}
