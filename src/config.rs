//! Application configuration
//!
//! Configuration is loaded from multiple sources with the following priority (lowest to highest):
//! 1. `config/default.toml` (version controlled)
//! 2. `config/user.toml` (gitignored, user overrides)
//! 3. Environment variables (`TETVOL_SECTION__KEY`)

use figment::{Figment, providers::{Format, Toml, Env}};
use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tetvol_core::{Encoding, Method, RendererConfig};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Renderer behavior switches
    #[serde(default)]
    pub renderer: RendererConfig,
    /// Synthetic mesh generation
    #[serde(default)]
    pub mesh: MeshConfig,
    /// Orbit camera
    #[serde(default)]
    pub camera: CameraConfig,
    /// Off-screen output
    #[serde(default)]
    pub output: OutputConfig,
    /// Methods to configure and render, in order
    #[serde(default = "default_methods")]
    pub methods: Vec<Method>,
    /// Per-method encoding overrides, keyed by method name
    ///
    /// Entries are laid over the method's default encoding.
    #[serde(default)]
    pub encodings: BTreeMap<String, Encoding>,
    /// Debug configuration
    #[serde(default)]
    pub debug: DebugConfig,
}

fn default_methods() -> Vec<Method> {
    Method::ALL.to_vec()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            renderer: RendererConfig::default(),
            mesh: MeshConfig::default(),
            camera: CameraConfig::default(),
            output: OutputConfig::default(),
            methods: default_methods(),
            encodings: BTreeMap::new(),
            debug: DebugConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from default locations
    ///
    /// Priority (lowest to highest):
    /// 1. `config/default.toml`
    /// 2. `config/user.toml`
    /// 3. Environment variables (`TETVOL_*`)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific config directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        let default_path = config_dir.join("default.toml");
        let user_path = config_dir.join("user.toml");

        let mut figment = Figment::new();

        if default_path.exists() {
            figment = figment.merge(Toml::file(&default_path));
        }

        if user_path.exists() {
            figment = figment.merge(Toml::file(&user_path));
        }

        // TETVOL_OUTPUT__WIDTH=320 -> output.width = 320
        figment = figment.merge(Env::prefixed("TETVOL_").split("__"));

        let config: Self = figment.extract().map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject encoding overrides for methods outside the catalog
    pub fn validate(&self) -> Result<(), ConfigError> {
        for name in self.encodings.keys() {
            name.parse::<Method>().map_err(|e| ConfigError::new(e.to_string()))?;
        }
        if self.output.width == 0 || self.output.height == 0 {
            return Err(ConfigError::new(format!(
                "output size {}x{} is empty",
                self.output.width, self.output.height
            )));
        }
        Ok(())
    }

    /// Encoding to configure `method` with
    ///
    /// `None` leaves the choice to the renderer's default encoding.
    pub fn encoding_for(&self, method: Method) -> Option<Encoding> {
        self.encodings
            .get(method.as_str())
            .map(|overrides| method.properties().default_encoding().merged(overrides))
    }
}

/// Synthetic mesh configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// Cubes along each axis, each split into six tetrahedra
    pub resolution: u32,
    /// Entries in the generated density and emission lookup tables
    pub lut_size: u32,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            resolution: 8,
            lut_size: 64,
        }
    }
}

/// Orbit camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Rotation around the vertical axis in degrees
    pub yaw: f32,
    /// Elevation above the horizontal plane in degrees
    pub pitch: f32,
    /// Distance from the orbit center
    pub distance: f32,
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
    /// Yaw change between animation frames in degrees
    pub orbit_step: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            yaw: 35.0,
            pitch: 25.0,
            distance: 2.5,
            fov: 45.0,
            near: 0.1,
            far: 100.0,
            orbit_step: 10.0,
        }
    }
}

/// Off-screen output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Clear color (RGBA)
    pub clear_color: [f32; 4],
    /// Directory receiving one image per method and frame
    pub directory: PathBuf,
    /// Frames rendered per method
    pub frames: u32,
    /// Scene time between frames in seconds
    pub frame_interval: f32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            clear_color: [0.02, 0.02, 0.08, 1.0],
            directory: PathBuf::from("output"),
            frames: 1,
            frame_interval: 1.0 / 30.0,
        }
    }
}

/// Debug configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Configuration error
#[derive(Debug)]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    fn new(message: impl Into<String>) -> Self {
        ConfigError { message: message.into() }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError {
            message: e.to_string(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}
