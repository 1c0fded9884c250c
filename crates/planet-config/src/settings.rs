//! Application settings with sensible defaults and RON persistence.
//!
//! These are the tool's own settings (window, fixed mesh resolutions, preset
//! slots, logging). Planet parameters live in presets, see [`crate::codec`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::codec::PresetFormat;
use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Window settings.
    pub window: WindowConfig,
    /// Rendering settings.
    pub render: RenderConfig,
    /// Preset slots and editing limits.
    pub editor: EditorConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Window configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Window width in logical pixels.
    pub width: u32,
    /// Window height in logical pixels.
    pub height: u32,
    /// Enable vsync (PresentMode::Fifo).
    pub vsync: bool,
    /// Window title.
    pub title: String,
}

/// Rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Tessellation of the ocean shell.
    pub ocean_segments: u32,
    /// Tessellation of the cloud shell.
    pub sky_segments: u32,
    /// Per-face tessellation of the starfield cube.
    pub background_segments: u32,
    /// Linear RGB clear color behind the starfield.
    pub clear_color: [f32; 3],
    /// Initial camera distance from the planet center.
    pub camera_distance: f32,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    /// Directory with WGSL overrides; enables shader hot reload (F6).
    pub shader_dir: Option<PathBuf>,
    /// World-space position of the planet center.
    pub planet_origin: [f32; 3],
}

/// Preset and editing configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    /// Preset directory override; the platform data directory is used when unset.
    pub preset_dir: Option<PathBuf>,
    /// File extension of preset slots, without the dot.
    pub preset_extension: String,
    /// Layout used when saving presets.
    pub save_format: PresetFormat,
    /// Preset loaded at startup, if any.
    pub startup_preset: Option<String>,
    /// Lowest terrain resolution the controls allow.
    pub min_segments: u32,
    /// Highest terrain resolution the controls allow.
    pub max_segments: u32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Warn once per program when a uniform write targets a name the shader lacks.
    pub warn_missing_uniforms: bool,
}

// --- Default implementations ---

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            vsync: true,
            title: "Procedural Planet Maker".to_string(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            ocean_segments: 96,
            sky_segments: 64,
            background_segments: 4,
            clear_color: [0.01, 0.01, 0.01],
            camera_distance: 3.0,
            fov_degrees: 45.0,
            shader_dir: None,
            planet_origin: [0.0; 3],
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            preset_dir: None,
            preset_extension: "planet".to_string(),
            save_format: PresetFormat::Positional,
            startup_preset: None,
            min_segments: 8,
            max_segments: 512,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            warn_missing_uniforms: cfg!(debug_assertions),
        }
    }
}

// --- Load / Save / Reload ---

impl AppConfig {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: AppConfig = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = AppConfig::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: AppConfig = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}
