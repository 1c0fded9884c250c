//! Planet parameters, preset persistence and application settings.
//!
//! [`PlanetParams`] is the single owned store of every tunable procedural
//! parameter. The [`codec`] module reads and writes it as preset files;
//! [`AppConfig`] holds the tool's own settings as RON, with CLI overrides via
//! clap.

mod cli;
pub mod codec;
mod error;
mod params;
mod settings;

pub use cli::CliArgs;
pub use codec::PresetFormat;
pub use error::{CodecError, ConfigError, FormatError};
pub use params::{
    GlobalParams, LightParams, NoiseAlgorithm, OceanParams, PlanetParams, Rgb, SkyParams,
    TerrainParams,
};
pub use settings::{AppConfig, DebugConfig, EditorConfig, RenderConfig, WindowConfig};
