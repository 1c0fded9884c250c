//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::AppConfig;

/// Planet Maker command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "planet-maker", about = "Procedural Planet Maker")]
pub struct CliArgs {
    /// Window width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Preset slot to load at startup.
    #[arg(long)]
    pub preset: Option<String>,

    /// Directory holding preset slots.
    #[arg(long)]
    pub preset_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(w) = args.width {
            self.window.width = w;
        }
        if let Some(h) = args.height {
            self.window.height = h;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
        if let Some(ref preset) = args.preset {
            self.editor.startup_preset = Some(preset.clone());
        }
        if let Some(ref dir) = args.preset_dir {
            self.editor.preset_dir = Some(dir.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = AppConfig::default();
        let args = CliArgs::parse_from([
            "planet-maker",
            "--width",
            "1920",
            "--preset",
            "mars",
            "--preset-dir",
            "/srv/presets",
        ]);
        config.apply_cli_overrides(&args);
        assert_eq!(config.window.width, 1920);
        assert_eq!(config.editor.startup_preset.as_deref(), Some("mars"));
        assert_eq!(config.editor.preset_dir, Some(PathBuf::from("/srv/presets")));
        // Non-overridden fields retain defaults
        assert_eq!(config.window.height, 720);
        assert_eq!(config.debug.log_level, "info");
    }

    #[test]
    fn test_cli_no_override() {
        let original = AppConfig::default();
        let mut config = AppConfig::default();
        let args = CliArgs::parse_from(["planet-maker"]);
        config.apply_cli_overrides(&args);
        assert_eq!(config, original);
    }
}
