//! The binary entry point for Planet Maker.

use clap::Parser;
use planet_app::{PlanetEditor, PlatformDirs, window};
use planet_config::{AppConfig, CliArgs};

fn main() {
    let cli = CliArgs::parse();

    let dirs = match PlatformDirs::resolve_and_create() {
        Ok(dirs) => dirs,
        Err(e) => {
            eprintln!("Failed to initialize platform directories: {e}");
            std::process::exit(1);
        }
    };

    let config_dir = cli.config.clone().unwrap_or_else(|| dirs.config_dir.clone());
    let mut config = match AppConfig::load_or_create(&config_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error ({}), using defaults: {e}", config_dir.display());
            AppConfig::default()
        }
    };
    config.apply_cli_overrides(&cli);

    planet_log::init_logging(Some(&dirs.log_dir), cfg!(debug_assertions), Some(&config));

    let preset_dir = config
        .editor
        .preset_dir
        .clone()
        .unwrap_or_else(|| dirs.presets_dir());
    tracing::info!("Presets: {}", preset_dir.display());

    let mut editor = PlanetEditor::new(preset_dir, &config.editor);
    if let Some(name) = config.editor.startup_preset.clone() {
        editor.load(&name);
    }

    if let Err(e) = window::run(config, config_dir, editor) {
        tracing::error!("Event loop failed: {e}");
        std::process::exit(1);
    }
}
