//! The editing surface the controls drive.
//!
//! [`PlanetEditor`] owns the [`PlanetParams`] store and the preset slots. Every
//! file operation logs its failure and returns; none of them stop the frame
//! loop, and a failed load leaves the current parameters untouched.

use std::path::{Path, PathBuf};

use planet_config::codec;
use planet_config::{EditorConfig, NoiseAlgorithm, PlanetParams, PresetFormat};
use tracing::{debug, error, info, warn};

/// Seed range offered by the seed controls.
pub const SEED_RANGE: std::ops::RangeInclusive<i32> = -10_000..=10_000;

/// Inclination limit in degrees.
pub const MAX_INCLINATION_DEG: f32 = 90.0;

/// Parameter store plus the preset slots it is saved to.
#[derive(Debug, Clone)]
pub struct PlanetEditor {
    params: PlanetParams,
    preset_dir: PathBuf,
    extension: String,
    save_format: PresetFormat,
    pending_segments: Option<u32>,
    min_segments: u32,
    max_segments: u32,
}

impl PlanetEditor {
    pub fn new(preset_dir: impl Into<PathBuf>, config: &EditorConfig) -> Self {
        let min_segments = config.min_segments.max(planet_mesh::MIN_SPHERE_SEGMENTS);
        Self {
            params: PlanetParams::default(),
            preset_dir: preset_dir.into(),
            extension: config.preset_extension.clone(),
            save_format: config.save_format,
            pending_segments: None,
            min_segments,
            max_segments: config
                .max_segments
                .clamp(min_segments, planet_mesh::MAX_SPHERE_SEGMENTS),
        }
    }

    pub fn params(&self) -> &PlanetParams {
        &self.params
    }

    /// Direct write access to every parameter.
    pub fn params_mut(&mut self) -> &mut PlanetParams {
        &mut self.params
    }

    pub fn preset_dir(&self) -> &Path {
        &self.preset_dir
    }

    pub fn segment_range(&self) -> (u32, u32) {
        (self.min_segments, self.max_segments)
    }

    fn slot_path(&self, name: &str) -> PathBuf {
        codec::preset_path(&self.preset_dir, name, &self.extension)
    }

    /// Write the current parameters to slot `name`. Returns whether the file
    /// was written.
    pub fn save(&self, name: &str) -> bool {
        let path = self.slot_path(name);
        if let Err(e) = std::fs::create_dir_all(&self.preset_dir) {
            error!(
                "Cannot create preset directory {}: {e}",
                self.preset_dir.display()
            );
            return false;
        }
        match codec::save_with(&path, &self.params, self.save_format) {
            Ok(()) => {
                info!("Saved preset '{name}' to {}", path.display());
                true
            }
            Err(e) => {
                error!("Failed to save preset '{name}': {e}");
                false
            }
        }
    }

    /// Replace the current parameters with slot `name`. On failure the
    /// parameters are unchanged. A terrain resolution outside
    /// [`segment_range`](Self::segment_range) is clamped into it.
    pub fn load(&mut self, name: &str) -> bool {
        let path = self.slot_path(name);
        let previous_segments = self.params.terrain.segments;
        match codec::load(&path, &mut self.params) {
            Ok(format) => {
                info!("Loaded {format:?} preset '{name}' from {}", path.display());
                self.pending_segments = None;
                let segments = self.params.terrain.segments;
                let clamped = segments.clamp(self.min_segments, self.max_segments);
                if clamped != segments {
                    warn!(
                        "Preset '{name}' terrain resolution {segments} outside {}..={}, using {clamped}",
                        self.min_segments, self.max_segments
                    );
                    self.params.terrain.segments = clamped;
                }
                if self.params.terrain.segments != previous_segments {
                    info!(
                        "Terrain resolution changed {previous_segments} -> {}, mesh rebuilds next frame",
                        self.params.terrain.segments
                    );
                }
                true
            }
            Err(e) => {
                error!("Failed to load preset '{name}': {e}");
                false
            }
        }
    }

    /// File names of the saved slots, sorted.
    pub fn list_files(&self) -> Vec<String> {
        codec::list_matching_files(&self.preset_dir, &self.extension)
    }

    /// Record a terrain resolution without applying it. Returns the clamped
    /// pending value.
    pub fn preview_segments(&mut self, segments: u32) -> u32 {
        let clamped = segments.clamp(self.min_segments, self.max_segments);
        self.pending_segments = Some(clamped);
        clamped
    }

    /// Preview a resolution `delta` steps from the pending (or current) one.
    pub fn step_segments(&mut self, delta: i32) -> u32 {
        let base = self.pending_segments.unwrap_or(self.params.terrain.segments);
        self.preview_segments(base.saturating_add_signed(delta))
    }

    pub fn pending_segments(&self) -> Option<u32> {
        self.pending_segments
    }

    /// Apply the pending resolution. Returns whether the terrain resolution
    /// changed.
    pub fn commit_segments(&mut self) -> bool {
        let Some(segments) = self.pending_segments.take() else {
            return false;
        };
        if segments == self.params.terrain.segments {
            return false;
        }
        debug!(
            "Terrain resolution {} -> {segments}",
            self.params.terrain.segments
        );
        self.params.terrain.segments = segments;
        true
    }

    pub fn set_algorithm(&mut self, algorithm: NoiseAlgorithm) {
        if !self.params.global.is_active(algorithm) {
            info!("Noise algorithm: {}", algorithm.label());
            self.params.global.set_active(algorithm);
        }
    }

    /// Returns the new ocean state.
    pub fn toggle_ocean(&mut self) -> bool {
        self.params.ocean.enabled = !self.params.ocean.enabled;
        self.params.ocean.enabled
    }

    /// Returns the new sky state.
    pub fn toggle_sky(&mut self) -> bool {
        self.params.sky.enabled = !self.params.sky.enabled;
        self.params.sky.enabled
    }

    /// Rotate the planet. Azimuth wraps into `[0, 360)`, inclination is
    /// clamped to `[-90, 90]`.
    pub fn rotate(&mut self, d_azimuth_deg: f32, d_inclination_deg: f32) {
        let global = &mut self.params.global;
        global.azimuth_deg = (global.azimuth_deg + d_azimuth_deg).rem_euclid(360.0);
        global.inclination_deg = (global.inclination_deg + d_inclination_deg)
            .clamp(-MAX_INCLINATION_DEG, MAX_INCLINATION_DEG);
    }

    /// Shift the terrain seed, staying inside [`SEED_RANGE`].
    pub fn step_seed(&mut self, delta: i32) -> i32 {
        let seed = self
            .params
            .terrain
            .seed
            .saturating_add(delta)
            .clamp(*SEED_RANGE.start(), *SEED_RANGE.end());
        self.params.terrain.seed = seed;
        seed
    }

    /// Restore every parameter to its default.
    pub fn reset(&mut self) {
        self.params.reset();
        self.pending_segments = None;
        info!("Parameters reset to defaults");
    }
}
