//! Procedural planet parameters, grouped by the subsystem that consumes them.
//!
//! [`PlanetParams`] is plain mutable state: the UI writes fields directly, the
//! codec overwrites it on load, and the renderer reads it every frame. No
//! field is validated or clamped here.

use serde::{Deserialize, Serialize};

/// RGB color with each channel nominally in `[0, 1]`.
pub type Rgb = [f32; 3];

/// The procedural noise function driving terrain, ocean and clouds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoiseAlgorithm {
    #[default]
    Perlin,
    Simplex,
    Worley,
}

impl NoiseAlgorithm {
    /// Every algorithm, in persisted index order.
    pub const ALL: [NoiseAlgorithm; 3] = [Self::Perlin, Self::Simplex, Self::Worley];

    /// Stable index used by the preset file and the shader uniform.
    pub fn index(self) -> u32 {
        match self {
            Self::Perlin => 0,
            Self::Simplex => 1,
            Self::Worley => 2,
        }
    }

    /// Inverse of [`index`](Self::index).
    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Human-readable name for menus and log lines.
    pub fn label(self) -> &'static str {
        match self {
            Self::Perlin => "Perlin Noise",
            Self::Simplex => "Simplex Noise",
            Self::Worley => "Cell Noise",
        }
    }
}

/// Settings shared by every pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalParams {
    /// The single active noise algorithm.
    pub algorithm: NoiseAlgorithm,
    /// Rotation around the vertical axis, degrees.
    pub azimuth_deg: f32,
    /// Tilt around the horizontal axis, degrees.
    pub inclination_deg: f32,
}

impl GlobalParams {
    /// Whether `algorithm` is the active one.
    pub fn is_active(&self, algorithm: NoiseAlgorithm) -> bool {
        self.algorithm == algorithm
    }

    /// Activate `algorithm`; the other two read as inactive afterwards.
    pub fn set_active(&mut self, algorithm: NoiseAlgorithm) {
        self.algorithm = algorithm;
    }

    /// Azimuth in radians, derived from the degree value on every call.
    pub fn azimuth_rad(&self) -> f32 {
        self.azimuth_deg.to_radians()
    }

    /// Inclination in radians, derived from the degree value on every call.
    pub fn inclination_rad(&self) -> f32 {
        self.inclination_deg.to_radians()
    }
}

/// Terrain sphere: resolution, displacement and the elevation palette.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainParams {
    /// Sphere tessellation; keys the terrain mesh cache.
    pub segments: u32,
    pub octaves: i32,
    pub seed: i32,
    pub radius: f32,
    /// Displacement amplitude relative to `radius`.
    pub elevation: f32,
    /// Frequency of the vertex displacement noise.
    pub vert_frequency: f32,
    /// Frequency of the color blend noise.
    pub frag_frequency: f32,
    pub color_deep: Rgb,
    pub color_beach: Rgb,
    pub color_grass: Rgb,
    pub color_rock: Rgb,
    pub color_snow: Rgb,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            segments: 128,
            octaves: 6,
            seed: 0,
            radius: 1.0,
            elevation: 0.1,
            vert_frequency: 1.5,
            frag_frequency: 4.0,
            color_deep: [0.05, 0.1, 0.3],
            color_beach: [0.76, 0.7, 0.5],
            color_grass: [0.2, 0.5, 0.15],
            color_rock: [0.4, 0.35, 0.3],
            color_snow: [0.95, 0.95, 0.97],
        }
    }
}

/// Ocean shell drawn at the terrain radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OceanParams {
    pub enabled: bool,
    pub frequency: f32,
    pub octaves: i32,
    pub seed: i32,
    pub color_1: Rgb,
    pub color_2: Rgb,
}

impl Default for OceanParams {
    fn default() -> Self {
        Self {
            enabled: true,
            frequency: 8.0,
            octaves: 4,
            seed: 0,
            color_1: [0.0, 0.2, 0.45],
            color_2: [0.0, 0.45, 0.6],
        }
    }
}

/// Animated cloud shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyParams {
    pub enabled: bool,
    pub frequency: f32,
    pub octaves: i32,
    pub seed: i32,
    pub opacity: f32,
    pub color: Rgb,
    /// Cloud drift in radians per second.
    pub speed: f32,
}

impl Default for SkyParams {
    fn default() -> Self {
        Self {
            enabled: true,
            frequency: 3.0,
            octaves: 5,
            seed: 0,
            opacity: 0.5,
            color: [1.0, 1.0, 1.0],
            speed: 0.05,
        }
    }
}

/// Point light used by the lit passes. Only the keyed preset format stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightParams {
    pub position: [f32; 3],
    pub intensity: f32,
    pub shininess: f32,
}

impl Default for LightParams {
    fn default() -> Self {
        Self {
            position: [5.0, 3.0, 5.0],
            intensity: 1.0,
            shininess: 32.0,
        }
    }
}

/// Every tunable parameter of the planet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanetParams {
    pub global: GlobalParams,
    pub terrain: TerrainParams,
    pub ocean: OceanParams,
    pub sky: SkyParams,
    pub light: LightParams,
}

impl PlanetParams {
    /// Restore every field to its default.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setting_one_algorithm_clears_the_others() {
        let mut global = GlobalParams::default();
        for chosen in NoiseAlgorithm::ALL {
            global.set_active(chosen);
            for other in NoiseAlgorithm::ALL {
                assert_eq!(global.is_active(other), other == chosen);
            }
        }
    }

    #[test]
    fn test_algorithm_index_roundtrip() {
        for alg in NoiseAlgorithm::ALL {
            assert_eq!(NoiseAlgorithm::from_index(alg.index()), Some(alg));
        }
        assert_eq!(NoiseAlgorithm::from_index(3), None);
    }

    #[test]
    fn test_radians_follow_degrees() {
        let mut global = GlobalParams::default();
        global.azimuth_deg = 180.0;
        assert!((global.azimuth_rad() - std::f32::consts::PI).abs() < 1e-6);

        global.azimuth_deg = 90.0;
        global.inclination_deg = -45.0;
        assert!((global.azimuth_rad() - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert!((global.inclination_rad() + std::f32::consts::FRAC_PI_4).abs() < 1e-6);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut params = PlanetParams::default();
        params.terrain.segments = 12;
        params.ocean.enabled = false;
        params.global.set_active(NoiseAlgorithm::Worley);
        params.reset();
        assert_eq!(params, PlanetParams::default());
    }

    #[test]
    fn test_default_colors_in_unit_range() {
        let p = PlanetParams::default();
        let colors = [
            p.terrain.color_deep,
            p.terrain.color_beach,
            p.terrain.color_grass,
            p.terrain.color_rock,
            p.terrain.color_snow,
            p.ocean.color_1,
            p.ocean.color_2,
            p.sky.color,
        ];
        for c in colors.iter().flatten() {
            assert!((0.0..=1.0).contains(c));
        }
        assert!((0.0..=1.0).contains(&p.sky.opacity));
    }
}
