//! Per-frame pass sequencing.
//!
//! A frame runs background, terrain, ocean and sky in that order. Each pass
//! binds its program, uploads the shared matrices and its slice of
//! [`PlanetParams`] by uniform name, then draws its cached mesh. Ocean and sky
//! are skipped outright when disabled: no mesh lookup, no uploads, no draw.

use glam::{Mat4, Vec3};
use planet_config::{GlobalParams, PlanetParams, RenderConfig};
use planet_mesh::{MeshCache, MeshShape, MeshUploader};

use crate::uniform::UniformValue;

/// One bind-and-draw cycle of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    Background,
    Terrain,
    Ocean,
    Sky,
}

impl PassKind {
    /// Fixed per-frame order.
    pub const ORDER: [PassKind; 4] = [
        PassKind::Background,
        PassKind::Terrain,
        PassKind::Ocean,
        PassKind::Sky,
    ];

    pub fn index(self) -> usize {
        match self {
            PassKind::Background => 0,
            PassKind::Terrain => 1,
            PassKind::Ocean => 2,
            PassKind::Sky => 3,
        }
    }

    /// Program name; also the shader file stem.
    pub fn name(self) -> &'static str {
        match self {
            PassKind::Background => "background",
            PassKind::Terrain => "terrain",
            PassKind::Ocean => "ocean",
            PassKind::Sky => "sky",
        }
    }

    pub fn shape(self) -> MeshShape {
        match self {
            PassKind::Background => MeshShape::Cube,
            _ => MeshShape::Sphere,
        }
    }

    /// Whether this pass runs for the given parameters.
    pub fn is_enabled(self, params: &PlanetParams) -> bool {
        match self {
            PassKind::Ocean => params.ocean.enabled,
            PassKind::Sky => params.sky.enabled,
            PassKind::Background | PassKind::Terrain => true,
        }
    }

    /// Whether the pass is drawn with the planet model transform.
    pub fn uses_model(self) -> bool {
        !matches!(self, PassKind::Background)
    }
}

/// GPU seam driven by the orchestrator once per pass.
pub trait RenderBackend {
    /// Mesh handle type the backend can draw.
    type Mesh;

    /// Make `pass`'s program current.
    fn bind_program(&mut self, pass: PassKind);

    /// Set a uniform of the bound program. Returns `false` when the program
    /// exposes no uniform of that name and type.
    fn set_uniform(&mut self, name: &str, value: UniformValue) -> bool;

    /// Draw `mesh` with the bound program.
    fn draw(&mut self, mesh: &Self::Mesh);
}

/// Camera and clock inputs for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    pub projection: Mat4,
    pub view: Mat4,
    /// Seconds since startup, drives cloud and star animation.
    pub time: f32,
}

/// What a frame did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStats {
    /// Passes drawn, in order.
    pub passes: Vec<PassKind>,
    /// Uniform writes attempted.
    pub uniforms_uploaded: usize,
    /// Uniform writes the bound program did not accept.
    pub missed_uniforms: usize,
    /// Mesh rebuilds triggered by this frame.
    pub mesh_rebuilds: u64,
}

/// Tessellation of the meshes whose resolution is not a planet parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassResolutions {
    pub background: u32,
    pub ocean: u32,
    pub sky: u32,
}

impl From<&RenderConfig> for PassResolutions {
    fn from(config: &RenderConfig) -> Self {
        Self {
            background: config.background_segments,
            ocean: config.ocean_segments,
            sky: config.sky_segments,
        }
    }
}

/// Planet model transform: rotate about X by inclination, then about Y by
/// azimuth, then translate to `origin`.
pub fn model_matrix(global: &GlobalParams, origin: Vec3) -> Mat4 {
    Mat4::from_translation(origin)
        * Mat4::from_rotation_y(global.azimuth_rad())
        * Mat4::from_rotation_x(global.inclination_rad())
}

/// Counts uploads and misses while forwarding to the backend.
struct PassUniforms<'a, B> {
    backend: &'a mut B,
    stats: &'a mut FrameStats,
}

impl<B: RenderBackend> PassUniforms<'_, B> {
    fn set(&mut self, name: &str, value: impl Into<UniformValue>) {
        self.stats.uniforms_uploaded += 1;
        if !self.backend.set_uniform(name, value.into()) {
            self.stats.missed_uniforms += 1;
        }
    }
}

/// Upload the uniforms `pass` reads. Names match the parameter fields.
fn upload_pass_uniforms<B: RenderBackend>(
    pass: PassKind,
    params: &PlanetParams,
    frame: &FrameInput,
    model: Mat4,
    out: &mut PassUniforms<'_, B>,
) {
    out.set("P", frame.projection);
    out.set("V", frame.view);
    if pass.uses_model() {
        out.set("M", model);
        out.set("noise_algorithm", params.global.algorithm.index());
    }

    let light = &params.light;
    match pass {
        PassKind::Background => {
            out.set("time", frame.time);
        }
        PassKind::Terrain => {
            let t = &params.terrain;
            out.set("octaves", t.octaves);
            out.set("seed", t.seed);
            out.set("radius", t.radius);
            out.set("elevation", t.elevation);
            out.set("vert_frequency", t.vert_frequency);
            out.set("frag_frequency", t.frag_frequency);
            out.set("color_deep", t.color_deep);
            out.set("color_beach", t.color_beach);
            out.set("color_grass", t.color_grass);
            out.set("color_rock", t.color_rock);
            out.set("color_snow", t.color_snow);
            out.set("light_position", light.position);
            out.set("light_intensity", light.intensity);
            out.set("shininess", light.shininess);
        }
        PassKind::Ocean => {
            let o = &params.ocean;
            out.set("radius", params.terrain.radius);
            out.set("frequency", o.frequency);
            out.set("octaves", o.octaves);
            out.set("seed", o.seed);
            out.set("color_1", o.color_1);
            out.set("color_2", o.color_2);
            out.set("light_position", light.position);
            out.set("light_intensity", light.intensity);
            out.set("shininess", light.shininess);
            out.set("time", frame.time);
        }
        PassKind::Sky => {
            let s = &params.sky;
            out.set("radius", params.terrain.radius);
            out.set("frequency", s.frequency);
            out.set("octaves", s.octaves);
            out.set("seed", s.seed);
            out.set("opacity", s.opacity);
            out.set("color", s.color);
            out.set("speed", s.speed);
            out.set("light_position", light.position);
            out.set("light_intensity", light.intensity);
            out.set("time", frame.time);
        }
    }
}

/// Owns the per-pass mesh caches and drives a [`RenderBackend`] each frame.
pub struct RenderOrchestrator<U: MeshUploader> {
    uploader: U,
    caches: [MeshCache<U::Handle>; 4],
    resolutions: PassResolutions,
    origin: Vec3,
}

impl<U: MeshUploader> RenderOrchestrator<U> {
    pub fn new(uploader: U, resolutions: PassResolutions) -> Self {
        let caches = PassKind::ORDER.map(|pass| MeshCache::new(pass.name(), pass.shape()));
        Self {
            uploader,
            caches,
            resolutions,
            origin: Vec3::ZERO,
        }
    }

    pub fn uploader(&self) -> &U {
        &self.uploader
    }

    pub fn cache(&self, pass: PassKind) -> &MeshCache<U::Handle> {
        &self.caches[pass.index()]
    }

    /// Take fixed-pass resolutions and the planet origin from `config`.
    /// Caches rebuild lazily on the next frame that draws them.
    pub fn apply_config(&mut self, config: &RenderConfig) {
        self.resolutions = PassResolutions::from(config);
        self.origin = Vec3::from(config.planet_origin);
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Mesh resolution a pass is drawn at.
    pub fn resolution_for(&self, pass: PassKind, params: &PlanetParams) -> u32 {
        match pass {
            PassKind::Background => self.resolutions.background,
            PassKind::Terrain => params.terrain.segments,
            PassKind::Ocean => self.resolutions.ocean,
            PassKind::Sky => self.resolutions.sky,
        }
    }

    /// Record one frame into `backend`.
    pub fn render_frame<B>(
        &mut self,
        params: &PlanetParams,
        frame: &FrameInput,
        backend: &mut B,
    ) -> FrameStats
    where
        B: RenderBackend<Mesh = U::Handle>,
    {
        let model = model_matrix(&params.global, self.origin);
        let mut stats = FrameStats::default();

        for pass in PassKind::ORDER {
            if !pass.is_enabled(params) {
                continue;
            }

            let resolution = self.resolution_for(pass, params);
            let cache = &mut self.caches[pass.index()];
            let builds_before = cache.builds();
            let mesh = cache.get_or_build(&mut self.uploader, resolution);

            backend.bind_program(pass);
            let mut uniforms = PassUniforms {
                backend: &mut *backend,
                stats: &mut stats,
            };
            upload_pass_uniforms(pass, params, frame, model, &mut uniforms);
            backend.draw(mesh);

            stats.passes.push(pass);
            stats.mesh_rebuilds += self.caches[pass.index()].builds() - builds_before;
        }

        stats
    }

    /// Release every cached mesh.
    pub fn shutdown(&mut self) {
        for cache in &mut self.caches {
            cache.clear(&mut self.uploader);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{
        BACKGROUND_SOURCE, NOISE_PRELUDE, OCEAN_SOURCE, SKY_SOURCE, TERRAIN_SOURCE, compose,
    };
    use crate::uniform::{UniformBlock, UniformLayout};
    use planet_mesh::MeshData;

    #[derive(Default)]
    struct CountingUploader {
        next_id: u32,
        vertex_counts: Vec<usize>,
        released: Vec<u32>,
    }

    impl MeshUploader for CountingUploader {
        type Handle = u32;

        fn upload(&mut self, _label: &str, mesh: &MeshData) -> u32 {
            self.next_id += 1;
            self.vertex_counts.push(mesh.vertex_count());
            self.next_id
        }

        fn release(&mut self, handle: u32) {
            self.released.push(handle);
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Bind(PassKind),
        Uniform(PassKind, String, UniformValue),
        Draw(PassKind, u32),
    }

    /// Records calls and accepts exactly the uniforms the embedded WGSL declares.
    struct RecordingBackend {
        blocks: Vec<UniformBlock>,
        bound: Option<PassKind>,
        events: Vec<Event>,
    }

    impl RecordingBackend {
        fn new() -> Self {
            let blocks = [BACKGROUND_SOURCE, TERRAIN_SOURCE, OCEAN_SOURCE, SKY_SOURCE]
                .iter()
                .zip(PassKind::ORDER)
                .map(|(source, pass)| {
                    let composed = compose(NOISE_PRELUDE, source);
                    let layout = UniformLayout::from_wgsl(&composed, "Uniforms").unwrap();
                    UniformBlock::new(pass.name(), layout, false)
                })
                .collect();
            Self {
                blocks,
                bound: None,
                events: Vec::new(),
            }
        }

        fn events_for(&self, pass: PassKind) -> usize {
            self.events
                .iter()
                .filter(|e| match e {
                    Event::Bind(p) | Event::Uniform(p, _, _) | Event::Draw(p, _) => *p == pass,
                })
                .count()
        }

        fn drawn(&self, pass: PassKind) -> Option<u32> {
            self.events.iter().rev().find_map(|e| match e {
                Event::Draw(p, id) if *p == pass => Some(*id),
                _ => None,
            })
        }

        fn model_uploads(&self) -> Vec<Mat4> {
            self.events
                .iter()
                .filter_map(|e| match e {
                    Event::Uniform(_, name, UniformValue::Mat4(m)) if name == "M" => Some(*m),
                    _ => None,
                })
                .collect()
        }
    }

    impl RenderBackend for RecordingBackend {
        type Mesh = u32;

        fn bind_program(&mut self, pass: PassKind) {
            self.bound = Some(pass);
            self.events.push(Event::Bind(pass));
        }

        fn set_uniform(&mut self, name: &str, value: UniformValue) -> bool {
            let pass = self.bound.unwrap();
            self.events
                .push(Event::Uniform(pass, name.to_string(), value));
            self.blocks[pass.index()].set(name, value)
        }

        fn draw(&mut self, mesh: &u32) {
            let pass = self.bound.unwrap();
            self.events.push(Event::Draw(pass, *mesh));
        }
    }

    fn orchestrator() -> RenderOrchestrator<CountingUploader> {
        RenderOrchestrator::new(
            CountingUploader::default(),
            PassResolutions::from(&RenderConfig::default()),
        )
    }

    fn frame() -> FrameInput {
        FrameInput {
            projection: Mat4::IDENTITY,
            view: Mat4::from_translation(Vec3::new(0.0, 0.0, -3.0)),
            time: 1.5,
        }
    }

    #[test]
    fn test_passes_run_in_fixed_order() {
        let mut orch = orchestrator();
        let mut backend = RecordingBackend::new();
        let stats = orch.render_frame(&PlanetParams::default(), &frame(), &mut backend);

        assert_eq!(stats.passes, PassKind::ORDER.to_vec());
        let binds: Vec<PassKind> = backend
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Bind(p) => Some(*p),
                _ => None,
            })
            .collect();
        assert_eq!(binds, PassKind::ORDER.to_vec());
    }

    #[test]
    fn test_every_uniform_exists_in_its_shader() {
        let mut orch = orchestrator();
        let mut backend = RecordingBackend::new();
        let stats = orch.render_frame(&PlanetParams::default(), &frame(), &mut backend);
        assert!(stats.uniforms_uploaded > 0);
        assert_eq!(stats.missed_uniforms, 0);
    }

    #[test]
    fn test_disabled_ocean_is_skipped_entirely() {
        let mut orch = orchestrator();
        let mut backend = RecordingBackend::new();
        let mut params = PlanetParams::default();
        params.ocean.enabled = false;

        let stats = orch.render_frame(&params, &frame(), &mut backend);

        assert_eq!(backend.events_for(PassKind::Ocean), 0);
        assert!(backend.events_for(PassKind::Sky) > 0);
        assert!(!stats.passes.contains(&PassKind::Ocean));
        assert_eq!(orch.cache(PassKind::Ocean).builds(), 0);
    }

    #[test]
    fn test_disabled_sky_is_skipped_entirely() {
        let mut orch = orchestrator();
        let mut backend = RecordingBackend::new();
        let mut params = PlanetParams::default();
        params.sky.enabled = false;
        params.ocean.enabled = false;

        let stats = orch.render_frame(&params, &frame(), &mut backend);

        assert_eq!(stats.passes, vec![PassKind::Background, PassKind::Terrain]);
        assert_eq!(backend.events_for(PassKind::Sky), 0);
    }

    #[test]
    fn test_model_matrix_shared_across_planet_passes() {
        let mut orch = orchestrator();
        let mut backend = RecordingBackend::new();
        let mut params = PlanetParams::default();
        params.global.azimuth_deg = 30.0;
        params.global.inclination_deg = 15.0;

        orch.render_frame(&params, &frame(), &mut backend);

        let models = backend.model_uploads();
        assert_eq!(models.len(), 3);
        let expected = Mat4::from_rotation_y(30f32.to_radians())
            * Mat4::from_rotation_x(15f32.to_radians());
        for m in &models {
            assert_eq!(*m, models[0]);
            assert!(m.abs_diff_eq(expected, 1e-6));
        }
    }

    #[test]
    fn test_origin_translation_applied_after_rotation() {
        let mut global = GlobalParams::default();
        global.azimuth_deg = 90.0;
        let m = model_matrix(&global, Vec3::new(5.0, 0.0, 0.0));
        let p = m.transform_point3(Vec3::X);
        assert!(p.abs_diff_eq(Vec3::new(5.0, 0.0, -1.0), 1e-5));
    }

    #[test]
    fn test_segment_change_rebuilds_terrain_only() {
        let mut orch = orchestrator();
        let mut backend = RecordingBackend::new();
        let mut params = PlanetParams::default();

        let first = orch.render_frame(&params, &frame(), &mut backend);
        assert_eq!(first.mesh_rebuilds, 4);

        let second = orch.render_frame(&params, &frame(), &mut backend);
        assert_eq!(second.mesh_rebuilds, 0);

        let old_terrain = orch.cache(PassKind::Terrain).resolution();
        params.terrain.segments = 64;
        let third = orch.render_frame(&params, &frame(), &mut backend);
        assert_eq!(third.mesh_rebuilds, 1);
        assert_ne!(orch.cache(PassKind::Terrain).resolution(), old_terrain);
        assert_eq!(orch.uploader().released.len(), 1);
    }

    #[test]
    fn test_loaded_preset_with_new_resolution_rebuilds_terrain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dense.planet");
        let mut saved = PlanetParams::default();
        saved.terrain.segments = 200;
        planet_config::codec::save(&path, &saved).unwrap();

        let mut orch = orchestrator();
        let mut backend = RecordingBackend::new();
        let mut params = PlanetParams::default();
        orch.render_frame(&params, &frame(), &mut backend);
        let old_terrain = backend.drawn(PassKind::Terrain).unwrap();

        planet_config::codec::load(&path, &mut params).unwrap();
        assert_eq!(params.terrain.segments, 200);
        let stats = orch.render_frame(&params, &frame(), &mut backend);

        assert_eq!(stats.mesh_rebuilds, 1);
        assert_eq!(orch.uploader().released, vec![old_terrain]);
        assert_eq!(orch.cache(PassKind::Terrain).resolution(), Some(200));
        assert_eq!(
            orch.uploader().vertex_counts.last().copied(),
            Some(MeshShape::Sphere.expected_vertex_count(200))
        );
        let new_terrain = backend.drawn(PassKind::Terrain).unwrap();
        assert_ne!(new_terrain, old_terrain);
    }

    #[test]
    fn test_apply_config_moves_origin_and_rebuilds_fixed_passes() {
        let mut orch = orchestrator();
        let mut backend = RecordingBackend::new();
        let params = PlanetParams::default();
        orch.render_frame(&params, &frame(), &mut backend);

        let config = RenderConfig {
            ocean_segments: 48,
            planet_origin: [0.0, 2.0, 0.0],
            ..RenderConfig::default()
        };
        orch.apply_config(&config);
        assert_eq!(orch.origin(), Vec3::new(0.0, 2.0, 0.0));

        backend.events.clear();
        let stats = orch.render_frame(&params, &frame(), &mut backend);
        assert_eq!(stats.mesh_rebuilds, 1);
        assert_eq!(orch.cache(PassKind::Ocean).resolution(), Some(48));
        for m in backend.model_uploads() {
            assert!(m.w_axis.truncate().abs_diff_eq(Vec3::new(0.0, 2.0, 0.0), 1e-6));
        }
    }

    #[test]
    fn test_draws_use_current_mesh_handle() {
        let mut orch = orchestrator();
        let mut backend = RecordingBackend::new();
        let mut params = PlanetParams::default();
        orch.render_frame(&params, &frame(), &mut backend);
        params.terrain.segments += 1;
        backend.events.clear();
        orch.render_frame(&params, &frame(), &mut backend);

        let terrain_draw = backend.events.iter().find_map(|e| match e {
            Event::Draw(PassKind::Terrain, id) => Some(*id),
            _ => None,
        });
        assert_eq!(terrain_draw, Some(5));
    }

    #[test]
    fn test_shutdown_releases_all_meshes() {
        let mut orch = orchestrator();
        let mut backend = RecordingBackend::new();
        orch.render_frame(&PlanetParams::default(), &frame(), &mut backend);
        orch.shutdown();
        assert_eq!(orch.uploader().released.len(), 4);
        for pass in PassKind::ORDER {
            assert_eq!(orch.cache(pass).resolution(), None);
        }
    }

    #[test]
    fn test_missing_uniform_is_counted_not_fatal() {
        struct PickyBackend(RecordingBackend);

        impl RenderBackend for PickyBackend {
            type Mesh = u32;
            fn bind_program(&mut self, pass: PassKind) {
                self.0.bind_program(pass);
            }
            fn set_uniform(&mut self, name: &str, value: UniformValue) -> bool {
                name != "shininess" && self.0.set_uniform(name, value)
            }
            fn draw(&mut self, mesh: &u32) {
                self.0.draw(mesh);
            }
        }

        let mut orch = orchestrator();
        let mut backend = PickyBackend(RecordingBackend::new());
        let stats = orch.render_frame(&PlanetParams::default(), &frame(), &mut backend);
        // terrain and ocean both upload shininess
        assert_eq!(stats.missed_uniforms, 2);
        assert_eq!(stats.passes.len(), 4);
    }
}
