//! Window creation and the frame loop via winit.
//!
//! [`AppState`] implements winit's [`ApplicationHandler`]: it creates the
//! window and GPU state on resume, routes keys to the editor and renders one
//! frame per redraw.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use planet_config::AppConfig;
use planet_render::{
    DepthBuffer, FrameEncoder, FrameInput, GpuMeshUploader, OrbitCamera, PassResolutions,
    ProgramError, ProgramSet, RenderContext, RenderOrchestrator, ShaderLibrary, SurfaceError,
    WgpuFrame, begin_planet_pass, clear_color, init_render_context_blocking,
};
use tracing::{debug, error, info, instrument, warn};
use winit::application::ApplicationHandler;
use winit::error::EventLoopError;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowAttributes, WindowId};

use crate::controls::{self, Outcome};
use crate::editor::PlanetEditor;

/// Camera distance per scroll line.
const ZOOM_PER_LINE: f32 = 0.25;
/// Camera distance per scrolled pixel.
const ZOOM_PER_PIXEL: f32 = 0.005;
/// Camera orbit in radians per dragged pixel.
const ORBIT_PER_PIXEL: f32 = 0.005;

/// Returns [`WindowAttributes`] based on the given configuration.
pub fn window_attributes_from_config(config: &AppConfig) -> WindowAttributes {
    WindowAttributes::default()
        .with_title(config.window.title.clone())
        .with_inner_size(winit::dpi::LogicalSize::new(
            config.window.width as f64,
            config.window.height as f64,
        ))
}

/// GPU resources that live as long as the window.
struct PlanetRenderer {
    queue: Arc<wgpu::Queue>,
    depth: DepthBuffer,
    library: ShaderLibrary,
    programs: ProgramSet,
    orchestrator: RenderOrchestrator<GpuMeshUploader>,
}

impl PlanetRenderer {
    fn new(gpu: &RenderContext, config: &AppConfig) -> Result<Self, ProgramError> {
        let mut library = ShaderLibrary::new();
        if let Some(dir) = &config.render.shader_dir {
            info!("Loading shaders from {}", dir.display());
            library = library.with_shader_dir(dir.clone());
        }
        let programs = ProgramSet::load(
            &gpu.device,
            &mut library,
            gpu.surface_format,
            config.debug.warn_missing_uniforms,
        )?;
        let depth = DepthBuffer::new(
            &gpu.device,
            gpu.surface_config.width,
            gpu.surface_config.height,
        );
        let mut orchestrator = RenderOrchestrator::new(
            GpuMeshUploader::new(gpu.device.clone()),
            PassResolutions::from(&config.render),
        );
        orchestrator.apply_config(&config.render);

        Ok(Self {
            queue: Arc::new(gpu.queue.clone()),
            depth,
            library,
            programs,
            orchestrator,
        })
    }
}

/// Application state driven by the winit event loop.
pub struct AppState {
    config: AppConfig,
    config_dir: PathBuf,
    editor: PlanetEditor,
    window: Option<Arc<Window>>,
    gpu: Option<RenderContext>,
    renderer: Option<PlanetRenderer>,
    camera: OrbitCamera,
    dragging: bool,
    cursor: Option<(f64, f64)>,
    start: Instant,
    frames: u64,
}

impl AppState {
    pub fn new(config: AppConfig, config_dir: impl Into<PathBuf>, editor: PlanetEditor) -> Self {
        let mut camera = OrbitCamera::new(config.render.camera_distance, config.render.fov_degrees);
        camera.set_aspect_ratio(config.window.width as f32, config.window.height as f32);
        Self {
            config,
            config_dir: config_dir.into(),
            editor,
            window: None,
            gpu: None,
            renderer: None,
            camera,
            dragging: false,
            cursor: None,
            start: Instant::now(),
            frames: 0,
        }
    }

    pub fn editor(&self) -> &PlanetEditor {
        &self.editor
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    /// Resize the surface, depth buffer and camera projection.
    pub fn handle_resize(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        self.camera.set_aspect_ratio(width as f32, height as f32);

        if let Some(gpu) = &mut self.gpu {
            gpu.resize(width, height);
            if let Some(renderer) = &mut self.renderer {
                renderer.depth.resize(&gpu.device, width, height);
            }
        }
        debug!("Window resized to {width}x{height}");
    }

    pub fn handle_scroll(&mut self, delta: MouseScrollDelta) {
        let amount = match delta {
            MouseScrollDelta::LineDelta(_, y) => y * ZOOM_PER_LINE,
            MouseScrollDelta::PixelDelta(position) => position.y as f32 * ZOOM_PER_PIXEL,
        };
        self.camera.zoom(-amount);
    }

    /// Orbit the camera while the left button is held.
    pub fn handle_cursor(&mut self, x: f64, y: f64) {
        if let (true, Some((last_x, last_y))) = (self.dragging, self.cursor) {
            self.camera.orbit(
                (last_x - x) as f32 * ORBIT_PER_PIXEL,
                (y - last_y) as f32 * ORBIT_PER_PIXEL,
            );
        }
        self.cursor = Some((x, y));
    }

    /// Re-read `config.ron` and apply what can change at runtime: camera
    /// field of view, fixed mesh resolutions, planet origin and clear color.
    fn reload_config(&mut self) {
        match self.config.reload(&self.config_dir) {
            Ok(Some(config)) => self.apply_config(config),
            Ok(None) => info!("config.ron unchanged"),
            Err(e) => error!("Config reload failed, keeping current settings: {e}"),
        }
    }

    fn apply_config(&mut self, config: AppConfig) {
        self.camera.fov_y = config.render.fov_degrees.to_radians();
        if let Some(renderer) = &mut self.renderer {
            renderer.orchestrator.apply_config(&config.render);
        }
        if config.window != self.config.window || config.editor != self.config.editor {
            info!("Window and editor settings take effect on restart");
        }
        self.config = config;
    }

    fn reload_shaders(&mut self) {
        let (Some(gpu), Some(renderer)) = (&self.gpu, &mut self.renderer) else {
            return;
        };
        if renderer.library.shader_dir().is_none() {
            warn!("Shader reload needs render.shader_dir in config.ron");
            return;
        }
        if let Err(e) = renderer.programs.reload(
            &gpu.device,
            &mut renderer.library,
            gpu.surface_format,
            self.config.debug.warn_missing_uniforms,
        ) {
            error!("Shader reload failed, keeping current programs: {e}");
        }
    }

    fn render(&mut self) {
        let (Some(gpu), Some(renderer)) = (&self.gpu, &mut self.renderer) else {
            return;
        };

        let surface_texture = match gpu.get_current_texture() {
            Ok(texture) => texture,
            Err(SurfaceError::Timeout) => {
                debug!("Surface timeout, skipping frame");
                return;
            }
            Err(e) => {
                error!("Cannot acquire surface texture: {e}");
                return;
            }
        };

        let input = FrameInput {
            projection: self.camera.projection_matrix(),
            view: self.camera.view_matrix(),
            time: self.start.elapsed().as_secs_f32(),
        };

        let mut frame = FrameEncoder::new(&gpu.device, renderer.queue.clone(), surface_texture);
        let Some((encoder, color_view)) = frame.parts() else {
            return;
        };
        let stats = {
            let mut render_pass = begin_planet_pass(
                encoder,
                color_view,
                &renderer.depth,
                clear_color(self.config.render.clear_color),
            );
            let mut backend = WgpuFrame::new(&mut render_pass, &renderer.queue, &mut renderer.programs);
            renderer
                .orchestrator
                .render_frame(self.editor.params(), &input, &mut backend)
        };
        frame.submit();

        self.frames += 1;
        if stats.mesh_rebuilds > 0 {
            debug!(
                "Frame {}: rebuilt {} mesh(es), {} live",
                self.frames,
                stats.mesh_rebuilds,
                renderer.orchestrator.uploader().live_meshes()
            );
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match event_loop.create_window(window_attributes_from_config(&self.config)) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("Window creation failed: {e}");
                event_loop.exit();
                return;
            }
        };

        let gpu = match init_render_context_blocking(window.clone(), self.config.window.vsync) {
            Ok(gpu) => gpu,
            Err(e) => {
                error!("GPU initialization failed: {e}");
                event_loop.exit();
                return;
            }
        };

        match PlanetRenderer::new(&gpu, &self.config) {
            Ok(renderer) => self.renderer = Some(renderer),
            Err(e) => {
                error!("Shader programs failed to build: {e}");
                event_loop.exit();
                return;
            }
        }

        let size = window.inner_size();
        self.camera
            .set_aspect_ratio(size.width.max(1) as f32, size.height.max(1) as f32);
        self.gpu = Some(gpu);
        window.request_redraw();
        self.window = Some(window);
        info!("Renderer ready ({}x{})", size.width, size.height);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => self.handle_resize(size.width, size.height),
            WindowEvent::KeyboardInput { event, .. } => {
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                let Some(action) = controls::action_for(code, event.state, event.repeat) else {
                    return;
                };
                match controls::apply(&mut self.editor, action) {
                    Outcome::Continue => {}
                    Outcome::ReloadShaders => self.reload_shaders(),
                    Outcome::ReloadConfig => self.reload_config(),
                    Outcome::Quit => {
                        info!("Escape pressed, shutting down");
                        event_loop.exit();
                    }
                }
            }
            WindowEvent::MouseWheel { delta, .. } => self.handle_scroll(delta),
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => self.dragging = state == ElementState::Pressed,
            WindowEvent::CursorMoved { position, .. } => {
                self.handle_cursor(position.x, position.y);
            }
            WindowEvent::CursorLeft { .. } => self.cursor = None,
            WindowEvent::RedrawRequested => {
                self.render();
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(renderer) = &mut self.renderer {
            renderer.orchestrator.shutdown();
            info!(
                "Released meshes, {} still live after {} frames",
                renderer.orchestrator.uploader().live_meshes(),
                self.frames
            );
        }
    }
}

/// Create an event loop and run the editor until the window closes.
#[instrument(skip_all)]
pub fn run(
    config: AppConfig,
    config_dir: PathBuf,
    editor: PlanetEditor,
) -> Result<(), EventLoopError> {
    let event_loop = EventLoop::new()?;
    let mut app = AppState::new(config, config_dir, editor);
    event_loop.run_app(&mut app)
}
