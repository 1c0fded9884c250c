//! wgpu rendering for the planet maker: device setup, reflected uniform
//! blocks, the four shader programs and the per-frame pass orchestrator.

pub mod buffer;
pub mod camera;
pub mod depth;
pub mod frame;
pub mod gpu;
pub mod orchestrator;
pub mod program;
pub mod shader;
pub mod uniform;

pub use buffer::{GpuMeshUploader, MeshBuffer, PlanetVertex};
pub use camera::OrbitCamera;
pub use depth::DepthBuffer;
pub use frame::{FrameEncoder, WgpuFrame, begin_planet_pass, clear_color};
pub use gpu::{RenderContext, RenderContextError, SurfaceError, init_render_context_blocking};
pub use orchestrator::{
    FrameInput, FrameStats, PassKind, PassResolutions, RenderBackend, RenderOrchestrator,
    model_matrix,
};
pub use program::{PassState, ProgramError, ProgramSet, ShaderProgram};
pub use shader::{ShaderError, ShaderLibrary};
pub use uniform::{UniformBlock, UniformLayout, UniformLayoutError, UniformType, UniformValue};

/// Headless device for GPU tests; `None` when no adapter is available.
#[cfg(test)]
pub(crate) fn test_device() -> Option<(wgpu::Device, wgpu::Queue)> {
    pollster::block_on(async {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .ok()?;
        adapter
            .request_device(&wgpu::DeviceDescriptor::default())
            .await
            .ok()
    })
}
