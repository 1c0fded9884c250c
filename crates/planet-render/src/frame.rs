//! Per-frame command recording against the window surface.

use std::sync::Arc;

use crate::buffer::MeshBuffer;
use crate::depth::DepthBuffer;
use crate::orchestrator::{PassKind, RenderBackend};
use crate::program::ProgramSet;
use crate::uniform::UniformValue;

/// Convert a linear RGB clear color to wgpu.
pub fn clear_color(rgb: [f32; 3]) -> wgpu::Color {
    wgpu::Color {
        r: f64::from(rgb[0]),
        g: f64::from(rgb[1]),
        b: f64::from(rgb[2]),
        a: 1.0,
    }
}

/// Begin the frame's single render pass: clear color and reverse-Z depth.
pub fn begin_planet_pass<'encoder>(
    encoder: &'encoder mut wgpu::CommandEncoder,
    color_view: &'encoder wgpu::TextureView,
    depth: &'encoder DepthBuffer,
    clear: wgpu::Color,
) -> wgpu::RenderPass<'encoder> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("planet-pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: color_view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(clear),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: &depth.view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(DepthBuffer::CLEAR_VALUE),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    })
}

/// [`RenderBackend`] recording into a live wgpu render pass.
///
/// Uniform writes are staged in the bound program's block and copied to the
/// GPU right before its draw.
pub struct WgpuFrame<'a, 'pass> {
    render_pass: &'a mut wgpu::RenderPass<'pass>,
    queue: &'a wgpu::Queue,
    programs: &'a mut ProgramSet,
    bound: Option<PassKind>,
}

impl<'a, 'pass> WgpuFrame<'a, 'pass> {
    pub fn new(
        render_pass: &'a mut wgpu::RenderPass<'pass>,
        queue: &'a wgpu::Queue,
        programs: &'a mut ProgramSet,
    ) -> Self {
        Self {
            render_pass,
            queue,
            programs,
            bound: None,
        }
    }
}

impl RenderBackend for WgpuFrame<'_, '_> {
    type Mesh = MeshBuffer;

    fn bind_program(&mut self, pass: PassKind) {
        self.programs.get(pass).bind(self.render_pass);
        self.bound = Some(pass);
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) -> bool {
        match self.bound {
            Some(pass) => self.programs.get_mut(pass).set_uniform(name, value),
            None => false,
        }
    }

    fn draw(&mut self, mesh: &MeshBuffer) {
        let Some(pass) = self.bound else {
            log::warn!("draw without a bound program");
            return;
        };
        self.programs.get_mut(pass).flush(self.queue);
        mesh.bind(self.render_pass);
        mesh.draw(self.render_pass);
    }
}

/// Owns the command encoder and surface texture for one frame.
pub struct FrameEncoder {
    encoder: Option<wgpu::CommandEncoder>,
    queue: Arc<wgpu::Queue>,
    surface_texture: Option<wgpu::SurfaceTexture>,
    surface_view: wgpu::TextureView,
}

impl FrameEncoder {
    pub fn new(
        device: &wgpu::Device,
        queue: Arc<wgpu::Queue>,
        surface_texture: wgpu::SurfaceTexture,
    ) -> Self {
        let encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame-encoder"),
        });
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            encoder: Some(encoder),
            queue,
            surface_texture: Some(surface_texture),
            surface_view,
        }
    }

    /// Encoder and color target for recording; `None` once submitted.
    pub fn parts(&mut self) -> Option<(&mut wgpu::CommandEncoder, &wgpu::TextureView)> {
        let encoder = self.encoder.as_mut()?;
        Some((encoder, &self.surface_view))
    }

    /// Submit the command buffer and present the surface texture.
    pub fn submit(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if let (Some(encoder), Some(surface_texture)) =
            (self.encoder.take(), self.surface_texture.take())
        {
            self.queue.submit([encoder.finish()]);
            surface_texture.present();
        }
    }
}

impl Drop for FrameEncoder {
    fn drop(&mut self) {
        if self.encoder.is_some() {
            log::warn!("FrameEncoder dropped without explicit submit() - auto-submitting");
            self.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_color_conversion() {
        let color = clear_color([0.25, 0.5, 1.0]);
        assert_eq!((color.r, color.g, color.b, color.a), (0.25, 0.5, 1.0, 1.0));
    }

    #[test]
    fn test_unbound_uniform_is_rejected() {
        let Some((device, queue)) = crate::test_device() else {
            return;
        };
        let mut library = crate::shader::ShaderLibrary::new();
        let mut programs = ProgramSet::load(
            &device,
            &mut library,
            wgpu::TextureFormat::Rgba8UnormSrgb,
            false,
        )
        .unwrap();
        let depth = DepthBuffer::new(&device, 4, 4);
        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("test-target"),
            size: wgpu::Extent3d {
                width: 4,
                height: 4,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = target.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor::default());

        {
            let mut pass = begin_planet_pass(&mut encoder, &view, &depth, clear_color([0.0; 3]));
            let mut frame = WgpuFrame::new(&mut pass, &queue, &mut programs);
            assert!(!frame.set_uniform("time", UniformValue::F32(1.0)));
            frame.bind_program(PassKind::Background);
            assert!(frame.set_uniform("time", UniformValue::F32(1.0)));
        }
        queue.submit([encoder.finish()]);
    }
}
