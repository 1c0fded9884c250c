//! Vertex format and GPU mesh storage.

use bytemuck::{Pod, Zeroable};
use planet_mesh::{MeshData, MeshUploader};
use wgpu::util::DeviceExt;

/// Interleaved vertex: position, normal and parameter coordinates.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PlanetVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

static_assertions::const_assert_eq!(std::mem::size_of::<PlanetVertex>(), 32);

impl PlanetVertex {
    pub const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    /// Vertex buffer layout shared by every planet program.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PlanetVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Interleave the attribute streams of `mesh`.
pub fn interleave(mesh: &MeshData) -> Vec<PlanetVertex> {
    mesh.positions
        .iter()
        .zip(&mesh.normals)
        .zip(&mesh.uvs)
        .map(|((p, n), uv)| PlanetVertex {
            position: p.to_array(),
            normal: n.to_array(),
            uv: *uv,
        })
        .collect()
}

/// Vertex and index buffers of one uploaded mesh.
#[derive(Debug)]
pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl MeshBuffer {
    /// Bind vertex and index buffers to a render pass.
    pub fn bind(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
    }

    /// Draw the entire mesh using indexed rendering.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }

    /// Bytes held on the GPU.
    pub fn byte_size(&self) -> u64 {
        self.vertex_buffer.size() + self.index_buffer.size()
    }
}

/// [`MeshUploader`] that creates wgpu buffers and destroys them on release.
pub struct GpuMeshUploader {
    device: wgpu::Device,
    live_meshes: usize,
}

impl GpuMeshUploader {
    pub fn new(device: wgpu::Device) -> Self {
        Self {
            device,
            live_meshes: 0,
        }
    }

    /// Meshes uploaded and not yet released.
    pub fn live_meshes(&self) -> usize {
        self.live_meshes
    }
}

impl MeshUploader for GpuMeshUploader {
    type Handle = MeshBuffer;

    fn upload(&mut self, label: &str, mesh: &MeshData) -> MeshBuffer {
        let vertices = interleave(mesh);

        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label}-vertices")),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label}-indices")),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        self.live_meshes += 1;
        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }

    fn release(&mut self, handle: MeshBuffer) {
        log::debug!("Releasing mesh ({} bytes)", handle.byte_size());
        handle.vertex_buffer.destroy();
        handle.index_buffer.destroy();
        self.live_meshes = self.live_meshes.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planet_mesh::{MeshCache, MeshShape, uv_sphere};

    #[test]
    fn test_vertex_layout_stride() {
        let layout = PlanetVertex::layout();
        assert_eq!(layout.array_stride, 32);
        assert_eq!(layout.attributes.len(), 3);
        assert_eq!(layout.attributes[1].offset, 12);
        assert_eq!(layout.attributes[2].offset, 24);
    }

    #[test]
    fn test_interleave_preserves_attributes() {
        let mesh = uv_sphere(4);
        let vertices = interleave(&mesh);
        assert_eq!(vertices.len(), mesh.vertex_count());
        assert_eq!(vertices[7].position, mesh.positions[7].to_array());
        assert_eq!(vertices[7].normal, mesh.normals[7].to_array());
        assert_eq!(vertices[7].uv, mesh.uvs[7]);
    }

    #[test]
    fn test_gpu_uploader_releases_replaced_mesh() {
        let Some((device, _queue)) = crate::test_device() else {
            return;
        };
        let mut uploader = GpuMeshUploader::new(device);
        let mut cache = MeshCache::new("terrain", MeshShape::Sphere);

        let count = cache.get_or_build(&mut uploader, 8).index_count;
        assert_eq!(count as usize, MeshShape::Sphere.expected_index_count(8));

        cache.get_or_build(&mut uploader, 16);
        assert_eq!(uploader.live_meshes(), 1);

        cache.clear(&mut uploader);
        assert_eq!(uploader.live_meshes(), 0);
    }
}
