//! CPU tessellation of the unit sphere and the six-plane background cube.
//!
//! Meshes carry geometry only. Displacement and coloring happen in the
//! shader passes, so the same sphere serves terrain, ocean and clouds.

use glam::Vec3;

/// Smallest sphere tessellation that still encloses a volume.
pub const MIN_SPHERE_SEGMENTS: u32 = 3;

/// Smallest cube face tessellation.
pub const MIN_CUBE_SEGMENTS: u32 = 1;

/// Largest sphere tessellation. Keeps vertex and index buffers under wgpu's
/// default 256 MiB buffer limit.
pub const MAX_SPHERE_SEGMENTS: u32 = 2048;

/// Largest cube face tessellation, for the same buffer limit.
pub const MAX_CUBE_SEGMENTS: u32 = 1024;

/// Indexed triangle-list mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Vertex positions.
    pub positions: Vec<Vec3>,
    /// Unit normals, one per vertex.
    pub normals: Vec<Vec3>,
    /// Parameter coordinates in `[0, 1]²`, one per vertex.
    pub uvs: Vec<[f32; 2]>,
    /// Counter-clockwise (seen from outside) triangle indices.
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Which primitive a cache slot tessellates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshShape {
    /// Latitude/longitude unit sphere.
    Sphere,
    /// Six unit planes bounding the cube `[-1, 1]³`.
    Cube,
}

impl MeshShape {
    /// Lowest tessellation [`generate`] will produce for this shape.
    pub fn min_segments(self) -> u32 {
        match self {
            MeshShape::Sphere => MIN_SPHERE_SEGMENTS,
            MeshShape::Cube => MIN_CUBE_SEGMENTS,
        }
    }

    /// Highest tessellation [`generate`] will produce for this shape.
    pub fn max_segments(self) -> u32 {
        match self {
            MeshShape::Sphere => MAX_SPHERE_SEGMENTS,
            MeshShape::Cube => MAX_CUBE_SEGMENTS,
        }
    }

    /// Tessellation actually used for a requested `segments` value.
    pub fn effective_segments(self, segments: u32) -> u32 {
        segments.clamp(self.min_segments(), self.max_segments())
    }

    /// Vertices produced by `generate(self, segments)`.
    pub fn expected_vertex_count(self, segments: u32) -> usize {
        let side = self.effective_segments(segments) as usize + 1;
        match self {
            MeshShape::Sphere => side * side,
            MeshShape::Cube => 6 * side * side,
        }
    }

    /// Indices produced by `generate(self, segments)`.
    pub fn expected_index_count(self, segments: u32) -> usize {
        let s = self.effective_segments(segments) as usize;
        match self {
            MeshShape::Sphere => 6 * s * s,
            MeshShape::Cube => 36 * s * s,
        }
    }
}

/// Tessellate `shape` at `segments`, clamped to the shape's supported range.
pub fn generate(shape: MeshShape, segments: u32) -> MeshData {
    match shape {
        MeshShape::Sphere => uv_sphere(segments),
        MeshShape::Cube => cube_planes(segments),
    }
}

/// Append the two triangles of every cell of a `(s+1)×(s+1)` vertex grid
/// starting at `base`. Grid rows advance along the second axis.
fn push_grid_indices(indices: &mut Vec<u32>, base: u32, s: u32) {
    let row = s + 1;
    for j in 0..s {
        for i in 0..s {
            let a = base + j * row + i;
            let b = a + row;
            indices.extend_from_slice(&[a, a + 1, b]);
            indices.extend_from_slice(&[a + 1, b + 1, b]);
        }
    }
}

/// Unit sphere with `segments` divisions in both latitude and longitude.
///
/// The seam column is duplicated so `uv.x` runs continuously from 0 to 1.
pub fn uv_sphere(segments: u32) -> MeshData {
    let s = MeshShape::Sphere.effective_segments(segments);
    let side = (s + 1) as usize;

    let mut positions = Vec::with_capacity(side * side);
    let mut uvs = Vec::with_capacity(side * side);
    for lat in 0..=s {
        let v = lat as f32 / s as f32;
        let theta = v * std::f32::consts::PI;
        let (sin_t, cos_t) = theta.sin_cos();
        for lon in 0..=s {
            let u = lon as f32 / s as f32;
            let phi = u * std::f32::consts::TAU;
            let (sin_p, cos_p) = phi.sin_cos();
            positions.push(Vec3::new(sin_t * cos_p, cos_t, sin_t * sin_p).normalize());
            uvs.push([u, v]);
        }
    }

    let mut indices = Vec::with_capacity(6 * s as usize * s as usize);
    push_grid_indices(&mut indices, 0, s);

    MeshData {
        normals: positions.clone(),
        positions,
        uvs,
        indices,
    }
}

/// Outward normal, tangent and bitangent per face, with `tangent × bitangent = normal`.
const CUBE_FACES: [(Vec3, Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::NEG_Z, Vec3::Y),
    (Vec3::NEG_X, Vec3::Z, Vec3::Y),
    (Vec3::Y, Vec3::X, Vec3::NEG_Z),
    (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    (Vec3::Z, Vec3::X, Vec3::Y),
    (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
];

/// Six `segments × segments` planes forming the cube `[-1, 1]³`.
pub fn cube_planes(segments: u32) -> MeshData {
    let s = MeshShape::Cube.effective_segments(segments);
    let per_face = (s as usize + 1) * (s as usize + 1);

    let mut mesh = MeshData {
        positions: Vec::with_capacity(6 * per_face),
        normals: Vec::with_capacity(6 * per_face),
        uvs: Vec::with_capacity(6 * per_face),
        indices: Vec::with_capacity(36 * s as usize * s as usize),
    };

    for (normal, tangent, bitangent) in CUBE_FACES {
        let base = mesh.positions.len() as u32;
        for j in 0..=s {
            let v = j as f32 / s as f32;
            for i in 0..=s {
                let u = i as f32 / s as f32;
                mesh.positions
                    .push(normal + tangent * (u * 2.0 - 1.0) + bitangent * (v * 2.0 - 1.0));
                mesh.normals.push(normal);
                mesh.uvs.push([u, v]);
            }
        }
        push_grid_indices(&mut mesh.indices, base, s);
    }

    mesh
}
