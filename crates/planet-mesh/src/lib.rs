//! Sphere and cube tessellation plus the per-pass mesh cache.

pub mod cache;
pub mod geometry;

pub use cache::{MeshCache, MeshUploader};
pub use geometry::{
    MAX_CUBE_SEGMENTS, MAX_SPHERE_SEGMENTS, MIN_CUBE_SEGMENTS, MIN_SPHERE_SEGMENTS, MeshData,
    MeshShape, cube_planes, generate, uv_sphere,
};
