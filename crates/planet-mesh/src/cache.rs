//! Single-entry mesh cache keyed by tessellation resolution.
//!
//! Each render pass owns one cache. A lookup with the resolution currently
//! held returns the existing handle; any other resolution rebuilds the mesh
//! synchronously and releases the previous GPU resources.

use crate::geometry::{MeshData, MeshShape, generate};

/// Moves CPU meshes into renderer-owned storage.
///
/// The GPU implementation lives in the renderer; tests use counting fakes.
pub trait MeshUploader {
    /// Opaque handle to the uploaded mesh.
    type Handle;

    /// Allocate resources for `mesh` and return a handle to them.
    fn upload(&mut self, label: &str, mesh: &MeshData) -> Self::Handle;

    /// Free the resources behind `handle`.
    fn release(&mut self, handle: Self::Handle);
}

#[derive(Debug)]
struct CacheEntry<H> {
    resolution: u32,
    handle: H,
}

/// Cache slot holding at most one uploaded mesh.
#[derive(Debug)]
pub struct MeshCache<H> {
    label: String,
    shape: MeshShape,
    entry: Option<CacheEntry<H>>,
    builds: u64,
}

impl<H> MeshCache<H> {
    /// Create an empty cache for `shape`. `label` names GPU allocations.
    pub fn new(label: impl Into<String>, shape: MeshShape) -> Self {
        Self {
            label: label.into(),
            shape,
            entry: None,
            builds: 0,
        }
    }

    /// Resolution of the held mesh, if any.
    pub fn resolution(&self) -> Option<u32> {
        self.entry.as_ref().map(|e| e.resolution)
    }

    /// Number of meshes built over the cache's lifetime.
    pub fn builds(&self) -> u64 {
        self.builds
    }

    /// Return the mesh for `resolution`, rebuilding it when the key differs.
    ///
    /// The previous handle is released immediately after the replacement is
    /// uploaded, so at most two meshes are alive during a rebuild.
    pub fn get_or_build<U>(&mut self, uploader: &mut U, resolution: u32) -> &H
    where
        U: MeshUploader<Handle = H>,
    {
        let entry = match self.entry.take() {
            Some(entry) if entry.resolution == resolution => entry,
            previous => {
                let effective = self.shape.effective_segments(resolution);
                if effective != resolution {
                    log::warn!(
                        "{}: resolution {} outside {:?} range, tessellating at {}",
                        self.label,
                        resolution,
                        self.shape,
                        effective
                    );
                }

                let mesh = generate(self.shape, resolution);
                let handle = uploader.upload(&self.label, &mesh);
                self.builds += 1;
                log::debug!(
                    "{}: built {} vertices / {} triangles at resolution {}",
                    self.label,
                    mesh.vertex_count(),
                    mesh.triangle_count(),
                    resolution
                );

                if let Some(old) = previous {
                    uploader.release(old.handle);
                }
                CacheEntry { resolution, handle }
            }
        };
        &self.entry.insert(entry).handle
    }

    /// Release the held mesh so the next lookup rebuilds.
    pub fn clear<U>(&mut self, uploader: &mut U)
    where
        U: MeshUploader<Handle = H>,
    {
        if let Some(entry) = self.entry.take() {
            uploader.release(entry.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hands out increasing ids and records what was uploaded and released.
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

    impl CountingUploader {
        fn live(&self) -> usize {
            self.vertex_counts.len() - self.released.len()
        }
    }

    #[test]
    fn test_same_resolution_reuses_mesh() {
        let mut uploader = CountingUploader::default();
        let mut cache = MeshCache::new("terrain", MeshShape::Sphere);

        let first = *cache.get_or_build(&mut uploader, 32);
        let second = *cache.get_or_build(&mut uploader, 32);

        assert_eq!(first, second);
        assert_eq!(cache.builds(), 1);
        assert!(uploader.released.is_empty());
    }

    #[test]
    fn test_resolution_change_rebuilds_and_releases() {
        let mut uploader = CountingUploader::default();
        let mut cache = MeshCache::new("terrain", MeshShape::Sphere);

        let old = *cache.get_or_build(&mut uploader, 16);
        let new = *cache.get_or_build(&mut uploader, 48);

        assert_ne!(old, new);
        assert_eq!(cache.resolution(), Some(48));
        assert_eq!(cache.builds(), 2);
        assert_eq!(uploader.released, vec![old]);
        assert_eq!(
            uploader.vertex_counts.last().copied(),
            Some(MeshShape::Sphere.expected_vertex_count(48))
        );
        assert_eq!(uploader.live(), 1);
    }

    #[test]
    fn test_repeated_edits_do_not_leak() {
        let mut uploader = CountingUploader::default();
        let mut cache = MeshCache::new("ocean", MeshShape::Sphere);
        for resolution in [8, 9, 10, 10, 11, 8] {
            cache.get_or_build(&mut uploader, resolution);
        }
        assert_eq!(cache.builds(), 5);
        assert_eq!(uploader.live(), 1);
    }

    #[test]
    fn test_below_minimum_still_builds() {
        let mut uploader = CountingUploader::default();
        let mut cache = MeshCache::new("terrain", MeshShape::Sphere);
        cache.get_or_build(&mut uploader, 0);
        assert_eq!(cache.resolution(), Some(0));
        assert_eq!(
            uploader.vertex_counts,
            vec![MeshShape::Sphere.expected_vertex_count(0)]
        );
    }

    #[test]
    fn test_clear_releases_and_forces_rebuild() {
        let mut uploader = CountingUploader::default();
        let mut cache = MeshCache::new("background", MeshShape::Cube);

        let first = *cache.get_or_build(&mut uploader, 4);
        cache.clear(&mut uploader);
        assert_eq!(cache.resolution(), None);
        assert_eq!(uploader.released, vec![first]);

        cache.get_or_build(&mut uploader, 4);
        assert_eq!(cache.builds(), 2);
        assert_eq!(
            uploader.vertex_counts[1],
            MeshShape::Cube.expected_vertex_count(4)
        );
    }

    #[test]
    fn test_clear_on_empty_cache_is_noop() {
        let mut uploader = CountingUploader::default();
        let mut cache: MeshCache<u32> = MeshCache::new("sky", MeshShape::Sphere);
        cache.clear(&mut uploader);
        assert!(uploader.released.is_empty());
    }
}
