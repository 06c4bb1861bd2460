//! NativeHost: built-in basic-geometry host.
//!
//! Implements the basic repair sequence in-process so the tool works without
//! Blender. It has no equivalent of the 3D-Print add-on.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use tracing::{debug, info};

use crate::mesh::TriMesh;
use crate::repair;
use crate::stl;
use crate::traits::MeshHost;
use crate::types::*;

pub struct NativeHost {
    next_handle: u64,
    meshes: HashMap<u64, TriMesh>,
}

impl NativeHost {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            meshes: HashMap::new(),
        }
    }

    fn alloc_handle(&mut self) -> MeshHandle {
        let h = MeshHandle(self.next_handle);
        self.next_handle += 1;
        h
    }

    fn mesh_mut(&mut self, handle: MeshHandle) -> Result<&mut TriMesh, HostError> {
        self.meshes
            .get_mut(&handle.0)
            .ok_or(HostError::UnknownHandle { handle })
    }

    /// Borrow a loaded mesh.
    pub fn mesh(&self, handle: MeshHandle) -> Option<&TriMesh> {
        self.meshes.get(&handle.0)
    }

    /// Register an in-memory mesh, bypassing file import.
    pub fn insert(&mut self, mesh: TriMesh) -> MeshHandle {
        let handle = self.alloc_handle();
        self.meshes.insert(handle.0, mesh);
        handle
    }
}

impl Default for NativeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshHost for NativeHost {
    fn name(&self) -> &str {
        "native"
    }

    fn capabilities(&mut self) -> HostCapabilities {
        HostCapabilities {
            advanced_repair: false,
        }
    }

    fn import_mesh(&mut self, path: &Path) -> Result<MeshHandle, HostError> {
        let mesh = stl::read_stl(path).map_err(|e| HostError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        info!(
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            "imported {}",
            path.display()
        );
        Ok(self.insert(mesh))
    }

    fn merge_vertices(&mut self, handle: MeshHandle, distance: f64) -> Result<(), HostError> {
        let mesh = self.mesh_mut(handle)?;
        let merged = repair::merge_vertices(mesh, distance);
        if mesh.is_empty() {
            return Err(HostError::operation(
                RepairOp::MergeVertices,
                "every triangle collapsed",
            ));
        }
        debug!(%handle, merged, distance, "merge by distance");
        Ok(())
    }

    fn fill_holes(&mut self, handle: MeshHandle, max_sides: usize) -> Result<(), HostError> {
        let filled = repair::fill_holes(self.mesh_mut(handle)?, max_sides);
        debug!(%handle, filled, max_sides, "fill holes");
        Ok(())
    }

    fn recompute_normals(&mut self, handle: MeshHandle) -> Result<(), HostError> {
        let flipped = repair::make_normals_consistent(self.mesh_mut(handle)?);
        debug!(%handle, flipped, "normals made consistent");
        Ok(())
    }

    fn advanced_repair(&mut self, _handle: MeshHandle) -> Result<(), HostError> {
        Err(HostError::Unavailable {
            reason: "the native host has no 3D-Print add-on".to_string(),
        })
    }

    fn center(&mut self, handle: MeshHandle) -> Result<(), HostError> {
        repair::center_on_volume(self.mesh_mut(handle)?);
        Ok(())
    }

    fn stats(&mut self, handle: MeshHandle) -> Result<Option<MeshStats>, HostError> {
        Ok(Some(self.mesh_mut(handle)?.stats()))
    }

    fn export_mesh(&mut self, handle: MeshHandle, path: &Path) -> Result<(), HostError> {
        let export_err = |reason: String| HostError::Export {
            path: path.to_path_buf(),
            reason,
        };

        let mesh = self.mesh_mut(handle)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let bytes = stl::write_binary_stl(mesh, &name).map_err(|e| export_err(e.to_string()))?;

        // Write next to the destination, then rename over it.
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| export_err(e.to_string()))?;
        tmp.write_all(&bytes)
            .and_then(|_| tmp.flush())
            .map_err(|e| export_err(e.to_string()))?;
        tmp.persist(path).map_err(|e| export_err(e.error.to_string()))?;

        debug!(bytes = bytes.len(), "wrote {}", path.display());
        Ok(())
    }

    fn release(&mut self, handle: MeshHandle) -> Result<(), HostError> {
        self.meshes
            .remove(&handle.0)
            .map(|_| ())
            .ok_or(HostError::UnknownHandle { handle })
    }
}
