use std::path::Path;

use crate::types::*;

/// Narrow capability interface over whatever actually repairs meshes.
/// Implemented by NativeHost (built-in basic geometry), BlenderHost (drives a
/// Blender executable) and MockHost (deterministic test double).
pub trait MeshHost {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Query optional features. May be expensive on first call; hosts cache it.
    fn capabilities(&mut self) -> HostCapabilities;

    /// Load a mesh file and return a handle to it.
    fn import_mesh(&mut self, path: &Path) -> Result<MeshHandle, HostError>;

    /// Merge vertices closer than `distance`.
    fn merge_vertices(&mut self, mesh: MeshHandle, distance: f64) -> Result<(), HostError>;

    /// Fill holes bounded by at most `max_sides` edges (0 = any size).
    fn fill_holes(&mut self, mesh: MeshHandle, max_sides: usize) -> Result<(), HostError>;

    /// Make face winding consistent and outward-facing.
    fn recompute_normals(&mut self, mesh: MeshHandle) -> Result<(), HostError>;

    /// Run the 3D-Print add-on analysis and non-manifold cleanup.
    fn advanced_repair(&mut self, mesh: MeshHandle) -> Result<(), HostError>;

    /// Translate the mesh so its volume centre is at the origin.
    fn center(&mut self, mesh: MeshHandle) -> Result<(), HostError>;

    /// Topology summary, if the host can inspect the mesh.
    fn stats(&mut self, mesh: MeshHandle) -> Result<Option<MeshStats>, HostError>;

    /// Write the mesh to `path` as STL.
    fn export_mesh(&mut self, mesh: MeshHandle, path: &Path) -> Result<(), HostError>;

    /// Drop the mesh. The handle is unknown afterwards.
    fn release(&mut self, mesh: MeshHandle) -> Result<(), HostError>;
}
