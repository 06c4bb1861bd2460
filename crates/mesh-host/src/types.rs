use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Opaque handle to a mesh loaded into a host.
/// NEVER persisted. Valid only for the host session that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

impl fmt::Display for MeshHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mesh#{}", self.0)
    }
}

/// What a host can do beyond the basic repair operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostCapabilities {
    /// The 3D-Print add-on (check-all + clean non-manifold) is available.
    pub advanced_repair: bool,
}

/// The repair steps a pipeline can request, in the order they normally run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairOp {
    MergeVertices,
    FillHoles,
    RecomputeNormals,
    AdvancedRepair,
    Center,
}

impl RepairOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepairOp::MergeVertices => "merge_vertices",
            RepairOp::FillHoles => "fill_holes",
            RepairOp::RecomputeNormals => "recompute_normals",
            RepairOp::AdvancedRepair => "advanced_repair",
            RepairOp::Center => "center",
        }
    }
}

impl fmt::Display for RepairOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tunables shared by every host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairSettings {
    /// Vertices closer than this are merged.
    pub merge_distance: f64,
    /// Largest hole (in boundary edges) that gets filled. 0 fills every hole.
    pub max_hole_sides: usize,
    /// Move the repaired mesh so its volume centre sits at the origin.
    pub center: bool,
}

impl Default for RepairSettings {
    fn default() -> Self {
        Self {
            merge_distance: 1e-4,
            max_hole_sides: 4,
            center: false,
        }
    }
}

/// Topology summary of a mesh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshStats {
    pub vertices: usize,
    pub triangles: usize,
    pub boundary_edges: usize,
    pub non_manifold_edges: usize,
}

impl MeshStats {
    /// Every edge borders exactly two triangles.
    pub fn is_manifold(&self) -> bool {
        self.boundary_edges == 0 && self.non_manifold_edges == 0
    }
}

/// Errors from host operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HostError {
    #[error("failed to load {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("{operation} failed: {reason}")]
    Operation { operation: RepairOp, reason: String },

    #[error("failed to export {path}: {reason}")]
    Export { path: PathBuf, reason: String },

    #[error("unknown mesh handle: {handle}")]
    UnknownHandle { handle: MeshHandle },

    #[error("host unavailable: {reason}")]
    Unavailable { reason: String },
}

impl HostError {
    pub fn operation(operation: RepairOp, reason: impl Into<String>) -> Self {
        HostError::Operation {
            operation,
            reason: reason.into(),
        }
    }
}
