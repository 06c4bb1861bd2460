//! MockHost: deterministic test double implementing MeshHost.
//!
//! Records every call in order and never touches mesh data. Import succeeds
//! for any path that exists on disk; failures can be injected per operation.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::traits::MeshHost;
use crate::types::*;

/// One recorded host call.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Import(PathBuf),
    Repair(RepairOp),
    Stats,
    Export(PathBuf),
    Release,
}

pub struct MockHost {
    next_handle: u64,
    advanced: bool,
    fail_ops: HashSet<RepairOp>,
    fail_export: bool,
    calls: Vec<HostCall>,
    loaded: HashMap<u64, PathBuf>,
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            advanced: false,
            fail_ops: HashSet::new(),
            fail_export: false,
            calls: Vec::new(),
            loaded: HashMap::new(),
        }
    }

    /// Report the 3D-Print add-on as present.
    pub fn with_advanced_repair(mut self) -> Self {
        self.advanced = true;
        self
    }

    /// Make `op` fail with an Operation error.
    pub fn failing(mut self, op: RepairOp) -> Self {
        self.fail_ops.insert(op);
        self
    }

    /// Make every export fail.
    pub fn failing_export(mut self) -> Self {
        self.fail_export = true;
        self
    }

    pub fn calls(&self) -> &[HostCall] {
        &self.calls
    }

    pub fn called(&self, op: RepairOp) -> bool {
        self.calls.contains(&HostCall::Repair(op))
    }

    pub fn exported(&self) -> bool {
        self.calls.iter().any(|c| matches!(c, HostCall::Export(_)))
    }

    /// Meshes imported and not yet released.
    pub fn open_meshes(&self) -> usize {
        self.loaded.len()
    }

    fn repair(&mut self, handle: MeshHandle, op: RepairOp) -> Result<(), HostError> {
        if !self.loaded.contains_key(&handle.0) {
            return Err(HostError::UnknownHandle { handle });
        }
        self.calls.push(HostCall::Repair(op));
        if self.fail_ops.contains(&op) {
            return Err(HostError::operation(op, "injected failure"));
        }
        Ok(())
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshHost for MockHost {
    fn name(&self) -> &str {
        "mock"
    }

    fn capabilities(&mut self) -> HostCapabilities {
        HostCapabilities {
            advanced_repair: self.advanced,
        }
    }

    fn import_mesh(&mut self, path: &Path) -> Result<MeshHandle, HostError> {
        self.calls.push(HostCall::Import(path.to_path_buf()));
        if !path.is_file() {
            return Err(HostError::Load {
                path: path.to_path_buf(),
                reason: "no such file".to_string(),
            });
        }
        let handle = MeshHandle(self.next_handle);
        self.next_handle += 1;
        self.loaded.insert(handle.0, path.to_path_buf());
        Ok(handle)
    }

    fn merge_vertices(&mut self, handle: MeshHandle, _distance: f64) -> Result<(), HostError> {
        self.repair(handle, RepairOp::MergeVertices)
    }

    fn fill_holes(&mut self, handle: MeshHandle, _max_sides: usize) -> Result<(), HostError> {
        self.repair(handle, RepairOp::FillHoles)
    }

    fn recompute_normals(&mut self, handle: MeshHandle) -> Result<(), HostError> {
        self.repair(handle, RepairOp::RecomputeNormals)
    }

    fn advanced_repair(&mut self, handle: MeshHandle) -> Result<(), HostError> {
        if !self.advanced {
            return Err(HostError::Unavailable {
                reason: "mock has no advanced repair".to_string(),
            });
        }
        self.repair(handle, RepairOp::AdvancedRepair)
    }

    fn center(&mut self, handle: MeshHandle) -> Result<(), HostError> {
        self.repair(handle, RepairOp::Center)
    }

    fn stats(&mut self, _handle: MeshHandle) -> Result<Option<MeshStats>, HostError> {
        self.calls.push(HostCall::Stats);
        Ok(None)
    }

    fn export_mesh(&mut self, handle: MeshHandle, path: &Path) -> Result<(), HostError> {
        if !self.loaded.contains_key(&handle.0) {
            return Err(HostError::UnknownHandle { handle });
        }
        self.calls.push(HostCall::Export(path.to_path_buf()));
        if self.fail_export {
            return Err(HostError::Export {
                path: path.to_path_buf(),
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn release(&mut self, handle: MeshHandle) -> Result<(), HostError> {
        self.calls.push(HostCall::Release);
        self.loaded
            .remove(&handle.0)
            .map(|_| ())
            .ok_or(HostError::UnknownHandle { handle })
    }
}
