//! BlenderHost: MeshHost implementation that defers to Blender.
//!
//! Import validates the file locally so load failures surface before Blender
//! starts. Repair calls only append to the mesh's job plan; export runs the
//! whole plan in one Blender process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use mesh_host::stl;
use mesh_host::{HostCapabilities, HostError, MeshHandle, MeshHost, MeshStats, RepairOp};
use tracing::{debug, info, warn};

use crate::job::{Job, JobStep};
use crate::runner::{self, RunError};

/// How to launch Blender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlenderConfig {
    pub executable: PathBuf,
    /// Start from factory settings, ignoring the user's startup file.
    pub factory_startup: bool,
    /// Download the 3D-Print add-on when it is not installed.
    pub install_addon: bool,
}

impl Default for BlenderConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("blender"),
            factory_startup: true,
            install_addon: true,
        }
    }
}

/// Recorded work for one imported mesh.
#[derive(Debug, Clone)]
struct JobPlan {
    input: PathBuf,
    steps: Vec<JobStep>,
    stats: MeshStats,
}

pub struct BlenderHost {
    config: BlenderConfig,
    capabilities: Option<HostCapabilities>,
    next_handle: u64,
    plans: HashMap<u64, JobPlan>,
}

impl BlenderHost {
    pub fn new(config: BlenderConfig) -> Self {
        Self {
            config,
            capabilities: None,
            next_handle: 1,
            plans: HashMap::new(),
        }
    }

    pub fn config(&self) -> &BlenderConfig {
        &self.config
    }

    /// Check that the executable runs; returns its version banner.
    pub fn version(&self) -> Result<String, HostError> {
        runner::blender_version(&self.config.executable).map_err(unavailable)
    }

    /// Steps recorded so far for `handle`.
    pub fn planned_steps(&self, handle: MeshHandle) -> Option<&[JobStep]> {
        self.plans.get(&handle.0).map(|p| p.steps.as_slice())
    }

    fn alloc_handle(&mut self) -> MeshHandle {
        let h = MeshHandle(self.next_handle);
        self.next_handle += 1;
        h
    }

    fn plan_mut(&mut self, handle: MeshHandle) -> Result<&mut JobPlan, HostError> {
        self.plans
            .get_mut(&handle.0)
            .ok_or(HostError::UnknownHandle { handle })
    }

    fn push(&mut self, handle: MeshHandle, step: JobStep) -> Result<(), HostError> {
        debug!(%handle, op = %step.op(), "queued for Blender");
        self.plan_mut(handle)?.steps.push(step);
        Ok(())
    }

    fn probe(&self) -> Result<bool, RunError> {
        let job = Job::probe(self.config.install_addon, PathBuf::new());
        let report = runner::run_job(&self.config.executable, self.config.factory_startup, job)?;
        if let Some(error) = &report.error {
            debug!(%error, "probe raised");
        }
        Ok(report.addon.unwrap_or(false))
    }
}

fn unavailable(err: RunError) -> HostError {
    HostError::Unavailable {
        reason: err.to_string(),
    }
}

impl MeshHost for BlenderHost {
    fn name(&self) -> &str {
        "blender"
    }

    fn capabilities(&mut self) -> HostCapabilities {
        if let Some(caps) = self.capabilities {
            return caps;
        }
        let advanced_repair = match self.probe() {
            Ok(present) => {
                info!(present, "3D-Print add-on probe");
                present
            }
            Err(e) => {
                warn!("could not probe Blender for the 3D-Print add-on: {e}");
                false
            }
        };
        let caps = HostCapabilities { advanced_repair };
        self.capabilities = Some(caps);
        caps
    }

    fn import_mesh(&mut self, path: &Path) -> Result<MeshHandle, HostError> {
        let mesh = stl::read_stl(path).map_err(|e| HostError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let stats = mesh.stats();
        info!(
            vertices = stats.vertices,
            triangles = stats.triangles,
            "queued {} for Blender",
            path.display()
        );
        let handle = self.alloc_handle();
        self.plans.insert(
            handle.0,
            JobPlan {
                input: path.to_path_buf(),
                steps: Vec::new(),
                stats,
            },
        );
        Ok(handle)
    }

    fn merge_vertices(&mut self, handle: MeshHandle, distance: f64) -> Result<(), HostError> {
        self.push(handle, JobStep::MergeVertices { distance })
    }

    fn fill_holes(&mut self, handle: MeshHandle, max_sides: usize) -> Result<(), HostError> {
        self.push(handle, JobStep::FillHoles { sides: max_sides })
    }

    fn recompute_normals(&mut self, handle: MeshHandle) -> Result<(), HostError> {
        self.push(handle, JobStep::RecomputeNormals)
    }

    fn advanced_repair(&mut self, handle: MeshHandle) -> Result<(), HostError> {
        if !self.capabilities().advanced_repair {
            return Err(HostError::Unavailable {
                reason: format!("{} add-on is not available", RepairOp::AdvancedRepair),
            });
        }
        self.push(handle, JobStep::AdvancedRepair)
    }

    fn center(&mut self, handle: MeshHandle) -> Result<(), HostError> {
        self.push(handle, JobStep::Center)
    }

    /// Counts from the last Blender run, or of the imported file before one.
    fn stats(&mut self, handle: MeshHandle) -> Result<Option<MeshStats>, HostError> {
        Ok(Some(self.plan_mut(handle)?.stats))
    }

    fn export_mesh(&mut self, handle: MeshHandle, path: &Path) -> Result<(), HostError> {
        let export_err = |reason: String| HostError::Export {
            path: path.to_path_buf(),
            reason,
        };
        let plan = self.plan_mut(handle)?.clone();

        // Blender writes beside the destination; the result replaces it only
        // after a clean report. Dropping `staged` removes any partial file.
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let staged = tempfile::Builder::new()
            .prefix(".stl-repair-")
            .suffix(".stl")
            .tempfile_in(dir)
            .map_err(|e| export_err(e.to_string()))?;

        let job = Job::repair(&plan.input, staged.path(), plan.steps, PathBuf::new());
        let report = runner::run_job(&self.config.executable, self.config.factory_startup, job)
            .map_err(unavailable)?;
        let stats = report.into_result(&plan.input, path)?;

        let written = staged
            .path()
            .metadata()
            .map(|m| m.len())
            .map_err(|e| export_err(e.to_string()))?;
        if written == 0 {
            return Err(export_err("Blender finished but wrote nothing".to_string()));
        }
        staged
            .persist(path)
            .map_err(|e| export_err(e.error.to_string()))?;

        if let Some(stats) = stats {
            self.plan_mut(handle)?.stats = stats;
        }
        debug!(bytes = written, "Blender wrote {}", path.display());
        Ok(())
    }

    fn release(&mut self, handle: MeshHandle) -> Result<(), HostError> {
        self.plans
            .remove(&handle.0)
            .map(|_| ())
            .ok_or(HostError::UnknownHandle { handle })
    }
}
