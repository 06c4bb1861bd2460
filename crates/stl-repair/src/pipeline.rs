//! The fixed repair sequence: import, merge, fill, normals, optional add-on, export.

use std::path::PathBuf;

use mesh_host::{HostError, MeshHandle, MeshHost, MeshStats, RepairSettings};
use tracing::{debug, info, warn};

use crate::error::StlRepairError;
use crate::paths;

/// Knobs for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub settings: RepairSettings,
    /// Never use the 3D-Print add-on, even when the host has it.
    pub force_basic: bool,
    /// Replace an existing output file.
    pub overwrite: bool,
}

/// One input/output pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// What a successful run did.
#[derive(Debug, Clone)]
pub struct RepairReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub host: String,
    pub advanced_used: bool,
    pub stats: Option<MeshStats>,
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Import,
    Repair,
    Export,
}

fn host_error(stage: Stage, job: &RepairJob, err: HostError) -> StlRepairError {
    match err {
        HostError::Load { path, reason } => StlRepairError::Load { path, reason },
        HostError::Operation { operation, reason } => StlRepairError::Repair {
            path: job.input.clone(),
            reason: format!("{operation}: {reason}"),
        },
        HostError::Export { path, reason } => StlRepairError::Export { path, reason },
        other => {
            let reason = other.to_string();
            match stage {
                Stage::Import => StlRepairError::Load {
                    path: job.input.clone(),
                    reason,
                },
                Stage::Repair => StlRepairError::Repair {
                    path: job.input.clone(),
                    reason,
                },
                Stage::Export => StlRepairError::Export {
                    path: job.output.clone(),
                    reason,
                },
            }
        }
    }
}

/// Repair one file. Either every step succeeds or the first failure is returned.
pub fn repair_file<H>(
    host: &mut H,
    job: &RepairJob,
    options: &PipelineOptions,
) -> Result<RepairReport, StlRepairError>
where
    H: MeshHost + ?Sized,
{
    if paths::same_file(&job.input, &job.output) {
        return Err(StlRepairError::invalid(format!(
            "output {} would replace the input",
            job.output.display()
        )));
    }
    if !job.input.is_file() {
        return Err(StlRepairError::Load {
            path: job.input.clone(),
            reason: "input file does not exist".to_string(),
        });
    }
    if job.output.exists() && !options.overwrite {
        return Err(StlRepairError::Export {
            path: job.output.clone(),
            reason: "file already exists (pass --overwrite to replace it)".to_string(),
        });
    }

    info!("Repairing {}", job.input.display());
    let mesh = host
        .import_mesh(&job.input)
        .map_err(|e| host_error(Stage::Import, job, e))?;

    let outcome = repair_loaded(host, mesh, job, options);
    if let Err(e) = host.release(mesh) {
        debug!("could not release {mesh}: {e}");
    }
    outcome
}

/// Steps after import. The caller releases `mesh` whatever the outcome.
fn repair_loaded<H>(
    host: &mut H,
    mesh: MeshHandle,
    job: &RepairJob,
    options: &PipelineOptions,
) -> Result<RepairReport, StlRepairError>
where
    H: MeshHost + ?Sized,
{
    let settings = &options.settings;
    let use_advanced = if options.force_basic {
        debug!("3D-Print add-on skipped (--force-basic)");
        false
    } else {
        let available = host.capabilities().advanced_repair;
        if !available {
            info!("Proceeding without 3D-Print add-on");
        }
        available
    };

    let repair = |e| host_error(Stage::Repair, job, e);
    host.merge_vertices(mesh, settings.merge_distance)
        .map_err(repair)?;
    host.fill_holes(mesh, settings.max_hole_sides)
        .map_err(repair)?;
    host.recompute_normals(mesh).map_err(repair)?;
    if use_advanced {
        info!("Running 3D-Print add-on checks");
        host.advanced_repair(mesh).map_err(repair)?;
    }
    if settings.center {
        host.center(mesh).map_err(repair)?;
    }

    host.export_mesh(mesh, &job.output)
        .map_err(|e| host_error(Stage::Export, job, e))?;

    let stats = match host.stats(mesh) {
        Ok(stats) => stats,
        Err(e) => {
            debug!("no stats from {} host: {e}", host.name());
            None
        }
    };
    if let Some(s) = stats {
        debug!(
            vertices = s.vertices,
            triangles = s.triangles,
            boundary_edges = s.boundary_edges,
            non_manifold_edges = s.non_manifold_edges,
            "repaired mesh"
        );
        if !s.is_manifold() {
            warn!(
                boundary_edges = s.boundary_edges,
                non_manifold_edges = s.non_manifold_edges,
                "{} is still not manifold",
                job.output.display()
            );
        }
    }

    info!("Repaired file saved: {}", job.output.display());
    Ok(RepairReport {
        input: job.input.clone(),
        output: job.output.clone(),
        host: host.name().to_string(),
        advanced_used: use_advanced,
        stats,
    })
}

/// Repair several files one after another, stopping at the first failure.
pub fn repair_batch<H>(
    host: &mut H,
    jobs: &[RepairJob],
    options: &PipelineOptions,
) -> Result<Vec<RepairReport>, StlRepairError>
where
    H: MeshHost + ?Sized,
{
    let mut reports = Vec::with_capacity(jobs.len());
    for (i, job) in jobs.iter().enumerate() {
        if jobs.len() > 1 {
            info!("[{}/{}] {}", i + 1, jobs.len(), job.input.display());
        }
        reports.push(repair_file(host, job, options)?);
    }
    Ok(reports)
}
