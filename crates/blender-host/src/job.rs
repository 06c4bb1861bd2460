//! JSON contract between BlenderHost and the Python driver.

use std::path::{Path, PathBuf};

use mesh_host::{HostError, MeshStats, RepairOp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobMode {
    /// Enable (and optionally install) the 3D-Print add-on, report availability.
    Probe,
    /// Import, run the steps, export.
    Repair,
}

/// One repair step, replayed by the driver in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum JobStep {
    MergeVertices { distance: f64 },
    FillHoles { sides: usize },
    RecomputeNormals,
    AdvancedRepair,
    Center,
}

impl JobStep {
    pub fn op(&self) -> RepairOp {
        match self {
            JobStep::MergeVertices { .. } => RepairOp::MergeVertices,
            JobStep::FillHoles { .. } => RepairOp::FillHoles,
            JobStep::RecomputeNormals => RepairOp::RecomputeNormals,
            JobStep::AdvancedRepair => RepairOp::AdvancedRepair,
            JobStep::Center => RepairOp::Center,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub mode: JobMode,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub steps: Vec<JobStep>,
    pub install_addon: bool,
    /// Where the driver writes its JobReport.
    pub report: PathBuf,
}

impl Job {
    pub fn probe(install_addon: bool, report: PathBuf) -> Self {
        Self {
            mode: JobMode::Probe,
            input: None,
            output: None,
            steps: Vec::new(),
            install_addon,
            report,
        }
    }

    pub fn repair(input: &Path, output: &Path, steps: Vec<JobStep>, report: PathBuf) -> Self {
        Self {
            mode: JobMode::Repair,
            input: Some(input.to_path_buf()),
            output: Some(output.to_path_buf()),
            steps,
            // The probe already installed the add-on if it could.
            install_addon: false,
            report,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Import,
    Repair,
    Export,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StepReport {
    pub stage: Stage,
    pub op: Option<RepairOp>,
    pub ok: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobReport {
    pub ok: bool,
    #[serde(default)]
    pub steps: Vec<StepReport>,
    pub addon: Option<bool>,
    pub stats: Option<MeshStats>,
    /// Traceback of an exception outside any step.
    pub error: Option<String>,
}

impl JobReport {
    /// Translate a repair report into the host error for the first failed step.
    pub fn into_result(self, input: &Path, output: &Path) -> Result<Option<MeshStats>, HostError> {
        if let Some(step) = self.steps.iter().find(|s| !s.ok) {
            let reason = step
                .message
                .clone()
                .unwrap_or_else(|| "no message from Blender".to_string());
            return Err(match (step.stage, step.op) {
                (Stage::Import, _) => HostError::Load {
                    path: input.to_path_buf(),
                    reason,
                },
                (Stage::Repair, Some(op)) => HostError::Operation {
                    operation: op,
                    reason,
                },
                (Stage::Repair, None) => HostError::Unavailable { reason },
                (Stage::Export, _) => HostError::Export {
                    path: output.to_path_buf(),
                    reason,
                },
            });
        }
        if let Some(trace) = self.error {
            return Err(HostError::Unavailable {
                reason: trace.trim().lines().last().unwrap_or("driver failed").to_string(),
            });
        }
        if !self.ok {
            return Err(HostError::Unavailable {
                reason: "driver reported failure without details".to_string(),
            });
        }
        Ok(self.stats)
    }
}
