use std::collections::HashSet;
use std::path::PathBuf;

use blender_host::BlenderConfig;
use clap::{Parser, ValueEnum};
use mesh_host::RepairSettings;

use crate::error::StlRepairError;
use crate::paths;
use crate::pipeline::{PipelineOptions, RepairJob};

/// Which mesh host performs the repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HostKind {
    /// Blender when it can be launched, otherwise the built-in repair.
    Auto,
    Blender,
    Native,
}

/// Repair STL meshes: merge duplicate vertices, fill small holes, fix normals.
#[derive(Debug, Parser)]
#[command(name = "stl-repair", version)]
pub struct Cli {
    /// STL files to repair, processed in order.
    #[arg(required = true, value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,

    /// Output file (single input only). The suffix is ignored when this is set.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Appended to the input's file stem to name the output.
    #[arg(short, long, default_value = "_fixed")]
    pub suffix: String,

    /// 0 = silent, 1 = warnings, 2 = progress, 3 = everything.
    #[arg(
        short,
        long,
        default_value_t = 2,
        value_parser = clap::value_parser!(u8).range(0..=3)
    )]
    pub verbose: u8,

    /// Do not write a .log file next to the output.
    #[arg(long)]
    pub no_log_file: bool,

    /// Skip the 3D-Print add-on even when it is available.
    #[arg(long)]
    pub force_basic: bool,

    #[arg(long, value_enum, default_value_t = HostKind::Auto)]
    pub host: HostKind,

    /// Blender executable.
    #[arg(long, env = "STL_REPAIR_BLENDER", default_value = "blender")]
    pub blender: PathBuf,

    /// Never download the 3D-Print add-on.
    #[arg(long)]
    pub no_addon_install: bool,

    /// Vertices closer than this are merged.
    #[arg(long, default_value_t = 1e-4, allow_negative_numbers = true)]
    pub merge_distance: f64,

    /// Largest hole, in edges, to fill. 0 fills every hole.
    #[arg(long, default_value_t = 4)]
    pub max_hole_sides: usize,

    /// Move the repaired mesh so its volume centre is at the origin.
    #[arg(long)]
    pub center: bool,

    /// Replace an existing output file.
    #[arg(long)]
    pub overwrite: bool,
}

impl Cli {
    /// One job per input, validated against each other.
    pub fn jobs(&self) -> Result<Vec<RepairJob>, StlRepairError> {
        if self.output.is_some() && self.inputs.len() > 1 {
            return Err(StlRepairError::invalid(
                "--output can only be used with a single input",
            ));
        }
        if self.output.is_none() && self.suffix.is_empty() {
            return Err(StlRepairError::invalid(
                "an empty --suffix would overwrite the input",
            ));
        }

        let mut seen = HashSet::new();
        let mut jobs = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            let output = paths::resolve_output(input, self.output.as_deref(), &self.suffix);
            if paths::same_file(input, &output) {
                return Err(StlRepairError::invalid(format!(
                    "output {} is the input file",
                    output.display()
                )));
            }
            if !seen.insert(output.clone()) {
                return Err(StlRepairError::invalid(format!(
                    "two inputs would both write {}",
                    output.display()
                )));
            }
            jobs.push(RepairJob {
                input: input.clone(),
                output,
            });
        }
        Ok(jobs)
    }

    pub fn settings(&self) -> Result<RepairSettings, StlRepairError> {
        if !self.merge_distance.is_finite() || self.merge_distance < 0.0 {
            return Err(StlRepairError::invalid(format!(
                "--merge-distance must be a non-negative number, got {}",
                self.merge_distance
            )));
        }
        Ok(RepairSettings {
            merge_distance: self.merge_distance,
            max_hole_sides: self.max_hole_sides,
            center: self.center,
        })
    }

    pub fn options(&self) -> Result<PipelineOptions, StlRepairError> {
        Ok(PipelineOptions {
            settings: self.settings()?,
            force_basic: self.force_basic,
            overwrite: self.overwrite,
        })
    }

    pub fn blender_config(&self) -> BlenderConfig {
        BlenderConfig {
            executable: self.blender.clone(),
            install_addon: !self.no_addon_install,
            ..BlenderConfig::default()
        }
    }

    /// Log file for this run, next to the first output.
    pub fn log_path(&self, jobs: &[RepairJob]) -> Option<PathBuf> {
        if self.no_log_file {
            return None;
        }
        jobs.first().map(|job| paths::log_file_path(&job.output))
    }
}
