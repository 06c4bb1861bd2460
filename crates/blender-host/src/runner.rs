//! Launching Blender in background mode with the embedded driver script.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};
use xshell::{cmd, Shell};

use crate::job::{Job, JobReport};

/// Python driver executed inside Blender.
pub const DRIVER_SCRIPT: &str = include_str!("driver.py");

/// How many trailing stderr lines to keep in error messages.
const STDERR_TAIL: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("could not run {executable}: {source}")]
    Spawn {
        executable: PathBuf,
        #[source]
        source: xshell::Error,
    },

    #[error("I/O error preparing Blender job: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid job or report JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Blender exited ({status}) without writing a report: {stderr}")]
    MissingReport { status: String, stderr: String },
}

/// Command-line switches placed before `--python`.
pub fn blender_flags(factory_startup: bool) -> Vec<&'static str> {
    let mut flags = vec!["--background"];
    if factory_startup {
        flags.push("--factory-startup");
    }
    flags
}

/// Return the first line of `<exe> --version`.
pub fn blender_version(executable: &Path) -> Result<String, RunError> {
    let sh = Shell::new().map_err(|source| RunError::Spawn {
        executable: executable.to_path_buf(),
        source,
    })?;
    let out = cmd!(sh, "{executable} --version")
        .quiet()
        .read()
        .map_err(|source| RunError::Spawn {
            executable: executable.to_path_buf(),
            source,
        })?;
    Ok(out.lines().next().unwrap_or_default().trim().to_string())
}

/// Run one job through Blender and parse the driver's report.
///
/// The job's `report` path is overwritten to point inside a scratch directory.
pub fn run_job(executable: &Path, factory_startup: bool, mut job: Job) -> Result<JobReport, RunError> {
    let scratch = tempfile::tempdir()?;
    let script = scratch.path().join("stl_repair_driver.py");
    let job_file = scratch.path().join("job.json");
    job.report = scratch.path().join("report.json");

    fs::write(&script, DRIVER_SCRIPT)?;
    fs::write(&job_file, serde_json::to_vec_pretty(&job)?)?;
    debug!(mode = ?job.mode, steps = job.steps.len(), "starting Blender");

    let spawn_err = |source| RunError::Spawn {
        executable: executable.to_path_buf(),
        source,
    };
    let sh = Shell::new().map_err(spawn_err)?;
    let flags = blender_flags(factory_startup);
    let output = cmd!(sh, "{executable} {flags...} --python {script} -- {job_file}")
        .quiet()
        .ignore_status()
        .output()
        .map_err(spawn_err)?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    for line in stdout.lines().chain(stderr.lines()) {
        trace!(target: "blender", "{line}");
    }

    match fs::read(&job.report) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(_) => {
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(STDERR_TAIL)..].join(" | ");
            Err(RunError::MissingReport {
                status: output.status.to_string(),
                stderr: tail,
            })
        }
    }
}
