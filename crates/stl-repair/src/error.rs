use std::path::PathBuf;

/// Top-level failure of a repair run. Every variant aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum StlRepairError {
    #[error("invalid arguments: {reason}")]
    InvalidArguments { reason: String },

    #[error("could not load {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("repair of {path} failed: {reason}")]
    Repair { path: PathBuf, reason: String },

    #[error("could not export {path}: {reason}")]
    Export { path: PathBuf, reason: String },
}

impl StlRepairError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        StlRepairError::InvalidArguments {
            reason: reason.into(),
        }
    }

    /// Stable name of the error kind, as shown in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StlRepairError::InvalidArguments { .. } => "InvalidArguments",
            StlRepairError::Load { .. } => "LoadError",
            StlRepairError::Repair { .. } => "RepairError",
            StlRepairError::Export { .. } => "ExportError",
        }
    }

    /// Process exit status. 2 matches clap's usage errors.
    pub fn exit_code(&self) -> u8 {
        match self {
            StlRepairError::Load { .. } => 1,
            StlRepairError::InvalidArguments { .. } => 2,
            StlRepairError::Repair { .. } => 3,
            StlRepairError::Export { .. } => 4,
        }
    }
}
