//! Command-line STL repair: argument handling, output naming, logging and the
//! repair pipeline that drives a [`mesh_host::MeshHost`].

pub mod cli;
pub mod error;
pub mod host;
pub mod logging;
pub mod paths;
pub mod pipeline;

pub use cli::{Cli, HostKind};
pub use error::StlRepairError;
pub use pipeline::{repair_batch, repair_file, PipelineOptions, RepairJob, RepairReport};

/// Select a host and repair every job in order.
pub fn run(cli: &Cli, jobs: &[RepairJob]) -> Result<Vec<RepairReport>, StlRepairError> {
    let options = cli.options()?;
    let mut host = host::select_host(cli.host, cli.blender_config())?;
    repair_batch(host.as_mut(), jobs, &options)
}
