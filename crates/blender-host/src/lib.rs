//! Mesh host backed by a Blender executable.
//!
//! Blender runs in background mode with an embedded Python driver. Repair
//! calls are recorded per mesh and replayed in a single Blender process when
//! the mesh is exported.

pub mod blender_host;
pub mod job;
pub mod runner;

pub use blender_host::{BlenderConfig, BlenderHost};
pub use job::{Job, JobMode, JobReport, JobStep, Stage, StepReport};
