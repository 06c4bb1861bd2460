use blender_host::{BlenderConfig, BlenderHost};
use mesh_host::{MeshHost, NativeHost};
use tracing::{info, warn};

use crate::cli::HostKind;
use crate::error::StlRepairError;

/// Build the requested host. `Auto` falls back to the built-in repair when
/// Blender cannot be started; an explicit `Blender` request does not.
pub fn select_host(
    kind: HostKind,
    config: BlenderConfig,
) -> Result<Box<dyn MeshHost>, StlRepairError> {
    match kind {
        HostKind::Native => Ok(Box::new(NativeHost::new())),
        HostKind::Blender => {
            let host = BlenderHost::new(config);
            let version = host.version().map_err(|e| {
                StlRepairError::invalid(format!(
                    "cannot run {}: {e}",
                    host.config().executable.display()
                ))
            })?;
            info!("Using {version}");
            Ok(Box::new(host))
        }
        HostKind::Auto => {
            let host = BlenderHost::new(config);
            match host.version() {
                Ok(version) => {
                    info!("Using {version}");
                    Ok(Box::new(host))
                }
                Err(e) => {
                    warn!("Blender not available ({e}), using built-in repair");
                    Ok(Box::new(NativeHost::new()))
                }
            }
        }
    }
}
