pub mod mesh;
pub mod mock_host;
pub mod native_host;
pub mod repair;
pub mod stl;
pub mod traits;
pub mod types;

pub use mesh::TriMesh;
pub use mock_host::{HostCall, MockHost};
pub use native_host::NativeHost;
pub use traits::*;
pub use types::*;
