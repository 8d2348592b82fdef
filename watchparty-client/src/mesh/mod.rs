mod local_action;
mod mesh_coordinator;
mod mesh_handle;
mod mesh_input;
mod role;

pub use local_action::*;
pub use mesh_coordinator::*;
pub use mesh_handle::*;
pub use mesh_input::*;
pub use role::*;
