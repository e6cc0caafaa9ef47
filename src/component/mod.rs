//! Component instances, the hook context and the host seam.

mod hooks;
mod host;
mod instance;

pub use hooks::Hooks;
pub use host::{CommitLog, Host};
pub use instance::{Component, InstanceHandle, InstanceId, Lifecycle};

pub(crate) use instance::{ComponentInstance, Renderable, Status};
