//! # Hookcell
//!
//! A small reactive engine for component functions.
//!
//! A component is a function that requests hooks from a [`Hooks`] context and
//! returns an output description. The engine provides three pieces:
//!
//! ## State cells
//!
//! - `Hooks::use_state` - a positional cell whose [`Setter`] commits a new
//!   value and schedules a re-render of the owning instance
//! - `Hooks::use_memo` - a value recomputed only when its dependencies change
//!
//! ## Effects
//!
//! - `Hooks::use_effect` - runs after every commit
//! - `Hooks::use_effect_with` - runs after the first commit and whenever its
//!   dependency value changes
//!
//! ## Render-trigger loop
//!
//! - [`Scheduler`] - mounts instances, coalesces render requests and renders
//!   them on [`Scheduler::flush`], delivering output to a [`Host`]
//! - [`ErrorSink`] - receives hook order violations and effect failures

pub mod component;
pub mod config;
mod effect;
pub mod error;
mod memo;
pub mod runtime;
pub mod state;

// Re-export main types for convenience
pub use component::{CommitLog, Component, Host, Hooks, InstanceHandle, InstanceId, Lifecycle};
pub use config::SchedulerConfig;
pub use error::{HookError, HookKind, OrderViolation};
pub use runtime::{ErrorSink, Scheduler, SchedulerBuilder, TracingSink};
pub use state::Setter;
