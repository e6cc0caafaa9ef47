//! The render-trigger loop.
//!
//! This module provides the scheduler that owns mounted instances, the
//! coalescing render queue that setters feed, and the error sink seam.

mod queue;
mod scheduler;
mod sink;

pub(crate) use queue::{RenderLink, RenderQueue};
pub use queue::FlushTrigger;
pub use scheduler::{Scheduler, SchedulerBuilder};
pub use sink::{ErrorSink, TracingSink};
