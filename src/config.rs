//! Scheduler configuration.

use serde::Deserialize;

/// Tunables for a [`Scheduler`](crate::Scheduler).
///
/// Deserializable so a host application can embed it in its own config file;
/// missing fields fall back to [`SchedulerConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Render passes a single instance may take within one `flush()` before
    /// it is faulted with `RenderLimitExceeded`.
    pub max_renders_per_flush: usize,
    /// Warn when a hook slot is requested from a different source line than
    /// the one that allocated it. Diagnostic only; the render proceeds.
    pub check_call_sites: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_renders_per_flush: 50,
            check_call_sites: cfg!(debug_assertions),
        }
    }
}

impl SchedulerConfig {
    pub fn max_renders_per_flush(mut self, limit: usize) -> Self {
        self.max_renders_per_flush = limit;
        self
    }

    pub fn check_call_sites(mut self, enabled: bool) -> Self {
        self.check_call_sites = enabled;
        self
    }
}
