use tracing::error;

use crate::error::HookError;

/// Destination for errors that must not unwind through the render loop.
pub trait ErrorSink {
    fn report(&self, error: &HookError);
}

impl<F> ErrorSink for F
where
    F: Fn(&HookError),
{
    fn report(&self, error: &HookError) {
        self(error)
    }
}

/// Default sink: logs every error through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, err: &HookError) {
        error!(instance = %err.instance(), fatal = err.is_fatal(), "{err}");
    }
}
