//! Error types surfaced by the engine.

use std::fmt;
use thiserror::Error;

use crate::component::InstanceId;

/// Which family of hook a positional slot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    State,
    Effect,
    Memo,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookKind::State => f.write_str("state cell"),
            HookKind::Effect => f.write_str("effect"),
            HookKind::Memo => f.write_str("memo"),
        }
    }
}

/// How a render diverged from the hook sequence recorded by earlier renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderViolation {
    /// The render requested fewer hooks than before.
    Missing,
    /// The render requested a hook past the end of the recorded sequence.
    Extra,
    /// The slot at this position holds a different value type.
    TypeMismatch,
    /// An effect switched between having a dependency list and not having one.
    DependencyMode,
}

impl fmt::Display for OrderViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            OrderViolation::Missing => "fewer hooks requested than in the previous render",
            OrderViolation::Extra => "more hooks requested than in the previous render",
            OrderViolation::TypeMismatch => "slot holds a value of a different type",
            OrderViolation::DependencyMode => "dependency list added or removed between renders",
        };
        f.write_str(text)
    }
}

/// Errors reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    #[error("hook order violation in {instance}: {kind} #{position}: {reason}")]
    HookOrderViolation {
        instance: InstanceId,
        kind: HookKind,
        position: usize,
        reason: OrderViolation,
    },

    #[error("effect #{position} of {instance} panicked: {message}")]
    EffectPanicked {
        instance: InstanceId,
        position: usize,
        message: String,
    },

    #[error("{instance} rendered more than {limit} times in one flush")]
    RenderLimitExceeded { instance: InstanceId, limit: usize },
}

impl HookError {
    pub(crate) fn order(
        instance: InstanceId,
        kind: HookKind,
        position: usize,
        reason: OrderViolation,
    ) -> Self {
        HookError::HookOrderViolation {
            instance,
            kind,
            position,
            reason,
        }
    }

    /// The instance the error belongs to.
    pub fn instance(&self) -> InstanceId {
        match self {
            HookError::HookOrderViolation { instance, .. }
            | HookError::EffectPanicked { instance, .. }
            | HookError::RenderLimitExceeded { instance, .. } => *instance,
        }
    }

    /// Whether the error is fatal for the instance (recovery is a remount).
    pub fn is_fatal(&self) -> bool {
        !matches!(self, HookError::EffectPanicked { .. })
    }
}
