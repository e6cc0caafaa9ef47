//! Memoized values gated by a dependency list.

mod memo;

pub(crate) use memo::{ErasedMemo, MemoSlot};
