use std::any::Any;
use std::panic::Location;

/// A memoized value and the dependencies it was computed from.
pub(crate) struct MemoSlot<D, T> {
    deps: D,
    cached_value: T,
    site: &'static Location<'static>,
}

impl<D: PartialEq + 'static, T: Clone + 'static> MemoSlot<D, T> {
    pub(crate) fn new(deps: D, compute: impl FnOnce() -> T, site: &'static Location<'static>) -> Self {
        Self {
            cached_value: compute(),
            deps,
            site,
        }
    }

    pub(crate) fn site(&self) -> &'static Location<'static> {
        self.site
    }

    pub(crate) fn cached(&self) -> T {
        self.cached_value.clone()
    }

    /// Get the cached value, recomputing first if `deps` changed.
    pub(crate) fn get(&mut self, deps: D, compute: impl FnOnce() -> T) -> T {
        if self.deps != deps {
            self.cached_value = compute();
            self.deps = deps;
        }
        self.cached_value.clone()
    }
}

/// Type-erased memo storage; the concrete slot is recovered by downcasting.
pub(crate) type ErasedMemo = Box<dyn Any>;
