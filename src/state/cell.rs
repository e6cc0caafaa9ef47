use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use std::any::Any;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;
use tracing::trace;

use crate::component::InstanceId;
use crate::runtime::RenderLink;

/// A positional state slot owned by one component instance.
///
/// The live value is shared with every [`Setter`] handed out for the slot;
/// `snapshot` is the value the current render pass observes.
pub(crate) struct StateCell<T> {
    value: Arc<RwLock<T>>,
    snapshot: T,
    site: &'static Location<'static>,
}

impl<T: Clone + Send + Sync + 'static> StateCell<T> {
    pub(crate) fn new(initial: T, site: &'static Location<'static>) -> Self {
        Self {
            value: Arc::new(RwLock::new(initial.clone())),
            snapshot: initial,
            site,
        }
    }

    pub(crate) fn site(&self) -> &'static Location<'static> {
        self.site
    }

    pub(crate) fn snapshot(&self) -> T {
        self.snapshot.clone()
    }

    pub(crate) fn setter(&self, link: &RenderLink) -> Setter<T> {
        Setter {
            value: Arc::clone(&self.value),
            link: link.clone(),
        }
    }
}

/// Type-erased view of a [`StateCell`] so an instance can hold cells of
/// different types in one sequence.
pub(crate) trait ErasedCell {
    /// Copy the live value into the render snapshot.
    fn capture(&mut self);
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Clone + Send + Sync + 'static> ErasedCell for StateCell<T> {
    fn capture(&mut self) {
        self.snapshot = self.value.read().clone();
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Writes a state cell and schedules a re-render of its instance.
///
/// Setters are cheap to clone and may be moved to other threads, so an effect
/// can hand one to background work and deliver the result later. Once the
/// owning instance is unmounted every call is a silent no-op.
pub struct Setter<T> {
    value: Arc<RwLock<T>>,
    link: RenderLink,
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            link: self.link.clone(),
        }
    }
}

impl<T> fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter")
            .field("instance", &self.link.instance())
            .field("mounted", &self.link.is_mounted())
            .finish()
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Setter<T> {
    /// Commit `next` and request a render. Writing a value equal to the
    /// current one does nothing.
    pub fn set(&self, next: T) {
        self.update(move |_| next);
    }

    /// Compute the next value from the latest committed one.
    ///
    /// `f` runs under an upgradable read lock: it may call [`get`](Self::get)
    /// on this cell, but must not `set` or `update` it.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        if !self.link.is_mounted() {
            trace!(instance = %self.link.instance(), "state write after unmount ignored");
            return;
        }
        {
            let value = self.value.upgradable_read();
            let next = f(&*value);
            if *value == next {
                trace!(instance = %self.link.instance(), "state write unchanged");
                return;
            }
            *RwLockUpgradableReadGuard::upgrade(value) = next;
        }
        self.link.request();
    }

    /// The latest committed value, including writes not yet rendered.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// The instance this setter belongs to.
    pub fn instance(&self) -> InstanceId {
        self.link.instance()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RenderQueue;

    fn cell_with_queue(initial: i32) -> (StateCell<i32>, RenderLink, Arc<RenderQueue>) {
        let queue = Arc::new(RenderQueue::new(None));
        let link = RenderLink::new(InstanceId::from_raw(0), Arc::downgrade(&queue));
        (StateCell::new(initial, Location::caller()), link, queue)
    }

    #[test]
    fn set_enqueues_and_snapshot_waits_for_capture() {
        let (mut cell, link, queue) = cell_with_queue(0);
        let setter = cell.setter(&link);

        setter.set(5);
        assert_eq!(setter.get(), 5);
        assert_eq!(cell.snapshot(), 0);
        assert_eq!(queue.len(), 1);

        cell.capture();
        assert_eq!(cell.snapshot(), 5);
    }

    #[test]
    fn equal_write_is_ignored() {
        let (cell, link, queue) = cell_with_queue(7);
        cell.setter(&link).set(7);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn update_reads_latest_value() {
        let (cell, link, _queue) = cell_with_queue(1);
        let setter = cell.setter(&link);
        setter.update(|n| n + 1);
        setter.update(|n| n * 10);
        assert_eq!(setter.get(), 20);
    }

    #[test]
    fn update_may_read_its_own_cell() {
        let (cell, link, _queue) = cell_with_queue(3);
        let setter = cell.setter(&link);
        setter.update(|n| n + setter.get());
        assert_eq!(setter.get(), 6);
    }

    #[test]
    fn writes_after_unmount_do_nothing() {
        let (cell, link, queue) = cell_with_queue(1);
        let setter = cell.setter(&link);
        link.unmount();

        setter.set(2);
        assert_eq!(setter.get(), 1);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn setter_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Setter<String>>();
    }
}
