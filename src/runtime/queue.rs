use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::trace;

use crate::component::InstanceId;

/// Callback invoked when the render queue goes from empty to non-empty.
pub type FlushTrigger = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct QueueState {
    order: VecDeque<InstanceId>,
    queued: HashSet<InstanceId>,
}

/// Pending render requests for one scheduler.
///
/// Requests are coalesced: an instance appears at most once until it is
/// popped for rendering.
pub(crate) struct RenderQueue {
    state: Mutex<QueueState>,
    trigger: Option<FlushTrigger>,
}

impl RenderQueue {
    pub(crate) fn new(trigger: Option<FlushTrigger>) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            trigger,
        }
    }

    /// Enqueue a render request. Returns `false` if it was coalesced into an
    /// already pending one.
    pub(crate) fn push(&self, instance: InstanceId) -> bool {
        let became_busy = {
            let mut state = self.state.lock();
            if !state.queued.insert(instance) {
                trace!(%instance, "render request coalesced");
                return false;
            }
            state.order.push_back(instance);
            state.order.len() == 1
        };

        // Called outside the lock so the trigger may inspect the queue.
        if became_busy {
            if let Some(trigger) = &self.trigger {
                trigger();
            }
        }
        true
    }

    pub(crate) fn pop(&self) -> Option<InstanceId> {
        let mut state = self.state.lock();
        let instance = state.order.pop_front()?;
        state.queued.remove(&instance);
        Some(instance)
    }

    pub(crate) fn remove(&self, instance: InstanceId) {
        let mut state = self.state.lock();
        if state.queued.remove(&instance) {
            state.order.retain(|queued| *queued != instance);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().order.len()
    }
}

/// The path from a setter or handle back to its instance's render queue.
#[derive(Clone)]
pub(crate) struct RenderLink {
    instance: InstanceId,
    mounted: Arc<AtomicBool>,
    queue: Weak<RenderQueue>,
}

impl RenderLink {
    pub(crate) fn new(instance: InstanceId, queue: Weak<RenderQueue>) -> Self {
        Self {
            instance,
            mounted: Arc::new(AtomicBool::new(true)),
            queue,
        }
    }

    pub(crate) fn instance(&self) -> InstanceId {
        self.instance
    }

    pub(crate) fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    /// Whether this link was issued by the scheduler that owns `queue`.
    pub(crate) fn belongs_to(&self, queue: &Arc<RenderQueue>) -> bool {
        std::ptr::eq(self.queue.as_ptr(), Arc::as_ptr(queue))
    }

    /// Returns whether the instance was still mounted.
    pub(crate) fn unmount(&self) -> bool {
        self.mounted.swap(false, Ordering::AcqRel)
    }

    /// Ask for a render pass. No-op after unmount or once the scheduler is gone.
    pub(crate) fn request(&self) -> bool {
        if !self.is_mounted() {
            trace!(instance = %self.instance, "render request after unmount ignored");
            return false;
        }
        match self.queue.upgrade() {
            Some(queue) => queue.push(self.instance),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn push_coalesces_until_popped() {
        let queue = RenderQueue::new(None);
        let id = InstanceId::from_raw(1);

        assert!(queue.push(id));
        assert!(!queue.push(id));
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.pop(), Some(id));
        assert_eq!(queue.pop(), None);
        assert!(queue.push(id));
    }

    #[test]
    fn trigger_fires_once_per_batch() {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        let queue = RenderQueue::new(Some(Box::new(move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        })));

        queue.push(InstanceId::from_raw(1));
        queue.push(InstanceId::from_raw(2));
        queue.push(InstanceId::from_raw(1));
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        while queue.pop().is_some() {}
        queue.push(InstanceId::from_raw(2));
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn remove_drops_pending_request() {
        let queue = RenderQueue::new(None);
        queue.push(InstanceId::from_raw(1));
        queue.push(InstanceId::from_raw(2));
        queue.remove(InstanceId::from_raw(1));
        assert_eq!(queue.pop(), Some(InstanceId::from_raw(2)));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn link_is_inert_after_unmount() {
        let queue = Arc::new(RenderQueue::new(None));
        let link = RenderLink::new(InstanceId::from_raw(4), Arc::downgrade(&queue));

        assert!(link.request());
        assert!(link.unmount());
        assert!(!link.unmount());
        queue.pop();
        assert!(!link.request());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn link_knows_its_queue() {
        let queue = Arc::new(RenderQueue::new(None));
        let other = Arc::new(RenderQueue::new(None));
        let link = RenderLink::new(InstanceId::from_raw(0), Arc::downgrade(&queue));

        assert!(link.belongs_to(&queue));
        assert!(!link.belongs_to(&other));
    }
}
