use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

use super::{ErrorSink, FlushTrigger, RenderLink, RenderQueue, TracingSink};
use crate::component::{ComponentInstance, Host, Hooks, InstanceHandle, InstanceId, Lifecycle, Renderable, Status};
use crate::config::SchedulerConfig;
use crate::error::HookError;

/// Owns mounted component instances and drives their render passes.
///
/// The scheduler is the render-trigger loop: it mounts instances, collects
/// render requests from setters and handles into a coalescing queue, and
/// renders everything pending when [`flush`](Scheduler::flush) is called.
/// Rendering happens on the thread that owns the scheduler; setters and
/// handles may be used from anywhere.
///
/// # Examples
///
/// ```
/// use hookcell::{CommitLog, HookError, Hooks, Scheduler};
///
/// fn greeting(cx: &mut Hooks<'_>, name: &String) -> Result<String, HookError> {
///     let (greeting, _) = cx.use_state("Hello".to_string())?;
///     Ok(format!("{greeting}, {name}!"))
/// }
///
/// let scheduler = Scheduler::new();
/// let log = CommitLog::new();
/// let handle = scheduler.mount(greeting, "world".to_string(), log.clone());
///
/// assert_eq!(log.last().as_deref(), Some("Hello, world!"));
/// assert!(scheduler.unmount(&handle));
/// ```
pub struct Scheduler {
    config: SchedulerConfig,
    next_id: AtomicUsize,
    queue: Arc<RenderQueue>,
    instances: RefCell<HashMap<InstanceId, Box<dyn Renderable>>>,
    /// Instances taken out of `instances` for a render pass.
    in_flight: RefCell<HashMap<InstanceId, Status>>,
    /// Set while a flush or mount render is on the stack.
    busy: Cell<bool>,
    sink: Box<dyn ErrorSink>,
}

/// Restores the scheduler's busy flag when a render pass unwinds or ends.
struct BusyGuard<'a> {
    flag: &'a Cell<bool>,
    outer: bool,
}

impl<'a> BusyGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        let outer = flag.replace(true);
        Self { flag, outer }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(self.outer);
    }
}

impl Scheduler {
    /// A scheduler with default configuration, manual flushing and the
    /// [`TracingSink`].
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::default()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Create an instance of `component` and perform its initial render.
    ///
    /// Output of every committed render is delivered to `host`. A failed
    /// initial render is reported to the error sink and leaves the instance
    /// faulted.
    pub fn mount<P, O, C, H>(&self, component: C, props: P, host: H) -> InstanceHandle
    where
        P: 'static,
        O: 'static,
        C: Fn(&mut Hooks<'_>, &P) -> Result<O, HookError> + 'static,
        H: Host<O> + 'static,
    {
        let id = InstanceId::from_raw(self.next_id.fetch_add(1, Ordering::SeqCst));
        let link = RenderLink::new(id, Arc::downgrade(&self.queue));
        let mut instance: Box<dyn Renderable> =
            Box::new(ComponentInstance::new(Box::new(component), props, Box::new(host), link.clone()));
        debug!(instance = %id, "mounted");

        let _busy = BusyGuard::enter(&self.busy);
        self.in_flight.borrow_mut().insert(id, instance.status());
        self.render(instance.as_mut());
        self.restore(id, instance);
        InstanceHandle::new(link)
    }

    /// Tear an instance down. Pending requests are dropped and later writes
    /// through its setters are ignored. Returns `false` if it was already
    /// unmounted.
    pub fn unmount(&self, handle: &InstanceHandle) -> bool {
        if !handle.link().belongs_to(&self.queue) {
            return false;
        }
        let was_mounted = handle.link().unmount();
        self.queue.remove(handle.id());
        let removed = self.instances.borrow_mut().remove(&handle.id());
        if was_mounted {
            debug!(instance = %handle.id(), "unmounted");
        }
        drop(removed);
        was_mounted
    }

    /// Ask for a render pass of `handle`'s instance on the next flush.
    pub fn request_render(&self, handle: &InstanceHandle) -> bool {
        handle.request_render()
    }

    /// Render every pending instance, including those requested by effects
    /// while flushing, until the queue is empty. Returns the number of
    /// committed render passes.
    ///
    /// Called from an effect while a flush or mount is already rendering,
    /// this returns 0 and leaves the queue to the render loop in progress.
    pub fn flush(&self) -> usize {
        if self.busy.get() {
            trace!(pending = self.queue.len(), "nested flush deferred to the running one");
            return 0;
        }
        let _busy = BusyGuard::enter(&self.busy);

        let limit = self.config.max_renders_per_flush;
        let mut passes: HashMap<InstanceId, usize> = HashMap::new();
        let mut committed = 0;

        while let Some(id) = self.queue.pop() {
            let taken = self.take(id);
            let Some(mut instance) = taken else {
                trace!(instance = %id, "render request for unknown instance dropped");
                continue;
            };

            let count = passes.entry(id).or_default();
            *count += 1;
            if *count > limit {
                self.sink.report(&HookError::RenderLimitExceeded { instance: id, limit });
                instance.fault();
            } else {
                committed += self.render(instance.as_mut());
            }
            self.restore(id, instance);
        }

        if committed > 0 {
            debug!(committed, "flush complete");
        }
        committed
    }

    /// Run `f`, then flush whatever it requested.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        let result = f();
        self.flush();
        result
    }

    /// Instances waiting for a render pass.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Where `handle`'s instance is in its lifecycle. A handle issued by
    /// another scheduler reads as `Unmounted`.
    pub fn lifecycle(&self, handle: &InstanceHandle) -> Lifecycle {
        if !handle.is_mounted() || !handle.link().belongs_to(&self.queue) {
            return Lifecycle::Unmounted;
        }
        let id = handle.id();
        if let Some(instance) = self.instances.borrow().get(&id) {
            return instance.lifecycle();
        }
        match self.in_flight.borrow().get(&id) {
            Some(status) => status.get(),
            None => Lifecycle::Unmounted,
        }
    }

    /// Completed render passes of `handle`'s instance, if it is still held.
    pub fn render_count(&self, handle: &InstanceHandle) -> Option<usize> {
        if !handle.link().belongs_to(&self.queue) {
            return None;
        }
        self.instances.borrow().get(&handle.id()).map(|instance| instance.renders())
    }

    fn take(&self, id: InstanceId) -> Option<Box<dyn Renderable>> {
        let instance = self.instances.borrow_mut().remove(&id)?;
        self.in_flight.borrow_mut().insert(id, instance.status());
        Some(instance)
    }

    fn render(&self, instance: &mut dyn Renderable) -> usize {
        match instance.render(&self.config, self.sink.as_ref()) {
            Ok(report) => {
                trace!(effects_run = report.effects_run, "render pass finished");
                usize::from(report.committed)
            }
            Err(err) => {
                self.sink.report(&err);
                0
            }
        }
    }

    fn restore(&self, id: InstanceId, instance: Box<dyn Renderable>) {
        self.in_flight.borrow_mut().remove(&id);
        if instance.lifecycle() == Lifecycle::Unmounted {
            trace!(instance = %id, "instance unmounted while rendering");
            return;
        }
        self.instances.borrow_mut().insert(id, instance);
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`Scheduler`].
#[derive(Default)]
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    sink: Option<Box<dyn ErrorSink>>,
    trigger: Option<FlushTrigger>,
}

impl SchedulerBuilder {
    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Where render and effect errors are reported.
    pub fn error_sink(mut self, sink: impl ErrorSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Called whenever the render queue goes from empty to non-empty, so a
    /// host event loop can schedule a [`Scheduler::flush`].
    pub fn flush_trigger(mut self, trigger: impl Fn() + Send + Sync + 'static) -> Self {
        self.trigger = Some(Box::new(trigger));
        self
    }

    pub fn build(self) -> Scheduler {
        Scheduler {
            config: self.config,
            next_id: AtomicUsize::new(0),
            queue: Arc::new(RenderQueue::new(self.trigger)),
            instances: RefCell::new(HashMap::new()),
            in_flight: RefCell::new(HashMap::new()),
            busy: Cell::new(false),
            sink: self.sink.unwrap_or_else(|| Box::new(TracingSink)),
        }
    }
}
