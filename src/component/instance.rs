use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

use super::hooks::{HookSlots, Hooks};
use super::host::Host;
use crate::config::SchedulerConfig;
use crate::error::HookError;
use crate::runtime::{ErrorSink, RenderLink};

/// Identity of one mounted occurrence of a component function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(usize);

impl InstanceId {
    pub(crate) fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance#{}", self.0)
    }
}

/// Where an instance is in its lifecycle.
///
/// `Mounted -> (Rendering -> Committed)* -> Unmounted`, with `Faulted`
/// entered when a render fails fatally. A faulted instance ignores further
/// render requests until it is unmounted and mounted again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Mounted,
    Rendering,
    Committed,
    Faulted,
    Unmounted,
}

/// A component function: reads hooks, returns an output description.
pub type Component<P, O> = Box<dyn Fn(&mut Hooks<'_>, &P) -> Result<O, HookError>>;

pub(crate) type Status = Rc<Cell<Lifecycle>>;

/// Outcome of one render pass of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct RenderReport {
    pub(crate) committed: bool,
    pub(crate) effects_run: usize,
}

/// What the scheduler needs from an instance, independent of its prop and
/// output types.
pub(crate) trait Renderable {
    fn render(&mut self, config: &SchedulerConfig, sink: &dyn ErrorSink) -> Result<RenderReport, HookError>;
    fn lifecycle(&self) -> Lifecycle;
    /// Shared view of the lifecycle, readable while the instance is out
    /// of the scheduler's hands for a render pass.
    fn status(&self) -> Status;
    fn fault(&mut self);
    fn renders(&self) -> usize;
}

pub(crate) struct ComponentInstance<P, O> {
    component: Component<P, O>,
    props: P,
    host: Box<dyn Host<O>>,
    slots: HookSlots,
    link: RenderLink,
    lifecycle: Status,
    renders: usize,
}

impl<P, O> ComponentInstance<P, O> {
    pub(crate) fn new(component: Component<P, O>, props: P, host: Box<dyn Host<O>>, link: RenderLink) -> Self {
        Self {
            component,
            props,
            host,
            slots: HookSlots::default(),
            link,
            lifecycle: Rc::new(Cell::new(Lifecycle::Mounted)),
            renders: 0,
        }
    }
}

impl<P, O> Renderable for ComponentInstance<P, O> {
    fn render(&mut self, config: &SchedulerConfig, sink: &dyn ErrorSink) -> Result<RenderReport, HookError> {
        let instance = self.link.instance();
        if !self.link.is_mounted() {
            self.lifecycle.set(Lifecycle::Unmounted);
            return Ok(RenderReport::default());
        }
        if self.lifecycle.get() == Lifecycle::Faulted {
            debug!(%instance, "render skipped, instance is faulted");
            return Ok(RenderReport::default());
        }

        self.lifecycle.set(Lifecycle::Rendering);
        self.slots.capture();

        let output = {
            let mut hooks = Hooks::new(&mut self.slots, &self.link, self.renders == 0, config.check_call_sites);
            (self.component)(&mut hooks, &self.props).and_then(|output| hooks.finish().map(|()| output))
        };
        let output = match output {
            Ok(output) => output,
            Err(err) => {
                self.slots.discard_pending();
                self.lifecycle.set(Lifecycle::Faulted);
                return Err(err);
            }
        };

        self.host.commit(output);
        self.renders += 1;
        self.lifecycle.set(Lifecycle::Committed);

        let effects_run = self.slots.run_effects(instance, sink);
        debug!(%instance, render = self.renders, effects_run, "render committed");
        Ok(RenderReport {
            committed: true,
            effects_run,
        })
    }

    fn lifecycle(&self) -> Lifecycle {
        if self.link.is_mounted() {
            self.lifecycle.get()
        } else {
            Lifecycle::Unmounted
        }
    }

    fn status(&self) -> Status {
        self.lifecycle.clone()
    }

    fn fault(&mut self) {
        self.slots.discard_pending();
        self.lifecycle.set(Lifecycle::Faulted);
    }

    fn renders(&self) -> usize {
        self.renders
    }
}

/// A handle to a mounted instance.
///
/// Handles are `Send + Sync`; like a [`Setter`](crate::Setter) they become
/// inert once the instance is unmounted.
#[derive(Clone)]
pub struct InstanceHandle {
    link: RenderLink,
}

impl InstanceHandle {
    pub(crate) fn new(link: RenderLink) -> Self {
        Self { link }
    }

    pub(crate) fn link(&self) -> &RenderLink {
        &self.link
    }

    pub fn id(&self) -> InstanceId {
        self.link.instance()
    }

    pub fn is_mounted(&self) -> bool {
        self.link.is_mounted()
    }

    /// Request a render pass without changing any state.
    ///
    /// Coalesces with other pending requests for the same instance. Returns
    /// `false` if the request was coalesced or the instance is gone.
    pub fn request_render(&self) -> bool {
        self.link.request()
    }
}

impl fmt::Debug for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceHandle")
            .field("id", &self.id())
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::CommitLog;
    use crate::runtime::RenderQueue;
    use std::sync::Arc;

    fn instance_with_log(
        component: Component<(), i32>,
    ) -> (ComponentInstance<(), i32>, CommitLog<i32>, Arc<RenderQueue>) {
        let queue = Arc::new(RenderQueue::new(None));
        let link = RenderLink::new(InstanceId::from_raw(1), Arc::downgrade(&queue));
        let log = CommitLog::new();
        let instance = ComponentInstance::new(component, (), Box::new(log.clone()), link);
        (instance, log, queue)
    }

    #[test]
    fn render_commits_then_runs_effects() {
        // What the effect saw in the commit log when it ran.
        let seen: Rc<Cell<Option<(usize, Option<i32>)>>> = Rc::default();
        let log = CommitLog::new();

        let component: Component<(), i32> = {
            let seen = seen.clone();
            let log = log.clone();
            Box::new(move |cx: &mut Hooks<'_>, _: &()| {
                let (value, _) = cx.use_state(7)?;
                let seen = seen.clone();
                let log = log.clone();
                cx.use_effect(move || seen.set(Some((log.len(), log.last()))))?;
                Ok(value)
            })
        };

        let queue = Arc::new(RenderQueue::new(None));
        let link = RenderLink::new(InstanceId::from_raw(1), Arc::downgrade(&queue));
        let mut instance = ComponentInstance::new(component, (), Box::new(log.clone()), link);
        let config = SchedulerConfig::default();
        let sink = |_: &HookError| {};

        assert_eq!(instance.lifecycle(), Lifecycle::Mounted);
        let report = instance.render(&config, &sink).unwrap();

        assert_eq!(report, RenderReport { committed: true, effects_run: 1 });
        assert_eq!(seen.get(), Some((1, Some(7))));
        assert_eq!(log.outputs(), vec![7]);
        assert_eq!(instance.lifecycle(), Lifecycle::Committed);
        assert_eq!(instance.renders(), 1);
    }

    #[test]
    fn status_tracks_the_render_pass() {
        let observed: Rc<Cell<Option<Lifecycle>>> = Rc::default();
        let status: Rc<Cell<Option<Status>>> = Rc::default();

        let component: Component<(), i32> = {
            let observed = observed.clone();
            let status = status.clone();
            Box::new(move |cx: &mut Hooks<'_>, _: &()| {
                if let Some(status) = status.take() {
                    observed.set(Some(status.get()));
                }
                cx.use_effect(|| {})?;
                Ok(0)
            })
        };

        let (mut instance, _log, _queue) = instance_with_log(component);
        status.set(Some(instance.status()));
        instance.render(&SchedulerConfig::default(), &|_: &HookError| {}).unwrap();

        assert_eq!(observed.get(), Some(Lifecycle::Rendering));
        assert_eq!(instance.status().get(), Lifecycle::Committed);
    }

    #[test]
    fn faulted_instance_stops_rendering() {
        fn shrinking(cx: &mut Hooks<'_>, _: &()) -> Result<i32, HookError> {
            let first = cx.is_first_render();
            cx.use_state(0)?;
            if first {
                cx.use_state(1)?;
            }
            Ok(0)
        }

        let (mut instance, log, _queue) = instance_with_log(Box::new(shrinking));
        let config = SchedulerConfig::default();
        let sink = |_: &HookError| {};

        instance.render(&config, &sink).unwrap();
        assert!(instance.render(&config, &sink).is_err());
        assert_eq!(instance.lifecycle(), Lifecycle::Faulted);

        assert_eq!(instance.render(&config, &sink), Ok(RenderReport::default()));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn handle_display_and_debug() {
        let queue = Arc::new(RenderQueue::new(None));
        let handle = InstanceHandle::new(RenderLink::new(InstanceId::from_raw(5), Arc::downgrade(&queue)));
        assert_eq!(handle.id().to_string(), "instance#5");
        assert_eq!(format!("{handle:?}"), "InstanceHandle { id: InstanceId(5), mounted: true }");
    }
}
