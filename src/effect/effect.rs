use std::any::Any;
use std::panic::{self, AssertUnwindSafe, Location};

use crate::component::InstanceId;
use crate::error::{HookError, OrderViolation};
use crate::runtime::ErrorSink;

type EffectBody = Box<dyn FnOnce()>;

/// An effect body registered by the current render and due to run after its
/// commit, together with the dependency values it was registered with.
struct PendingEffect {
    body: EffectBody,
    deps: Option<Box<dyn Any>>,
}

/// A positional effect slot.
///
/// `gated` records whether the effect was registered with a dependency list;
/// `last_deps` holds the list captured the last time the body actually ran.
pub(crate) struct EffectRecord {
    gated: bool,
    last_deps: Option<Box<dyn Any>>,
    pending: Option<PendingEffect>,
    site: &'static Location<'static>,
}

impl EffectRecord {
    pub(crate) fn new(gated: bool, site: &'static Location<'static>) -> Self {
        Self {
            gated,
            last_deps: None,
            pending: None,
            site,
        }
    }

    pub(crate) fn site(&self) -> &'static Location<'static> {
        self.site
    }

    /// Register this render's body. It is kept only if it is due:
    ///
    /// - no dependency list: every commit
    /// - never run yet: first commit, whatever the list
    /// - otherwise: when `deps` differs from the list captured at the last run
    pub(crate) fn schedule<D>(&mut self, deps: Option<D>, body: EffectBody) -> Result<bool, OrderViolation>
    where
        D: PartialEq + 'static,
    {
        if self.gated != deps.is_some() {
            return Err(OrderViolation::DependencyMode);
        }

        let due = match (&deps, self.last_deps.as_ref()) {
            (None, _) | (Some(_), None) => true,
            (Some(next), Some(prev)) => match prev.downcast_ref::<D>() {
                Some(prev) => prev != next,
                None => return Err(OrderViolation::TypeMismatch),
            },
        };

        self.pending = due.then(|| PendingEffect {
            body,
            deps: deps.map(|deps| Box::new(deps) as Box<dyn Any>),
        });
        Ok(due)
    }

    pub(crate) fn discard(&mut self) {
        self.pending = None;
    }
}

/// Run every pending effect in registration order.
///
/// A panicking body is reported to `sink` and does not stop the ones after
/// it. Returns how many bodies ran.
pub(crate) fn run_pending(instance: InstanceId, effects: &mut [EffectRecord], sink: &dyn ErrorSink) -> usize {
    let mut ran = 0;
    for (position, record) in effects.iter_mut().enumerate() {
        let Some(pending) = record.pending.take() else {
            continue;
        };
        record.last_deps = pending.deps;
        ran += 1;

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(pending.body)) {
            sink.report(&HookError::EffectPanicked {
                instance,
                position,
                message: panic_message(payload.as_ref()),
            });
        }
    }
    ran
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn counting_body(counter: &Rc<Cell<usize>>) -> EffectBody {
        let counter = counter.clone();
        Box::new(move || counter.set(counter.get() + 1))
    }

    fn silent_sink() -> impl ErrorSink {
        |_: &HookError| {}
    }

    #[test]
    fn ungated_effect_is_due_every_time() {
        let runs = Rc::new(Cell::new(0));
        let mut records = vec![EffectRecord::new(false, Location::caller())];

        for _ in 0..3 {
            assert_eq!(records[0].schedule::<()>(None, counting_body(&runs)), Ok(true));
            run_pending(InstanceId::from_raw(0), &mut records, &silent_sink());
        }
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn empty_dependency_list_runs_once() {
        let runs = Rc::new(Cell::new(0));
        let mut records = vec![EffectRecord::new(true, Location::caller())];

        assert_eq!(records[0].schedule(Some(()), counting_body(&runs)), Ok(true));
        run_pending(InstanceId::from_raw(0), &mut records, &silent_sink());
        assert_eq!(records[0].schedule(Some(()), counting_body(&runs)), Ok(false));
        run_pending(InstanceId::from_raw(0), &mut records, &silent_sink());

        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn gated_effect_compares_against_last_run() {
        let mut record = EffectRecord::new(true, Location::caller());
        let noop = || -> EffectBody { Box::new(|| {}) };

        assert_eq!(record.schedule(Some((1, "a")), noop()), Ok(true));
        run_pending(InstanceId::from_raw(0), std::slice::from_mut(&mut record), &silent_sink());
        assert_eq!(record.schedule(Some((1, "a")), noop()), Ok(false));
        assert_eq!(record.schedule(Some((1, "b")), noop()), Ok(true));
    }

    #[test]
    fn deps_do_not_advance_until_run() {
        let mut record = EffectRecord::new(true, Location::caller());
        assert_eq!(record.schedule(Some(1), Box::new(|| {})), Ok(true));
        record.discard();
        assert_eq!(run_pending(InstanceId::from_raw(0), std::slice::from_mut(&mut record), &silent_sink()), 0);
        // The discarded render never ran, so the same value is still due.
        assert_eq!(record.schedule(Some(1), Box::new(|| {})), Ok(true));
    }

    #[test]
    fn mode_and_type_changes_are_violations() {
        let mut record = EffectRecord::new(true, Location::caller());
        assert_eq!(
            record.schedule::<()>(None, Box::new(|| {})),
            Err(OrderViolation::DependencyMode)
        );

        record.schedule(Some(1u8), Box::new(|| {})).ok();
        run_pending(InstanceId::from_raw(0), std::slice::from_mut(&mut record), &silent_sink());
        assert_eq!(
            record.schedule(Some("x"), Box::new(|| {})),
            Err(OrderViolation::TypeMismatch)
        );
    }

    #[test]
    fn panicking_effect_does_not_block_siblings() {
        let runs = Rc::new(Cell::new(0));
        let reported = RefCell::new(Vec::new());
        let sink = |err: &HookError| reported.borrow_mut().push(err.clone());

        let mut records = vec![
            EffectRecord::new(false, Location::caller()),
            EffectRecord::new(false, Location::caller()),
        ];
        records[0]
            .schedule::<()>(None, Box::new(|| panic!("effect failed")))
            .ok();
        records[1].schedule::<()>(None, counting_body(&runs)).ok();

        let ran = run_pending(InstanceId::from_raw(9), &mut records, &sink);

        assert_eq!(ran, 2);
        assert_eq!(runs.get(), 1);
        assert_eq!(
            reported.into_inner(),
            vec![HookError::EffectPanicked {
                instance: InstanceId::from_raw(9),
                position: 0,
                message: "effect failed".to_string(),
            }]
        );
    }
}
