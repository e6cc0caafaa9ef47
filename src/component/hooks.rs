use std::panic::Location;
use tracing::warn;

use super::InstanceId;
use crate::effect::{run_pending, EffectRecord};
use crate::error::{HookError, HookKind, OrderViolation};
use crate::memo::{ErasedMemo, MemoSlot};
use crate::runtime::{ErrorSink, RenderLink};
use crate::state::{ErasedCell, Setter, StateCell};

/// Every hook slot an instance has allocated, in request order.
#[derive(Default)]
pub(crate) struct HookSlots {
    cells: Vec<Box<dyn ErasedCell>>,
    effects: Vec<EffectRecord>,
    memos: Vec<ErasedMemo>,
}

impl HookSlots {
    /// Snapshot every cell so the coming render reads a consistent view.
    pub(crate) fn capture(&mut self) {
        for cell in &mut self.cells {
            cell.capture();
        }
    }

    pub(crate) fn discard_pending(&mut self) {
        for effect in &mut self.effects {
            effect.discard();
        }
    }

    pub(crate) fn run_effects(&mut self, instance: InstanceId, sink: &dyn ErrorSink) -> usize {
        run_pending(instance, &mut self.effects, sink)
    }
}

/// The hook context handed to a component function while it renders.
///
/// Hooks are identified by the order in which they are requested. Every
/// render of an instance must request the same hooks in the same order;
/// any divergence fails the render with [`HookError::HookOrderViolation`].
///
/// ```
/// use hookcell::{CommitLog, HookError, Hooks, Scheduler};
///
/// fn counter(cx: &mut Hooks<'_>, step: &i32) -> Result<String, HookError> {
///     let (count, set_count) = cx.use_state(0)?;
///     let step = *step;
///     cx.use_effect_with((), move || set_count.update(|n| n + step))?;
///     Ok(format!("count: {count}"))
/// }
///
/// let scheduler = Scheduler::new();
/// let log = CommitLog::new();
/// scheduler.mount(counter, 2, log.clone());
/// scheduler.flush();
/// assert_eq!(log.outputs(), vec!["count: 0".to_string(), "count: 2".to_string()]);
/// ```
pub struct Hooks<'a> {
    instance: InstanceId,
    slots: &'a mut HookSlots,
    link: &'a RenderLink,
    first_render: bool,
    check_call_sites: bool,
    state_cursor: usize,
    effect_cursor: usize,
    memo_cursor: usize,
}

impl<'a> Hooks<'a> {
    pub(crate) fn new(
        slots: &'a mut HookSlots,
        link: &'a RenderLink,
        first_render: bool,
        check_call_sites: bool,
    ) -> Self {
        Self {
            instance: link.instance(),
            slots,
            link,
            first_render,
            check_call_sites,
            state_cursor: 0,
            effect_cursor: 0,
            memo_cursor: 0,
        }
    }

    /// The instance being rendered.
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    /// Whether this is the instance's first render.
    pub fn is_first_render(&self) -> bool {
        self.first_render
    }

    /// Request the next state cell.
    ///
    /// `initial` is used only when the cell is first allocated; later renders
    /// get the value committed by the cell's [`Setter`] as of the start of
    /// the render pass.
    #[track_caller]
    pub fn use_state<T>(&mut self, initial: T) -> Result<(T, Setter<T>), HookError>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let site = Location::caller();
        let position = self.next_slot(HookKind::State, self.slots.cells.len())?;
        if position == self.slots.cells.len() {
            self.slots.cells.push(Box::new(StateCell::new(initial, site)));
        }

        let instance = self.instance;
        let violation = |reason| HookError::order(instance, HookKind::State, position, reason);
        let cell = self.slots.cells[position]
            .as_any_mut()
            .downcast_mut::<StateCell<T>>()
            .ok_or_else(|| violation(OrderViolation::TypeMismatch))?;
        let recorded = cell.site();
        let value = (cell.snapshot(), cell.setter(self.link));
        self.note_site(HookKind::State, position, recorded, site);
        Ok(value)
    }

    /// Register an effect that runs after every commit of this instance.
    #[track_caller]
    pub fn use_effect<F>(&mut self, body: F) -> Result<(), HookError>
    where
        F: FnOnce() + 'static,
    {
        self.register_effect::<()>(None, Box::new(body), Location::caller())
    }

    /// Register an effect gated by `deps`.
    ///
    /// The body runs after the first commit and afterwards only when `deps`
    /// differs from the value captured at its previous run. Pass a tuple for
    /// several dependencies or `()` to run once on mount.
    #[track_caller]
    pub fn use_effect_with<D, F>(&mut self, deps: D, body: F) -> Result<(), HookError>
    where
        D: PartialEq + 'static,
        F: FnOnce() + 'static,
    {
        self.register_effect(Some(deps), Box::new(body), Location::caller())
    }

    /// Compute a value once and reuse it until `deps` changes.
    #[track_caller]
    pub fn use_memo<D, T, F>(&mut self, deps: D, compute: F) -> Result<T, HookError>
    where
        D: PartialEq + 'static,
        T: Clone + 'static,
        F: FnOnce() -> T,
    {
        let site = Location::caller();
        let position = self.next_slot(HookKind::Memo, self.slots.memos.len())?;
        if position == self.slots.memos.len() {
            let slot = MemoSlot::new(deps, compute, site);
            let value = slot.cached();
            self.slots.memos.push(Box::new(slot));
            return Ok(value);
        }

        let instance = self.instance;
        let violation = |reason| HookError::order(instance, HookKind::Memo, position, reason);
        let slot = self.slots.memos[position]
            .downcast_mut::<MemoSlot<D, T>>()
            .ok_or_else(|| violation(OrderViolation::TypeMismatch))?;
        let recorded = slot.site();
        let value = slot.get(deps, compute);
        self.note_site(HookKind::Memo, position, recorded, site);
        Ok(value)
    }

    fn register_effect<D>(
        &mut self,
        deps: Option<D>,
        body: Box<dyn FnOnce()>,
        site: &'static Location<'static>,
    ) -> Result<(), HookError>
    where
        D: PartialEq + 'static,
    {
        let position = self.next_slot(HookKind::Effect, self.slots.effects.len())?;
        if position == self.slots.effects.len() {
            self.slots.effects.push(EffectRecord::new(deps.is_some(), site));
        }

        let instance = self.instance;
        let record = &mut self.slots.effects[position];
        let recorded = record.site();
        record
            .schedule(deps, body)
            .map_err(|reason| HookError::order(instance, HookKind::Effect, position, reason))?;
        self.note_site(HookKind::Effect, position, recorded, site);
        Ok(())
    }

    /// A slot reached from another source line keeps its position, so the
    /// render stands; the move is only worth a warning.
    fn note_site(
        &self,
        kind: HookKind,
        position: usize,
        recorded: &'static Location<'static>,
        site: &'static Location<'static>,
    ) {
        if self.check_call_sites && recorded != site {
            warn!(
                instance = %self.instance,
                %kind,
                position,
                allocated_at = %recorded,
                requested_at = %site,
                "hook slot requested from a different call site"
            );
        }
    }

    /// Advance the cursor for `kind`. Past the recorded sequence a slot may
    /// only be allocated during the first render.
    fn next_slot(&mut self, kind: HookKind, allocated: usize) -> Result<usize, HookError> {
        let cursor = match kind {
            HookKind::State => &mut self.state_cursor,
            HookKind::Effect => &mut self.effect_cursor,
            HookKind::Memo => &mut self.memo_cursor,
        };
        let position = *cursor;
        *cursor += 1;

        if position >= allocated && !self.first_render {
            return Err(HookError::order(self.instance, kind, position, OrderViolation::Extra));
        }
        Ok(position)
    }

    /// Check that the render requested every previously allocated hook.
    pub(crate) fn finish(&self) -> Result<(), HookError> {
        let counts = [
            (HookKind::State, self.state_cursor, self.slots.cells.len()),
            (HookKind::Effect, self.effect_cursor, self.slots.effects.len()),
            (HookKind::Memo, self.memo_cursor, self.slots.memos.len()),
        ];
        for (kind, requested, allocated) in counts {
            if requested < allocated {
                return Err(HookError::order(self.instance, kind, requested, OrderViolation::Missing));
            }
        }
        Ok(())
    }
}
