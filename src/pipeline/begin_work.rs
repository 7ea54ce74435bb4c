//! Begin Work - The per-fiber dispatcher.
//!
//! The work loop calls [`WorkContext::begin_work`] once per fiber, depth
//! first. Each call either bails out (possibly skipping the whole subtree)
//! or routes to the handler for the fiber's kind, and returns the next
//! fiber to visit.
//!
//! ```text
//! begin_work(current, wip, target)
//!   ├─ props identical, no legacy change, no due work
//!   │    └─ push stacks for the kind ─► bailout ─► skip | clone children
//!   └─ otherwise
//!        └─ clear wip urgency ─► handler(kind) ─► reconcile ─► first child
//! ```

use std::rc::Rc;

use crate::config::WorkConfig;
use crate::engine::{FiberId, FiberKind, FiberRoot, FiberTree};
use crate::error::WorkResult;
use crate::primitives::{Props, resolve_default_props};
use crate::state::RenderStacks;
use crate::types::{EffectTag, ExpirationTime, TypeOfMode};

use super::collaborators::Collaborators;

// =============================================================================
// Stats
// =============================================================================

/// Counters for one work context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchStats {
    /// Calls to `begin_work`.
    pub dispatches: u64,
    /// Dispatches that took the fast bailout.
    pub fast_bailouts: u64,
    /// Dispatches that ran a kind handler.
    pub handler_runs: u64,
    /// Bailouts that skipped a whole subtree.
    pub skipped_subtrees: u64,
    /// Bailouts that cloned the child chain.
    pub cloned_subtrees: u64,
}

// =============================================================================
// Work Context
// =============================================================================

/// Everything one render pass threads through dispatch.
pub struct WorkContext<'a> {
    pub tree: &'a mut FiberTree,
    pub stacks: &'a mut RenderStacks,
    pub host: &'a mut dyn Collaborators,
    pub config: WorkConfig,
    pub stats: DispatchStats,
}

impl<'a> WorkContext<'a> {
    pub fn new(
        tree: &'a mut FiberTree,
        stacks: &'a mut RenderStacks,
        host: &'a mut dyn Collaborators,
        config: WorkConfig,
    ) -> Self {
        Self {
            tree,
            stacks,
            host,
            config,
            stats: DispatchStats::default(),
        }
    }

    /// Perform the begin phase for `wip` and return the next fiber to visit.
    ///
    /// `current` is `None` for a fresh mount. On error every stack frame
    /// pushed during this call is popped again.
    pub fn begin_work(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        self.stats.dispatches += 1;
        let depth = self.stacks.depth();
        let result = self.dispatch(current, wip, render_time);
        if let Err(err) = &result {
            self.stacks.rewind(depth);
            if err.is_configuration_error() {
                log::warn!("[BEGIN_WORK] render pass aborted at {wip:?}: {err}");
            }
        }
        result
    }

    fn dispatch(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        let fiber = self.tree.fiber(wip)?;
        let update_time = fiber.expiration_time;
        log::trace!(
            "[BEGIN_WORK] dispatch: fiber={:?} tag={} update={:?} target={:?}",
            wip,
            fiber.tag(),
            update_time,
            render_time
        );

        if let Some(current) = current {
            let new_props = &fiber.pending_props;
            let unchanged = self
                .tree
                .fiber(current)?
                .memoized_props
                .as_ref()
                .is_some_and(|old| old.is_same(new_props));
            if unchanged
                && !self.stacks.legacy.has_context_changed()
                && update_time.is_less_urgent_than(render_time)
            {
                self.stats.fast_bailouts += 1;
                return self.fast_bailout(current, wip, render_time);
            }
        }

        let fiber = self.tree.fiber_mut(wip)?;
        fiber.expiration_time = ExpirationTime::NO_WORK;
        let kind = fiber.kind.clone();
        let pending = fiber.pending_props.clone();
        let lazy_wrapped = fiber.needs_default_props();
        self.stats.handler_runs += 1;

        // Components reached through a lazy wrapper never had defaults applied.
        let resolve = |defaults: Option<&Props>| {
            if lazy_wrapped {
                resolve_default_props(defaults, &pending)
            } else {
                pending.clone()
            }
        };

        match kind {
            FiberKind::LazyComponent(lazy) => {
                self.mount_lazy_component(current, wip, &lazy, update_time, render_time)
            }
            FiberKind::FunctionComponent(component) => {
                let props = resolve(component.default_props.as_ref());
                self.update_function_component(current, wip, &component, props, render_time)
            }
            FiberKind::ClassComponent(class) => {
                let props = resolve(class.component.default_props.as_ref());
                self.update_class_component(current, wip, &class.component, props, render_time)
            }
            FiberKind::HostRoot(root) => self.update_host_root(current, wip, &root, render_time),
            FiberKind::HostComponent { tag, .. } => {
                self.update_host_component(current, wip, &tag, render_time)
            }
            FiberKind::HostText { .. } => self.update_host_text(current, wip),
            FiberKind::Suspense => self.update_suspense_component(current, wip, render_time),
            FiberKind::HostPortal(container) => {
                self.update_portal_component(current, wip, container, render_time)
            }
            FiberKind::ForwardRef(component) => {
                let props = resolve(component.default_props.as_ref());
                self.update_forward_ref(current, wip, &component, props, render_time)
            }
            FiberKind::Fragment => self.update_fragment(current, wip, render_time),
            FiberKind::Mode => self.update_mode(current, wip, render_time),
            FiberKind::Profiler => self.update_profiler(current, wip, render_time),
            FiberKind::ContextProvider(context) => {
                self.update_context_provider(current, wip, &context, render_time)
            }
            FiberKind::ContextConsumer(context) => {
                self.update_context_consumer(current, wip, &context, render_time)
            }
            FiberKind::MemoComponent(memo) => {
                // Outer defaults first, then the wrapped type's.
                let props = resolve_default_props(memo.default_props.as_ref(), &pending);
                let props = resolve_default_props(memo.inner.default_props(), &props);
                self.update_memo_component(current, wip, &memo, props, update_time, render_time)
            }
            FiberKind::SimpleMemoComponent(component) => self.update_simple_memo_component(
                current,
                wip,
                &component,
                pending.clone(),
                update_time,
                render_time,
            ),
            FiberKind::IncompleteClassComponent(component) => {
                let props = resolve(component.default_props.as_ref());
                self.mount_incomplete_class_component(current, wip, &component, props, render_time)
            }
        }
    }

    // =========================================================================
    // Fast Bailout
    // =========================================================================

    /// Push what the kind's handler would have pushed, then bail out.
    fn fast_bailout(
        &mut self,
        current: FiberId,
        wip: FiberId,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        let fiber = self.tree.fiber(wip)?;
        log::trace!("[BEGIN_WORK] fast bailout: fiber={:?} tag={}", wip, fiber.tag());

        match fiber.kind.clone() {
            FiberKind::HostRoot(root) => {
                self.push_host_root_context(wip, &root);
                self.host.reset_hydration_state();
            }
            FiberKind::HostComponent { tag, .. } => {
                self.stacks
                    .host
                    .push_host_context(wip, &tag, self.host.as_host_environment());
            }
            FiberKind::ClassComponent(class) => {
                if class.component.is_legacy_context_provider() {
                    self.stacks.legacy.push_context_provider(self.tree, wip)?;
                }
            }
            FiberKind::HostPortal(container) => {
                self.stacks
                    .host
                    .push_host_container(wip, container, self.host.as_host_environment());
            }
            FiberKind::ContextProvider(context) => {
                let value = fiber
                    .memoized_props
                    .as_ref()
                    .and_then(|props| props.get(Props::VALUE))
                    .cloned()
                    .unwrap_or_default();
                self.stacks.context.push_provider(wip, &context, value);
            }
            FiberKind::Profiler => {
                if self.config.profiler_timer {
                    self.tree.fiber_mut(wip)?.effect_tag |= EffectTag::UPDATE;
                }
            }
            FiberKind::Suspense => {
                if fiber.is_timed_out() {
                    return self.bailout_timed_out_suspense(current, wip, render_time);
                }
            }
            _ => {}
        }

        self.bailout_on_already_finished_work(Some(current), wip, render_time)
    }

    // =========================================================================
    // Shared Steps
    // =========================================================================

    /// Push the root's legacy context (if any) and its host container.
    pub(super) fn push_host_root_context(&mut self, wip: FiberId, root: &Rc<FiberRoot>) {
        let pending = root.pending_context.borrow().clone();
        let committed = root.context.borrow().clone();
        match (pending, committed) {
            (Some(pending), committed) => {
                let did_change = committed.is_none_or(|committed| !Rc::ptr_eq(&committed, &pending));
                self.stacks
                    .legacy
                    .push_top_level_context_object(wip, pending, did_change);
            }
            (None, Some(committed)) => {
                self.stacks
                    .legacy
                    .push_top_level_context_object(wip, committed, false);
            }
            (None, None) => {}
        }
        self.stacks.host.push_host_container(
            wip,
            root.container.clone(),
            self.host.as_host_environment(),
        );
    }

    /// Schedule a `REF` effect when the ref was added or replaced.
    pub(super) fn mark_ref(&mut self, current: Option<FiberId>, wip: FiberId) -> WorkResult<()> {
        let ref_handle = self.tree.fiber(wip)?.ref_handle.clone();
        let changed = match current {
            None => ref_handle.is_some(),
            Some(current) => self.tree.fiber(current)?.ref_handle != ref_handle,
        };
        if changed {
            self.tree.fiber_mut(wip)?.effect_tag |= EffectTag::REF;
        }
        Ok(())
    }

    /// Check if render functions of `wip` run twice this pass.
    pub(super) fn double_invoke(&self, wip: FiberId) -> WorkResult<bool> {
        Ok(self.config.double_invoke_in_strict_mode
            && self.tree.fiber(wip)?.mode.contains(TypeOfMode::STRICT))
    }

    pub(super) fn mark_performed_work(&mut self, wip: FiberId) -> WorkResult<()> {
        self.tree.fiber_mut(wip)?.effect_tag |= EffectTag::PERFORMED_WORK;
        Ok(())
    }

    /// Treat `wip` as a brand-new fiber although a committed twin exists:
    /// the twin was left inconsistent by a suspended legacy-mode mount.
    pub(super) fn detach_for_remount(&mut self, wip: FiberId) -> WorkResult<()> {
        log::debug!("[BEGIN_WORK] forced remount: fiber={wip:?} detached from its alternate");
        self.tree.detach_alternate(wip)?;
        self.tree.fiber_mut(wip)?.effect_tag |= EffectTag::PLACEMENT;
        Ok(())
    }
}
