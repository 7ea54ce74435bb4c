//! Memo handlers.
//!
//! A memo fiber owns exactly one child of its wrapped type and skips it
//! while the props compare equal. Plain function components without
//! defaults or a comparator are promoted on mount to the simple-memo kind,
//! which renders the function directly instead of through a child.

use std::rc::Rc;

use crate::engine::FiberId;
use crate::error::{BeginWorkError, WorkResult};
use crate::primitives::{FunctionComponent, MemoComponent, Props};
use crate::types::{ExpirationTime, RefHandle};

use super::begin_work::WorkContext;

impl WorkContext<'_> {
    pub(super) fn update_memo_component(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
        memo: &Rc<MemoComponent>,
        props: Props,
        update_time: ExpirationTime,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        let Some(current) = current else {
            return self.mount_memo_component(wip, memo, props, update_time, render_time);
        };

        let current_fiber = self.tree.fiber(current)?;
        let current_child = current_fiber
            .child
            .ok_or(BeginWorkError::MissingMemoChild(wip))?;
        let current_ref = current_fiber.ref_handle.clone();
        let wip_ref = self.tree.fiber(wip)?.ref_handle.clone();

        if update_time.is_less_urgent_than(render_time) {
            // The child holds the resolved props; the memo fiber's own are raw.
            let previous = self.tree.fiber(current_child)?.memoized_props.clone();
            let equal = previous.is_some_and(|previous| match &memo.compare {
                Some(compare) => compare(&previous, &props),
                None => previous.shallow_equal(&props),
            });
            if equal && current_ref == wip_ref {
                log::trace!("[BEGIN_WORK] memo props equal: fiber={wip:?}");
                return self.bailout_on_already_finished_work(Some(current), wip, render_time);
            }
        }

        self.mark_performed_work(wip)?;
        let child = self.tree.create_work_in_progress(current_child, props)?;
        self.adopt_only_child(wip, child, wip_ref)
    }

    fn mount_memo_component(
        &mut self,
        wip: FiberId,
        memo: &Rc<MemoComponent>,
        props: Props,
        update_time: ExpirationTime,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        let fiber = self.tree.fiber_mut(wip)?;
        if let Some(promoted) = fiber.kind.promote_simple_memo() {
            log::debug!("[BEGIN_WORK] promote {wip:?}: MemoComponent -> SimpleMemoComponent");
            fiber.kind = promoted;
            if let Some(inner) = memo.simple_inner() {
                return self.update_simple_memo_component(
                    None,
                    wip,
                    inner,
                    props,
                    update_time,
                    render_time,
                );
            }
        }

        let fiber = self.tree.fiber(wip)?;
        let (mode, ref_handle) = (fiber.mode, fiber.ref_handle.clone());
        let child =
            self.tree
                .create_fiber_from_type_and_props(&memo.inner, None, props, mode, render_time);
        self.adopt_only_child(wip, child, ref_handle)
    }

    /// Attach `child` as the single child of `wip`, forwarding the memo's ref.
    fn adopt_only_child(
        &mut self,
        wip: FiberId,
        child: FiberId,
        ref_handle: Option<RefHandle>,
    ) -> WorkResult<Option<FiberId>> {
        let fiber = self.tree.fiber_mut(child)?;
        fiber.ref_handle = ref_handle;
        fiber.return_fiber = Some(wip);
        self.tree.fiber_mut(wip)?.child = Some(child);
        Ok(Some(child))
    }

    pub(super) fn update_simple_memo_component(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
        component: &Rc<FunctionComponent>,
        props: Props,
        update_time: ExpirationTime,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        if let Some(current) = current
            && update_time.is_less_urgent_than(render_time)
        {
            let current_fiber = self.tree.fiber(current)?;
            let unchanged = current_fiber
                .memoized_props
                .as_ref()
                .is_some_and(|previous| previous.shallow_equal(&props))
                && current_fiber.ref_handle == self.tree.fiber(wip)?.ref_handle;
            if unchanged {
                log::trace!("[BEGIN_WORK] simple memo props equal: fiber={wip:?}");
                return self.bailout_on_already_finished_work(Some(current), wip, render_time);
            }
        }
        self.update_function_component(current, wip, component, props, render_time)
    }
}
