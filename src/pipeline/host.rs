//! Host handlers - Root, elements, text and portals.
//!
//! These kinds render nothing themselves; they keep the host container and
//! host context stacks in step with the tree and hand their children to the
//! reconciler.

use std::rc::Rc;

use crate::engine::{FiberId, FiberRoot};
use crate::error::{BeginWorkError, WorkResult};
use crate::primitives::Children;
use crate::types::{EffectTag, ExpirationTime, Opaque, TypeOfMode};

use super::begin_work::WorkContext;

impl WorkContext<'_> {
    // =========================================================================
    // Host Root
    // =========================================================================

    pub(super) fn update_host_root(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
        root: &Rc<FiberRoot>,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        self.push_host_root_context(wip, root);

        let fiber = self.tree.fiber(wip)?;
        if fiber.update_queue.is_none() {
            return Err(BeginWorkError::MissingUpdateQueue(wip));
        }
        let props = fiber.pending_props.clone();
        let previous = fiber.memoized_state.root_element().cloned();

        self.host
            .process_update_queue(self.tree, wip, &props, render_time)?;
        let next = self
            .tree
            .fiber(wip)?
            .memoized_state
            .root_element()
            .cloned()
            .unwrap_or_default();

        if previous.unwrap_or_default().is_same(&next) {
            self.host.reset_hydration_state();
            return self.bailout_on_already_finished_work(current, wip, render_time);
        }

        let has_current_child = match current {
            Some(current) => self.tree.fiber(current)?.child.is_some(),
            None => false,
        };
        if !has_current_child && root.hydrate && self.host.enter_hydration_state(self.tree, wip) {
            // Children of a hydrating root mount untracked; the root itself
            // carries the placement while the pass is mounting.
            log::debug!("[BEGIN_WORK] hydrating root {wip:?}");
            self.tree.fiber_mut(wip)?.effect_tag |= EffectTag::PLACEMENT;
            let child = self
                .host
                .mount_child_fibers(self.tree, wip, &next, render_time)?;
            self.tree.fiber_mut(wip)?.child = child;
            return Ok(child);
        }

        let child = self.reconcile_children(current, wip, &next, render_time)?;
        self.host.reset_hydration_state();
        Ok(child)
    }

    // =========================================================================
    // Host Component
    // =========================================================================

    pub(super) fn update_host_component(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
        tag: &Rc<str>,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        self.stacks
            .host
            .push_host_context(wip, tag, self.host.as_host_environment());

        if current.is_none() {
            self.host.try_to_claim_next_hydratable_instance(self.tree, wip);
        }

        let fiber = self.tree.fiber(wip)?;
        let props = fiber.pending_props.clone();
        let mode = fiber.mode;
        let previous = match current {
            Some(current) => self.tree.fiber(current)?.memoized_props.clone(),
            None => None,
        };

        let env = self.host.as_host_environment();
        let children = if env.should_set_text_content(tag, &props) {
            // Painted by the host as a property; no text fiber.
            Children::Empty
        } else {
            if previous.is_some_and(|previous| env.should_set_text_content(tag, &previous)) {
                self.tree.fiber_mut(wip)?.effect_tag |= EffectTag::CONTENT_RESET;
            }
            props.children()
        };

        self.mark_ref(current, wip)?;

        if render_time != ExpirationTime::NEVER
            && mode.contains(TypeOfMode::CONCURRENT)
            && self.host.should_deprioritize_subtree(tag, &props)
        {
            log::debug!("[BEGIN_WORK] deprioritize hidden subtree of {wip:?} ({tag})");
            self.tree.fiber_mut(wip)?.expiration_time = ExpirationTime::NEVER;
            return Ok(None);
        }

        self.reconcile_children(current, wip, &children, render_time)
    }

    pub(super) fn update_host_text(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
    ) -> WorkResult<Option<FiberId>> {
        if current.is_none() {
            self.host.try_to_claim_next_hydratable_instance(self.tree, wip);
        }
        Ok(None)
    }

    // =========================================================================
    // Host Portal
    // =========================================================================

    pub(super) fn update_portal_component(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
        container: Opaque,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        self.stacks
            .host
            .push_host_container(wip, container, self.host.as_host_environment());
        let children = self.tree.fiber(wip)?.pending_props.children();

        match current {
            // Portal children are inserted at commit, so even a mount
            // records placements.
            None => {
                let child = self
                    .host
                    .reconcile_child_fibers(self.tree, wip, None, &children, render_time)?;
                self.tree.fiber_mut(wip)?.child = child;
                Ok(child)
            }
            Some(_) => self.reconcile_children(current, wip, &children, render_time),
        }
    }
}
