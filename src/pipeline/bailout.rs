//! Bailout - Skip or clone a subtree whose root has no work.

use crate::engine::FiberId;
use crate::error::{BeginWorkError, WorkResult};
use crate::types::ExpirationTime;

use super::begin_work::WorkContext;

impl WorkContext<'_> {
    /// Finish `wip` without rendering it.
    ///
    /// Returns `None` when nothing below is due at `render_time`; otherwise
    /// clones the child chain and returns its first fiber.
    pub(crate) fn bailout_on_already_finished_work(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        if let Some(current) = current {
            let dependencies = self.tree.fiber(current)?.context_dependencies.clone();
            self.tree.fiber_mut(wip)?.context_dependencies = dependencies;
        }

        let child_time = self.tree.fiber(wip)?.child_expiration_time;
        if child_time.is_less_urgent_than(render_time) {
            log::trace!("BAILOUT_SKIP: fiber={wip:?} - skip subtree");
            self.stats.skipped_subtrees += 1;
            return Ok(None);
        }

        log::trace!("[BEGIN_WORK] clone children: fiber={wip:?} child_time={child_time:?}");
        self.stats.cloned_subtrees += 1;
        self.host.clone_child_fibers(self.tree, current, wip)?;
        Ok(self.tree.fiber(wip)?.child)
    }

    /// Fast bailout of a boundary showing its fallback.
    ///
    /// Pending work inside the primary fragment retries the boundary.
    /// Otherwise the bailout continues with the fallback fragment, skipping
    /// the hidden primary children.
    pub(super) fn bailout_timed_out_suspense(
        &mut self,
        current: FiberId,
        wip: FiberId,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        let primary = self
            .tree
            .fiber(wip)?
            .child
            .ok_or(BeginWorkError::MalformedSuspense(wip))?;
        let primary_time = self.tree.fiber(primary)?.child_expiration_time;

        if primary_time.is_due(render_time) {
            log::debug!("[SUSPENSE] retry primary children: fiber={wip:?}");
            self.stats.handler_runs += 1;
            return self.update_suspense_component(Some(current), wip, render_time);
        }

        match self.bailout_on_already_finished_work(Some(current), wip, render_time)? {
            Some(primary) => Ok(self.tree.fiber(primary)?.sibling),
            None => Ok(None),
        }
    }
}
