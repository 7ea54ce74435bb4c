//! Reconcile - Attach the next children description to a fiber.

use crate::engine::FiberId;
use crate::error::WorkResult;
use crate::primitives::Children;
use crate::types::ExpirationTime;

use super::begin_work::WorkContext;

impl WorkContext<'_> {
    /// Mount (fresh fiber) or diff (committed twin) `children` under `wip`.
    pub(crate) fn reconcile_children(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
        children: &Children,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        let child = match current {
            None => self
                .host
                .mount_child_fibers(self.tree, wip, children, render_time)?,
            Some(current) => {
                let current_child = self.tree.fiber(current)?.child;
                self.host
                    .reconcile_child_fibers(self.tree, wip, current_child, children, render_time)?
            }
        };
        self.tree.fiber_mut(wip)?.child = child;
        Ok(child)
    }

    /// Reconcile without matching against the committed children.
    ///
    /// The first pass deletes every current child; the second mounts
    /// `children` against an empty chain, so nothing is reused even when
    /// type and key match.
    pub(crate) fn force_unmount_current_and_reconcile(
        &mut self,
        current: FiberId,
        wip: FiberId,
        children: &Children,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        log::debug!("[BEGIN_WORK] forced remount of children: fiber={wip:?}");
        let current_child = self.tree.fiber(current)?.child;
        let cleared = self.host.reconcile_child_fibers(
            self.tree,
            wip,
            current_child,
            &Children::Empty,
            render_time,
        )?;
        self.tree.fiber_mut(wip)?.child = cleared;

        let child = self
            .host
            .reconcile_child_fibers(self.tree, wip, None, children, render_time)?;
        self.tree.fiber_mut(wip)?.child = child;
        Ok(child)
    }
}
