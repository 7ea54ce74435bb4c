//! Pass-through handlers - Fragment, Mode and Profiler.
//!
//! None of these render anything of their own; they reconcile the
//! `children` prop as-is.

use crate::engine::FiberId;
use crate::error::WorkResult;
use crate::types::{EffectTag, ExpirationTime};

use super::begin_work::WorkContext;

impl WorkContext<'_> {
    pub(super) fn update_fragment(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        self.reconcile_own_children(current, wip, render_time)
    }

    pub(super) fn update_mode(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        self.reconcile_own_children(current, wip, render_time)
    }

    /// Like a fragment, plus an `UPDATE` effect so commit records timings.
    pub(super) fn update_profiler(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        if self.config.profiler_timer {
            self.tree.fiber_mut(wip)?.effect_tag |= EffectTag::UPDATE;
        }
        self.reconcile_own_children(current, wip, render_time)
    }

    fn reconcile_own_children(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        let children = self.tree.fiber(wip)?.pending_props.children();
        self.reconcile_children(current, wip, &children, render_time)
    }
}
