//! Function-style handlers: plain functions and forward-ref components.
//!
//! Both render through the hook runtime:
//!
//! ```text
//! prepare_to_read_context ─► prepare_to_use_hooks ─► render ─► finish_hooks
//!                                                                 │
//!                                      PERFORMED_WORK ◄───────────┘
//!                                            └─► reconcile ─► first child
//! ```

use std::rc::Rc;

use crate::engine::FiberId;
use crate::error::WorkResult;
use crate::primitives::{Children, ForwardRefComponent, FunctionComponent, Props, RenderArg, RenderFn};
use crate::state::LegacyContextStack;
use crate::types::ExpirationTime;

use super::begin_work::WorkContext;

impl WorkContext<'_> {
    pub(super) fn update_function_component(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
        component: &Rc<FunctionComponent>,
        props: Props,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        let unmasked = self.stacks.legacy.unmasked_context(false, true);
        let context =
            LegacyContextStack::masked_context(&unmasked, component.context_types.as_deref());
        let arg = RenderArg::Context(context);
        self.render_with_hooks(current, wip, &component.render, props, arg, render_time)
    }

    pub(super) fn update_forward_ref(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
        component: &Rc<ForwardRefComponent>,
        props: Props,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        let arg = RenderArg::Ref(self.tree.fiber(wip)?.ref_handle.clone());
        self.render_with_hooks(current, wip, &component.render, props, arg, render_time)
    }

    fn render_with_hooks(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
        render: &RenderFn,
        props: Props,
        arg: RenderArg,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        self.stacks.context.prepare_to_read_context(self.tree, wip)?;
        self.host
            .prepare_to_use_hooks(self.tree, current, wip, render_time);

        let children = render(&props, &arg)?;
        let children: Children = self
            .host
            .finish_hooks(self.tree, render, &props, children, &arg)?;

        self.mark_performed_work(wip)?;
        self.reconcile_children(current, wip, &children, render_time)
    }
}
