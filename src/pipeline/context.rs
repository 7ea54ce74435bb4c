//! Context handlers - Providers and consumers.

use std::rc::Rc;

use crate::engine::FiberId;
use crate::error::{BeginWorkError, WorkResult};
use crate::primitives::{Context, PropValue, Props};
use crate::state::ContextStack;
use crate::types::ExpirationTime;

use super::begin_work::WorkContext;

impl WorkContext<'_> {
    /// Push the provided value and, when it changed, schedule every
    /// dependent fiber below.
    pub(super) fn update_context_provider(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
        context: &Rc<Context>,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        let fiber = self.tree.fiber(wip)?;
        let new_props = fiber.pending_props.clone();
        let old_props = fiber.memoized_props.clone();
        let new_value = new_props.get(Props::VALUE).cloned().unwrap_or_default();

        self.stacks
            .context
            .push_provider(wip, context, new_value.clone());

        if let Some(old_props) = old_props {
            let old_value = old_props.get(Props::VALUE).cloned().unwrap_or_default();
            let changed_bits = ContextStack::calculate_changed_bits(context, &new_value, &old_value);
            if changed_bits == 0 {
                if old_props.same_at(&new_props, Props::CHILDREN)
                    && !self.stacks.legacy.has_context_changed()
                {
                    return self.bailout_on_already_finished_work(current, wip, render_time);
                }
            } else {
                let matched = ContextStack::propagate_context_change(
                    self.tree,
                    wip,
                    context,
                    changed_bits,
                    render_time,
                )?;
                log::trace!(
                    "[BEGIN_WORK] {} changed (bits={changed_bits:#x}): {} class consumers",
                    context.name,
                    matched.len()
                );
                for class_fiber in matched {
                    self.host
                        .enqueue_force_update(self.tree, class_fiber, render_time)?;
                }
            }
        }

        self.reconcile_children(current, wip, &new_props.children(), render_time)
    }

    /// Read the context and render the child function with its value.
    pub(super) fn update_context_consumer(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
        context: &Rc<Context>,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        let props = self.tree.fiber(wip)?.pending_props.clone();
        let Some(PropValue::Render(render)) = props.get(Props::CHILDREN) else {
            return Err(BeginWorkError::ConsumerChildNotFunction(wip));
        };
        let observed_bits = props
            .get(Props::OBSERVED_BITS)
            .and_then(PropValue::as_int)
            .and_then(|bits| u32::try_from(bits).ok());

        self.stacks.context.prepare_to_read_context(self.tree, wip)?;
        let value = self
            .stacks
            .context
            .read_context(self.tree, context, observed_bits)?;
        let children = render(&value)?;

        self.mark_performed_work(wip)?;
        self.reconcile_children(current, wip, &children, render_time)
    }
}
