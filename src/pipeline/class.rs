//! Class-style handlers.
//!
//! The instance manager owns construction and lifecycles and answers
//! whether to render; this module pushes the legacy provider frame,
//! renders the instance and reconciles its output.

use std::rc::Rc;

use crate::engine::{FiberId, MemoizedState};
use crate::error::{BeginWorkError, WorkResult};
use crate::primitives::{Children, ClassComponent, ContextMap, Props};
use crate::state::LegacyContextStack;
use crate::types::{EffectTag, ExpirationTime};

use super::begin_work::WorkContext;

impl WorkContext<'_> {
    pub(super) fn update_class_component(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
        component: &Rc<ClassComponent>,
        props: Props,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        let has_context = self.push_class_context(wip, component)?;
        let context = self.class_context(component, has_context);
        let has_instance = self.tree.fiber(wip)?.class_instance().is_some();

        let should_update = match current {
            None if has_instance => self.host.resume_mount_class_instance(
                self.tree,
                wip,
                component,
                &props,
                &context,
                render_time,
            )?,
            Some(current) if has_instance => self.host.update_class_instance(
                self.tree,
                current,
                wip,
                component,
                &props,
                &context,
                render_time,
            )?,
            _ => {
                // A committed twin without an instance only exists after a
                // legacy-mode mount suspended.
                if current.is_some() {
                    self.detach_for_remount(wip)?;
                }
                self.construct_and_mount(wip, component, &props, &context, render_time)?;
                true
            }
        };

        self.finish_class_component(current, wip, component, should_update, has_context, render_time)
    }

    /// Re-run the first mount of a class whose earlier mount suspended.
    pub(super) fn mount_incomplete_class_component(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
        component: &Rc<ClassComponent>,
        props: Props,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        if current.is_some() {
            self.detach_for_remount(wip)?;
        }

        let fiber = self.tree.fiber_mut(wip)?;
        if let Some(kind) = fiber.kind.complete_class() {
            log::debug!("[BEGIN_WORK] promote {wip:?}: IncompleteClassComponent -> ClassComponent");
            fiber.kind = kind;
        }

        let has_context = self.push_class_context(wip, component)?;
        let context = self.class_context(component, has_context);
        self.construct_and_mount(wip, component, &props, &context, render_time)?;
        self.finish_class_component(None, wip, component, true, has_context, render_time)
    }

    /// Push the legacy provider frame early; the child context is only
    /// known after rendering.
    fn push_class_context(&mut self, wip: FiberId, component: &ClassComponent) -> WorkResult<bool> {
        let has_context = component.is_legacy_context_provider();
        if has_context {
            self.stacks.legacy.push_context_provider(self.tree, wip)?;
        }
        self.stacks.context.prepare_to_read_context(self.tree, wip)?;
        Ok(has_context)
    }

    fn class_context(&self, component: &ClassComponent, has_context: bool) -> ContextMap {
        let unmasked = self.stacks.legacy.unmasked_context(has_context, true);
        LegacyContextStack::masked_context(&unmasked, component.context_types.as_deref())
    }

    fn construct_and_mount(
        &mut self,
        wip: FiberId,
        component: &Rc<ClassComponent>,
        props: &Props,
        context: &ContextMap,
        render_time: ExpirationTime,
    ) -> WorkResult<()> {
        self.host
            .construct_class_instance(self.tree, wip, component, props, context, render_time)?;
        self.host
            .mount_class_instance(self.tree, wip, component, props, context, render_time)
    }

    fn finish_class_component(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
        component: &ClassComponent,
        should_update: bool,
        has_context: bool,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        // Refs update even when the instance declines to render.
        self.mark_ref(current, wip)?;

        let did_capture = self
            .tree
            .fiber(wip)?
            .effect_tag
            .contains(EffectTag::DID_CAPTURE);

        if !should_update && !did_capture {
            if has_context {
                self.stacks
                    .legacy
                    .invalidate_context_provider(self.tree, wip, false)?;
            }
            return self.bailout_on_already_finished_work(current, wip, render_time);
        }

        let instance = self
            .tree
            .fiber(wip)?
            .class_instance()
            .cloned()
            .ok_or(BeginWorkError::MissingInstance(wip))?;

        let children = if did_capture && !component.has_derived_state_from_error {
            log::debug!(
                "[BEGIN_WORK] {} captured an error without derived state: unmounting children",
                component.name
            );
            Children::Empty
        } else {
            let children = instance.render()?;
            if self.double_invoke(wip)? {
                // Output of the second render is dropped.
                instance.render()?;
            }
            children
        };

        self.mark_performed_work(wip)?;
        match current {
            Some(current) if did_capture => {
                self.force_unmount_current_and_reconcile(current, wip, &children, render_time)?;
            }
            _ => {
                self.reconcile_children(current, wip, &children, render_time)?;
            }
        }

        self.tree.fiber_mut(wip)?.memoized_state = MemoizedState::Class(instance.state());

        if has_context {
            self.stacks
                .legacy
                .invalidate_context_provider(self.tree, wip, true)?;
        }

        Ok(self.tree.fiber(wip)?.child)
    }
}
