//! Lazy handler - Resolve a lazily loaded definition and mount it.

use std::rc::Rc;

use crate::engine::{FiberId, FiberKind};
use crate::error::{BeginWorkError, WorkResult};
use crate::primitives::{LazyComponent, resolve_default_props};
use crate::types::ExpirationTime;

use super::begin_work::WorkContext;

impl WorkContext<'_> {
    /// Resolve `lazy`, rewrite the fiber to the resolved kind and run that
    /// kind's handler as a fresh mount.
    ///
    /// While the definition is still loading the resolver's suspension is
    /// returned untouched.
    pub(super) fn mount_lazy_component(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
        lazy: &Rc<LazyComponent>,
        update_time: ExpirationTime,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        if current.is_some() {
            self.detach_for_remount(wip)?;
        }

        let resolved = self.host.read_lazy_component_type(lazy)?;
        let kind = FiberKind::resolve_lazy(&resolved)?;
        log::debug!("[BEGIN_WORK] promote {wip:?}: lazy {} -> {}", lazy.name, kind.tag());

        let fiber = self.tree.fiber_mut(wip)?;
        fiber.kind = kind.clone();
        let props = resolve_default_props(resolved.default_props(), &fiber.pending_props);

        match kind {
            FiberKind::FunctionComponent(component) => {
                self.update_function_component(None, wip, &component, props, render_time)
            }
            FiberKind::ClassComponent(class) => {
                self.update_class_component(None, wip, &class.component, props, render_time)
            }
            FiberKind::ForwardRef(component) => {
                self.update_forward_ref(None, wip, &component, props, render_time)
            }
            FiberKind::MemoComponent(memo) => {
                let props = resolve_default_props(memo.inner.default_props(), &props);
                self.update_memo_component(None, wip, &memo, props, update_time, render_time)
            }
            // `resolve_lazy` only yields the four kinds above.
            other => Err(BeginWorkError::InvalidLazyType {
                resolved: format!("{other:?}"),
            }),
        }
    }
}
