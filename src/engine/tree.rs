//! Fiber Tree - Arena of fibers addressed by generational handles.
//!
//! Both trees live in one arena. A fiber's twin is reached through
//! `alternate`; the parent/child/sibling links of each tree are kept on the
//! fibers themselves:
//!
//! ```text
//!   current                 work-in-progress
//!   HostRoot ◄─alternate─►  HostRoot
//!     │ child                 │ child
//!     ▼                       ▼
//!   div ──sibling──► span   div' (cloned on demand)
//! ```
//!
//! Handles are stable for the lifetime of a fiber and become dangling (not
//! reused) once it is removed, so a stale handle is reported instead of
//! silently reading another node.

use std::rc::Rc;

use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::error::{BeginWorkError, WorkResult};
use crate::primitives::{Children, Element, ElementType, Portal, Props};
use crate::types::{EffectTag, ExpirationTime, TypeOfMode};

use super::fiber::{Fiber, FiberKind, FiberRoot, MemoizedState, RootState};

slotmap::new_key_type! {
    /// Handle to a fiber in a [`FiberTree`].
    pub struct FiberId;
}

/// Child lists are short; most nodes have a handful of children.
pub type ChildIds = SmallVec<[FiberId; 8]>;

/// Arena holding the current and work-in-progress trees.
#[derive(Debug, Default)]
pub struct FiberTree {
    fibers: SlotMap<FiberId, Fiber>,
}

impl FiberTree {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Access
    // =========================================================================

    pub fn len(&self) -> usize {
        self.fibers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fibers.is_empty()
    }

    pub fn contains(&self, id: FiberId) -> bool {
        self.fibers.contains_key(id)
    }

    pub fn get(&self, id: FiberId) -> Option<&Fiber> {
        self.fibers.get(id)
    }

    /// Fiber by handle, or [`BeginWorkError::DanglingFiber`].
    pub fn fiber(&self, id: FiberId) -> WorkResult<&Fiber> {
        self.fibers.get(id).ok_or(BeginWorkError::DanglingFiber(id))
    }

    pub fn fiber_mut(&mut self, id: FiberId) -> WorkResult<&mut Fiber> {
        self.fibers
            .get_mut(id)
            .ok_or(BeginWorkError::DanglingFiber(id))
    }

    /// Add a detached fiber.
    pub fn insert(&mut self, fiber: Fiber) -> FiberId {
        self.fibers.insert(fiber)
    }

    /// Remove a fiber. Links pointing at it become dangling.
    pub fn remove(&mut self, id: FiberId) -> Option<Fiber> {
        self.fibers.remove(id)
    }

    /// Child handles of `parent`, in sibling order.
    pub fn children(&self, parent: FiberId) -> WorkResult<ChildIds> {
        let mut ids = ChildIds::new();
        let mut next = self.fiber(parent)?.child;
        while let Some(id) = next {
            ids.push(id);
            next = self.fiber(id)?.sibling;
        }
        Ok(ids)
    }

    // =========================================================================
    // Linking
    // =========================================================================

    /// Replace `parent`'s child list with `children`, in order.
    ///
    /// Sets `return_fiber`, `sibling` and `index` on every child.
    pub fn set_child_chain(&mut self, parent: FiberId, children: &[FiberId]) -> WorkResult<()> {
        for (index, &id) in children.iter().enumerate() {
            let sibling = children.get(index + 1).copied();
            let fiber = self.fiber_mut(id)?;
            fiber.return_fiber = Some(parent);
            fiber.sibling = sibling;
            fiber.index = index as u32;
        }
        self.fiber_mut(parent)?.child = children.first().copied();
        Ok(())
    }

    /// Break the current/work-in-progress pairing of `id` on both sides.
    pub fn detach_alternate(&mut self, id: FiberId) -> WorkResult<()> {
        let alternate = self.fiber_mut(id)?.alternate.take();
        if let Some(twin) = alternate.and_then(|a| self.fibers.get_mut(a)) {
            twin.alternate = None;
        }
        Ok(())
    }

    // =========================================================================
    // Factories
    // =========================================================================

    /// Host root of a new tree. The caller installs the update queue.
    pub fn create_host_root(&mut self, root: Rc<FiberRoot>, mode: TypeOfMode) -> FiberId {
        let mut fiber = Fiber::new(FiberKind::HostRoot(root), Props::new(), None, mode);
        fiber.memoized_state = MemoizedState::Root(RootState::default());
        self.insert(fiber)
    }

    pub fn create_fiber_from_element(
        &mut self,
        element: &Element,
        mode: TypeOfMode,
        expiration_time: ExpirationTime,
    ) -> FiberId {
        let id = self.create_fiber_from_type_and_props(
            &element.element_type,
            element.key.clone(),
            element.props.clone(),
            mode,
            expiration_time,
        );
        self.fibers[id].ref_handle = element.ref_handle.clone();
        id
    }

    pub fn create_fiber_from_type_and_props(
        &mut self,
        element_type: &ElementType,
        key: Option<Rc<str>>,
        pending_props: Props,
        mode: TypeOfMode,
        expiration_time: ExpirationTime,
    ) -> FiberId {
        let (kind, extra_mode) = FiberKind::for_element_type(element_type);
        let mut fiber = Fiber::new(kind, pending_props, key, mode | extra_mode);
        fiber.element_type = Some(element_type.clone());
        fiber.expiration_time = expiration_time;
        self.insert(fiber)
    }

    pub fn create_fiber_from_fragment(
        &mut self,
        children: Children,
        mode: TypeOfMode,
        expiration_time: ExpirationTime,
        key: Option<Rc<str>>,
    ) -> FiberId {
        let mut fiber = Fiber::new(
            FiberKind::Fragment,
            Props::from_children(children),
            key,
            mode,
        );
        fiber.expiration_time = expiration_time;
        self.insert(fiber)
    }

    pub fn create_fiber_from_text(
        &mut self,
        text: impl Into<Rc<str>>,
        mode: TypeOfMode,
        expiration_time: ExpirationTime,
    ) -> FiberId {
        let mut fiber = Fiber::new(
            FiberKind::HostText { instance: None },
            Props::from_children(Children::Text(text.into())),
            None,
            mode,
        );
        fiber.expiration_time = expiration_time;
        self.insert(fiber)
    }

    pub fn create_fiber_from_portal(
        &mut self,
        portal: &Portal,
        mode: TypeOfMode,
        expiration_time: ExpirationTime,
    ) -> FiberId {
        let mut fiber = Fiber::new(
            FiberKind::HostPortal(portal.container.clone()),
            Props::from_children(portal.children.clone()),
            portal.key.clone(),
            mode,
        );
        fiber.expiration_time = expiration_time;
        self.insert(fiber)
    }

    // =========================================================================
    // Double Buffering
    // =========================================================================

    /// Work-in-progress twin of `current`, reusing the existing alternate.
    ///
    /// Pending work and committed state are copied from `current`; effects
    /// are cleared. The caller sets `return_fiber`.
    pub fn create_work_in_progress(
        &mut self,
        current: FiberId,
        pending_props: Props,
    ) -> WorkResult<FiberId> {
        let source = self.fiber(current)?.clone();

        let wip = match source.alternate.filter(|id| self.fibers.contains_key(*id)) {
            Some(wip) => {
                let fiber = &mut self.fibers[wip];
                fiber.kind = source.kind.clone();
                fiber.pending_props = pending_props;
                fiber.effect_tag = EffectTag::NO_EFFECT;
                wip
            }
            None => {
                let mut fiber = Fiber::new(
                    source.kind.clone(),
                    pending_props,
                    source.key.clone(),
                    source.mode,
                );
                fiber.element_type = source.element_type.clone();
                fiber.alternate = Some(current);
                let wip = self.insert(fiber);
                self.fibers[current].alternate = Some(wip);
                wip
            }
        };

        let fiber = &mut self.fibers[wip];
        fiber.child_expiration_time = source.child_expiration_time;
        fiber.expiration_time = source.expiration_time;
        fiber.child = source.child;
        fiber.memoized_props = source.memoized_props;
        fiber.memoized_state = source.memoized_state;
        fiber.update_queue = source.update_queue;
        fiber.context_dependencies = source.context_dependencies;
        fiber.sibling = source.sibling;
        fiber.index = source.index;
        fiber.ref_handle = source.ref_handle;
        Ok(wip)
    }

    /// Replace `wip`'s children (still shared with current) by their own
    /// work-in-progress twins, reusing each child's pending props.
    pub fn clone_child_fibers(&mut self, wip: FiberId) -> WorkResult<()> {
        let Some(first) = self.fiber(wip)?.child else {
            return Ok(());
        };

        let mut current_child = first;
        let props = self.fiber(current_child)?.pending_props.clone();
        let mut new_child = self.create_work_in_progress(current_child, props)?;
        self.fibers[wip].child = Some(new_child);
        self.fibers[new_child].return_fiber = Some(wip);

        while let Some(next) = self.fiber(current_child)?.sibling {
            current_child = next;
            let props = self.fiber(current_child)?.pending_props.clone();
            let cloned = self.create_work_in_progress(current_child, props)?;
            self.fibers[new_child].sibling = Some(cloned);
            self.fibers[cloned].return_fiber = Some(wip);
            new_child = cloned;
        }
        self.fibers[new_child].sibling = None;
        Ok(())
    }

    // =========================================================================
    // Pending Work
    // =========================================================================

    /// Raise the pending work of `id` (and its twin) to at least `time`.
    pub fn raise_expiration_time(&mut self, id: FiberId, time: ExpirationTime) -> WorkResult<()> {
        let fiber = self.fiber_mut(id)?;
        fiber.expiration_time = fiber.expiration_time.most_urgent(time);
        let alternate = fiber.alternate;
        if let Some(twin) = alternate.and_then(|a| self.fibers.get_mut(a)) {
            twin.expiration_time = twin.expiration_time.most_urgent(time);
        }
        Ok(())
    }

    /// Record `time` as pending below every ancestor starting at `parent`,
    /// on both trees. Stops at the first ancestor that already knows.
    pub fn schedule_work_on_parent_path(
        &mut self,
        parent: Option<FiberId>,
        time: ExpirationTime,
    ) -> WorkResult<()> {
        let mut node = parent;
        while let Some(id) = node {
            let fiber = self.fiber_mut(id)?;
            let alternate = fiber.alternate;
            let own_behind = fiber.child_expiration_time.is_less_urgent_than(time);
            if own_behind {
                fiber.child_expiration_time = time;
            }
            let twin_behind = match alternate.and_then(|a| self.fibers.get_mut(a)) {
                Some(twin) if twin.child_expiration_time.is_less_urgent_than(time) => {
                    twin.child_expiration_time = time;
                    true
                }
                _ => false,
            };
            if !own_behind && !twin_behind {
                break;
            }
            node = self.fibers[id].return_fiber;
        }
        Ok(())
    }
}
