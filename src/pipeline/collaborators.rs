//! Collaborators - What the dispatcher delegates and never does itself.
//!
//! Each trait is one external subsystem. A host usually implements all of
//! them on one object, which then serves as `&mut dyn Collaborators`.
//!
//! Every method receives the tree explicitly; collaborators keep no handle
//! to it between calls.

use std::rc::Rc;

use crate::engine::{FiberId, FiberKind, FiberTree};
use crate::error::{BeginWorkError, Thrown, WorkResult};
use crate::primitives::{
    Children, ClassComponent, ContextMap, ElementType, LazyComponent, Props, RenderArg, RenderFn,
};
use crate::types::{ExpirationTime, Opaque, WorkTag};

// =============================================================================
// Child Reconciler
// =============================================================================

/// Turns a children description into the child chain of a fiber.
///
/// Both methods return the new first child; the caller attaches it.
pub trait ChildReconciler {
    /// Fresh mount without side-effect tracking.
    fn mount_child_fibers(
        &mut self,
        tree: &mut FiberTree,
        parent: FiberId,
        children: &Children,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>>;

    /// Diff against `current_first_child`, recording placements and deletions.
    fn reconcile_child_fibers(
        &mut self,
        tree: &mut FiberTree,
        parent: FiberId,
        current_first_child: Option<FiberId>,
        children: &Children,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>>;

    /// Give `wip` its own twins of the children it still shares with `current`.
    fn clone_child_fibers(
        &mut self,
        tree: &mut FiberTree,
        _current: Option<FiberId>,
        wip: FiberId,
    ) -> WorkResult<()> {
        tree.clone_child_fibers(wip)
    }
}

// =============================================================================
// Hook Runtime
// =============================================================================

/// Slot tracking for function-style renders.
pub trait HookRuntime {
    fn prepare_to_use_hooks(
        &mut self,
        tree: &mut FiberTree,
        current: Option<FiberId>,
        wip: FiberId,
        render_time: ExpirationTime,
    );

    /// End tracking. May render again if state changed mid-render; returns
    /// the children to reconcile.
    fn finish_hooks(
        &mut self,
        tree: &mut FiberTree,
        render: &RenderFn,
        props: &Props,
        children: Children,
        arg: &RenderArg,
    ) -> WorkResult<Children>;
}

// =============================================================================
// Instance Manager
// =============================================================================

/// Class instance lifecycle.
pub trait InstanceManager {
    /// Construct the instance and store it on `wip`.
    fn construct_class_instance(
        &mut self,
        tree: &mut FiberTree,
        wip: FiberId,
        component: &Rc<ClassComponent>,
        props: &Props,
        context: &ContextMap,
        _render_time: ExpirationTime,
    ) -> WorkResult<()> {
        let instance = (component.construct)(props, context)?;
        let fiber = tree.fiber_mut(wip)?;
        match &mut fiber.kind {
            FiberKind::ClassComponent(class) => {
                class.instance = Some(instance);
                Ok(())
            }
            other => Err(BeginWorkError::UnexpectedKind {
                fiber: wip,
                expected: WorkTag::ClassComponent,
                found: other.tag(),
            }),
        }
    }

    /// First-mount lifecycle of a freshly constructed instance.
    fn mount_class_instance(
        &mut self,
        tree: &mut FiberTree,
        wip: FiberId,
        component: &Rc<ClassComponent>,
        props: &Props,
        context: &ContextMap,
        render_time: ExpirationTime,
    ) -> WorkResult<()>;

    /// Resume a mount whose instance survived an aborted render.
    /// Returns whether to render.
    fn resume_mount_class_instance(
        &mut self,
        tree: &mut FiberTree,
        wip: FiberId,
        component: &Rc<ClassComponent>,
        props: &Props,
        context: &ContextMap,
        render_time: ExpirationTime,
    ) -> WorkResult<bool>;

    /// Apply queued updates and update lifecycles. Returns whether to render.
    #[allow(clippy::too_many_arguments)]
    fn update_class_instance(
        &mut self,
        tree: &mut FiberTree,
        current: FiberId,
        wip: FiberId,
        component: &Rc<ClassComponent>,
        props: &Props,
        context: &ContextMap,
        render_time: ExpirationTime,
    ) -> WorkResult<bool>;
}

// =============================================================================
// Update Queue
// =============================================================================

/// Pending state transitions of roots and class instances.
pub trait UpdateQueueProcessor {
    /// Apply every update due at `render_time` and write the resulting state
    /// into `wip.memoized_state`.
    fn process_update_queue(
        &mut self,
        tree: &mut FiberTree,
        wip: FiberId,
        props: &Props,
        render_time: ExpirationTime,
    ) -> WorkResult<()>;

    /// Queue a forced re-render of a class fiber.
    fn enqueue_force_update(
        &mut self,
        tree: &mut FiberTree,
        fiber: FiberId,
        render_time: ExpirationTime,
    ) -> WorkResult<()>;
}

// =============================================================================
// Hydration
// =============================================================================

/// Claims pre-existing host instances during a first render.
pub trait Hydration {
    /// Start hydrating below `root`. Returns whether hydration is active.
    fn enter_hydration_state(&mut self, tree: &FiberTree, root: FiberId) -> bool;

    fn try_to_claim_next_hydratable_instance(&mut self, tree: &mut FiberTree, fiber: FiberId);

    fn reset_hydration_state(&mut self);
}

// =============================================================================
// Lazy Resolver
// =============================================================================

/// Loads the definition behind a lazy component.
pub trait LazyResolver {
    /// The resolved type, or [`Thrown::Suspended`] while still loading.
    fn read_lazy_component_type(&mut self, lazy: &LazyComponent) -> Result<ElementType, Thrown>;
}

// =============================================================================
// Host Environment
// =============================================================================

/// Queries about the output target.
pub trait HostEnvironment {
    /// Check if `props` paint their children as text content of the element.
    fn should_set_text_content(&self, tag: &str, props: &Props) -> bool;

    /// Check if the subtree is hidden and can wait for offscreen priority.
    fn should_deprioritize_subtree(&self, tag: &str, props: &Props) -> bool;

    fn root_host_context(&self, container: &Opaque) -> Opaque;

    /// Context for children of host element `tag`. Returning `parent`
    /// itself means no change.
    fn child_host_context(&self, parent: &Opaque, tag: &str, container: &Opaque) -> Opaque;
}

// =============================================================================
// Bundle
// =============================================================================

/// Every collaborator role at once.
pub trait Collaborators:
    ChildReconciler + HookRuntime + InstanceManager + UpdateQueueProcessor + Hydration + LazyResolver + HostEnvironment
{
    /// View as the host environment alone.
    fn as_host_environment(&self) -> &dyn HostEnvironment;
}

impl<T> Collaborators for T
where
    T: ChildReconciler
        + HookRuntime
        + InstanceManager
        + UpdateQueueProcessor
        + Hydration
        + LazyResolver
        + HostEnvironment,
{
    fn as_host_environment(&self) -> &dyn HostEnvironment {
        self
    }
}
