//! Recording collaborators for dispatcher tests.
//!
//! `TestHost` implements every collaborator role with the simplest behavior
//! that still exercises the dispatcher: a positional child reconciler, a
//! root update queue that holds one element, counters everywhere else.

use std::collections::HashMap;
use std::rc::Rc;

use crate::config::WorkConfig;
use crate::engine::{FiberId, FiberKind, FiberRoot, FiberTree, MemoizedState, RootState};
use crate::error::{Thrown, WorkResult};
use crate::primitives::{
    Children, ClassComponent, ContextMap, ElementType, LazyComponent, PropValue, Props, RenderArg,
    RenderFn,
};
use crate::state::RenderStacks;
use crate::types::{EffectTag, ExpirationTime, Opaque, TypeOfMode, WorkTag};

use super::begin_work::WorkContext;
use super::collaborators::{
    ChildReconciler, HookRuntime, HostEnvironment, Hydration, InstanceManager, LazyResolver,
    UpdateQueueProcessor,
};

/// One call into the child reconciler.
#[derive(Debug, Clone)]
pub enum ReconcileCall {
    Mount {
        parent: FiberId,
        children: Children,
    },
    Reconcile {
        parent: FiberId,
        current_first_child: Option<FiberId>,
        children: Children,
    },
}

impl ReconcileCall {
    pub fn parent(&self) -> FiberId {
        match self {
            Self::Mount { parent, .. } | Self::Reconcile { parent, .. } => *parent,
        }
    }
}

/// Root update queue: processing it renders `element`.
pub struct TestRootQueue {
    pub element: Children,
}

pub struct TestHost {
    pub calls: Vec<ReconcileCall>,
    pub hooks_prepared: usize,
    pub hooks_finished: usize,
    pub mounted_instances: usize,
    pub resumed_instances: usize,
    pub updated_instances: usize,
    /// Answer of resume/update lifecycles.
    pub should_update: bool,
    pub force_updates: Vec<FiberId>,
    /// Answer of `enter_hydration_state`.
    pub can_hydrate: bool,
    pub entered_hydration: usize,
    pub claimed: Vec<FiberId>,
    pub hydration_resets: usize,
    pub lazy_types: HashMap<Rc<str>, ElementType>,
    root_context: Opaque,
}

impl TestHost {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            hooks_prepared: 0,
            hooks_finished: 0,
            mounted_instances: 0,
            resumed_instances: 0,
            updated_instances: 0,
            should_update: true,
            force_updates: Vec::new(),
            can_hydrate: false,
            entered_hydration: 0,
            claimed: Vec::new(),
            hydration_resets: 0,
            lazy_types: HashMap::new(),
            root_context: Rc::new("html"),
        }
    }

    /// Fresh tree and stacks for one render pass.
    pub fn pass() -> (FiberTree, RenderStacks) {
        (FiberTree::new(), RenderStacks::new())
    }

    pub fn context<'a>(
        &'a mut self,
        tree: &'a mut FiberTree,
        stacks: &'a mut RenderStacks,
    ) -> WorkContext<'a> {
        self.context_with(tree, stacks, WorkConfig::default())
    }

    pub fn context_with<'a>(
        &'a mut self,
        tree: &'a mut FiberTree,
        stacks: &'a mut RenderStacks,
        config: WorkConfig,
    ) -> WorkContext<'a> {
        WorkContext::new(tree, stacks, self, config)
    }

    pub fn resolve_lazy(mut self, name: &str, resolved: ElementType) -> Self {
        self.lazy_types.insert(name.into(), resolved);
        self
    }

    /// Flatten nested lists, dropping empty slots.
    fn flatten(children: &Children, out: &mut Vec<Children>) {
        match children {
            Children::Empty => {}
            Children::List(items) => {
                for item in items.iter() {
                    Self::flatten(item, out);
                }
            }
            other => out.push(other.clone()),
        }
    }

    fn create_child(
        tree: &mut FiberTree,
        child: &Children,
        mode: TypeOfMode,
        render_time: ExpirationTime,
    ) -> FiberId {
        match child {
            Children::Text(text) => tree.create_fiber_from_text(text.clone(), mode, render_time),
            Children::Element(element) => tree.create_fiber_from_element(element, mode, render_time),
            Children::Portal(portal) => tree.create_fiber_from_portal(portal, mode, render_time),
            Children::Empty | Children::List(_) => {
                tree.create_fiber_from_fragment(child.clone(), mode, render_time, None)
            }
        }
    }

    /// Reuse `existing` for `child` when the kinds line up.
    fn reuse(tree: &mut FiberTree, existing: FiberId, child: &Children) -> Option<FiberId> {
        let fiber = tree.get(existing)?;
        match child {
            Children::Text(text) if fiber.tag() == WorkTag::HostText => tree
                .create_work_in_progress(existing, Props::from_children(Children::Text(text.clone())))
                .ok(),
            Children::Element(element)
                if fiber
                    .element_type
                    .as_ref()
                    .is_some_and(|t| t.is_same(&element.element_type))
                    && fiber.key == element.key =>
            {
                let wip = tree
                    .create_work_in_progress(existing, element.props.clone())
                    .ok()?;
                if let Ok(fiber) = tree.fiber_mut(wip) {
                    fiber.ref_handle = element.ref_handle.clone();
                }
                Some(wip)
            }
            _ => None,
        }
    }

    fn place(
        &mut self,
        tree: &mut FiberTree,
        parent: FiberId,
        current_first_child: Option<FiberId>,
        children: &Children,
        render_time: ExpirationTime,
        track_effects: bool,
    ) -> WorkResult<Option<FiberId>> {
        let mode = tree.fiber(parent)?.mode;
        let mut flat = Vec::new();
        Self::flatten(children, &mut flat);

        let mut existing = Vec::new();
        let mut next = current_first_child;
        while let Some(id) = next {
            existing.push(id);
            next = tree.fiber(id)?.sibling;
        }

        let mut ids = Vec::with_capacity(flat.len());
        for (index, child) in flat.iter().enumerate() {
            let reused = existing
                .get(index)
                .and_then(|&old| Self::reuse(tree, old, child));
            let id = match reused {
                Some(id) => id,
                None => {
                    let id = Self::create_child(tree, child, mode, render_time);
                    if track_effects {
                        tree.fiber_mut(id)?.effect_tag |= EffectTag::PLACEMENT;
                    }
                    id
                }
            };
            ids.push(id);
        }
        tree.set_child_chain(parent, &ids)?;
        Ok(ids.first().copied())
    }
}

impl ChildReconciler for TestHost {
    fn mount_child_fibers(
        &mut self,
        tree: &mut FiberTree,
        parent: FiberId,
        children: &Children,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        self.calls.push(ReconcileCall::Mount {
            parent,
            children: children.clone(),
        });
        self.place(tree, parent, None, children, render_time, false)
    }

    fn reconcile_child_fibers(
        &mut self,
        tree: &mut FiberTree,
        parent: FiberId,
        current_first_child: Option<FiberId>,
        children: &Children,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        self.calls.push(ReconcileCall::Reconcile {
            parent,
            current_first_child,
            children: children.clone(),
        });
        self.place(tree, parent, current_first_child, children, render_time, true)
    }
}

impl HookRuntime for TestHost {
    fn prepare_to_use_hooks(
        &mut self,
        _tree: &mut FiberTree,
        _current: Option<FiberId>,
        _wip: FiberId,
        _render_time: ExpirationTime,
    ) {
        self.hooks_prepared += 1;
    }

    fn finish_hooks(
        &mut self,
        _tree: &mut FiberTree,
        _render: &RenderFn,
        _props: &Props,
        children: Children,
        _arg: &RenderArg,
    ) -> WorkResult<Children> {
        self.hooks_finished += 1;
        Ok(children)
    }
}

impl InstanceManager for TestHost {
    fn mount_class_instance(
        &mut self,
        _tree: &mut FiberTree,
        _wip: FiberId,
        _component: &Rc<ClassComponent>,
        _props: &Props,
        _context: &ContextMap,
        _render_time: ExpirationTime,
    ) -> WorkResult<()> {
        self.mounted_instances += 1;
        Ok(())
    }

    fn resume_mount_class_instance(
        &mut self,
        _tree: &mut FiberTree,
        _wip: FiberId,
        _component: &Rc<ClassComponent>,
        _props: &Props,
        _context: &ContextMap,
        _render_time: ExpirationTime,
    ) -> WorkResult<bool> {
        self.resumed_instances += 1;
        Ok(self.should_update)
    }

    fn update_class_instance(
        &mut self,
        _tree: &mut FiberTree,
        _current: FiberId,
        _wip: FiberId,
        _component: &Rc<ClassComponent>,
        _props: &Props,
        _context: &ContextMap,
        _render_time: ExpirationTime,
    ) -> WorkResult<bool> {
        self.updated_instances += 1;
        Ok(self.should_update)
    }
}

impl UpdateQueueProcessor for TestHost {
    fn process_update_queue(
        &mut self,
        tree: &mut FiberTree,
        wip: FiberId,
        _props: &Props,
        _render_time: ExpirationTime,
    ) -> WorkResult<()> {
        let fiber = tree.fiber_mut(wip)?;
        let element = fiber
            .update_queue
            .as_ref()
            .and_then(|queue| queue.downcast_ref::<TestRootQueue>())
            .map(|queue| queue.element.clone());
        if let Some(element) = element {
            fiber.memoized_state = MemoizedState::Root(RootState { element });
        }
        Ok(())
    }

    fn enqueue_force_update(
        &mut self,
        _tree: &mut FiberTree,
        fiber: FiberId,
        _render_time: ExpirationTime,
    ) -> WorkResult<()> {
        self.force_updates.push(fiber);
        Ok(())
    }
}

impl Hydration for TestHost {
    fn enter_hydration_state(&mut self, _tree: &FiberTree, _root: FiberId) -> bool {
        self.entered_hydration += 1;
        self.can_hydrate
    }

    fn try_to_claim_next_hydratable_instance(&mut self, _tree: &mut FiberTree, fiber: FiberId) {
        self.claimed.push(fiber);
    }

    fn reset_hydration_state(&mut self) {
        self.hydration_resets += 1;
    }
}

impl LazyResolver for TestHost {
    fn read_lazy_component_type(&mut self, lazy: &LazyComponent) -> Result<ElementType, Thrown> {
        self.lazy_types
            .get(&lazy.name)
            .cloned()
            .ok_or_else(|| Thrown::suspended(lazy.name.clone()))
    }
}

impl HostEnvironment for TestHost {
    fn should_set_text_content(&self, _tag: &str, props: &Props) -> bool {
        matches!(props.children(), Children::Text(_))
    }

    fn should_deprioritize_subtree(&self, _tag: &str, props: &Props) -> bool {
        props.get("hidden").and_then(PropValue::as_bool) == Some(true)
    }

    fn root_host_context(&self, _container: &Opaque) -> Opaque {
        self.root_context.clone()
    }

    fn child_host_context(&self, parent: &Opaque, tag: &str, _container: &Opaque) -> Opaque {
        if tag == "svg" {
            Rc::new("svg")
        } else {
            parent.clone()
        }
    }
}

// =============================================================================
// Tree Builders
// =============================================================================

pub fn host_fiber(tree: &mut FiberTree, tag: &str) -> FiberId {
    tree.create_fiber_from_type_and_props(
        &ElementType::host(tag),
        None,
        Props::new(),
        TypeOfMode::NO_CONTEXT,
        ExpirationTime::NO_WORK,
    )
}

/// Committed host root whose queue renders `element`, plus its twin.
pub fn root_pair(tree: &mut FiberTree, root: FiberRoot, element: Children) -> (FiberId, FiberId) {
    let current = tree.create_host_root(Rc::new(root), TypeOfMode::NO_CONTEXT);
    let queue: Opaque = Rc::new(TestRootQueue { element });
    let fiber = tree.fiber_mut(current).expect("root exists");
    fiber.update_queue = Some(queue);
    fiber.memoized_props = Some(fiber.pending_props.clone());
    fiber.expiration_time = ExpirationTime::SYNC;
    let props = fiber.pending_props.clone();
    let wip = tree
        .create_work_in_progress(current, props)
        .expect("root twin");
    (current, wip)
}

/// The work loop's step after `begin_work`: the pending props become the
/// memoized ones.
pub fn complete(tree: &mut FiberTree, wip: FiberId) {
    let fiber = tree.fiber_mut(wip).expect("completed fiber exists");
    fiber.memoized_props = Some(fiber.pending_props.clone());
}

/// Committed fiber of `element_type` with `props`, plus a twin whose
/// pending props are `next_props`.
pub fn committed_pair(
    tree: &mut FiberTree,
    element_type: &ElementType,
    props: Props,
    next_props: Props,
    mode: TypeOfMode,
) -> (FiberId, FiberId) {
    let current =
        tree.create_fiber_from_type_and_props(element_type, None, props, mode, ExpirationTime::NO_WORK);
    complete(tree, current);
    let wip = tree
        .create_work_in_progress(current, next_props)
        .expect("twin");
    (current, wip)
}

/// Kind of `id`, for assertions.
pub fn kind_of(tree: &FiberTree, id: FiberId) -> FiberKind {
    tree.fiber(id).expect("fiber exists").kind.clone()
}
