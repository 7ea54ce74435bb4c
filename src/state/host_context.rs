//! Host Context - Container and environment context for host elements.
//!
//! Roots and portals push the container their subtree renders into. Host
//! elements push a child host context only when the environment reports a
//! different one (an `svg` element switching namespaces, for example).

use std::rc::Rc;

use crate::engine::FiberId;
use crate::pipeline::HostEnvironment;
use crate::types::Opaque;

use super::stack::ValueStack;

/// Depths of both host stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HostStackDepth {
    containers: usize,
    contexts: usize,
}

#[derive(Default)]
pub struct HostContextStack {
    containers: ValueStack<Opaque>,
    contexts: ValueStack<Opaque>,
}

impl HostContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Innermost host container.
    pub fn root_container(&self) -> Option<&Opaque> {
        self.containers.peek()
    }

    /// Innermost host context.
    pub fn current_context(&self) -> Option<&Opaque> {
        self.contexts.peek()
    }

    pub fn push_host_container(&mut self, fiber: FiberId, container: Opaque, env: &dyn HostEnvironment) {
        let root_context = env.root_host_context(&container);
        self.containers.push(container, fiber);
        self.contexts.push(root_context, fiber);
    }

    pub fn pop_host_container(&mut self, fiber: FiberId) {
        self.contexts.pop(fiber);
        self.containers.pop(fiber);
    }

    /// Push the child context of host element `tag` if it differs.
    pub fn push_host_context(&mut self, fiber: FiberId, tag: &str, env: &dyn HostEnvironment) {
        let (Some(container), Some(context)) = (self.containers.peek(), self.contexts.peek()) else {
            log::warn!("host element {tag:?} rendered outside a host container");
            return;
        };
        let next = env.child_host_context(context, tag, container);
        if Rc::ptr_eq(context, &next) {
            return;
        }
        self.contexts.push(next, fiber);
    }

    /// Pop the context `fiber` pushed, if it pushed one.
    pub fn pop_host_context(&mut self, fiber: FiberId) {
        if self.contexts.top_fiber() != Some(fiber) {
            return;
        }
        self.contexts.pop(fiber);
    }

    pub fn depth(&self) -> HostStackDepth {
        HostStackDepth {
            containers: self.containers.depth(),
            contexts: self.contexts.depth(),
        }
    }

    pub fn rewind(&mut self, depth: HostStackDepth) {
        self.contexts.rewind(depth.contexts).for_each(drop);
        self.containers.rewind(depth.containers).for_each(drop);
    }
}

impl std::fmt::Debug for HostContextStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContextStack")
            .field("depth", &self.depth())
            .finish()
    }
}
