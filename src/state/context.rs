//! Context Stack - Provided values and change propagation.
//!
//! Providers push their value while their subtree renders. Consumers read
//! the innermost value and record a dependency on the fiber being rendered,
//! so a later change can find them without re-rendering everything between.
//!
//! # Example
//!
//! ```ignore
//! stacks.context.push_provider(provider, &theme, "dark".into());
//! stacks.context.prepare_to_read_context(tree, consumer)?;
//! let value = stacks.context.read_context(tree, &theme, None)?;
//! ```

use std::collections::HashMap;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::engine::{ContextDependency, FiberId, FiberKind, FiberTree};
use crate::error::WorkResult;
use crate::primitives::{Context, MAX_CHANGED_BITS, PropValue};
use crate::types::{ExpirationTime, WorkTag};

use super::stack::ValueStack;

/// Class fibers matched by a propagation walk. They need a forced update.
pub type MatchedClassFibers = SmallVec<[FiberId; 4]>;

/// Value a provider replaced, restored when it pops.
#[derive(Debug, Clone)]
struct ProviderFrame {
    context_id: u64,
    previous: Option<PropValue>,
}

/// Provider values plus dependency tracking for the fiber being rendered.
#[derive(Debug, Default)]
pub struct ContextStack {
    values: HashMap<u64, PropValue>,
    frames: ValueStack<ProviderFrame>,
    currently_rendering: Option<FiberId>,
    last_context_with_all_bits: Option<u64>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Provider Values
    // =========================================================================

    pub fn push_provider(&mut self, fiber: FiberId, context: &Context, value: PropValue) {
        let previous = self.values.insert(context.id(), value);
        self.frames.push(
            ProviderFrame {
                context_id: context.id(),
                previous,
            },
            fiber,
        );
    }

    pub fn pop_provider(&mut self, fiber: FiberId) {
        if let Some(frame) = self.frames.pop(fiber) {
            self.restore(frame);
        }
    }

    /// Innermost provided value, or the context's default.
    pub fn current_value(&self, context: &Context) -> PropValue {
        self.values
            .get(&context.id())
            .cloned()
            .unwrap_or_else(|| context.default_value.clone())
    }

    pub fn depth(&self) -> usize {
        self.frames.depth()
    }

    /// Pop every provider above `depth`, restoring the values they replaced.
    pub fn rewind(&mut self, depth: usize) {
        let frames: Vec<_> = self.frames.rewind(depth).collect();
        for frame in frames {
            self.restore(frame);
        }
    }

    fn restore(&mut self, frame: ProviderFrame) {
        match frame.previous {
            Some(value) => {
                self.values.insert(frame.context_id, value);
            }
            None => {
                self.values.remove(&frame.context_id);
            }
        }
    }

    // =========================================================================
    // Reading
    // =========================================================================

    /// Start recording dependencies for `fiber`, clearing the old ones.
    pub fn prepare_to_read_context(&mut self, tree: &mut FiberTree, fiber: FiberId) -> WorkResult<()> {
        tree.fiber_mut(fiber)?.context_dependencies.clear();
        self.currently_rendering = Some(fiber);
        self.last_context_with_all_bits = None;
        Ok(())
    }

    /// Read the current value of `context`.
    ///
    /// `observed_bits` of `None` observes everything; `Some(0)` reads without
    /// subscribing. Once a context is observed in full, later reads of it in
    /// the same render add nothing.
    pub fn read_context(
        &mut self,
        tree: &mut FiberTree,
        context: &Rc<Context>,
        observed_bits: Option<u32>,
    ) -> WorkResult<PropValue> {
        if let Some(fiber) = self.currently_rendering
            && self.last_context_with_all_bits != Some(context.id())
            && observed_bits != Some(0)
        {
            let observed_bits = match observed_bits {
                Some(bits) if bits != MAX_CHANGED_BITS => bits,
                _ => {
                    self.last_context_with_all_bits = Some(context.id());
                    MAX_CHANGED_BITS
                }
            };
            tree.fiber_mut(fiber)?
                .context_dependencies
                .push(ContextDependency {
                    context: context.clone(),
                    observed_bits,
                });
        }
        Ok(self.current_value(context))
    }

    /// Bits that changed between two provided values of `context`.
    pub fn calculate_changed_bits(context: &Context, new_value: &PropValue, old_value: &PropValue) -> u32 {
        context.changed_bits(new_value, old_value)
    }

    // =========================================================================
    // Propagation
    // =========================================================================

    /// Walk the subtree of `provider` and schedule every fiber that depends
    /// on `context` through one of `changed_bits` at `render_time`.
    ///
    /// Nested providers of the same context shadow it, so their subtrees are
    /// not entered. Matched class fibers are returned for a forced update.
    pub fn propagate_context_change(
        tree: &mut FiberTree,
        provider: FiberId,
        context: &Context,
        changed_bits: u32,
        render_time: ExpirationTime,
    ) -> WorkResult<MatchedClassFibers> {
        let mut matched = MatchedClassFibers::new();

        let mut fiber = tree.fiber(provider)?.child;
        if let Some(first) = fiber {
            tree.fiber_mut(first)?.return_fiber = Some(provider);
        }

        while let Some(id) = fiber {
            let node = tree.fiber(id)?;
            let depends = node.context_dependencies.iter().any(|dependency| {
                dependency.context.id() == context.id() && dependency.observed_bits & changed_bits != 0
            });

            let next_child = if depends {
                if node.tag() == WorkTag::ClassComponent {
                    matched.push(id);
                }
                let parent = node.return_fiber;
                tree.raise_expiration_time(id, render_time)?;
                tree.schedule_work_on_parent_path(parent, render_time)?;
                tree.fiber(id)?.child
            } else {
                match &node.kind {
                    FiberKind::ContextProvider(nested) if nested.id() == context.id() => None,
                    _ => node.child,
                }
            };

            fiber = match next_child {
                Some(child) => {
                    tree.fiber_mut(child)?.return_fiber = Some(id);
                    Some(child)
                }
                None => Self::next_outside(tree, provider, id)?,
            };
        }

        Ok(matched)
    }

    /// Next sibling on the way back up to `root`, fixing return links.
    fn next_outside(tree: &mut FiberTree, root: FiberId, from: FiberId) -> WorkResult<Option<FiberId>> {
        let mut node = from;
        loop {
            if node == root {
                return Ok(None);
            }
            let fiber = tree.fiber(node)?;
            let parent = fiber.return_fiber;
            if let Some(sibling) = fiber.sibling {
                tree.fiber_mut(sibling)?.return_fiber = parent;
                return Ok(Some(sibling));
            }
            match parent {
                Some(parent) => node = parent,
                None => return Ok(None),
            }
        }
    }
}
