//! Legacy Context - Name-keyed context handed down by class providers.
//!
//! Each frame holds the merged context visible below a provider and whether
//! that context changed during this render. A changed flag anywhere above a
//! fiber defeats its fast bailout.

use std::rc::Rc;

use crate::engine::{FiberId, FiberKind, FiberTree};
use crate::error::{BeginWorkError, WorkResult};
use crate::primitives::{ContextMap, empty_context};
use crate::types::WorkTag;

use super::stack::ValueStack;

#[derive(Debug, Clone)]
struct LegacyFrame {
    context: ContextMap,
    did_change: bool,
}

/// Stack of merged legacy context objects.
#[derive(Debug)]
pub struct LegacyContextStack {
    frames: ValueStack<LegacyFrame>,
    /// Context visible above the provider pushed last.
    previous_context: ContextMap,
}

impl Default for LegacyContextStack {
    fn default() -> Self {
        Self {
            frames: ValueStack::new(),
            previous_context: empty_context(),
        }
    }
}

impl LegacyContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merged context visible at the current depth.
    pub fn current(&self) -> ContextMap {
        self.frames
            .peek()
            .map(|frame| frame.context.clone())
            .unwrap_or_else(empty_context)
    }

    /// Check if an ancestor provider's context changed during this render.
    pub fn has_context_changed(&self) -> bool {
        self.frames.peek().is_some_and(|frame| frame.did_change)
    }

    /// Unmasked context for a component, skipping its own frame when it is
    /// a provider that already pushed.
    pub fn unmasked_context(&self, is_provider: bool, did_push_own_context: bool) -> ContextMap {
        if did_push_own_context && is_provider {
            return self.previous_context.clone();
        }
        self.current()
    }

    /// The subset of `unmasked` a component declared interest in.
    pub fn masked_context(unmasked: &ContextMap, context_types: Option<&[Rc<str>]>) -> ContextMap {
        let Some(keys) = context_types else {
            return empty_context();
        };
        let masked = keys
            .iter()
            .map(|key| {
                let value = unmasked.get(key).cloned().unwrap_or_default();
                (key.clone(), value)
            })
            .collect();
        Rc::new(masked)
    }

    // =========================================================================
    // Root
    // =========================================================================

    pub fn push_top_level_context_object(&mut self, fiber: FiberId, context: ContextMap, did_change: bool) {
        if !self.frames.is_empty() {
            log::warn!("top-level legacy context pushed over {} open frames", self.frames.depth());
        }
        self.frames.push(LegacyFrame { context, did_change }, fiber);
    }

    pub fn pop_top_level_context_object(&mut self, fiber: FiberId) {
        self.frames.pop(fiber);
    }

    // =========================================================================
    // Class Providers
    // =========================================================================

    /// Push the child context last merged for the class instance at `fiber`.
    pub fn push_context_provider(&mut self, tree: &FiberTree, fiber: FiberId) -> WorkResult<()> {
        let memoized = match &tree.fiber(fiber)?.kind {
            FiberKind::ClassComponent(class) => class.merged_child_context.clone(),
            _ => None,
        };
        self.previous_context = self.current();
        let did_change = self.has_context_changed();
        self.frames.push(
            LegacyFrame {
                context: memoized.unwrap_or_else(empty_context),
                did_change,
            },
            fiber,
        );
        Ok(())
    }

    /// Replace the provider frame of `fiber` after it rendered.
    ///
    /// When `did_change`, the instance's child context is merged over the
    /// parent context again and remembered on the fiber.
    pub fn invalidate_context_provider(
        &mut self,
        tree: &mut FiberTree,
        fiber: FiberId,
        did_change: bool,
    ) -> WorkResult<()> {
        let kept = self.frames.pop(fiber).map(|frame| frame.context);
        let context = if did_change {
            let merged = self.process_child_context(tree, fiber)?;
            if let FiberKind::ClassComponent(class) = &mut tree.fiber_mut(fiber)?.kind {
                class.merged_child_context = Some(merged.clone());
            }
            merged
        } else {
            kept.unwrap_or_else(empty_context)
        };
        self.frames.push(LegacyFrame { context, did_change }, fiber);
        Ok(())
    }

    pub fn pop_context(&mut self, fiber: FiberId) {
        self.frames.pop(fiber);
    }

    fn process_child_context(&self, tree: &FiberTree, fiber: FiberId) -> WorkResult<ContextMap> {
        let node = tree.fiber(fiber)?;
        let FiberKind::ClassComponent(class) = &node.kind else {
            return Err(BeginWorkError::UnexpectedKind {
                fiber,
                expected: WorkTag::ClassComponent,
                found: node.tag(),
            });
        };
        let instance = class
            .instance
            .as_ref()
            .ok_or(BeginWorkError::MissingInstance(fiber))?;
        let Some(child_context) = instance.child_context() else {
            return Ok(self.previous_context.clone());
        };
        let mut merged = (*self.previous_context).clone();
        merged.extend(child_context.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(Rc::new(merged))
    }

    pub fn depth(&self) -> usize {
        self.frames.depth()
    }

    pub fn rewind(&mut self, depth: usize) {
        self.frames.rewind(depth).for_each(drop);
    }
}
