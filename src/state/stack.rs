//! Value Stack - Depth-first push/pop discipline for render-pass state.
//!
//! Every frame records the fiber that pushed it. Pops must come back in exact
//! reverse order; a pop by the wrong fiber is logged and still performed so
//! the stack cannot drift further.
//!
//! `depth()` + `rewind()` give scoped acquisition: remember the depth before
//! a unit of work and rewind to it if that unit fails.

use crate::engine::FiberId;

#[derive(Debug, Clone)]
struct Frame<T> {
    value: T,
    fiber: FiberId,
}

/// Stack of values tagged with the fiber that pushed them.
#[derive(Debug, Clone)]
pub struct ValueStack<T> {
    frames: Vec<Frame<T>>,
}

impl<T> Default for ValueStack<T> {
    fn default() -> Self {
        Self { frames: Vec::new() }
    }
}

impl<T> ValueStack<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: T, fiber: FiberId) {
        self.frames.push(Frame { value, fiber });
    }

    /// Pop the top frame, which `fiber` is expected to own.
    pub fn pop(&mut self, fiber: FiberId) -> Option<T> {
        let frame = self.frames.pop()?;
        if frame.fiber != fiber {
            log::warn!(
                "unexpected fiber popped: {:?} owns the frame, {:?} popped it",
                frame.fiber,
                fiber
            );
        }
        Some(frame.value)
    }

    /// Value on top of the stack.
    pub fn peek(&self) -> Option<&T> {
        self.frames.last().map(|frame| &frame.value)
    }

    /// Fiber that pushed the top frame.
    pub fn top_fiber(&self) -> Option<FiberId> {
        self.frames.last().map(|frame| frame.fiber)
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Drop every frame above `depth`, yielding their values top first.
    pub fn rewind(&mut self, depth: usize) -> impl Iterator<Item = T> + '_ {
        let depth = depth.min(self.frames.len());
        self.frames.drain(depth..).rev().map(|frame| frame.value)
    }
}
