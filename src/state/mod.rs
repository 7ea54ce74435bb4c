//! State Module - Render-pass stacks threaded through dispatch
//!
//! Everything a fiber can observe from its ancestors lives here:
//!
//! - **Context** - provided context values, dependency recording, change propagation
//! - **Legacy context** - name-keyed context merged by class providers
//! - **Host context** - host containers and environment context
//!
//! All of them follow strict depth-first push/pop discipline. A bailed-out
//! fiber still pushes what its full handler would have pushed, so deeper
//! fibers read the same values either way.

mod context;
mod host_context;
mod legacy_context;
mod stack;

pub use context::*;
pub use host_context::*;
pub use legacy_context::*;
pub use stack::*;

/// Snapshot of every stack depth, taken before a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StackDepth {
    context: usize,
    legacy: usize,
    host: HostStackDepth,
}

/// The stacks of one render pass.
#[derive(Debug, Default)]
pub struct RenderStacks {
    pub context: ContextStack,
    pub legacy: LegacyContextStack,
    pub host: HostContextStack,
}

impl RenderStacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> StackDepth {
        StackDepth {
            context: self.context.depth(),
            legacy: self.legacy.depth(),
            host: self.host.depth(),
        }
    }

    /// Pop everything pushed since `depth` was taken.
    pub fn rewind(&mut self, depth: StackDepth) {
        self.context.rewind(depth.context);
        self.legacy.rewind(depth.legacy);
        self.host.rewind(depth.host);
    }
}
