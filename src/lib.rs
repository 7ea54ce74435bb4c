//! # spark-fiber
//!
//! Incremental reconciliation core: the begin phase of a fiber work loop.
//!
//! Every node of a component tree exists twice, once as the committed
//! (`current`) fiber and once as its work-in-progress twin. For each fiber
//! the work loop visits, [`WorkContext::begin_work`] either proves the
//! subtree is unchanged and skips or clones it, or runs the handler for the
//! fiber's kind and reconciles the children it renders.
//!
//! ## Architecture
//!
//! ```text
//! FiberTree (slot arena) ─► WorkContext::begin_work ─► kind handler
//!          ▲                        │                       │
//!          └──── RenderStacks ◄─────┴──── Collaborators ◄───┘
//! ```
//!
//! The hook runtime, class instance manager, update queues, hydration,
//! lazy loading, host environment and child reconciler are external:
//! they are reached through the [`Collaborators`] traits.
//!
//! ## Modules
//!
//! - [`types`] - Expiration times, effect tags, mode and work tags
//! - [`primitives`] - Props, children descriptions and component definitions
//! - [`engine`] - Fibers and the arena holding both trees
//! - [`state`] - Context, legacy context and host context stacks
//! - [`pipeline`] - The dispatcher, bailouts and per-kind handlers

pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod primitives;
pub mod state;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use config::WorkConfig;
pub use error::{BeginWorkError, Thrown, WorkResult};

pub use engine::{
    ClassFiber, ContextDependency, Fiber, FiberId, FiberKind, FiberRoot, FiberTree, MemoizedState,
    RootState, SuspenseState,
};

pub use pipeline::{
    ChildReconciler, Collaborators, DispatchStats, HookRuntime, HostEnvironment, Hydration,
    InstanceManager, LazyResolver, UpdateQueueProcessor, WorkContext,
};

pub use primitives::{
    Children, ClassComponent, ClassInstance, Context, ContextMap, Element, ElementType,
    ForwardRefComponent, FunctionComponent, InstanceHandle, LazyComponent, MemoComponent, Portal,
    PropValue, Props, RenderArg,
};

pub use state::{ContextStack, HostContextStack, LegacyContextStack, RenderStacks};
