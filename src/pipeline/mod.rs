//! Begin-Work Pipeline
//!
//! This module implements the begin phase of one unit of work: given a
//! fiber's work-in-progress twin, decide whether it can be skipped, and if
//! not, run the handler for its kind and produce its next children.
//!
//! # Pipeline Architecture
//!
//! ```text
//! work loop → begin_work → fast bailout ─────────────► skip | clone children
//!                        └► kind handler → reconcile ─► first child
//! ```
//!
//! ## Data Flow
//!
//! 1. **begin_work** - Compares props, legacy context and pending work
//! 2. **handlers** - One per fiber kind (function, class, host, memo, lazy,
//!    context, fragment, suspense)
//! 3. **reconcile** - Hands the next children to the [`ChildReconciler`]
//!
//! ## Key Design Principles
//!
//! - **Handlers own no state**: everything lives in the tree, the render
//!   stacks or behind [`Collaborators`]
//! - **Balanced stacks**: a bailout pushes exactly what the handler would
//! - **Errors rewind**: a failed dispatch pops every frame it pushed

pub mod begin_work;
pub mod collaborators;

mod bailout;
mod class;
mod context;
mod fragment;
mod function;
mod host;
mod lazy;
mod memo;
mod reconcile;
mod suspense;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports
pub use begin_work::{DispatchStats, WorkContext};
pub use collaborators::*;
