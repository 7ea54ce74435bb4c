//! Fiber engine - The arena both trees live in.
//!
//! The engine owns the core data structures:
//! - Fiber: one node with its kind-specific payload and pending work
//! - FiberTree: slot arena, factories and double buffering
//!
//! # Architecture
//!
//! Fibers are NOT linked by pointers. They are entries in one arena, and
//! every link is a generational handle:
//!
//! ```text
//! FiberId(1v1): HostRoot   child=2v1  alternate=7v1
//! FiberId(2v1): div        return=1v1 sibling=3v1
//! FiberId(3v1): span       return=1v1
//! FiberId(7v1): HostRoot'  alternate=1v1 (work-in-progress twin)
//! ```
//!
//! A twin is created at most once per logical position and reused on every
//! later render.

mod fiber;
mod tree;

pub use fiber::*;
pub use tree::*;
