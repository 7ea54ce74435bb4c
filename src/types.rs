//! Core types for spark-fiber.
//!
//! These types define the foundation that everything builds on: priorities,
//! side-effect markers, execution modes and the work tags that name every
//! fiber kind. They flow through the dispatcher and into the (external)
//! commit phase.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Type-erased value owned by an external collaborator (host instances,
/// update queues, host contexts, class state).
///
/// The core never looks inside; collaborators downcast.
pub type Opaque = Rc<dyn Any>;

// =============================================================================
// Expiration Time
// =============================================================================

/// Priority deadline attached to pending work.
///
/// Comparisons order urgency, not wall-clock time: a greater value is more
/// urgent. `NO_WORK` means nothing is pending, `NEVER` is the offscreen
/// priority and `SYNC` is the most urgent value there is.
///
/// Work recorded at `t` is due in a render at `target` when
/// `t != NO_WORK && t >= target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ExpirationTime(u32);

impl ExpirationTime {
    /// No pending work.
    pub const NO_WORK: Self = Self(0);
    /// Offscreen priority. Work here only runs when nothing else is pending.
    pub const NEVER: Self = Self(1);
    /// Synchronous priority.
    pub const SYNC: Self = Self(u32::MAX);

    /// Create an expiration time from its raw value.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Check if this marks no pending work.
    #[inline]
    pub const fn is_no_work(self) -> bool {
        self.0 == Self::NO_WORK.0
    }

    /// Check if work at this time must be performed in a render at `target`.
    #[inline]
    pub fn is_due(self, target: Self) -> bool {
        !self.is_no_work() && self >= target
    }

    /// Check if this is strictly less urgent than `target`.
    ///
    /// `NO_WORK` is less urgent than every real target.
    #[inline]
    pub fn is_less_urgent_than(self, target: Self) -> bool {
        self < target
    }

    /// The more urgent of two times.
    #[inline]
    pub fn most_urgent(self, other: Self) -> Self {
        self.max(other)
    }
}

// =============================================================================
// Effect Tags (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// Pending side-effect markers recorded on a work-in-progress fiber.
    ///
    /// The commit phase reads them; this core only sets and clears them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EffectTag: u16 {
        const NO_EFFECT = 0;
        /// Read by devtools: this fiber ran its render this pass.
        const PERFORMED_WORK = 1 << 0;
        const PLACEMENT = 1 << 1;
        const UPDATE = 1 << 2;
        const DELETION = 1 << 3;
        const CONTENT_RESET = 1 << 4;
        const CALLBACK = 1 << 5;
        /// Set by the work loop on a boundary that caught a failure or suspension.
        const DID_CAPTURE = 1 << 6;
        const REF = 1 << 7;
        const SNAPSHOT = 1 << 8;
        const INCOMPLETE = 1 << 10;
        const SHOULD_CAPTURE = 1 << 11;
    }
}

// =============================================================================
// Type Of Mode (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// Execution mode bits inherited down a subtree.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeOfMode: u8 {
        const NO_CONTEXT = 0;
        /// Interruptible rendering.
        const CONCURRENT = 1 << 0;
        const STRICT = 1 << 1;
        const PROFILE = 1 << 2;
    }
}

// =============================================================================
// Work Tags
// =============================================================================

/// Plain discriminant of a fiber kind.
///
/// `FiberKind` carries the payload; this is what logs, errors and tests name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkTag {
    FunctionComponent,
    ClassComponent,
    HostRoot,
    HostPortal,
    HostComponent,
    HostText,
    Fragment,
    Mode,
    ContextConsumer,
    ContextProvider,
    ForwardRef,
    Profiler,
    SuspenseComponent,
    MemoComponent,
    SimpleMemoComponent,
    LazyComponent,
    IncompleteClassComponent,
}

impl fmt::Display for WorkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// =============================================================================
// Refs
// =============================================================================

/// A ref attached to an element. Compared by identity.
#[derive(Clone, Default)]
pub struct RefHandle(Rc<RefCell<Option<Opaque>>>);

impl RefHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value the commit phase attached, if any.
    pub fn current(&self) -> Option<Opaque> {
        self.0.borrow().clone()
    }

    pub fn set(&self, value: Option<Opaque>) {
        *self.0.borrow_mut() = value;
    }
}

impl PartialEq for RefHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for RefHandle {}

impl fmt::Debug for RefHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RefHandle({:p})", Rc::as_ptr(&self.0))
    }
}
