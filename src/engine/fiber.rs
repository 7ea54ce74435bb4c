//! Fiber - One persistent record per logical tree position.
//!
//! A fiber is paired with its twin in the other tree through `alternate`.
//! Links (`return_fiber`, `child`, `sibling`, `alternate`) are arena handles,
//! never owning pointers, so the current/work-in-progress pair can reference
//! each other without cycles.
//!
//! Kind-specific data lives in [`FiberKind`] instead of an untyped state
//! node: a class fiber carries its instance, a host root its root
//! descriptor, a portal its container.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::error::{BeginWorkError, WorkResult};
use crate::primitives::{
    Children, ClassComponent, Context, ContextMap, ElementType, ForwardRefComponent,
    FunctionComponent, InstanceHandle, LazyComponent, MemoComponent, Props,
};
use crate::types::{EffectTag, ExpirationTime, Opaque, RefHandle, TypeOfMode, WorkTag};

use super::tree::FiberId;

// =============================================================================
// Root Descriptor
// =============================================================================

/// Descriptor of a whole tree, held by its host root fiber.
pub struct FiberRoot {
    /// Host container the tree renders into.
    pub container: Opaque,
    /// Legacy context of the last commit.
    pub context: RefCell<Option<ContextMap>>,
    /// Legacy context handed to the next render, if it changed.
    pub pending_context: RefCell<Option<ContextMap>>,
    /// Claim pre-existing host instances on the first render.
    pub hydrate: bool,
}

impl FiberRoot {
    pub fn new(container: Opaque) -> Self {
        Self {
            container,
            context: RefCell::new(None),
            pending_context: RefCell::new(None),
            hydrate: false,
        }
    }

    pub fn hydrating(mut self) -> Self {
        self.hydrate = true;
        self
    }
}

impl fmt::Debug for FiberRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FiberRoot")
            .field("container", &Rc::as_ptr(&self.container))
            .field("hydrate", &self.hydrate)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Fiber Kind
// =============================================================================

/// Class fiber payload.
#[derive(Clone)]
pub struct ClassFiber {
    pub component: Rc<ClassComponent>,
    pub instance: Option<InstanceHandle>,
    /// Legacy child context last computed for this instance.
    pub merged_child_context: Option<ContextMap>,
}

impl ClassFiber {
    pub fn new(component: Rc<ClassComponent>) -> Self {
        Self {
            component,
            instance: None,
            merged_child_context: None,
        }
    }
}

/// Closed set of node kinds, each with the data only it needs.
#[derive(Clone)]
pub enum FiberKind {
    FunctionComponent(Rc<FunctionComponent>),
    ClassComponent(ClassFiber),
    /// A class mount that suspended before completing.
    IncompleteClassComponent(Rc<ClassComponent>),
    HostRoot(Rc<FiberRoot>),
    /// Portal into the given host container.
    HostPortal(Opaque),
    HostComponent {
        tag: Rc<str>,
        instance: Option<Opaque>,
    },
    HostText {
        instance: Option<Opaque>,
    },
    Fragment,
    Mode,
    Profiler,
    Suspense,
    ContextProvider(Rc<Context>),
    ContextConsumer(Rc<Context>),
    ForwardRef(Rc<ForwardRefComponent>),
    MemoComponent(Rc<MemoComponent>),
    SimpleMemoComponent(Rc<FunctionComponent>),
    LazyComponent(Rc<LazyComponent>),
}

impl FiberKind {
    pub fn tag(&self) -> WorkTag {
        match self {
            Self::FunctionComponent(_) => WorkTag::FunctionComponent,
            Self::ClassComponent(_) => WorkTag::ClassComponent,
            Self::IncompleteClassComponent(_) => WorkTag::IncompleteClassComponent,
            Self::HostRoot(_) => WorkTag::HostRoot,
            Self::HostPortal(_) => WorkTag::HostPortal,
            Self::HostComponent { .. } => WorkTag::HostComponent,
            Self::HostText { .. } => WorkTag::HostText,
            Self::Fragment => WorkTag::Fragment,
            Self::Mode => WorkTag::Mode,
            Self::Profiler => WorkTag::Profiler,
            Self::Suspense => WorkTag::SuspenseComponent,
            Self::ContextProvider(_) => WorkTag::ContextProvider,
            Self::ContextConsumer(_) => WorkTag::ContextConsumer,
            Self::ForwardRef(_) => WorkTag::ForwardRef,
            Self::MemoComponent(_) => WorkTag::MemoComponent,
            Self::SimpleMemoComponent(_) => WorkTag::SimpleMemoComponent,
            Self::LazyComponent(_) => WorkTag::LazyComponent,
        }
    }

    /// Kind for a fresh fiber created from an element type, plus the mode
    /// bits the type adds to its subtree.
    pub fn for_element_type(element_type: &ElementType) -> (Self, TypeOfMode) {
        let kind = match element_type {
            ElementType::Function(c) => Self::FunctionComponent(c.clone()),
            ElementType::Class(c) => Self::ClassComponent(ClassFiber::new(c.clone())),
            ElementType::ForwardRef(c) => Self::ForwardRef(c.clone()),
            ElementType::Memo(c) => Self::MemoComponent(c.clone()),
            ElementType::Lazy(c) => Self::LazyComponent(c.clone()),
            ElementType::Host(tag) => Self::HostComponent {
                tag: tag.clone(),
                instance: None,
            },
            ElementType::Fragment => Self::Fragment,
            ElementType::StrictMode => {
                return (Self::Mode, TypeOfMode::STRICT);
            }
            ElementType::ConcurrentMode => {
                return (Self::Mode, TypeOfMode::CONCURRENT | TypeOfMode::STRICT);
            }
            ElementType::Profiler => {
                return (Self::Profiler, TypeOfMode::PROFILE);
            }
            ElementType::Suspense => Self::Suspense,
            ElementType::Provider(c) => Self::ContextProvider(c.clone()),
            ElementType::Consumer(c) => Self::ContextConsumer(c.clone()),
        };
        (kind, TypeOfMode::NO_CONTEXT)
    }

    /// Memo → simple memo, when the wrapped type allows the fast path.
    pub fn promote_simple_memo(&self) -> Option<Self> {
        match self {
            Self::MemoComponent(memo) => memo
                .simple_inner()
                .map(|inner| Self::SimpleMemoComponent(inner.clone())),
            _ => None,
        }
    }

    /// Lazy → the concrete kind its definition resolved to.
    pub fn resolve_lazy(resolved: &ElementType) -> WorkResult<Self> {
        match resolved {
            ElementType::Function(c) => Ok(Self::FunctionComponent(c.clone())),
            ElementType::Class(c) => Ok(Self::ClassComponent(ClassFiber::new(c.clone()))),
            ElementType::ForwardRef(c) => Ok(Self::ForwardRef(c.clone())),
            ElementType::Memo(c) => Ok(Self::MemoComponent(c.clone())),
            other => Err(BeginWorkError::InvalidLazyType {
                resolved: other.describe(),
            }),
        }
    }

    /// Incomplete class → class, starting over without an instance.
    pub fn complete_class(&self) -> Option<Self> {
        match self {
            Self::IncompleteClassComponent(c) => {
                Some(Self::ClassComponent(ClassFiber::new(c.clone())))
            }
            _ => None,
        }
    }
}

impl fmt::Debug for FiberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostComponent { tag, .. } => write!(f, "HostComponent({tag:?})"),
            Self::FunctionComponent(c) | Self::SimpleMemoComponent(c) => {
                write!(f, "{}({})", self.tag(), c.name)
            }
            Self::ClassComponent(c) => write!(f, "ClassComponent({})", c.component.name),
            _ => write!(f, "{}", self.tag()),
        }
    }
}

// =============================================================================
// Memoized State
// =============================================================================

/// Host root state: the element tree last rendered into the root.
#[derive(Debug, Clone, Default)]
pub struct RootState {
    pub element: Children,
}

/// Suspense state: present only while the boundary shows its fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SuspenseState {
    pub timed_out_at: ExpirationTime,
}

/// Kind-specific committed state.
#[derive(Clone, Default)]
pub enum MemoizedState {
    #[default]
    None,
    Root(RootState),
    Suspense(SuspenseState),
    /// Mirror of a class instance's state.
    Class(Option<Opaque>),
    /// Owned by an external collaborator (hook slots).
    External(Opaque),
}

impl MemoizedState {
    pub fn root_element(&self) -> Option<&Children> {
        match self {
            Self::Root(state) => Some(&state.element),
            _ => None,
        }
    }

    pub fn suspense(&self) -> Option<SuspenseState> {
        match self {
            Self::Suspense(state) => Some(*state),
            _ => None,
        }
    }
}

impl fmt::Debug for MemoizedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Root(state) => f.debug_tuple("Root").field(state).finish(),
            Self::Suspense(state) => f.debug_tuple("Suspense").field(state).finish(),
            Self::Class(_) => f.write_str("Class(..)"),
            Self::External(_) => f.write_str("External(..)"),
        }
    }
}

// =============================================================================
// Context Dependencies
// =============================================================================

/// A context this fiber read during its last render.
#[derive(Debug, Clone)]
pub struct ContextDependency {
    pub context: Rc<Context>,
    pub observed_bits: u32,
}

/// Dependencies of one fiber. Most fibers read at most one context.
pub type ContextDependencies = SmallVec<[ContextDependency; 1]>;

// =============================================================================
// Fiber
// =============================================================================

/// One node of either tree.
#[derive(Clone)]
pub struct Fiber {
    pub kind: FiberKind,
    /// Type of the element this fiber was created from. Differs from the
    /// resolved kind when the fiber was reached through a lazy wrapper.
    pub element_type: Option<ElementType>,
    pub key: Option<Rc<str>>,
    pub ref_handle: Option<RefHandle>,

    pub pending_props: Props,
    pub memoized_props: Option<Props>,
    pub memoized_state: MemoizedState,
    /// Externally managed queue of pending state transitions.
    pub update_queue: Option<Opaque>,
    pub context_dependencies: ContextDependencies,

    pub return_fiber: Option<FiberId>,
    pub child: Option<FiberId>,
    pub sibling: Option<FiberId>,
    pub index: u32,
    pub alternate: Option<FiberId>,

    pub effect_tag: EffectTag,
    pub expiration_time: ExpirationTime,
    pub child_expiration_time: ExpirationTime,
    pub mode: TypeOfMode,
}

impl Fiber {
    pub fn new(kind: FiberKind, pending_props: Props, key: Option<Rc<str>>, mode: TypeOfMode) -> Self {
        Self {
            kind,
            element_type: None,
            key,
            ref_handle: None,
            pending_props,
            memoized_props: None,
            memoized_state: MemoizedState::None,
            update_queue: None,
            context_dependencies: ContextDependencies::new(),
            return_fiber: None,
            child: None,
            sibling: None,
            index: 0,
            alternate: None,
            effect_tag: EffectTag::NO_EFFECT,
            expiration_time: ExpirationTime::NO_WORK,
            child_expiration_time: ExpirationTime::NO_WORK,
            mode,
        }
    }

    #[inline]
    pub fn tag(&self) -> WorkTag {
        self.kind.tag()
    }

    /// Check if this is a suspense boundary currently showing its fallback.
    pub fn is_timed_out(&self) -> bool {
        matches!(self.kind, FiberKind::Suspense) && self.memoized_state.suspense().is_some()
    }

    /// Check if props must get default values resolved before rendering:
    /// only fibers reached through a lazy wrapper skip that step at creation.
    pub fn needs_default_props(&self) -> bool {
        matches!(self.element_type, Some(ElementType::Lazy(_)))
    }

    pub fn class_instance(&self) -> Option<&InstanceHandle> {
        match &self.kind {
            FiberKind::ClassComponent(class) => class.instance.as_ref(),
            _ => None,
        }
    }
}

impl fmt::Debug for Fiber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fiber")
            .field("kind", &self.kind)
            .field("key", &self.key)
            .field("pending_props", &self.pending_props)
            .field("memoized_state", &self.memoized_state)
            .field("return_fiber", &self.return_fiber)
            .field("child", &self.child)
            .field("sibling", &self.sibling)
            .field("alternate", &self.alternate)
            .field("effect_tag", &self.effect_tag)
            .field("expiration_time", &self.expiration_time)
            .field("child_expiration_time", &self.child_expiration_time)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}
