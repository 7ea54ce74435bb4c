//! Component definitions - the `type` side of an element.
//!
//! Every definition is shared behind an `Rc`, and element types compare by
//! that pointer. Host tags compare by name.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Thrown;
use crate::types::Opaque;

use super::element::Children;
use super::types::{ChangedBitsFn, CompareFn, ContextMap, PropValue, Props, RenderArg, RenderFn};

// =============================================================================
// Class Instances
// =============================================================================

/// A live class-style component instance.
///
/// Created and driven by the instance manager; the dispatcher only renders
/// it and mirrors its state.
pub trait ClassInstance {
    fn render(&self) -> Result<Children, Thrown>;

    /// State to mirror into the fiber after rendering.
    fn state(&self) -> Option<Opaque> {
        None
    }

    /// Child context this instance provides to legacy consumers.
    fn child_context(&self) -> Option<ContextMap> {
        None
    }
}

/// Shared handle to a class instance (both fibers of a pair point at it).
pub type InstanceHandle = Rc<dyn ClassInstance>;

/// Class constructor called by the instance manager.
pub type ConstructFn = Rc<dyn Fn(&Props, &ContextMap) -> Result<InstanceHandle, Thrown>>;

// =============================================================================
// Definitions
// =============================================================================

/// Function-style component.
#[derive(Clone)]
pub struct FunctionComponent {
    pub name: Rc<str>,
    pub render: RenderFn,
    pub default_props: Option<Props>,
    /// Legacy context keys this component reads.
    pub context_types: Option<Rc<[Rc<str>]>>,
}

impl FunctionComponent {
    pub fn new(
        name: impl Into<Rc<str>>,
        render: impl Fn(&Props, &RenderArg) -> Result<Children, Thrown> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            render: Rc::new(render),
            default_props: None,
            context_types: None,
        }
    }

    pub fn with_default_props(mut self, defaults: Props) -> Self {
        self.default_props = Some(defaults);
        self
    }

    pub fn with_context_types(mut self, keys: &[&str]) -> Self {
        self.context_types = Some(keys.iter().map(|k| Rc::from(*k)).collect());
        self
    }
}

/// Class-style component.
#[derive(Clone)]
pub struct ClassComponent {
    pub name: Rc<str>,
    pub construct: ConstructFn,
    pub default_props: Option<Props>,
    pub context_types: Option<Rc<[Rc<str>]>>,
    /// Keys of the legacy child context this class provides. `Some` makes
    /// it a legacy context provider.
    pub child_context_types: Option<Rc<[Rc<str>]>>,
    /// Whether the class derives fallback state from a captured error.
    pub has_derived_state_from_error: bool,
}

impl ClassComponent {
    pub fn new(
        name: impl Into<Rc<str>>,
        construct: impl Fn(&Props, &ContextMap) -> Result<InstanceHandle, Thrown> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            construct: Rc::new(construct),
            default_props: None,
            context_types: None,
            child_context_types: None,
            has_derived_state_from_error: false,
        }
    }

    pub fn with_default_props(mut self, defaults: Props) -> Self {
        self.default_props = Some(defaults);
        self
    }

    pub fn with_child_context_types(mut self, keys: &[&str]) -> Self {
        self.child_context_types = Some(keys.iter().map(|k| Rc::from(*k)).collect());
        self
    }

    pub fn with_derived_state_from_error(mut self) -> Self {
        self.has_derived_state_from_error = true;
        self
    }

    #[inline]
    pub fn is_legacy_context_provider(&self) -> bool {
        self.child_context_types.is_some()
    }
}

/// Component whose render also receives the element's ref.
#[derive(Clone)]
pub struct ForwardRefComponent {
    pub name: Rc<str>,
    pub render: RenderFn,
    pub default_props: Option<Props>,
}

impl ForwardRefComponent {
    pub fn new(
        name: impl Into<Rc<str>>,
        render: impl Fn(&Props, &RenderArg) -> Result<Children, Thrown> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            render: Rc::new(render),
            default_props: None,
        }
    }
}

/// Wrapper that skips re-rendering its inner type while props stay equal.
#[derive(Clone)]
pub struct MemoComponent {
    pub inner: ElementType,
    pub compare: Option<CompareFn>,
    pub default_props: Option<Props>,
}

impl MemoComponent {
    pub fn new(inner: ElementType) -> Self {
        Self {
            inner,
            compare: None,
            default_props: None,
        }
    }

    pub fn with_compare(mut self, compare: impl Fn(&Props, &Props) -> bool + 'static) -> Self {
        self.compare = Some(Rc::new(compare));
        self
    }

    pub fn with_default_props(mut self, defaults: Props) -> Self {
        self.default_props = Some(defaults);
        self
    }

    /// Check if this memo can run on the simple-memo fast path: the inner
    /// type is a plain function with no defaults and no custom comparator.
    pub fn simple_inner(&self) -> Option<&Rc<FunctionComponent>> {
        match &self.inner {
            ElementType::Function(inner)
                if inner.default_props.is_none()
                    && self.compare.is_none()
                    && self.default_props.is_none() =>
            {
                Some(inner)
            }
            _ => None,
        }
    }
}

/// A component whose definition is loaded on first mount.
///
/// Resolution is done by the lazy resolver collaborator; `name` identifies
/// the module to it.
#[derive(Debug, Clone)]
pub struct LazyComponent {
    pub name: Rc<str>,
}

impl LazyComponent {
    pub fn new(name: impl Into<Rc<str>>) -> Self {
        Self { name: name.into() }
    }
}

// =============================================================================
// Context
// =============================================================================

/// Largest changed-bits mask: every observed bit changed.
pub const MAX_CHANGED_BITS: u32 = 0b11_1111_1111_1111_1111_1111_1111_1111;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A context object, shared by its providers and consumers.
#[derive(Clone)]
pub struct Context {
    id: u64,
    pub name: Rc<str>,
    pub default_value: PropValue,
    pub calculate_changed_bits: Option<ChangedBitsFn>,
}

impl Context {
    pub fn new(name: impl Into<Rc<str>>, default_value: impl Into<PropValue>) -> Self {
        Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            default_value: default_value.into(),
            calculate_changed_bits: None,
        }
    }

    pub fn with_changed_bits(
        mut self,
        calculate: impl Fn(&PropValue, &PropValue) -> u32 + 'static,
    ) -> Self {
        self.calculate_changed_bits = Some(Rc::new(calculate));
        self
    }

    /// Stable identity of this context.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Bits that changed between two provided values. Identical values
    /// never change anything.
    pub fn changed_bits(&self, new_value: &PropValue, old_value: &PropValue) -> u32 {
        if new_value.is_same(old_value) {
            return 0;
        }
        match &self.calculate_changed_bits {
            Some(calculate) => calculate(old_value, new_value),
            None => MAX_CHANGED_BITS,
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Element Type
// =============================================================================

/// The kind-specific definition an element or fiber was created from.
#[derive(Clone)]
pub enum ElementType {
    Function(Rc<FunctionComponent>),
    Class(Rc<ClassComponent>),
    ForwardRef(Rc<ForwardRefComponent>),
    Memo(Rc<MemoComponent>),
    Lazy(Rc<LazyComponent>),
    /// Host element by tag name.
    Host(Rc<str>),
    Fragment,
    StrictMode,
    ConcurrentMode,
    Profiler,
    Suspense,
    Provider(Rc<Context>),
    Consumer(Rc<Context>),
}

impl ElementType {
    pub fn host(tag: impl Into<Rc<str>>) -> Self {
        Self::Host(tag.into())
    }

    pub fn function(component: FunctionComponent) -> Self {
        Self::Function(Rc::new(component))
    }

    pub fn class(component: ClassComponent) -> Self {
        Self::Class(Rc::new(component))
    }

    pub fn forward_ref(component: ForwardRefComponent) -> Self {
        Self::ForwardRef(Rc::new(component))
    }

    pub fn memo(component: MemoComponent) -> Self {
        Self::Memo(Rc::new(component))
    }

    pub fn lazy(component: LazyComponent) -> Self {
        Self::Lazy(Rc::new(component))
    }

    /// Check for type identity.
    pub fn is_same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Class(a), Self::Class(b)) => Rc::ptr_eq(a, b),
            (Self::ForwardRef(a), Self::ForwardRef(b)) => Rc::ptr_eq(a, b),
            (Self::Memo(a), Self::Memo(b)) => Rc::ptr_eq(a, b),
            (Self::Lazy(a), Self::Lazy(b)) => Rc::ptr_eq(a, b),
            (Self::Host(a), Self::Host(b)) => a == b,
            (Self::Provider(a), Self::Provider(b)) => Rc::ptr_eq(a, b),
            (Self::Consumer(a), Self::Consumer(b)) => Rc::ptr_eq(a, b),
            (Self::Fragment, Self::Fragment)
            | (Self::StrictMode, Self::StrictMode)
            | (Self::ConcurrentMode, Self::ConcurrentMode)
            | (Self::Profiler, Self::Profiler)
            | (Self::Suspense, Self::Suspense) => true,
            _ => false,
        }
    }

    /// Default props declared by this type, if it can declare any.
    pub fn default_props(&self) -> Option<&Props> {
        match self {
            Self::Function(c) => c.default_props.as_ref(),
            Self::Class(c) => c.default_props.as_ref(),
            Self::ForwardRef(c) => c.default_props.as_ref(),
            Self::Memo(c) => c.default_props.as_ref(),
            _ => None,
        }
    }

    /// Human-readable name for errors and logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Function(c) => format!("function component {}", c.name),
            Self::Class(c) => format!("class component {}", c.name),
            Self::ForwardRef(c) => format!("forward ref {}", c.name),
            Self::Memo(c) => format!("memo({})", c.inner.describe()),
            Self::Lazy(c) => format!("lazy {}", c.name),
            Self::Host(tag) => format!("host component {tag:?}"),
            Self::Fragment => "fragment".into(),
            Self::StrictMode => "strict mode".into(),
            Self::ConcurrentMode => "concurrent mode".into(),
            Self::Profiler => "profiler".into(),
            Self::Suspense => "suspense".into(),
            Self::Provider(c) => format!("{} provider", c.name),
            Self::Consumer(c) => format!("{} consumer", c.name),
        }
    }
}

impl fmt::Debug for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_render() -> FunctionComponent {
        FunctionComponent::new("Empty", |_, _| Ok(Children::Empty))
    }

    // =========================================================================
    // ElementType tests
    // =========================================================================

    #[test]
    fn test_element_type_identity() {
        let a = ElementType::function(empty_render());
        let b = ElementType::function(empty_render());

        assert!(a.is_same(&a.clone()));
        assert!(!a.is_same(&b), "two definitions with the same name are still distinct");
        assert!(ElementType::host("div").is_same(&ElementType::host("div")));
        assert!(!ElementType::host("div").is_same(&ElementType::host("span")));
        assert!(ElementType::Suspense.is_same(&ElementType::Suspense));
    }

    #[test]
    fn test_describe_names_the_definition() {
        let memo = ElementType::memo(MemoComponent::new(ElementType::function(empty_render())));
        assert_eq!(memo.describe(), "memo(function component Empty)");
        assert_eq!(ElementType::host("div").describe(), "host component \"div\"");
    }

    // =========================================================================
    // MemoComponent tests
    // =========================================================================

    #[test]
    fn test_simple_inner_requires_plain_function() {
        let plain = MemoComponent::new(ElementType::function(empty_render()));
        assert!(plain.simple_inner().is_some());

        let with_compare = MemoComponent::new(ElementType::function(empty_render()))
            .with_compare(|_, _| true);
        assert!(with_compare.simple_inner().is_none());

        let inner_defaults = MemoComponent::new(ElementType::function(
            empty_render().with_default_props(Props::new().with("a", 1)),
        ));
        assert!(inner_defaults.simple_inner().is_none());

        let host = MemoComponent::new(ElementType::host("div"));
        assert!(host.simple_inner().is_none());
    }

    // =========================================================================
    // Context tests
    // =========================================================================

    #[test]
    fn test_context_ids_are_unique() {
        let a = Context::new("A", PropValue::Null);
        let b = Context::new("B", PropValue::Null);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_changed_bits_default_and_custom() {
        let plain = Context::new("Theme", "light");
        assert_eq!(plain.changed_bits(&"light".into(), &"light".into()), 0);
        assert_eq!(plain.changed_bits(&"dark".into(), &"light".into()), MAX_CHANGED_BITS);

        let custom = Context::new("Flags", 0).with_changed_bits(|_, _| 0b10);
        assert_eq!(custom.changed_bits(&1.into(), &0.into()), 0b10);
    }
}
