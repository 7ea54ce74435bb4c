//! Primitive types - Props, prop values and render callbacks.
//!
//! Props are immutable once built. Two props objects can be compared two ways:
//! - identity ([`Props::is_same`]): the dispatcher's fast bailout
//! - shallow equality ([`Props::shallow_equal`]): memoized components

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::Thrown;
use crate::types::{Opaque, RefHandle};

use super::element::Children;

// =============================================================================
// Callback Types
// =============================================================================

/// Extra argument a render function receives besides its props.
#[derive(Debug, Clone)]
pub enum RenderArg {
    /// Masked legacy context (function components).
    Context(ContextMap),
    /// The fiber's ref (forward-ref components).
    Ref(Option<RefHandle>),
}

/// Render function of a function-style or forward-ref component.
pub type RenderFn = Rc<dyn Fn(&Props, &RenderArg) -> Result<Children, Thrown>>;

/// Child-as-function of a context consumer.
pub type RenderPropFn = Rc<dyn Fn(&PropValue) -> Result<Children, Thrown>>;

/// Custom props comparator of a memoized component. `true` means equal.
pub type CompareFn = Rc<dyn Fn(&Props, &Props) -> bool>;

/// Changed-bits calculator of a context. `0` means unchanged.
pub type ChangedBitsFn = Rc<dyn Fn(&PropValue, &PropValue) -> u32>;

/// Legacy context object: a flat, immutable name → value map.
pub type ContextMap = Rc<BTreeMap<Rc<str>, PropValue>>;

/// An empty legacy context object.
pub fn empty_context() -> ContextMap {
    Rc::new(BTreeMap::new())
}

// =============================================================================
// Prop Value
// =============================================================================

/// A single prop.
#[derive(Clone, Default)]
pub enum PropValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    /// A children description (compared by identity).
    Children(Children),
    /// A render function (compared by identity).
    Render(RenderPropFn),
    /// Anything else (compared by identity).
    Shared(Opaque),
}

impl PropValue {
    /// Same-value comparison.
    ///
    /// Scalars and strings compare by value, floats by bit pattern with every
    /// NaN equal to every NaN, and everything reference-counted by pointer.
    pub fn is_same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => {
                (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits()
            }
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Children(a), Self::Children(b)) => a.is_same(b),
            (Self::Render(a), Self::Render(b)) => Rc::ptr_eq(a, b),
            (Self::Shared(a), Self::Shared(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(v) => write!(f, "Bool({v})"),
            Self::Int(v) => write!(f, "Int({v})"),
            Self::Float(v) => write!(f, "Float({v})"),
            Self::Str(v) => write!(f, "Str({v:?})"),
            Self::Children(c) => f.debug_tuple("Children").field(c).finish(),
            Self::Render(r) => write!(f, "Render({:p})", Rc::as_ptr(r)),
            Self::Shared(s) => write!(f, "Shared({:p})", Rc::as_ptr(s)),
        }
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        Self::Str(value.into())
    }
}

impl From<Rc<str>> for PropValue {
    fn from(value: Rc<str>) -> Self {
        Self::Str(value)
    }
}

impl From<Children> for PropValue {
    fn from(value: Children) -> Self {
        Self::Children(value)
    }
}

// =============================================================================
// Props
// =============================================================================

/// Immutable props object.
///
/// Cloning shares the underlying map, so a clone `is_same` as its source.
/// `children` is an ordinary key holding a [`PropValue::Children`].
#[derive(Clone, Default)]
pub struct Props(Rc<BTreeMap<Rc<str>, PropValue>>);

impl Props {
    /// Key under which a node's children description lives.
    pub const CHILDREN: &'static str = "children";
    /// Suspense boundary content shown while the primary children wait.
    pub const FALLBACK: &'static str = "fallback";
    /// Value a context provider provides.
    pub const VALUE: &'static str = "value";
    /// Changed-bits mask a context consumer observes.
    pub const OBSERVED_BITS: &'static str = "observed_bits";

    pub fn new() -> Self {
        Self::default()
    }

    /// Props holding only a children description (fragments, host text).
    pub fn from_children(children: Children) -> Self {
        Self::from_iter([(Self::CHILDREN, PropValue::Children(children))])
    }

    /// Copy of these props with one key replaced. The result is a new identity.
    pub fn with(&self, key: impl Into<Rc<str>>, value: impl Into<PropValue>) -> Self {
        let mut map = (*self.0).clone();
        map.insert(key.into(), value.into());
        Self(Rc::new(map))
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Rc<str>, &PropValue)> {
        self.0.iter()
    }

    /// Children description, `Empty` when absent or not a description.
    ///
    /// A plain string under `children` is treated as a text child.
    pub fn children(&self) -> Children {
        self.description(Self::CHILDREN)
    }

    /// Children description stored under `key`, read like [`Props::children`].
    pub fn description(&self, key: &str) -> Children {
        match self.get(key) {
            Some(PropValue::Children(children)) => children.clone(),
            Some(PropValue::Str(text)) => Children::Text(text.clone()),
            _ => Children::Empty,
        }
    }

    /// Check for reference identity.
    #[inline]
    pub fn is_same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Check if `key` holds the same value in both. Absent counts as `Null`.
    pub fn same_at(&self, other: &Self, key: &str) -> bool {
        let null = PropValue::Null;
        let a = self.get(key).unwrap_or(&null);
        let b = other.get(key).unwrap_or(&null);
        a.is_same(b)
    }

    /// Shallow equality: same key set, every value [`PropValue::is_same`].
    pub fn shallow_equal(&self, other: &Self) -> bool {
        if self.is_same(other) {
            return true;
        }
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|(key, value)| {
            other
                .get(key)
                .is_some_and(|other_value| value.is_same(other_value))
        })
    }
}

impl<K, V> FromIterator<(K, V)> for Props
where
    K: Into<Rc<str>>,
    V: Into<PropValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(Rc::new(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        ))
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

/// Fill in defaults for keys the props leave unset (absent or `Null`).
///
/// Without defaults the input comes back unchanged, identity included.
pub fn resolve_default_props(defaults: Option<&Props>, props: &Props) -> Props {
    let Some(defaults) = defaults else {
        return props.clone();
    };
    let mut map = (*props.0).clone();
    for (key, value) in defaults.iter() {
        let unset = map
            .get(key)
            .is_none_or(|current| matches!(current, PropValue::Null));
        if unset {
            map.insert(key.clone(), value.clone());
        }
    }
    Props(Rc::new(map))
}
