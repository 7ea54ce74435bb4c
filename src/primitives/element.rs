//! Children descriptions - what a render produces.
//!
//! A description is cheap to clone and compared by identity: two
//! descriptions are "the same" only when they are the very same allocation,
//! which is what lets the host root and context providers bail out when a
//! render hands back the object it was given.

use std::fmt;
use std::rc::Rc;

use crate::types::{Opaque, RefHandle};

use super::component::ElementType;
use super::types::Props;

/// A single element: a type plus its props, key and ref.
#[derive(Debug, Clone)]
pub struct Element {
    pub element_type: ElementType,
    pub key: Option<Rc<str>>,
    pub ref_handle: Option<RefHandle>,
    pub props: Props,
}

impl Element {
    pub fn new(element_type: ElementType, props: Props) -> Self {
        Self {
            element_type,
            key: None,
            ref_handle: None,
            props,
        }
    }

    pub fn with_key(mut self, key: impl Into<Rc<str>>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_ref(mut self, ref_handle: RefHandle) -> Self {
        self.ref_handle = Some(ref_handle);
        self
    }
}

/// Children rendered into a different host container.
#[derive(Clone)]
pub struct Portal {
    pub container: Opaque,
    pub key: Option<Rc<str>>,
    pub children: Children,
}

impl fmt::Debug for Portal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Portal")
            .field("container", &Rc::as_ptr(&self.container))
            .field("key", &self.key)
            .field("children", &self.children)
            .finish()
    }
}

/// Next-children description handed to the child reconciler.
#[derive(Debug, Clone, Default)]
pub enum Children {
    /// Nothing to render.
    #[default]
    Empty,
    Text(Rc<str>),
    Element(Rc<Element>),
    Portal(Rc<Portal>),
    List(Rc<[Children]>),
}

impl Children {
    pub fn text(text: impl Into<Rc<str>>) -> Self {
        Self::Text(text.into())
    }

    pub fn element(element: Element) -> Self {
        Self::Element(Rc::new(element))
    }

    pub fn portal(portal: Portal) -> Self {
        Self::Portal(Rc::new(portal))
    }

    pub fn list(children: impl IntoIterator<Item = Children>) -> Self {
        Self::List(children.into_iter().collect())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Check for identity. Text compares by content like any string value.
    pub fn is_same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Empty, Self::Empty) => true,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Element(a), Self::Element(b)) => Rc::ptr_eq(a, b),
            (Self::Portal(a), Self::Portal(b)) => Rc::ptr_eq(a, b),
            (Self::List(a), Self::List(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Element> for Children {
    fn from(element: Element) -> Self {
        Self::element(element)
    }
}

impl From<&str> for Children {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}
