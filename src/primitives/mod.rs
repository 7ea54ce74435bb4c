//! Primitives - The description vocabulary renders speak.
//!
//! This module provides what a render hands to the dispatcher and what the
//! dispatcher hands to the child reconciler:
//! - [`Props`] / [`PropValue`] - immutable props with identity and shallow equality
//! - [`Children`] / [`Element`] / [`Portal`] - next-children descriptions
//! - [`ElementType`] and the component definitions it points at
//!
//! # Identity
//!
//! Descriptions are reference-counted and compared by pointer. Returning the
//! exact props or children object from a previous render is how callers tell
//! the dispatcher "nothing changed here":
//!
//! ```ignore
//! let props: Props = [("label", "ok")].into_iter().collect();
//! let same = props.clone();           // same identity: fast bailout applies
//! let rebuilt = props.with("label", "ok"); // equal content, new identity
//! assert!(props.is_same(&same));
//! assert!(!props.is_same(&rebuilt));
//! assert!(props.shallow_equal(&rebuilt));
//! ```

mod component;
mod element;
mod types;

pub use component::*;
pub use element::*;
pub use types::*;
