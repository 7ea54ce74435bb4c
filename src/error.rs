//! Error types for begin-work dispatch.
//!
//! Two classes travel through the same `Result`:
//! - configuration errors: contract violations inside the tree or its
//!   collaborators. They abort the render pass.
//! - [`Thrown`]: an application render failed or suspended. The dispatcher
//!   never handles these; the work loop catches them, marks the nearest
//!   boundary with `DID_CAPTURE` and dispatches again.

use std::rc::Rc;

use thiserror::Error;

use crate::engine::FiberId;
use crate::types::WorkTag;

/// Shared `Result` alias for dispatch.
pub type WorkResult<T> = std::result::Result<T, BeginWorkError>;

/// Something an application render function raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Thrown {
    /// Rendering is waiting on an asynchronous resource.
    #[error("suspended while waiting on {0}")]
    Suspended(Rc<str>),

    /// Rendering failed.
    #[error("render failed: {0}")]
    Error(Rc<str>),
}

impl Thrown {
    pub fn suspended(reason: impl Into<Rc<str>>) -> Self {
        Self::Suspended(reason.into())
    }

    pub fn error(message: impl Into<Rc<str>>) -> Self {
        Self::Error(message.into())
    }
}

/// Top-level error returned by the dispatcher.
#[derive(Debug, Error)]
pub enum BeginWorkError {
    #[error("fiber {0:?} is not in the tree")]
    DanglingFiber(FiberId),

    #[error("fiber {fiber:?} reached the {expected} handler but is a {found}")]
    UnexpectedKind {
        fiber: FiberId,
        expected: WorkTag,
        found: WorkTag,
    },

    #[error(
        "element type is invalid: lazy component resolved to {resolved}; \
         lazy element type must resolve to a class or function"
    )]
    InvalidLazyType { resolved: String },

    #[error("host root {0:?} has no update queue")]
    MissingUpdateQueue(FiberId),

    #[error("class fiber {0:?} has no instance to render")]
    MissingInstance(FiberId),

    #[error("timed-out suspense fiber {0:?} is missing its primary/fallback fragments")]
    MalformedSuspense(FiberId),

    #[error("memo fiber {0:?} has no committed child")]
    MissingMemoChild(FiberId),

    #[error("context consumer {0:?} expects a render function as its child")]
    ConsumerChildNotFunction(FiberId),

    #[error(transparent)]
    Thrown(#[from] Thrown),
}

impl BeginWorkError {
    /// Check if this is a contract violation rather than an application throw.
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        !matches!(self, Self::Thrown(_))
    }

    /// The application throw carried by this error, if any.
    pub fn thrown(&self) -> Option<&Thrown> {
        match self {
            Self::Thrown(thrown) => Some(thrown),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    #[test]
    fn test_thrown_is_not_configuration_error() {
        let err = BeginWorkError::from(Thrown::suspended("user data"));
        assert!(!err.is_configuration_error());
        assert_eq!(err.thrown(), Some(&Thrown::suspended("user data")));
        assert_eq!(err.to_string(), "suspended while waiting on user data");
    }

    #[test]
    fn test_invalid_lazy_type_message_names_value() {
        let err = BeginWorkError::InvalidLazyType {
            resolved: "host component \"div\"".into(),
        };
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("host component \"div\""));
    }

    #[test]
    fn test_unexpected_kind_message() {
        let fiber = FiberId::from(KeyData::from_ffi(1));
        let err = BeginWorkError::UnexpectedKind {
            fiber,
            expected: WorkTag::HostRoot,
            found: WorkTag::Fragment,
        };
        let message = err.to_string();
        assert!(message.contains("HostRoot"));
        assert!(message.contains("Fragment"));
        assert!(err.thrown().is_none());
    }
}
