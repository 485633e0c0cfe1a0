//! Error types for Horizon Wire.

use crate::coerce::CoercionError;
use crate::command::CommandError;
use crate::config::ConfigError;
use crate::invoker::InvokeError;
use crate::meta::ResolveError;

/// Result type alias for Horizon Wire operations.
pub type Result<T> = std::result::Result<T, WireError>;

/// The main error type for Horizon Wire operations.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// No unique method matched a binding or property request.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// An argument could not be converted to the declared parameter kind.
    #[error(transparent)]
    Coercion(#[from] CoercionError),
    /// The target could not be called or failed during the call.
    #[error(transparent)]
    Invoke(#[from] InvokeError),
    /// A registry command could not be executed.
    #[error(transparent)]
    Command(#[from] CommandError),
    /// Configuration or property sheet loading failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Coarse classification of a [`WireError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MethodNotFound,
    AmbiguousMethod,
    Coercion,
    Invocation,
    Command,
    Config,
}

impl WireError {
    /// The classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Resolve(ResolveError::MethodNotFound { .. }) => ErrorKind::MethodNotFound,
            Self::Resolve(ResolveError::AmbiguousMethod { .. }) => ErrorKind::AmbiguousMethod,
            Self::Coercion(_) => ErrorKind::Coercion,
            Self::Invoke(_) => ErrorKind::Invocation,
            Self::Command(_) => ErrorKind::Command,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::ParamQuery;

    #[test]
    fn test_kind_classification() {
        let err: WireError = ResolveError::MethodNotFound {
            type_name: "Panel",
            method: "set_title".into(),
            query: ParamQuery::unknown(1),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::MethodNotFound);
        assert_eq!(err.to_string(), "no method Panel::set_title(?)");

        let err: WireError = CoercionError::Unsupported {
            from: "string",
            to: "Menu",
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Coercion);
    }
}
