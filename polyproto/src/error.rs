//! Errors raised while classifying, declaring, registering and dispatching.

use thiserror::Error;

use crate::protocol::Arity;
use crate::value::{Keyword, Symbol, Value};

/// Errors that can occur in the protocol layer.
///
/// None of these are transient: each one reports a mistake in how a
/// protocol was declared, extended or called, and is returned to the caller
/// unmodified.
#[derive(Debug, Clone, Error)]
pub enum ProtocolError {
    /// The classifier has no category for this value.
    #[error("cannot classify value {value}")]
    UnclassifiableValue { value: Value },

    /// The dispatch type has no method table in the registry, or its table
    /// lacks the called operation.
    #[error("no implementation of `{operation}` of protocol `{protocol}` found for {type_id}")]
    NoImplementation {
        protocol: Symbol,
        operation: Symbol,
        type_id: Keyword,
    },

    /// A declared operation has no dispatch argument.
    #[error("operation `{operation}` of protocol `{protocol}` must declare a dispatch argument")]
    InvalidOperationArity { protocol: Symbol, operation: Symbol },

    /// A forwarder was called with a number of arguments its shape rejects.
    #[error("wrong number of arguments ({got}) passed to `{operation}`, expected {expected}")]
    ArityMismatch {
        operation: Symbol,
        expected: Arity,
        got: usize,
    },

    /// A flat `extend` ended with a protocol that has no method table.
    #[error("extend of {type_id}: trailing argument {leftover} has no method table")]
    InvalidArgumentCount { type_id: Keyword, leftover: Value },

    /// A flat `extend` named something that is not a bound protocol.
    #[error("{name} does not name a protocol")]
    NotAProtocol { name: Value },

    /// A flat `extend` supplied a method table that is not a map of names.
    #[error("method table for protocol `{protocol}` must be a map keyed by names, got {value}")]
    InvalidMethodTable { protocol: Symbol, value: Value },

    /// `Protocol::invoke` named an operation the protocol never declared.
    #[error("protocol `{protocol}` declares no operation `{operation}`")]
    UnknownOperation { protocol: Symbol, operation: Symbol },

    /// A non-function value was invoked.
    #[error("{value} is not callable")]
    NotCallable { value: Value },

    /// A host implementation signalled failure with a value.
    #[error("thrown: {value}")]
    Thrown { value: Value },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ProtocolError>;

impl ProtocolError {
    /// Build a [`ProtocolError::Thrown`] from anything convertible to a value.
    pub fn thrown(value: impl Into<Value>) -> Self {
        ProtocolError::Thrown {
            value: value.into(),
        }
    }

    /// Check if this is a missing-implementation error.
    ///
    /// Callers that fall back to a default behaviour test this instead of
    /// matching on the variant.
    pub fn is_no_implementation(&self) -> bool {
        matches!(self, ProtocolError::NoImplementation { .. })
    }
}
