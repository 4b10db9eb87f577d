//! Generated forwarding callables.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::descriptor::OperationDescriptor;
use crate::error::{ProtocolError, Result};
use crate::registry::Registry;
use crate::value::{Function, Value};

/// The callable generated for one protocol operation.
///
/// A forwarder holds no state of its own. Each call:
///
/// 1. checks the argument count against the declared shape,
/// 2. classifies the dispatch argument,
/// 3. looks up the type's method table, then the operation within it,
/// 4. invokes the implementation with the fixed arguments followed by the
///    rest arguments, each passed individually.
#[derive(Clone)]
pub struct Forwarder {
    descriptor: Arc<OperationDescriptor>,
    registry: Registry,
}

impl Forwarder {
    pub(crate) fn new(descriptor: OperationDescriptor, registry: Registry) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            registry,
        }
    }

    pub fn descriptor(&self) -> &OperationDescriptor {
        &self.descriptor
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Dispatch on the first argument and call the registered implementation.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        let operation = self.descriptor.name();
        let arity = self.descriptor.arity();
        if !arity.accepts(args.len()) {
            return Err(ProtocolError::ArityMismatch {
                operation: operation.clone(),
                expected: arity,
                got: args.len(),
            });
        }

        // `validate` guarantees a dispatch parameter, so `args` is non-empty.
        let (fixed, rest) = args.split_at(arity.fixed);
        let type_id = self.registry.classifier().classify(&fixed[0])?;

        let method = self
            .registry
            .find_method(&type_id, operation)
            .ok_or_else(|| ProtocolError::NoImplementation {
                protocol: self.registry.protocol().clone(),
                operation: operation.clone(),
                type_id: type_id.clone(),
            })?;

        trace!(
            protocol = %self.registry.protocol(),
            operation = %operation,
            type_id = %type_id,
            rest = rest.len(),
            "dispatching"
        );

        // The rest arguments already sit flat after the fixed ones, so the
        // implementation sees them spread, never collected into one value.
        method.invoke(args)
    }

    /// Wrap this forwarder as a host function value.
    pub fn to_value(&self) -> Value {
        let forwarder = self.clone();
        Value::Fn(Function::named(self.descriptor.name(), move |args| {
            forwarder.call(args)
        }))
    }
}

impl fmt::Debug for Forwarder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Forwarder")
            .field("protocol", self.registry.protocol())
            .field("operation", &format_args!("{}", self.descriptor))
            .finish()
    }
}
