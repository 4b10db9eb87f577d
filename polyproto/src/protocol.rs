//! Protocol declaration.
//!
//! Declaring a protocol turns a name and a list of operation descriptors
//! into a fresh [`Registry`] plus one [`Forwarder`] per operation. This is
//! the runtime form of generating forwarding functions: the forwarders are
//! closures over the registry, and [`Forwarder::to_value`] turns each one
//! into a host function that a [`Namespace`](crate::namespace::Namespace)
//! binds under the operation's name.
//!
//! Every descriptor is validated before anything is built, so a protocol
//! with one malformed operation yields no forwarders at all.

mod descriptor;
mod forwarder;

pub use descriptor::{Arity, OperationDescriptor, DEFAULT_REST_MARKER};
pub use forwarder::Forwarder;

use tracing::debug;

use crate::classify::Classifier;
use crate::error::{ProtocolError, Result};
use crate::registry::{MethodTable, Registry};
use crate::value::{FxIndexMap, Keyword, Symbol, Value};

/// A declared protocol: its registry and its forwarders.
#[derive(Debug, Clone)]
pub struct Protocol {
    name: Symbol,
    registry: Registry,
    forwarders: FxIndexMap<Symbol, Forwarder>,
}

impl Protocol {
    /// Declare a protocol with an empty registry and the default classifier.
    pub fn declare(
        name: impl Into<Symbol>,
        operations: impl IntoIterator<Item = OperationDescriptor>,
    ) -> Result<Self> {
        Self::declare_with(name, operations, Classifier::default())
    }

    /// Declare a protocol whose forwarders classify with `classifier`.
    pub fn declare_with(
        name: impl Into<Symbol>,
        operations: impl IntoIterator<Item = OperationDescriptor>,
        classifier: Classifier,
    ) -> Result<Self> {
        let name = name.into();
        let registry = Registry::new(name.clone(), classifier);
        Self::build(name, operations, registry)
    }

    /// Declare a protocol on top of an existing registry.
    ///
    /// Used when redeclaration is configured to keep registered
    /// implementations.
    pub fn declare_over(
        registry: Registry,
        operations: impl IntoIterator<Item = OperationDescriptor>,
    ) -> Result<Self> {
        Self::build(registry.protocol().clone(), operations, registry)
    }

    fn build(
        name: Symbol,
        operations: impl IntoIterator<Item = OperationDescriptor>,
        registry: Registry,
    ) -> Result<Self> {
        let operations: Vec<OperationDescriptor> = operations.into_iter().collect();
        for op in &operations {
            op.validate(&name)?;
        }

        // A repeated operation name rebinds, so the last declaration wins.
        let forwarders: FxIndexMap<Symbol, Forwarder> = operations
            .into_iter()
            .map(|op| {
                let name = op.name().clone();
                (name, Forwarder::new(op, registry.clone()))
            })
            .collect();

        debug!(protocol = %name, operations = forwarders.len(), "declared protocol");

        Ok(Self {
            name,
            registry,
            forwarders,
        })
    }

    pub fn name(&self) -> &Symbol {
        &self.name
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Declared operations, in declaration order.
    pub fn operations(&self) -> impl Iterator<Item = &OperationDescriptor> {
        self.forwarders.values().map(Forwarder::descriptor)
    }

    /// Forwarders keyed by operation name, in declaration order.
    pub fn forwarders(&self) -> impl Iterator<Item = (&Symbol, &Forwarder)> {
        self.forwarders.iter()
    }

    pub fn forwarder(&self, operation: &str) -> Option<&Forwarder> {
        self.forwarders.get(&Symbol::new(operation))
    }

    /// Call the forwarder for `operation`.
    pub fn invoke(&self, operation: &str, args: &[Value]) -> Result<Value> {
        let forwarder = self
            .forwarder(operation)
            .ok_or_else(|| ProtocolError::UnknownOperation {
                protocol: self.name.clone(),
                operation: Symbol::new(operation),
            })?;
        forwarder.call(args)
    }

    /// Register `methods` for `type_id` in this protocol's registry.
    pub fn extend(&self, type_id: &Keyword, methods: MethodTable) {
        self.registry.merge(type_id, methods);
    }

    /// Check if the type of `value` is registered with this protocol.
    pub fn satisfies(&self, value: &Value) -> Result<bool> {
        crate::registry::satisfies(&self.registry, value)
    }
}
