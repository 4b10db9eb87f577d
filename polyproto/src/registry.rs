//! Dispatch registries and the registration API.
//!
//! A [`Registry`] maps type identifiers to method tables. It is created
//! empty when a protocol is declared and only ever grows: registration
//! merges operations into a type's table, overwriting same-named entries.
//! There is no unregister.
//!
//! The registry is structurally untyped. Nothing checks that a method
//! table's names match the protocol's operations or that the callables have
//! the right arity; such mistakes surface when a forwarder is called.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::classify::Classifier;
use crate::error::Result;
use crate::value::{FxIndexMap, Keyword, Symbol, Value};

/// Per-type map from operation name to implementation.
pub type MethodTable = FxIndexMap<Symbol, Value>;

/// Build a method table from `(name, callable)` pairs.
pub fn methods<K: Into<Symbol>>(entries: impl IntoIterator<Item = (K, Value)>) -> MethodTable {
    entries
        .into_iter()
        .map(|(name, method)| (name.into(), method))
        .collect()
}

/// Shared handle to one protocol's dispatch table.
///
/// Cloning the handle shares the table. Writers take the lock for the whole
/// merge, so concurrent registrations for the same type never lose
/// operations.
#[derive(Clone)]
pub struct Registry {
    protocol: Symbol,
    classifier: Classifier,
    types: Arc<RwLock<FxIndexMap<Keyword, MethodTable>>>,
}

impl Registry {
    /// Create an empty registry for `protocol`.
    pub fn new(protocol: impl Into<Symbol>, classifier: Classifier) -> Self {
        Self {
            protocol: protocol.into(),
            classifier,
            types: Arc::new(RwLock::new(FxIndexMap::default())),
        }
    }

    /// Name of the protocol this registry serves.
    pub fn protocol(&self) -> &Symbol {
        &self.protocol
    }

    /// The classifier forwarders and [`satisfies`] use for this registry.
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Merge `methods` into the table for `type_id`.
    ///
    /// Creates the table if absent. Same-named operations are overwritten;
    /// other operations already registered for the type are kept.
    pub fn merge(&self, type_id: &Keyword, methods: MethodTable) {
        let mut types = self.types.write();
        let table = types.entry(type_id.clone()).or_default();
        debug!(
            protocol = %self.protocol,
            type_id = %type_id,
            operations = methods.len(),
            "extending protocol"
        );
        table.extend(methods);
    }

    /// Check if `type_id` has any entry, complete or not.
    pub fn extends(&self, type_id: &Keyword) -> bool {
        self.types.read().contains_key(type_id)
    }

    /// Types registered so far, in registration order.
    pub fn extenders(&self) -> Vec<Keyword> {
        self.types.read().keys().cloned().collect()
    }

    /// Look up the implementation of `operation` for `type_id`.
    ///
    /// Returns a clone so no lock is held while the caller invokes it.
    pub fn find_method(&self, type_id: &Keyword, operation: &Symbol) -> Option<Value> {
        self.types.read().get(type_id)?.get(operation).cloned()
    }

    /// Snapshot of the method table registered for `type_id`.
    pub fn method_table(&self, type_id: &Keyword) -> Option<MethodTable> {
        self.types.read().get(type_id).cloned()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }

    /// Check if two handles share the same table.
    pub fn ptr_eq(&self, other: &Registry) -> bool {
        Arc::ptr_eq(&self.types, &other.types)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("protocol", &self.protocol)
            .field("extenders", &self.extenders())
            .finish()
    }
}

/// Register `methods` for `type_id` in `registry`, then each additional
/// `(registry, methods)` pair against the same type, in order.
///
/// Additional pairs are typed as tuples, so a registry without a method
/// table cannot be passed here; the flat host-level form lives on
/// [`Namespace::extend`](crate::namespace::Namespace::extend).
pub fn register<'a>(
    type_id: &Keyword,
    registry: &Registry,
    methods: MethodTable,
    additional: impl IntoIterator<Item = (&'a Registry, MethodTable)>,
) {
    registry.merge(type_id, methods);
    for (registry, methods) in additional {
        registry.merge(type_id, methods);
    }
}

/// Check if the type of `value` has any entry in `registry`.
///
/// This tests existence, not completeness: a type that implements only some
/// operations still satisfies the protocol.
pub fn satisfies(registry: &Registry, value: &Value) -> Result<bool> {
    let type_id = registry.classifier().classify(value)?;
    Ok(registry.extends(&type_id))
}
