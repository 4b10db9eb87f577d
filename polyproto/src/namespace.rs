//! Namespaces: where protocol declarations bind their names.
//!
//! Declaring a protocol in a namespace binds N+1 names: one host function
//! per operation and the registry under the protocol's name. The namespace
//! is an explicit value owned by whoever declares protocols in it; there is
//! no global lookup.
//!
//! The namespace also hosts the flat form of registration that host code
//! uses, `extend(type, P1, {...}, P2, {...})`, where protocols are named by
//! symbols and method tables are map values.

use tracing::{debug, warn};

use crate::config::{OddArgumentPolicy, ProtocolConfig, RedeclarePolicy};
use crate::decl::ProtocolDecl;
use crate::error::{ProtocolError, Result};
use crate::protocol::{OperationDescriptor, Protocol};
use crate::registry::{MethodTable, Registry};
use crate::value::{FxIndexMap, Keyword, Symbol, Value};

/// What a name is bound to.
#[derive(Debug, Clone)]
pub enum Binding {
    /// An ordinary value, forwarders included.
    Value(Value),
    /// A protocol's registry.
    Registry(Registry),
}

/// A scope of named bindings.
#[derive(Debug, Clone)]
pub struct Namespace {
    name: Symbol,
    config: ProtocolConfig,
    bindings: FxIndexMap<Symbol, Binding>,
}

impl Namespace {
    /// Create an empty namespace with default configuration.
    pub fn new(name: impl Into<Symbol>) -> Self {
        Self::with_config(name, ProtocolConfig::default())
    }

    pub fn with_config(name: impl Into<Symbol>, config: ProtocolConfig) -> Self {
        Self {
            name: name.into(),
            config,
            bindings: FxIndexMap::default(),
        }
    }

    pub fn name(&self) -> &Symbol {
        &self.name
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Bind `value` under `name`, replacing any previous binding.
    pub fn define(&mut self, name: impl Into<Symbol>, value: Value) {
        self.bindings.insert(name.into(), Binding::Value(value));
    }

    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(&Symbol::new(name))
    }

    /// The value bound to `name`, if it is not a registry.
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.lookup(name)? {
            Binding::Value(value) => Some(value),
            Binding::Registry(_) => None,
        }
    }

    /// The registry bound to `name`, if any.
    pub fn registry(&self, name: &str) -> Option<&Registry> {
        match self.lookup(name)? {
            Binding::Registry(registry) => Some(registry),
            Binding::Value(_) => None,
        }
    }

    /// Parse an operation with this namespace's rest marker.
    pub fn operation<P: Into<Symbol>>(
        &self,
        name: impl Into<Symbol>,
        params: impl IntoIterator<Item = P>,
    ) -> OperationDescriptor {
        OperationDescriptor::parse(name, params, &self.config.rest_marker)
    }

    /// Declare a protocol and bind its forwarders and registry.
    ///
    /// If `name` already holds a registry, the configured
    /// [`RedeclarePolicy`] decides whether it is replaced by a fresh empty
    /// one or kept.
    pub fn declare_protocol(
        &mut self,
        name: impl Into<Symbol>,
        operations: impl IntoIterator<Item = OperationDescriptor>,
    ) -> Result<Protocol> {
        let name = name.into();
        let existing = match self.bindings.get(&name) {
            Some(Binding::Registry(registry)) => Some(registry.clone()),
            _ => None,
        };

        let protocol = match (existing, self.config.redeclare) {
            (Some(registry), RedeclarePolicy::Preserve) => {
                debug!(protocol = %name, "redeclaring protocol over its existing registry");
                Protocol::declare_over(registry, operations)?
            }
            (existing, _) => {
                if existing.is_some() {
                    warn!(
                        protocol = %name,
                        "redeclaring protocol; registered implementations are discarded"
                    );
                }
                Protocol::declare_with(name.clone(), operations, self.config.classifier())?
            }
        };

        for (operation, forwarder) in protocol.forwarders() {
            self.bindings
                .insert(operation.clone(), Binding::Value(forwarder.to_value()));
        }
        self.bindings
            .insert(name, Binding::Registry(protocol.registry().clone()));

        Ok(protocol)
    }

    /// Declare a protocol from its declarative description.
    pub fn declare(&mut self, decl: &ProtocolDecl) -> Result<Protocol> {
        let operations = decl.descriptors(&self.config.rest_marker);
        self.declare_protocol(decl.name.as_str(), operations)
    }

    /// Register method tables for `type_id` from a flat argument list.
    ///
    /// `args` alternates protocol names (symbols bound to registries) and
    /// method tables (maps from operation names to functions). Every pair is
    /// resolved before any registry changes, so a bad pair registers
    /// nothing. A trailing protocol without a table is handled by the
    /// configured [`OddArgumentPolicy`].
    pub fn extend(&self, type_id: &Keyword, args: &[Value]) -> Result<()> {
        let mut pairs = args.chunks_exact(2);
        let resolved = pairs
            .by_ref()
            .map(|pair| {
                let registry = self.resolve_protocol(&pair[0])?;
                let methods = method_table(registry.protocol(), &pair[1])?;
                Ok((registry, methods))
            })
            .collect::<Result<Vec<_>>>()?;

        if let [leftover] = pairs.remainder() {
            match self.config.odd_arguments {
                OddArgumentPolicy::Ignore => {
                    warn!(
                        type_id = %type_id,
                        leftover = %leftover,
                        "ignoring trailing extend argument without a method table"
                    );
                }
                OddArgumentPolicy::Reject => {
                    return Err(ProtocolError::InvalidArgumentCount {
                        type_id: type_id.clone(),
                        leftover: leftover.clone(),
                    });
                }
            }
        }

        for (registry, methods) in resolved {
            registry.merge(type_id, methods);
        }
        Ok(())
    }

    /// Check if the type of `value` is registered with the named protocol.
    pub fn satisfies(&self, protocol: &str, value: &Value) -> Result<bool> {
        let registry = self.resolve_protocol(&Value::symbol(protocol))?;
        crate::registry::satisfies(&registry, value)
    }

    fn resolve_protocol(&self, name: &Value) -> Result<Registry> {
        name.as_symbol()
            .and_then(|symbol| match self.bindings.get(symbol) {
                Some(Binding::Registry(registry)) => Some(registry.clone()),
                _ => None,
            })
            .ok_or_else(|| ProtocolError::NotAProtocol { name: name.clone() })
    }
}

/// Convert a host map into a method table.
///
/// Keys may be symbols, keywords or strings. Values are stored as given;
/// a non-function only fails once a forwarder tries to call it.
fn method_table(protocol: &Symbol, value: &Value) -> Result<MethodTable> {
    let invalid = || ProtocolError::InvalidMethodTable {
        protocol: protocol.clone(),
        value: value.clone(),
    };

    let Value::Map(map) = value else {
        return Err(invalid());
    };

    map.entries()
        .iter()
        .map(|(key, method)| {
            let name = match key {
                Value::Symbol(symbol) => symbol.clone(),
                Value::Keyword(keyword) => Symbol::new(keyword.name()),
                Value::Str(text) => Symbol::new(text),
                _ => return Err(invalid()),
            };
            Ok((name, method.clone()))
        })
        .collect()
}
