//! Polyproto
//!
//! Protocol-based polymorphism for a dynamically typed host runtime.
//!
//! A protocol is a named set of operations. Declaring one creates an empty
//! registry and one forwarding function per operation. Implementations are
//! registered later, per type identifier, and a forwarder dispatches on the
//! type of its first argument at call time.
//!
//! # Features
//!
//! - Type classification with nominal overrides from value metadata
//! - Open extension: any type can be registered with any protocol at any time
//! - Variadic operations whose rest arguments are spread into the implementation
//! - Partial implementations; `satisfies` tests registration, not completeness
//! - Runtime declarations from TOML and compile-time ones via [`defprotocol!`]
//!
//! # Example
//!
//! ```rust,ignore
//! use polyproto::{Keyword, Namespace, Value};
//!
//! let mut ns = Namespace::new("user");
//! let area = ns.operation("area", ["this"]);
//! ns.declare_protocol("Shape", [area])?;
//!
//! let square = Value::function("area", |args| {
//!     let side = args[0].as_int().unwrap_or(0);
//!     Ok(Value::Int(side * side))
//! });
//! let table = Value::map([(Value::keyword("area"), square)]);
//! ns.extend(&Keyword::new("number"), &[Value::symbol("Shape"), table])?;
//!
//! let area = ns.value("area").unwrap();
//! assert_eq!(area.invoke(&[Value::Int(3)])?, Value::Int(9));
//! ```

mod macros;

pub mod classify;
pub mod config;
pub mod decl;
pub mod error;
pub mod namespace;
pub mod protocol;
pub mod registry;
pub mod value;

pub use classify::{classify, Classifier};
pub use config::{ConfigError, OddArgumentPolicy, ProtocolConfig, RedeclarePolicy};
pub use decl::{OperationDecl, ProtocolDecl};
pub use error::{ProtocolError, Result};
pub use namespace::{Binding, Namespace};
pub use protocol::{Arity, Forwarder, OperationDescriptor, Protocol, DEFAULT_REST_MARKER};
pub use registry::{methods, register, satisfies, MethodTable, Registry};
pub use value::{Atom, Foreign, Function, FxIndexMap, Keyword, Metadata, Symbol, Value};
