//! Declarative protocol descriptions.
//!
//! A [`ProtocolDecl`] is the literal structure a caller hands to the
//! protocol builder: a name and, per operation, a parameter list written the
//! way the host language writes it (`["this", "x", "&", "more"]`). The
//! structures deserialize from TOML:
//!
//! ```toml
//! [[protocol]]
//! name = "Seqable"
//!
//! [[protocol.operation]]
//! name = "conj"
//! params = ["this", "x", "&", "more"]
//! doc = "Adds items to a collection."
//! ```

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::protocol::OperationDescriptor;

/// A protocol declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolDecl {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    #[serde(default, rename = "operation")]
    pub operations: Vec<OperationDecl>,
}

/// One operation of a [`ProtocolDecl`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDecl {
    pub name: String,

    #[serde(default)]
    pub params: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

#[derive(Deserialize)]
struct DeclFile {
    #[serde(default)]
    protocol: Vec<ProtocolDecl>,
}

impl ProtocolDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: None,
            operations: Vec::new(),
        }
    }

    /// Adds an operation with the given parameter list.
    pub fn operation(mut self, name: impl Into<String>, params: &[&str]) -> Self {
        self.operations.push(OperationDecl {
            name: name.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
            doc: None,
        });
        self
    }

    /// Parses every `[[protocol]]` table in a TOML document.
    pub fn parse_all(source: &str) -> Result<Vec<Self>, ConfigError> {
        let file: DeclFile = toml::from_str(source)?;
        Ok(file.protocol)
    }

    /// Operation descriptors, splitting variadic tails at `rest_marker`.
    ///
    /// Descriptors are not validated here; declaring the protocol does that.
    pub fn descriptors(&self, rest_marker: &str) -> Vec<OperationDescriptor> {
        self.operations
            .iter()
            .map(|op| {
                let params = op.params.iter().map(String::as_str);
                let descriptor = OperationDescriptor::parse(op.name.as_str(), params, rest_marker);
                match &op.doc {
                    Some(doc) => descriptor.with_doc(doc.clone()),
                    None => descriptor,
                }
            })
            .collect()
    }
}
