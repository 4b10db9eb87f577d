//! Operation descriptors and call arities.

use std::fmt;

use crate::error::{ProtocolError, Result};
use crate::value::Symbol;

/// Parameter that introduces the rest collector, as in `[this x & more]`.
pub const DEFAULT_REST_MARKER: &str = "&";

/// How many arguments a forwarder accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    /// Number of fixed parameters, dispatch argument included.
    pub fixed: usize,
    /// Whether any number of trailing arguments may follow.
    pub variadic: bool,
}

impl Arity {
    /// Exactly `fixed` arguments.
    pub fn exact(fixed: usize) -> Self {
        Self {
            fixed,
            variadic: false,
        }
    }

    /// At least `fixed` arguments.
    pub fn variadic(fixed: usize) -> Self {
        Self {
            fixed,
            variadic: true,
        }
    }

    /// Check if a call with `count` arguments fits this arity.
    pub fn accepts(&self, count: usize) -> bool {
        if self.variadic {
            count >= self.fixed
        } else {
            count == self.fixed
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.variadic {
            write!(f, "at least {}", self.fixed)
        } else {
            write!(f, "{}", self.fixed)
        }
    }
}

/// Declaration of one protocol operation.
///
/// Built once when the protocol is declared and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    name: Symbol,
    /// Parameters as declared, rest marker included.
    params: Vec<Symbol>,
    /// Position of the rest marker in `params`, for variadic operations.
    variadic_index: Option<usize>,
    doc: Option<String>,
}

impl OperationDescriptor {
    /// Parse a parameter list using the default rest marker.
    pub fn new<P: Into<Symbol>>(
        name: impl Into<Symbol>,
        params: impl IntoIterator<Item = P>,
    ) -> Self {
        Self::parse(name, params, DEFAULT_REST_MARKER)
    }

    /// Parse a parameter list.
    ///
    /// The operation is variadic when it has at least two parameters and the
    /// second-to-last one is `rest_marker`; the last parameter then collects
    /// the rest. A marker anywhere else is an ordinary parameter name.
    pub fn parse<P: Into<Symbol>>(
        name: impl Into<Symbol>,
        params: impl IntoIterator<Item = P>,
        rest_marker: &str,
    ) -> Self {
        let params: Vec<Symbol> = params.into_iter().map(Into::into).collect();
        let variadic_index = params
            .len()
            .checked_sub(2)
            .filter(|&i| params[i].name() == rest_marker);

        Self {
            name: name.into(),
            params,
            variadic_index,
            doc: None,
        }
    }

    /// Attach a doc string.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn name(&self) -> &Symbol {
        &self.name
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Parameters as declared, rest marker included.
    pub fn params(&self) -> &[Symbol] {
        &self.params
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic_index.is_some()
    }

    /// Position of the rest marker in [`params`](Self::params).
    pub fn variadic_index(&self) -> Option<usize> {
        self.variadic_index
    }

    /// Parameters bound one-to-one to arguments.
    pub fn fixed_params(&self) -> &[Symbol] {
        match self.variadic_index {
            Some(index) => &self.params[..index],
            None => &self.params,
        }
    }

    /// The rest collector, for variadic operations.
    pub fn rest_param(&self) -> Option<&Symbol> {
        self.variadic_index.and_then(|_| self.params.last())
    }

    /// The parameter whose runtime type selects the implementation.
    pub fn dispatch_param(&self) -> Option<&Symbol> {
        self.fixed_params().first()
    }

    pub fn arity(&self) -> Arity {
        let fixed = self.fixed_params().len();
        if self.is_variadic() {
            Arity::variadic(fixed)
        } else {
            Arity::exact(fixed)
        }
    }

    /// Reject operations without a dispatch argument.
    pub fn validate(&self, protocol: &Symbol) -> Result<()> {
        if self.dispatch_param().is_none() {
            return Err(ProtocolError::InvalidOperationArity {
                protocol: protocol.clone(),
                operation: self.name.clone(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} [", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, "])")
    }
}
