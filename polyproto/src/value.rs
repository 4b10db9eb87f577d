//! Host values.
//!
//! This is the value runtime the classifier reads. It supplies:
//!
//! - One predicate per intrinsic category (`is_symbol`, `is_number`, ...)
//! - The metadata reader (`meta`) used for nominal type overrides
//! - A uniform invocation entry point (`invoke`) that erases arity behind
//!   a slice of arguments
//!
//! Values are cheap to clone: every heap payload sits behind an `Arc`.
//! Equality and hashing ignore metadata; functions, atoms and foreign
//! handles compare by identity.

mod print;

use std::any::Any;
use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use parking_lot::RwLock;
use rustc_hash::FxBuildHasher;

use crate::error::{ProtocolError, Result};

/// Insertion-ordered map with the Fx hasher.
pub type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Side-map attached to a value, keyed by keywords.
pub type Metadata = FxIndexMap<Keyword, Value>;

/// Signature shared by every native callable.
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

/// A symbol: a bare name such as `conj` or `Seqable`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Arc<str>);

impl Symbol {
    /// Creates a symbol with the given name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Returns the symbol's name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::new(name)
    }
}

impl From<String> for Symbol {
    fn from(name: String) -> Self {
        Symbol(Arc::from(name))
    }
}

impl From<&Symbol> for Symbol {
    fn from(symbol: &Symbol) -> Self {
        symbol.clone()
    }
}

/// A keyword such as `:number`. Keywords are the type identifiers.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Keyword(Arc<str>);

impl Keyword {
    /// Creates a keyword; a leading `:` is accepted and stripped.
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        Self(Arc::from(name.strip_prefix(':').unwrap_or(name)))
    }

    /// Returns the name without the leading colon.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Keyword {
    fn from(name: &str) -> Self {
        Keyword::new(name)
    }
}

impl From<&Keyword> for Keyword {
    fn from(keyword: &Keyword) -> Self {
        keyword.clone()
    }
}

/// A boxed mutable cell.
#[derive(Clone)]
pub struct Atom(Arc<RwLock<Value>>);

impl Atom {
    /// Creates a new atom holding `value`.
    pub fn new(value: Value) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    /// Returns a copy of the current value.
    pub fn deref(&self) -> Value {
        self.0.read().clone()
    }

    /// Replaces the current value, returning the new one.
    pub fn reset(&self, value: Value) -> Value {
        *self.0.write() = value.clone();
        value
    }

    /// Applies `f` to the current value and stores the result.
    ///
    /// The write lock is held across `f`; `f` must not touch this atom.
    pub fn swap(&self, f: impl FnOnce(&Value) -> Result<Value>) -> Result<Value> {
        let mut slot = self.0.write();
        let next = f(&slot)?;
        *slot = next.clone();
        Ok(next)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

/// A native function or compiled macro.
#[derive(Clone)]
pub struct Function {
    name: Option<Symbol>,
    body: Arc<NativeFn>,
    is_macro: bool,
    meta: Option<Arc<Metadata>>,
}

impl Function {
    /// Wraps an anonymous closure.
    pub fn new(body: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static) -> Self {
        Self {
            name: None,
            body: Arc::new(body),
            is_macro: false,
            meta: None,
        }
    }

    /// Wraps a closure under a name used when printing.
    pub fn named(
        name: impl Into<Symbol>,
        body: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(body)
        }
    }

    /// Marks this function as a compiled macro.
    pub fn into_macro(mut self) -> Self {
        self.is_macro = true;
        self
    }

    pub fn name(&self) -> Option<&Symbol> {
        self.name.as_ref()
    }

    pub fn is_macro(&self) -> bool {
        self.is_macro
    }

    /// Calls the function with positional arguments.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.body)(args)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.body) as *const () as usize
    }
}

/// An opaque host object the classifier has no category for.
#[derive(Clone)]
pub struct Foreign {
    type_name: &'static str,
    handle: Arc<dyn Any + Send + Sync>,
}

impl Foreign {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            handle: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.handle.downcast_ref()
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.handle) as *const () as usize
    }
}

/// Ordered elements of a list or vector.
#[derive(Clone)]
pub struct Seq {
    items: Arc<Vec<Value>>,
    meta: Option<Arc<Metadata>>,
}

impl Seq {
    pub fn items(&self) -> &[Value] {
        &self.items
    }
}

/// Entries of an associative mapping, in insertion order.
#[derive(Clone)]
pub struct Map {
    entries: Arc<FxIndexMap<Value, Value>>,
    meta: Option<Arc<Metadata>>,
}

impl Map {
    pub fn entries(&self) -> &FxIndexMap<Value, Value> {
        &self.entries
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.get(key)
    }
}

/// A runtime value of the host language.
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(Arc<str>),
    Symbol(Symbol),
    Keyword(Keyword),
    Atom(Atom),
    List(Seq),
    Vector(Seq),
    Map(Map),
    Fn(Function),
    Foreign(Foreign),
}

impl Value {
    pub fn symbol(name: impl AsRef<str>) -> Self {
        Value::Symbol(Symbol::new(name))
    }

    pub fn keyword(name: impl AsRef<str>) -> Self {
        Value::Keyword(Keyword::new(name))
    }

    pub fn string(text: impl AsRef<str>) -> Self {
        Value::Str(Arc::from(text.as_ref()))
    }

    pub fn atom(value: Value) -> Self {
        Value::Atom(Atom::new(value))
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(Seq {
            items: Arc::new(items.into_iter().collect()),
            meta: None,
        })
    }

    pub fn vector(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Vector(Seq {
            items: Arc::new(items.into_iter().collect()),
            meta: None,
        })
    }

    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Value::Map(Map {
            entries: Arc::new(entries.into_iter().collect()),
            meta: None,
        })
    }

    /// A named native function.
    pub fn function(
        name: impl Into<Symbol>,
        body: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Value::Fn(Function::named(name, body))
    }

    pub fn foreign<T: Any + Send + Sync>(value: T) -> Self {
        Value::Foreign(Foreign::new(value))
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, Value::Symbol(_))
    }

    pub fn is_keyword(&self) -> bool {
        matches!(self, Value::Keyword(_))
    }

    pub fn is_atom(&self) -> bool {
        matches!(self, Value::Atom(_))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Value::Bool(true))
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Value::Bool(false))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    pub fn is_macro(&self) -> bool {
        matches!(self, Value::Fn(f) if f.is_macro())
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Value::Vector(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// True for plain functions; compiled macros report `is_macro` instead.
    pub fn is_fn(&self) -> bool {
        matches!(self, Value::Fn(f) if !f.is_macro())
    }

    pub fn as_keyword(&self) -> Option<&Keyword> {
        match self {
            Value::Keyword(k) => Some(k),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Elements of a list or vector.
    pub fn as_items(&self) -> Option<&[Value]> {
        match self {
            Value::List(seq) | Value::Vector(seq) => Some(seq.items()),
            _ => None,
        }
    }

    /// Returns the metadata attached to this value, if any.
    pub fn meta(&self) -> Option<&Metadata> {
        match self {
            Value::List(seq) | Value::Vector(seq) => seq.meta.as_deref(),
            Value::Map(map) => map.meta.as_deref(),
            Value::Fn(f) => f.meta.as_deref(),
            _ => None,
        }
    }

    /// Returns a copy of this value carrying `meta`.
    ///
    /// Only lists, vectors, maps, functions and macros carry metadata; any
    /// other value is returned unchanged.
    pub fn with_meta(self, meta: Metadata) -> Self {
        let meta = Some(Arc::new(meta));
        match self {
            Value::List(seq) => Value::List(Seq { meta, ..seq }),
            Value::Vector(seq) => Value::Vector(Seq { meta, ..seq }),
            Value::Map(map) => Value::Map(Map { meta, ..map }),
            Value::Fn(f) => Value::Fn(Function { meta, ..f }),
            other => other,
        }
    }

    /// Shorthand for attaching a single metadata entry.
    pub fn with_meta_entry(self, key: impl Into<Keyword>, value: impl Into<Value>) -> Self {
        let mut meta = self.meta().cloned().unwrap_or_default();
        meta.insert(key.into(), value.into());
        self.with_meta(meta)
    }

    /// Invokes this value with positional arguments.
    pub fn invoke(&self, args: &[Value]) -> Result<Value> {
        match self {
            Value::Fn(f) => f.call(args),
            other => Err(ProtocolError::NotCallable {
                value: other.clone(),
            }),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Keyword(a), Value::Keyword(b)) => a == b,
            (Value::Atom(a), Value::Atom(b)) => a.addr() == b.addr(),
            (Value::List(a), Value::List(b)) => a.items == b.items,
            (Value::Vector(a), Value::Vector(b)) => a.items == b.items,
            (Value::Map(a), Value::Map(b)) => a.entries == b.entries,
            (Value::Fn(a), Value::Fn(b)) => a.addr() == b.addr(),
            (Value::Foreign(a), Value::Foreign(b)) => a.addr() == b.addr(),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Nil => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(n) => n.hash(state),
            Value::Float(n) => n.hash(state),
            Value::Str(s) => s.hash(state),
            Value::Symbol(s) => s.hash(state),
            Value::Keyword(k) => k.hash(state),
            Value::Atom(a) => a.addr().hash(state),
            Value::List(seq) | Value::Vector(seq) => seq.items.hash(state),
            Value::Map(map) => {
                // Map equality ignores entry order, so the hash must too.
                let mut combined = 0u64;
                for (key, value) in map.entries.iter() {
                    combined = combined.wrapping_add(FxBuildHasher.hash_one((key, value)));
                }
                map.entries.len().hash(state);
                combined.hash(state);
            }
            Value::Fn(f) => f.addr().hash(state),
            Value::Foreign(h) => h.addr().hash(state),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({})", self)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(OrderedFloat(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<Symbol> for Value {
    fn from(s: Symbol) -> Self {
        Value::Symbol(s)
    }
}

impl From<Keyword> for Value {
    fn from(k: Keyword) -> Self {
        Value::Keyword(k)
    }
}

impl From<Atom> for Value {
    fn from(a: Atom) -> Self {
        Value::Atom(a)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Fn(f)
    }
}
