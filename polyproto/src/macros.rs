//! Compile-time protocol declarations.

/// Declare a protocol as a Rust type with one typed method per operation.
///
/// ```ignore
/// polyproto::defprotocol! {
///     /// Collections that accept new items.
///     pub struct Collection {
///         fn count(this);
///         fn conj(this, x; & more);
///     }
/// }
///
/// let coll = Collection::declare()?;
/// coll.conj(&list, &item, &[extra])?;
/// ```
///
/// A `; & rest` tail makes the operation variadic; the generated method
/// takes the rest as a slice and spreads it after the fixed arguments.
/// The generated type wraps a [`Protocol`](crate::Protocol), so the
/// operation names `declare`, `declare_with`, `protocol`, `registry` and
/// `satisfies` are reserved.
#[macro_export]
macro_rules! defprotocol {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$op_meta:meta])*
                fn $op:ident($this:ident $(, $param:ident)* $(; & $rest:ident)?);
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name {
            protocol: $crate::Protocol,
        }

        impl $name {
            /// Declare the protocol with an empty registry.
            pub fn declare() -> $crate::Result<Self> {
                Self::declare_with($crate::Classifier::default())
            }

            /// Declare the protocol with a specific classifier.
            pub fn declare_with(classifier: $crate::Classifier) -> $crate::Result<Self> {
                let operations = ::std::vec![
                    $(
                        $crate::OperationDescriptor::new(
                            stringify!($op),
                            [
                                stringify!($this),
                                $(stringify!($param),)*
                                $($crate::DEFAULT_REST_MARKER, stringify!($rest),)?
                            ],
                        ),
                    )*
                ];
                let protocol =
                    $crate::Protocol::declare_with(stringify!($name), operations, classifier)?;
                Ok(Self { protocol })
            }

            pub fn protocol(&self) -> &$crate::Protocol {
                &self.protocol
            }

            pub fn registry(&self) -> &$crate::Registry {
                self.protocol.registry()
            }

            pub fn satisfies(&self, value: &$crate::Value) -> $crate::Result<bool> {
                self.protocol.satisfies(value)
            }

            $(
                $(#[$op_meta])*
                #[allow(unused_mut)]
                pub fn $op(
                    &self,
                    $this: &$crate::Value
                    $(, $param: &$crate::Value)*
                    $(, $rest: &[$crate::Value])?
                ) -> $crate::Result<$crate::Value> {
                    let mut args = ::std::vec![$this.clone() $(, $param.clone())*];
                    $(args.extend_from_slice($rest);)?
                    self.protocol.invoke(stringify!($op), &args)
                }
            )*
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::{methods, Arity, Keyword, Value};

    crate::defprotocol! {
        /// Collections that accept new items.
        pub struct Collection {
            /// Number of items.
            fn count(this);
            fn conj(this, x; & more);
            fn nth(this, index, default);
        }
    }

    fn collection() -> Collection {
        let coll = Collection::declare().unwrap();
        coll.registry().merge(
            &Keyword::new("vector"),
            methods([
                (
                    "count",
                    Value::function("count", |args| {
                        let items = args[0].as_items().unwrap_or(&[]);
                        Ok(Value::Int(items.len() as i64))
                    }),
                ),
                (
                    "conj",
                    Value::function("conj", |args| {
                        let mut items = args[0].as_items().unwrap_or(&[]).to_vec();
                        items.extend_from_slice(&args[1..]);
                        Ok(Value::vector(items))
                    }),
                ),
            ]),
        );
        coll
    }

    #[test]
    fn test_generated_shapes() {
        let coll = Collection::declare().unwrap();
        let protocol = coll.protocol();
        assert_eq!(protocol.name().name(), "Collection");
        let arity = |op: &str| protocol.forwarder(op).unwrap().descriptor().arity();
        assert_eq!(arity("count"), Arity::exact(1));
        assert_eq!(arity("conj"), Arity::variadic(2));
        assert_eq!(arity("nth"), Arity::exact(3));
    }

    #[test]
    fn test_generated_methods_dispatch() {
        let coll = collection();
        let v = Value::vector([Value::Int(1)]);

        assert_eq!(coll.count(&v).unwrap(), Value::Int(1));
        let grown = coll
            .conj(&v, &Value::Int(2), &[Value::Int(3), Value::Int(4)])
            .unwrap();
        assert_eq!(coll.count(&grown).unwrap(), Value::Int(4));
        assert!(coll.satisfies(&v).unwrap());
    }

    #[test]
    fn test_generated_missing_operation() {
        let coll = collection();
        let v = Value::vector([]);
        let err = coll.nth(&v, &Value::Int(0), &Value::Nil).unwrap_err();
        assert!(err.is_no_implementation());
    }
}
