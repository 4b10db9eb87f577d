//! End-to-end tests for protocol declaration, registration and dispatch.
//!
//! These drive the crate the way a host runtime would: protocols are
//! declared into a namespace, extended with method-table maps, and called
//! through the forwarder values bound in that namespace.

use std::slice;
use std::sync::{Arc, Once};
use std::thread;

use polyproto::{
    classify, methods, register, satisfies, Keyword, Namespace, OddArgumentPolicy,
    OperationDescriptor, Protocol, ProtocolConfig, ProtocolDecl, ProtocolError, RedeclarePolicy,
    Value,
};
use pretty_assertions::assert_eq;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Install a test subscriber; `RUST_LOG=polyproto=trace` shows dispatch.
fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Returns its arguments as a vector.
fn echo() -> Value {
    Value::function("echo", |args| Ok(Value::vector(args.iter().cloned())))
}

fn table(entries: impl IntoIterator<Item = (&'static str, Value)>) -> Value {
    Value::map(
        entries
            .into_iter()
            .map(|(name, f)| (Value::keyword(name), f)),
    )
}

fn seqable(ns: &mut Namespace) -> Protocol {
    let seq = ns.operation("seq", ["this"]);
    let conj = ns.operation("conj", ["this", "x", "&", "more"]);
    ns.declare_protocol("Seqable", [seq, conj]).unwrap()
}

fn call(ns: &Namespace, operation: &str, args: &[Value]) -> polyproto::Result<Value> {
    match ns.value(operation) {
        Some(forwarder) => forwarder.invoke(args),
        None => panic!("Expected `{}` to be bound", operation),
    }
}

#[test]
fn test_register_then_dispatch() {
    init_tracing();
    let mut ns = Namespace::new("user");
    seqable(&mut ns);

    let args = [
        Value::symbol("Seqable"),
        table([("seq", echo()), ("conj", echo())]),
    ];
    ns.extend(&Keyword::new("vector"), &args).unwrap();

    let v = Value::vector([Value::Int(1)]);
    assert!(ns.satisfies("Seqable", &v).unwrap());
    assert_eq!(
        call(&ns, "seq", slice::from_ref(&v)).unwrap(),
        Value::vector([v.clone()])
    );
}

#[test]
fn test_variadic_rest_is_spread() {
    init_tracing();
    let mut ns = Namespace::new("user");
    seqable(&mut ns);
    ns.extend(
        &Keyword::new("list"),
        &[Value::symbol("Seqable"), table([("conj", echo())])],
    )
    .unwrap();

    let x = Value::list([]);
    let result = call(
        &ns,
        "conj",
        &[x.clone(), Value::Int(1), Value::Int(2), Value::Int(3)],
    )
    .unwrap();
    assert_eq!(
        result,
        Value::vector([x, Value::Int(1), Value::Int(2), Value::Int(3)])
    );
}

#[test]
fn test_partial_implementation_satisfies() {
    init_tracing();
    let mut ns = Namespace::new("user");
    seqable(&mut ns);
    ns.extend(
        &Keyword::new("string"),
        &[Value::symbol("Seqable"), table([("seq", echo())])],
    )
    .unwrap();

    let s = Value::string("abc");
    assert!(ns.satisfies("Seqable", &s).unwrap());
    match call(&ns, "conj", &[s, Value::Int(1)]) {
        Err(ProtocolError::NoImplementation {
            protocol,
            operation,
            type_id,
        }) => {
            assert_eq!(protocol.name(), "Seqable");
            assert_eq!(operation.name(), "conj");
            assert_eq!(type_id, Keyword::new("string"));
        }
        other => panic!("Expected NoImplementation, got {:?}", other),
    }
}

#[test]
fn test_unregistered_type_fails_every_forwarder() {
    init_tracing();
    let mut ns = Namespace::new("user");
    seqable(&mut ns);

    let n = Value::Int(7);
    assert!(!ns.satisfies("Seqable", &n).unwrap());
    for (operation, args) in [
        ("seq", vec![n.clone()]),
        ("conj", vec![n.clone(), Value::Nil]),
    ] {
        let err = call(&ns, operation, &args).unwrap_err();
        assert!(err.is_no_implementation(), "{operation}: {err}");
    }
}

#[test]
fn test_nominal_type_dispatch() {
    init_tracing();
    let mut ns = Namespace::new("user");
    let area = ns.operation("area", ["this"]);
    ns.declare_protocol("Shape", [area]).unwrap();

    let circle_area = Value::function("area", |args| {
        let radius = args[0]
            .meta()
            .and_then(|meta| meta.get(&Keyword::new("radius")))
            .and_then(Value::as_int)
            .ok_or_else(|| ProtocolError::thrown("circle without radius"))?;
        Ok(Value::Int(3 * radius * radius))
    });
    ns.extend(
        &Keyword::new("circle"),
        &[Value::symbol("Shape"), table([("area", circle_area)])],
    )
    .unwrap();

    let circle = Value::map([])
        .with_meta_entry("type", Value::keyword("circle"))
        .with_meta_entry("radius", 2i64);
    assert_eq!(classify(&circle).unwrap(), Keyword::new("circle"));
    assert_eq!(call(&ns, "area", &[circle]).unwrap(), Value::Int(12));

    // A plain map is still a :map and is not a Shape.
    assert!(!ns.satisfies("Shape", &Value::map([])).unwrap());

    let bare = Value::vector([]).with_meta_entry("type", Value::keyword("circle"));
    match call(&ns, "area", &[bare]) {
        Err(ProtocolError::Thrown { value }) => {
            assert_eq!(value, Value::string("circle without radius"))
        }
        other => panic!("Expected Thrown, got {:?}", other),
    }
}

#[test]
fn test_configured_type_key_dispatch() {
    init_tracing();
    let config = ProtocolConfig::from_toml_str(r#"type_meta_key = "tag""#).unwrap();
    let mut ns = Namespace::with_config("user", config);
    let area = ns.operation("area", ["this"]);
    ns.declare_protocol("Shape", [area]).unwrap();

    let args = [Value::symbol("Shape"), table([("area", echo())])];
    ns.extend(&Keyword::new("square"), &args).unwrap();

    let square = Value::vector([]).with_meta_entry("tag", Value::keyword("square"));
    assert!(ns.satisfies("Shape", &square).unwrap());
    let result = call(&ns, "area", slice::from_ref(&square)).unwrap();
    assert_eq!(result, Value::vector([square]));

    // Under this configuration `:type` is ordinary metadata.
    let decoy = Value::vector([]).with_meta_entry("type", Value::keyword("square"));
    assert!(!ns.satisfies("Shape", &decoy).unwrap());
    match call(&ns, "area", &[decoy]) {
        Err(ProtocolError::NoImplementation { type_id, .. }) => {
            assert_eq!(type_id, Keyword::new("vector"));
        }
        other => panic!("Expected NoImplementation, got {:?}", other),
    }
}

#[test]
fn test_one_type_many_protocols() {
    init_tracing();
    let mut ns = Namespace::new("user");
    seqable(&mut ns);
    let count = ns.operation("count", ["this"]);
    ns.declare_protocol("Counted", [count]).unwrap();

    let count_fn = Value::function("count", |args| {
        let len = args[0].as_items().map_or(0, <[Value]>::len);
        Ok(Value::Int(len as i64))
    });
    ns.extend(
        &Keyword::new("vector"),
        &[
            Value::symbol("Seqable"),
            table([("seq", echo())]),
            Value::symbol("Counted"),
            table([("count", count_fn)]),
        ],
    )
    .unwrap();

    let v = Value::vector([Value::Nil, Value::Nil]);
    assert!(ns.satisfies("Seqable", &v).unwrap());
    assert!(ns.satisfies("Counted", &v).unwrap());
    assert_eq!(call(&ns, "count", &[v]).unwrap(), Value::Int(2));
}

#[test]
fn test_odd_argument_policies() {
    init_tracing();
    let args = [
        Value::symbol("Seqable"),
        table([("seq", echo())]),
        Value::symbol("Seqable"),
    ];

    let mut lenient = Namespace::new("lenient");
    let protocol = seqable(&mut lenient);
    lenient.extend(&Keyword::new("nil"), &args).unwrap();
    assert!(protocol.satisfies(&Value::Nil).unwrap());

    let config = ProtocolConfig {
        odd_arguments: OddArgumentPolicy::Reject,
        ..ProtocolConfig::default()
    };
    let mut strict = Namespace::with_config("strict", config);
    let protocol = seqable(&mut strict);
    let err = strict.extend(&Keyword::new("nil"), &args).unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidArgumentCount { .. }));
    assert!(!protocol.satisfies(&Value::Nil).unwrap());
}

#[test]
fn test_redeclaration_resets_by_default() {
    init_tracing();
    let mut ns = Namespace::new("user");
    seqable(&mut ns);
    ns.extend(
        &Keyword::new("vector"),
        &[Value::symbol("Seqable"), table([("seq", echo())])],
    )
    .unwrap();

    seqable(&mut ns);
    let v = Value::vector([]);
    assert!(!ns.satisfies("Seqable", &v).unwrap());
    assert!(call(&ns, "seq", &[v]).unwrap_err().is_no_implementation());
}

#[test]
fn test_redeclaration_preserve_keeps_methods() {
    init_tracing();
    let config = ProtocolConfig {
        redeclare: RedeclarePolicy::Preserve,
        ..ProtocolConfig::default()
    };
    let mut ns = Namespace::with_config("user", config);
    seqable(&mut ns);
    ns.extend(
        &Keyword::new("vector"),
        &[Value::symbol("Seqable"), table([("seq", echo())])],
    )
    .unwrap();

    seqable(&mut ns);
    let v = Value::vector([]);
    assert!(ns.satisfies("Seqable", &v).unwrap());
    let seq = call(&ns, "seq", slice::from_ref(&v)).unwrap();
    assert_eq!(seq, Value::vector([v]));
}

#[test]
fn test_declarations_from_toml() {
    init_tracing();
    let decls = ProtocolDecl::parse_all(
        r#"
        [[protocol]]
        name = "Named"

        [[protocol.operation]]
        name = "name-of"
        params = ["this"]

        [[protocol.operation]]
        name = "rename"
        params = ["this", "new-name"]
        "#,
    )
    .unwrap();

    let mut ns = Namespace::new("user");
    for decl in &decls {
        ns.declare(decl).unwrap();
    }
    assert!(ns.registry("Named").is_some());
    assert!(ns.value("name-of").is_some());
    assert!(ns.value("rename").is_some());

    let err = call(&ns, "rename", &[Value::Nil]).unwrap_err();
    assert!(matches!(err, ProtocolError::ArityMismatch { got: 1, .. }));
}

#[test]
fn test_typed_register_with_additional_pairs() {
    init_tracing();
    let area = OperationDescriptor::new("area", ["this"]);
    let shape = Protocol::declare("Shape", [area]).unwrap();
    let name_of = OperationDescriptor::new("name-of", ["this"]);
    let named = Protocol::declare("Named", [name_of]).unwrap();

    let number = Keyword::new("number");
    register(
        &number,
        shape.registry(),
        methods([("area", echo())]),
        [(named.registry(), methods([("name-of", echo())]))],
    );
    // Registering the same pair again changes nothing observable.
    register(&number, shape.registry(), methods([("area", echo())]), []);

    assert!(satisfies(shape.registry(), &Value::Int(1)).unwrap());
    assert!(satisfies(named.registry(), &Value::Int(1)).unwrap());
    assert_eq!(shape.registry().len(), 1);
    assert_eq!(
        shape.invoke("area", &[Value::Int(5)]).unwrap(),
        Value::vector([Value::Int(5)])
    );
}

#[test]
fn test_implementation_may_reenter_registry() {
    init_tracing();
    let force = OperationDescriptor::new("force", ["this"]);
    let protocol = Protocol::declare("Lazy", [force]).unwrap();

    // The first call for :nil registers :string while dispatching.
    let registry = protocol.registry().clone();
    let force = Value::function("force", move |_| {
        registry.merge(&Keyword::new("string"), methods([("force", Value::Nil)]));
        Ok(Value::Bool(true))
    });
    protocol.extend(&Keyword::new("nil"), methods([("force", force)]));

    let forced = protocol.invoke("force", &[Value::Nil]).unwrap();
    assert_eq!(forced, Value::Bool(true));
    assert!(protocol.satisfies(&Value::string("")).unwrap());

    // A registered non-function fails only once it is called.
    match protocol.invoke("force", &[Value::string("")]) {
        Err(ProtocolError::NotCallable { value }) => assert_eq!(value, Value::Nil),
        other => panic!("Expected NotCallable, got {:?}", other),
    }
}

#[test]
fn test_concurrent_registration() {
    init_tracing();
    let operations = (0..8).map(|i| OperationDescriptor::new(format!("op{i}"), ["this"]));
    let protocol = Arc::new(Protocol::declare("Wide", operations).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let protocol = Arc::clone(&protocol);
            thread::spawn(move || {
                let op = format!("op{i}");
                let method = Value::function(op.as_str(), move |_| Ok(Value::Int(i)));
                protocol.extend(&Keyword::new("vector"), methods([(op, method)]));
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let v = Value::vector([]);
    for i in 0..8 {
        let op = format!("op{i}");
        let result = protocol.invoke(&op, slice::from_ref(&v)).unwrap();
        assert_eq!(result, Value::Int(i));
    }
}
