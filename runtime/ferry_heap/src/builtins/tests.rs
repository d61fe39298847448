#![allow(
    clippy::unwrap_used,
    reason = "test code uses unwrap for concise assertions"
)]

use super::*;
use crate::errors::{EvalError, EvalErrorKind};
use crate::value::{Attr, AttrSet, Kind};
use pretty_assertions::assert_eq;

fn call_global(ev: &mut Evaluator, name: &str, args: &[ValueId]) -> Result<Shape, EvalError> {
    let set = ev.force_attrs(ev.builtins()).unwrap();
    let func = set.get(ev.symbols().find(name).unwrap()).unwrap();
    ev.call(func, args)
}

fn int(ev: &mut Evaluator, n: i64) -> ValueId {
    ev.alloc(Shape::Int(n))
}

fn string(ev: &mut Evaluator, s: &str) -> ValueId {
    ev.alloc(Shape::string(s))
}

fn attrs(ev: &mut Evaluator, entries: &[(&str, ValueId)]) -> ValueId {
    let attrs = entries
        .iter()
        .map(|&(name, value)| Attr {
            name: ev.intern(name),
            value,
        })
        .collect();
    ev.alloc(Shape::Attrs(AttrSet::from_unsorted(attrs)))
}

fn as_int(shape: Shape) -> i64 {
    match shape {
        Shape::Int(n) => n,
        other => panic!("expected an integer, got {other:?}"),
    }
}

fn as_str(shape: Shape) -> String {
    match shape {
        Shape::String(s) => s.to_string(),
        other => panic!("expected a string, got {other:?}"),
    }
}

#[test]
fn test_arithmetic() {
    let mut ev = Evaluator::new();
    let a = int(&mut ev, 7);
    let b = int(&mut ev, 2);

    assert_eq!(as_int(call_global(&mut ev, "add", &[a, b]).unwrap()), 9);
    assert_eq!(as_int(call_global(&mut ev, "sub", &[a, b]).unwrap()), 5);
    assert_eq!(as_int(call_global(&mut ev, "mul", &[a, b]).unwrap()), 14);
    assert_eq!(as_int(call_global(&mut ev, "div", &[a, b]).unwrap()), 3);
}

#[test]
fn test_float_promotion() {
    let mut ev = Evaluator::new();
    let a = int(&mut ev, 1);
    let b = ev.alloc(Shape::Float(0.5));

    let Shape::Float(x) = call_global(&mut ev, "add", &[a, b]).unwrap() else {
        panic!("expected a float");
    };
    assert!((x - 1.5).abs() < f64::EPSILON);
}

#[test]
fn test_division_by_zero() {
    let mut ev = Evaluator::new();
    let a = int(&mut ev, 1);
    let zero = int(&mut ev, 0);

    let err = call_global(&mut ev, "div", &[a, zero]).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::DivisionByZero);
}

#[test]
fn test_integer_overflow() {
    let mut ev = Evaluator::new();
    let max = int(&mut ev, i64::MAX);
    let one = int(&mut ev, 1);

    let err = call_global(&mut ev, "add", &[max, one]).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::IntegerOverflow { operation: "addition" });
}

#[test]
fn test_less_than() {
    let mut ev = Evaluator::new();
    let a = string(&mut ev, "abc");
    let b = string(&mut ev, "abd");

    assert!(matches!(call_global(&mut ev, "lessThan", &[a, b]).unwrap(), Shape::Bool(true)));
    assert!(matches!(call_global(&mut ev, "lessThan", &[b, a]).unwrap(), Shape::Bool(false)));
}

#[test]
fn test_get_attr_and_has_attr() {
    let mut ev = Evaluator::new();
    let one = int(&mut ev, 1);
    let set = attrs(&mut ev, &[("x", one)]);
    let x = string(&mut ev, "x");
    let y = string(&mut ev, "y");

    assert_eq!(as_int(call_global(&mut ev, "getAttr", &[x, set]).unwrap()), 1);
    assert!(matches!(call_global(&mut ev, "hasAttr", &[x, set]).unwrap(), Shape::Bool(true)));
    assert!(matches!(call_global(&mut ev, "hasAttr", &[y, set]).unwrap(), Shape::Bool(false)));

    let err = call_global(&mut ev, "getAttr", &[y, set]).unwrap_err();
    assert_eq!(err.message, "attribute 'y' missing");
}

#[test]
fn test_get_attr_on_non_set() {
    let mut ev = Evaluator::new();
    let x = string(&mut ev, "x");
    let not_a_set = int(&mut ev, 3);

    let err = call_global(&mut ev, "getAttr", &[x, not_a_set]).unwrap_err();
    assert_eq!(
        err.kind,
        EvalErrorKind::TypeMismatch {
            expected: "a set",
            got: Kind::Int,
        }
    );
    assert!(!err.message.is_empty());
}

#[test]
fn test_attr_names_sorted_alphabetically() {
    let mut ev = Evaluator::new();
    let one = int(&mut ev, 1);
    let two = int(&mut ev, 2);
    // Interned out of alphabetical order.
    let set = attrs(&mut ev, &[("zeta", one), ("alpha", two)]);

    let Shape::List(names) = call_global(&mut ev, "attrNames", &[set]).unwrap() else {
        panic!("expected a list");
    };
    let names: Vec<String> = names
        .as_slice()
        .iter()
        .map(|&id| as_str(ev.force_shape(id).unwrap()))
        .collect();
    assert_eq!(names, vec!["alpha", "zeta"]);

    let Shape::List(values) = call_global(&mut ev, "attrValues", &[set]).unwrap() else {
        panic!("expected a list");
    };
    assert_eq!(values.as_slice(), &[two, one]);
}

#[test]
fn test_list_builtins() {
    let mut ev = Evaluator::new();
    let items: Vec<ValueId> = (10..13).map(|n| int(&mut ev, n)).collect();
    let list = ev.alloc(Shape::List(List::new(items)));
    let one = int(&mut ev, 1);
    let five = int(&mut ev, 5);

    assert_eq!(as_int(call_global(&mut ev, "length", &[list]).unwrap()), 3);
    assert_eq!(as_int(call_global(&mut ev, "elemAt", &[list, one]).unwrap()), 11);

    let err = call_global(&mut ev, "elemAt", &[list, five]).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::IndexOutOfBounds { index: 5, len: 3 });
}

#[test]
fn test_map_is_lazy() {
    let mut ev = Evaluator::new();
    let set = ev.force_attrs(ev.builtins()).unwrap();
    let type_of = set.get(ev.symbols().find("typeOf").unwrap()).unwrap();
    let items = vec![int(&mut ev, 1), string(&mut ev, "s")];
    let list = ev.alloc(Shape::List(List::new(items)));

    let Shape::List(mapped) = call_global(&mut ev, "map", &[type_of, list]).unwrap() else {
        panic!("expected a list");
    };
    let first = mapped.get(0).unwrap();
    assert_eq!(ev.kind(first), Kind::Thunk);
    assert_eq!(as_str(ev.force_shape(first).unwrap()), "int");
    assert_eq!(as_str(ev.force_shape(mapped.get(1).unwrap()).unwrap()), "string");
}

#[test]
fn test_throw_and_abort() {
    let mut ev = Evaluator::new();
    let msg = string(&mut ev, "bad input");

    let err = call_global(&mut ev, "throw", &[msg]).unwrap_err();
    assert_eq!(err.message, "bad input");

    let err = call_global(&mut ev, "abort", &[msg]).unwrap_err();
    assert_eq!(
        err.message,
        "evaluation aborted with the following error message: 'bad input'"
    );
}

#[test]
fn test_seq_forces_first_argument() {
    let mut ev = Evaluator::new();
    let msg = string(&mut ev, "first");
    let set = ev.force_attrs(ev.builtins()).unwrap();
    let throw = set.get(ev.symbols().find("throw").unwrap()).unwrap();
    let failing = ev.alloc_thunk(Thunk::Apply {
        func: throw,
        args: Arc::from([msg]),
    });
    let two = int(&mut ev, 2);

    let err = call_global(&mut ev, "seq", &[failing, two]).unwrap_err();
    assert_eq!(err.message, "first");
}

#[test]
fn test_to_string() {
    let mut ev = Evaluator::new();
    let n = int(&mut ev, 42);
    let t = ev.alloc(Shape::Bool(true));
    let list = ev.alloc(Shape::List(List::new(vec![n, t])));

    assert_eq!(as_str(call_global(&mut ev, "toString", &[n]).unwrap()), "42");
    assert_eq!(as_str(call_global(&mut ev, "toString", &[list]).unwrap()), "42 1");
}

#[test]
fn test_constants() {
    let mut ev = Evaluator::new();
    let set = ev.force_attrs(ev.builtins()).unwrap();
    let t = set.get(ev.symbols().find("true").unwrap()).unwrap();
    let null = set.get(ev.symbols().find("null").unwrap()).unwrap();

    assert!(ev.force_bool(t).unwrap());
    assert_eq!(ev.kind(null), Kind::Null);
}
