#![allow(
    clippy::unwrap_used,
    reason = "test code uses unwrap for concise assertions"
)]

use super::*;
use crate::error::ErrorCode;
use ferry_heap::{EvalErrorKind, Kind};
use pretty_assertions::assert_eq;

fn builtin(ctx: &Context, name: &str) -> ValueId {
    ctx.lookup_by_name(ctx.global_namespace(), name).unwrap().unwrap()
}

fn int(ctx: &Context, n: i64) -> ValueId {
    let v = ctx.alloc_value();
    ctx.write_int(v, n);
    v
}

#[test]
fn test_add_two_and_three() {
    let ctx = Context::new();
    let add = builtin(&ctx, "add");
    let a = int(&ctx, 2);
    let b = int(&ctx, 3);
    let out = ctx.alloc_value();

    ctx.apply(add, &[a, b], out).unwrap();
    assert_eq!(ctx.kind(out), Kind::Int);
    assert_eq!(ctx.get_int(out).unwrap(), 5);
}

#[test]
fn test_get_attr_on_non_set_fails() {
    let ctx = Context::new();
    let get_attr = builtin(&ctx, "getAttr");
    let name = ctx.alloc_value();
    ctx.write_string(name, "x");
    let not_a_set = int(&ctx, 1);
    let out = ctx.alloc_value();

    let err = ctx.apply(get_attr, &[name, not_a_set], out).unwrap_err();
    assert_eq!(err.code(), ErrorCode::Evaluation);
    assert!(!err.to_string().is_empty());
    assert!(!ctx.is_realized(out));
}

#[test]
fn test_partial_then_saturating_application() {
    let ctx = Context::new();
    let sub = builtin(&ctx, "sub");
    let ten = int(&ctx, 10);
    let four = int(&ctx, 4);

    let partial = ctx.alloc_value();
    ctx.apply(sub, &[ten], partial).unwrap();
    assert_eq!(ctx.kind(partial), Kind::Function);

    let out = ctx.alloc_value();
    ctx.apply(partial, &[four], out).unwrap();
    assert_eq!(ctx.get_int(out).unwrap(), 6);
}

#[test]
fn test_panicking_primop_is_contained() {
    let ctx = Context::new();
    let explode = ctx.register_primop("explode", 1, |_, _| panic!("host callback failed"));
    let arg = int(&ctx, 0);
    let out = ctx.alloc_value();

    let err = ctx.apply(explode, &[arg], out).unwrap_err();
    assert_eq!(
        err,
        BridgeError::Evaluation {
            kind: EvalErrorKind::ForeignPanic {
                message: "host callback failed".to_string(),
            },
            message: "primop panicked: host callback failed".to_string(),
        }
    );
    assert!(!ctx.is_realized(out));

    // The context is still usable.
    let add = builtin(&ctx, "add");
    let next = ctx.alloc_value();
    ctx.apply(add, &[arg, arg], next).unwrap();
    assert_eq!(ctx.get_int(next).unwrap(), 0);
}

#[test]
fn test_panic_inside_lazy_value_is_repaired() {
    let ctx = Context::new();
    let explode = ctx.register_primop("explode", 1, |_, _| panic!("boom"));
    let arg = int(&ctx, 0);
    let lazy = ctx.alloc_value();
    ctx.write_lazy_apply(lazy, explode, &[arg]);

    let err = ctx.force(lazy).unwrap_err();
    assert!(err.to_string().contains("boom"));

    // The cell is a thunk again, not a blackhole.
    let again = ctx.force(lazy).unwrap_err();
    assert!(again.to_string().contains("boom"));
}

#[test]
fn test_registered_primop_receives_lazy_arguments() {
    let ctx = Context::new();
    let first = ctx.register_primop("first", 2, |ev, args| ev.force_shape(args[0]));
    let one = int(&ctx, 1);
    let never = ctx.alloc_value();
    let out = ctx.alloc_value();

    ctx.apply(first, &[one, never], out).unwrap();
    assert_eq!(ctx.get_int(out).unwrap(), 1);
}

#[test]
#[should_panic(expected = "already realized")]
fn test_realized_result_is_contract_violation() {
    let ctx = Context::new();
    let add = builtin(&ctx, "add");
    let a = int(&ctx, 1);
    ctx.apply(add, &[a, a], a).unwrap();
}
