#![allow(
    clippy::unwrap_used,
    reason = "test code uses unwrap for concise assertions"
)]

use super::*;
use crate::errors::EvalErrorKind;
use pretty_assertions::assert_eq;

fn global(ev: &mut Evaluator, name: &str) -> ValueId {
    let set = ev.force_attrs(ev.builtins()).unwrap();
    let symbol = ev.symbols().find(name).unwrap();
    set.get(symbol).unwrap()
}

fn int(ev: &mut Evaluator, n: i64) -> ValueId {
    ev.alloc(Shape::Int(n))
}

#[test]
fn test_force_realized_is_idempotent() {
    let mut ev = Evaluator::new();
    let v = int(&mut ev, 4);

    ev.force(v).unwrap();
    ev.force(v).unwrap();
    assert_eq!(ev.force_int(v).unwrap(), 4);
}

#[test]
fn test_force_lazy_apply() {
    let mut ev = Evaluator::new();
    let add = global(&mut ev, "add");
    let a = int(&mut ev, 2);
    let b = int(&mut ev, 3);
    let out = ev.alloc_blank();

    ev.write_lazy_apply(out, add, &[a, b]);
    assert_eq!(ev.kind(out), Kind::Thunk);

    ev.force(out).unwrap();
    assert_eq!(ev.kind(out), Kind::Int);
    assert_eq!(ev.force_int(out).unwrap(), 5);
}

#[test]
fn test_force_blank_is_uninitialised() {
    let mut ev = Evaluator::new();
    let v = ev.alloc_blank();
    let err = ev.force(v).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::Uninitialised);
}

#[test]
fn test_failed_force_restores_thunk() {
    let mut ev = Evaluator::new();
    let throw = global(&mut ev, "throw");
    let msg = ev.alloc(Shape::string("boom"));
    let v = ev.alloc_thunk(Thunk::Apply {
        func: throw,
        args: Arc::from([msg]),
    });

    let err = ev.force(v).unwrap_err();
    assert_eq!(err.message, "boom");
    assert!(matches!(ev.cell(v), Cell::Thunk(_)));

    let again = ev.force(v).unwrap_err();
    assert_eq!(again.message, "boom");
}

#[test]
fn test_self_dependency_is_infinite_recursion() {
    let mut ev = Evaluator::new();
    let seq = global(&mut ev, "seq");
    let v = ev.alloc_blank();
    let one = int(&mut ev, 1);
    ev.write_lazy_apply(v, seq, &[v, one]);

    let err = ev.force(v).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::InfiniteRecursion);
    assert!(matches!(ev.cell(v), Cell::Thunk(_)));
}

#[test]
fn test_depth_limit_reports_stack_overflow() {
    let mut ev = Evaluator::with_config(EvalConfig::default().with_max_depth(8));
    let seq = global(&mut ev, "seq");
    let mut v = int(&mut ev, 0);
    for _ in 0..20 {
        let next = ev.alloc_blank();
        ev.write_lazy_apply(next, seq, &[v, v]);
        v = next;
    }

    let err = ev.force(v).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::StackOverflow { depth: 8 });
}

#[test]
fn test_partial_application() {
    let mut ev = Evaluator::new();
    let add = global(&mut ev, "add");
    let a = int(&mut ev, 10);
    let b = int(&mut ev, 5);

    let partial = ev.alloc_blank();
    ev.apply(add, &[a], partial).unwrap();
    assert_eq!(ev.kind(partial), Kind::Function);

    let out = ev.alloc_blank();
    ev.apply(partial, &[b], out).unwrap();
    assert_eq!(ev.force_int(out).unwrap(), 15);
}

#[test]
fn test_over_application() {
    let mut ev = Evaluator::new();
    let curried = ev.register_primop("curriedAdd", 1, |ev, args| {
        let add = ev.intern("add");
        let builtins = ev.force_attrs(ev.builtins())?;
        let add = builtins.get(add).unwrap();
        ev.call(add, args)
    });
    let a = int(&mut ev, 1);
    let b = int(&mut ev, 2);
    let out = ev.alloc_blank();

    ev.apply(curried, &[a, b], out).unwrap();
    assert_eq!(ev.force_int(out).unwrap(), 3);
}

#[test]
fn test_applying_non_function_fails() {
    let mut ev = Evaluator::new();
    let f = int(&mut ev, 1);
    let out = ev.alloc_blank();

    let err = ev.apply(f, &[f], out).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::NotCallable { got: Kind::Int });
    assert_eq!(ev.kind(out), Kind::Thunk);
}

#[test]
#[should_panic(expected = "already realized")]
fn test_write_to_realized_panics() {
    let mut ev = Evaluator::new();
    let v = int(&mut ev, 1);
    ev.realize(v, Shape::Null);
}

#[test]
fn test_registered_primop_is_global() {
    let mut ev = Evaluator::new();
    ev.register_primop("double", 1, |ev, args| Ok(Shape::Int(ev.force_int(args[0])? * 2)));
    let double = global(&mut ev, "double");
    let x = int(&mut ev, 21);
    let out = ev.alloc_blank();

    ev.apply(double, &[x], out).unwrap();
    assert_eq!(ev.force_int(out).unwrap(), 42);
}

#[test]
fn test_builtins_survive_collection() {
    let mut ev = Evaluator::new();
    ev.collect_garbage();
    let add = global(&mut ev, "add");
    assert!(ev.is_live(add));
}

#[test]
fn test_keep_alive_survives_collection() {
    let mut ev = Evaluator::new();
    let kept = int(&mut ev, 1);
    let dropped = int(&mut ev, 2);
    ev.keep_alive(kept);

    ev.collect_garbage();
    assert!(ev.is_live(kept));
    assert!(!ev.is_live(dropped));

    ev.release(kept);
    ev.collect_garbage();
    assert!(!ev.is_live(kept));
}

#[test]
fn test_force_and_apply_never_collect() {
    let mut ev = Evaluator::with_config(EvalConfig::default().with_gc_threshold(1));
    let add = global(&mut ev, "add");
    let a = int(&mut ev, 2);
    let out = ev.alloc_blank();
    let scratch: Vec<ValueId> = (0..5000).map(|n| int(&mut ev, n)).collect();

    let x = ev.alloc_blank();
    ev.write_lazy_apply(x, add, &[a, a]);
    ev.force(x).unwrap();
    assert!(ev.is_live(out));

    ev.apply(add, &[x, x], out).unwrap();
    assert_eq!(ev.force_int(out).unwrap(), 8);
    assert!(scratch.iter().all(|&id| ev.is_live(id)));
    assert_eq!(ev.gc_stats().runs, 0);
}

#[test]
fn test_collect_if_due_follows_threshold() {
    let mut ev = Evaluator::with_config(EvalConfig::default().with_gc_threshold(1_000_000));
    let dropped = int(&mut ev, 1);
    assert_eq!(ev.collect_garbage_if_due(), None);
    assert!(ev.is_live(dropped));

    let mut ev = Evaluator::with_config(EvalConfig::default().with_gc_threshold(1));
    let dropped = int(&mut ev, 1);
    assert!(ev.collect_garbage_if_due().is_some_and(|freed| freed >= 1));
    assert!(!ev.is_live(dropped));
    // The cycle reset the allocation count.
    assert_eq!(ev.collect_garbage_if_due(), None);
}

#[test]
fn test_no_collection_inside_primop() {
    let mut ev = Evaluator::with_config(EvalConfig::default().with_gc_threshold(1));
    let build = ev.register_primop("pairOf", 1, |ev, args| {
        let first = ev.alloc(Shape::Int(1));
        // Nothing allocated here may be collected before the primop returns.
        ev.force(args[0])?;
        Ok(Shape::List(List::new(vec![first, args[0]])))
    });
    let add = global(&mut ev, "add");
    let one = int(&mut ev, 1);
    let x = ev.alloc_blank();
    ev.write_lazy_apply(x, add, &[one, one]);
    let out = ev.alloc_blank();

    ev.apply(build, &[x], out).unwrap();
    let list = ev.force_list(out).unwrap();
    assert!(ev.is_live(list.get(0).unwrap()));
    assert_eq!(ev.force_int(list.get(1).unwrap()).unwrap(), 2);
}

#[test]
fn test_recover_resets_forcing_cells() {
    let mut ev = Evaluator::new();
    let explode = ev.register_primop("explode", 1, |_, _| panic!("primop exploded"));
    let x = int(&mut ev, 1);
    let v = ev.alloc_blank();
    ev.write_lazy_apply(v, explode, &[x]);

    let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| ev.force(v)));
    assert!(unwound.is_err());
    assert!(matches!(ev.cell(v), Cell::Forcing(_)));

    assert_eq!(ev.recover(), 1);
    assert!(matches!(ev.cell(v), Cell::Thunk(_)));
}

#[test]
fn test_force_thunk_twice_runs_body_once() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut ev = Evaluator::new();
    let counted = ev.register_primop("counted", 1, move |ev, args| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Shape::Int(ev.force_int(args[0])? * 10))
    });
    let x = int(&mut ev, 4);
    let v = ev.alloc_blank();
    ev.write_lazy_apply(v, counted, &[x]);

    ev.force(v).unwrap();
    ev.force(v).unwrap();

    assert_eq!(ev.kind(v), Kind::Int);
    assert_eq!(ev.force_int(v).unwrap(), 40);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_replaced_global_stays_live() {
    let mut ev = Evaluator::new();
    let first = ev.register_primop("twice", 1, |ev, args| {
        Ok(Shape::Int(ev.force_int(args[0])? * 2))
    });
    let snapshot = ev.force_attrs(ev.builtins()).unwrap();
    let second = ev.register_primop("twice", 1, |ev, args| {
        Ok(Shape::Int(ev.force_int(args[0])? + 2))
    });

    ev.collect_garbage();

    assert!(ev.is_live(first));
    assert!(ev.is_live(second));
    let symbol = ev.symbols().find("twice").unwrap();
    assert_eq!(snapshot.get(symbol), Some(first));
    assert_eq!(global(&mut ev, "twice"), second);
}
