//! The global namespace.
//!
//! Every builtin receives its arguments unevaluated and forces only what it
//! needs. Builtins that return an existing value (`getAttr`, `elemAt`,
//! `seq`) force it and return a copy of its shape.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::errors::{
    aborted, division_by_zero, index_out_of_bounds, integer_overflow, missing_attribute, thrown,
    type_mismatch, EvalResult,
};
use crate::eval::Evaluator;
use crate::value::{List, Shape, Thunk, ValueId};

type Builtin = fn(&mut Evaluator, &[ValueId]) -> EvalResult<Shape>;

const PRIMOPS: &[(&str, usize, Builtin)] = &[
    ("add", 2, add),
    ("sub", 2, sub),
    ("mul", 2, mul),
    ("div", 2, div),
    ("lessThan", 2, less_than),
    ("getAttr", 2, get_attr),
    ("hasAttr", 2, has_attr),
    ("attrNames", 1, attr_names),
    ("attrValues", 1, attr_values),
    ("length", 1, length),
    ("elemAt", 2, elem_at),
    ("map", 2, map),
    ("seq", 2, seq),
    ("throw", 1, throw),
    ("abort", 1, abort),
    ("typeOf", 1, type_of),
    ("toString", 1, to_string),
];

/// Populate the global namespace of a fresh evaluator.
pub(crate) fn install(ev: &mut Evaluator) {
    for &(name, arity, body) in PRIMOPS {
        ev.register_primop(name, arity, body);
    }
    for (name, shape) in [
        ("true", Shape::Bool(true)),
        ("false", Shape::Bool(false)),
        ("null", Shape::Null),
    ] {
        let id = ev.alloc(shape);
        ev.bind_global(name, id);
    }
}

// Arithmetic

#[derive(Copy, Clone, Debug, PartialEq)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    #[expect(clippy::cast_precision_loss, reason = "int to float promotion is the numeric rule")]
    fn as_float(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(x) => x,
        }
    }

    fn into_shape(self) -> Shape {
        match self {
            Num::Int(n) => Shape::Int(n),
            Num::Float(x) => Shape::Float(x),
        }
    }
}

fn to_num(shape: Shape) -> EvalResult<Num> {
    match shape {
        Shape::Int(n) => Ok(Num::Int(n)),
        Shape::Float(x) => Ok(Num::Float(x)),
        other => Err(type_mismatch("a number", other.kind())),
    }
}

fn force_num(ev: &mut Evaluator, id: ValueId) -> EvalResult<Num> {
    to_num(ev.force_shape(id)?)
}

fn arith(
    ev: &mut Evaluator,
    args: &[ValueId],
    operation: &'static str,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> EvalResult<Shape> {
    let lhs = force_num(ev, args[0])?;
    let rhs = force_num(ev, args[1])?;
    let result = match (lhs, rhs) {
        (Num::Int(a), Num::Int(b)) => {
            Num::Int(int_op(a, b).ok_or_else(|| integer_overflow(operation))?)
        }
        (a, b) => Num::Float(float_op(a.as_float(), b.as_float())),
    };
    Ok(result.into_shape())
}

fn add(ev: &mut Evaluator, args: &[ValueId]) -> EvalResult<Shape> {
    arith(ev, args, "addition", i64::checked_add, |a, b| a + b)
}

fn sub(ev: &mut Evaluator, args: &[ValueId]) -> EvalResult<Shape> {
    arith(ev, args, "subtraction", i64::checked_sub, |a, b| a - b)
}

fn mul(ev: &mut Evaluator, args: &[ValueId]) -> EvalResult<Shape> {
    arith(ev, args, "multiplication", i64::checked_mul, |a, b| a * b)
}

fn div(ev: &mut Evaluator, args: &[ValueId]) -> EvalResult<Shape> {
    let divisor = force_num(ev, args[1])?;
    let is_zero = match divisor {
        Num::Int(n) => n == 0,
        Num::Float(x) => x == 0.0,
    };
    if is_zero {
        return Err(division_by_zero());
    }
    arith(ev, args, "division", i64::checked_div, |a, b| a / b)
}

fn less_than(ev: &mut Evaluator, args: &[ValueId]) -> EvalResult<Shape> {
    let lhs = ev.force_shape(args[0])?;
    let rhs = ev.force_shape(args[1])?;
    let less = match (lhs, rhs) {
        (Shape::String(a), Shape::String(b)) | (Shape::Path(a), Shape::Path(b)) => {
            a.cmp(&b) == Ordering::Less
        }
        (Shape::Int(a), Shape::Int(b)) => a < b,
        (a, b) => to_num(a)?.as_float() < to_num(b)?.as_float(),
    };
    Ok(Shape::Bool(less))
}

// Attribute sets

fn get_attr(ev: &mut Evaluator, args: &[ValueId]) -> EvalResult<Shape> {
    let name = ev.force_string(args[0])?;
    let set = ev.force_attrs(args[1])?;
    let value = ev
        .symbols()
        .find(&name)
        .and_then(|symbol| set.get(symbol))
        .ok_or_else(|| missing_attribute(&*name))?;
    ev.force_shape(value)
}

fn has_attr(ev: &mut Evaluator, args: &[ValueId]) -> EvalResult<Shape> {
    let name = ev.force_string(args[0])?;
    let set = ev.force_attrs(args[1])?;
    let present = ev
        .symbols()
        .find(&name)
        .is_some_and(|symbol| set.get(symbol).is_some());
    Ok(Shape::Bool(present))
}

/// Attributes of a set sorted by name text.
fn sorted_by_name(ev: &mut Evaluator, id: ValueId) -> EvalResult<Vec<(Arc<str>, ValueId)>> {
    let set = ev.force_attrs(id)?;
    let symbols = ev.symbols();
    let mut entries: Vec<(Arc<str>, ValueId)> = set
        .iter()
        .map(|attr| (symbols.name_arc(attr.name), attr.value))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}

fn attr_names(ev: &mut Evaluator, args: &[ValueId]) -> EvalResult<Shape> {
    let entries = sorted_by_name(ev, args[0])?;
    let items = entries
        .into_iter()
        .map(|(name, _)| ev.alloc(Shape::String(name)))
        .collect();
    Ok(Shape::List(List::new(items)))
}

fn attr_values(ev: &mut Evaluator, args: &[ValueId]) -> EvalResult<Shape> {
    let entries = sorted_by_name(ev, args[0])?;
    let items = entries.into_iter().map(|(_, value)| value).collect();
    Ok(Shape::List(List::new(items)))
}

// Lists

fn length(ev: &mut Evaluator, args: &[ValueId]) -> EvalResult<Shape> {
    let list = ev.force_list(args[0])?;
    let len = i64::try_from(list.len()).map_err(|_| integer_overflow("length"))?;
    Ok(Shape::Int(len))
}

fn elem_at(ev: &mut Evaluator, args: &[ValueId]) -> EvalResult<Shape> {
    let list = ev.force_list(args[0])?;
    let index = ev.force_int(args[1])?;
    let item = usize::try_from(index)
        .ok()
        .and_then(|idx| list.get(idx))
        .ok_or_else(|| index_out_of_bounds(index, list.len()))?;
    ev.force_shape(item)
}

fn map(ev: &mut Evaluator, args: &[ValueId]) -> EvalResult<Shape> {
    let func = args[0];
    let list = ev.force_list(args[1])?;
    let items = list
        .as_slice()
        .iter()
        .map(|&item| {
            ev.alloc_thunk(Thunk::Apply {
                func,
                args: Arc::from([item]),
            })
        })
        .collect();
    Ok(Shape::List(List::new(items)))
}

// Control

fn seq(ev: &mut Evaluator, args: &[ValueId]) -> EvalResult<Shape> {
    ev.force(args[0])?;
    ev.force_shape(args[1])
}

fn throw(ev: &mut Evaluator, args: &[ValueId]) -> EvalResult<Shape> {
    let message = ev.force_string(args[0])?;
    Err(thrown(&*message))
}

fn abort(ev: &mut Evaluator, args: &[ValueId]) -> EvalResult<Shape> {
    let message = ev.force_string(args[0])?;
    Err(aborted(&*message))
}

// Reflection

fn type_of(ev: &mut Evaluator, args: &[ValueId]) -> EvalResult<Shape> {
    let kind = ev.force_shape(args[0])?.kind();
    Ok(Shape::string(kind.name()))
}

fn to_string(ev: &mut Evaluator, args: &[ValueId]) -> EvalResult<Shape> {
    let text = coerce_to_string(ev, args[0])?;
    Ok(Shape::String(text))
}

fn coerce_to_string(ev: &mut Evaluator, id: ValueId) -> EvalResult<Arc<str>> {
    let text: Arc<str> = match ev.force_shape(id)? {
        Shape::String(s) | Shape::Path(s) => s,
        Shape::Int(n) => n.to_string().into(),
        Shape::Float(x) => format!("{x:.6}").into(),
        Shape::Bool(true) => "1".into(),
        Shape::Bool(false) | Shape::Null => "".into(),
        Shape::List(list) => {
            let mut parts = Vec::with_capacity(list.len());
            for &item in list.as_slice() {
                parts.push(coerce_to_string(ev, item)?);
            }
            parts.join(" ").into()
        }
        other @ (Shape::Attrs(_) | Shape::Function(_)) => {
            return Err(type_mismatch("a value coercible to a string", other.kind()));
        }
    };
    Ok(text)
}

#[cfg(test)]
mod tests;
