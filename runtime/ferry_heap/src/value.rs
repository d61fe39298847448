//! Heap cells and the realized shapes they settle into.
//!
//! A [`ValueId`] names one cell. A cell starts blank (freshly allocated)
//! or as a thunk, and is realized at most once into a [`Shape`]; it never
//! goes back. Composite shapes (`AttrSet`, `List`, partial applications)
//! refer to other cells by `ValueId`, which is what the collector traces.

use std::fmt;
use std::sync::Arc;

use crate::errors::EvalResult;
use crate::eval::Evaluator;
use crate::symbol::Symbol;

/// Handle to a heap cell.
///
/// Layout: slot index in the low 32 bits, slot generation in the high 32
/// bits. Generations start at 1, so a raw value of 0 never names a cell and
/// the C boundary uses it as "absent".
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ValueId {
    index: u32,
    generation: u32,
}

impl ValueId {
    #[inline]
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        debug_assert!(generation != 0);
        ValueId { index, generation }
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Get the raw `u64` value.
    #[inline]
    pub const fn to_raw(self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }

    /// Create from a raw `u64` value. Returns `None` for 0.
    #[inline]
    pub const fn from_raw(raw: u64) -> Option<Self> {
        let generation = (raw >> 32) as u32;
        if generation == 0 {
            return None;
        }
        Some(ValueId {
            index: raw as u32,
            generation,
        })
    }
}

impl fmt::Debug for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueId(#{}@{})", self.index, self.generation)
    }
}

/// Observable kind of a cell.
///
/// `Thunk` covers every unrealized state; the discriminants are the values
/// reported through the C boundary.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Kind {
    Thunk = 0,
    Int = 1,
    Float = 2,
    Bool = 3,
    String = 4,
    Path = 5,
    Null = 6,
    Attrs = 7,
    List = 8,
    Function = 9,
}

impl Kind {
    /// Name of the kind as the builtins report it (`typeOf`, type errors).
    pub const fn name(self) -> &'static str {
        match self {
            Kind::Thunk => "thunk",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::Bool => "bool",
            Kind::String => "string",
            Kind::Path => "path",
            Kind::Null => "null",
            Kind::Attrs => "set",
            Kind::List => "list",
            Kind::Function => "lambda",
        }
    }

    /// Kind with its article, as used in error messages.
    pub const fn article_name(self) -> &'static str {
        match self {
            Kind::Thunk => "a thunk",
            Kind::Int => "an integer",
            Kind::Float => "a float",
            Kind::Bool => "a Boolean",
            Kind::String => "a string",
            Kind::Path => "a path",
            Kind::Null => "null",
            Kind::Attrs => "a set",
            Kind::List => "a list",
            Kind::Function => "a function",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One attribute of a finalized set.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Attr {
    pub name: Symbol,
    pub value: ValueId,
}

/// Immutable attribute set, sorted by symbol.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AttrSet(Arc<[Attr]>);

impl AttrSet {
    /// Build a set from unordered attributes.
    ///
    /// Duplicate names keep the entry that appears last in `attrs`.
    pub fn from_unsorted(mut attrs: Vec<Attr>) -> Self {
        // Stable sort keeps insertion order among equal names, so the
        // last one of each run is the latest write.
        attrs.sort_by_key(|attr| attr.name);
        let mut deduped: Vec<Attr> = Vec::with_capacity(attrs.len());
        for attr in attrs {
            match deduped.last_mut() {
                Some(last) if last.name == attr.name => *last = attr,
                _ => deduped.push(attr),
            }
        }
        AttrSet(deduped.into())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, name: Symbol) -> Option<ValueId> {
        self.0
            .binary_search_by_key(&name, |attr| attr.name)
            .ok()
            .map(|idx| self.0[idx].value)
    }

    /// Attribute at a canonical position.
    pub fn at(&self, position: usize) -> Option<Attr> {
        self.0.get(position).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Attr> + '_ {
        self.0.iter().copied()
    }
}

impl fmt::Debug for AttrSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.iter().map(|attr| (attr.name, attr.value)))
            .finish()
    }
}

/// Immutable ordered sequence of cells.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct List(Arc<[ValueId]>);

impl List {
    pub fn new(items: Vec<ValueId>) -> Self {
        List(items.into())
    }

    pub fn get(&self, index: usize) -> Option<ValueId> {
        self.0.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[ValueId] {
        &self.0
    }
}

/// Body of a primitive operation.
///
/// Receives exactly `arity` lazy arguments and produces the realized shape
/// of the application. Arguments must be forced explicitly.
pub type PrimOpFn = dyn Fn(&mut Evaluator, &[ValueId]) -> EvalResult<Shape> + Send + Sync;

/// A named primitive with a fixed arity.
#[derive(Clone)]
pub struct PrimOp {
    name: Arc<str>,
    arity: usize,
    body: Arc<PrimOpFn>,
}

impl PrimOp {
    /// # Panics
    /// Panics if `arity` is zero; nullary primitives are plain values.
    pub fn new(
        name: impl Into<Arc<str>>,
        arity: usize,
        body: impl Fn(&mut Evaluator, &[ValueId]) -> EvalResult<Shape> + Send + Sync + 'static,
    ) -> Self {
        let name = name.into();
        assert!(arity > 0, "primop '{name}' must take at least one argument");
        PrimOp {
            name,
            arity,
            body: Arc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub(crate) fn invoke(&self, ev: &mut Evaluator, args: &[ValueId]) -> EvalResult<Shape> {
        debug_assert_eq!(args.len(), self.arity);
        (self.body)(ev, args)
    }
}

impl fmt::Debug for PrimOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<primop {}/{}>", self.name, self.arity)
    }
}

/// Callable shapes.
#[derive(Clone, Debug)]
pub enum Function {
    PrimOp(PrimOp),
    /// A primop applied to fewer arguments than its arity.
    Partial { op: PrimOp, bound: Arc<[ValueId]> },
}

impl Function {
    /// Arguments still needed before the primop runs.
    pub fn remaining_arity(&self) -> usize {
        match self {
            Function::PrimOp(op) => op.arity(),
            Function::Partial { op, bound } => op.arity() - bound.len(),
        }
    }
}

/// Realized value.
#[derive(Clone, Debug)]
pub enum Shape {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Arc<str>),
    Path(Arc<str>),
    Attrs(AttrSet),
    List(List),
    Function(Function),
}

impl Shape {
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Shape::String(s.into())
    }

    pub fn kind(&self) -> Kind {
        match self {
            Shape::Null => Kind::Null,
            Shape::Bool(_) => Kind::Bool,
            Shape::Int(_) => Kind::Int,
            Shape::Float(_) => Kind::Float,
            Shape::String(_) => Kind::String,
            Shape::Path(_) => Kind::Path,
            Shape::Attrs(_) => Kind::Attrs,
            Shape::List(_) => Kind::List,
            Shape::Function(_) => Kind::Function,
        }
    }

    /// Cells this shape keeps reachable.
    pub(crate) fn for_each_child(&self, mut f: impl FnMut(ValueId)) {
        match self {
            Shape::Attrs(set) => set.iter().for_each(|attr| f(attr.value)),
            Shape::List(list) => list.as_slice().iter().copied().for_each(f),
            Shape::Function(Function::Partial { bound, .. }) => bound.iter().copied().for_each(f),
            Shape::Null
            | Shape::Bool(_)
            | Shape::Int(_)
            | Shape::Float(_)
            | Shape::String(_)
            | Shape::Path(_)
            | Shape::Function(Function::PrimOp(_)) => {}
        }
    }
}

/// Deferred computation.
#[derive(Clone, Debug)]
pub enum Thunk {
    /// Apply `func` to `args` when forced.
    Apply { func: ValueId, args: Arc<[ValueId]> },
}

impl Thunk {
    pub(crate) fn for_each_child(&self, mut f: impl FnMut(ValueId)) {
        match self {
            Thunk::Apply { func, args } => {
                f(*func);
                args.iter().copied().for_each(f);
            }
        }
    }
}

/// State of one heap cell.
#[derive(Clone, Debug)]
pub enum Cell {
    /// Allocated but never written.
    Blank,
    Thunk(Thunk),
    /// Being forced. Reaching it again means the value depends on itself.
    Forcing(Thunk),
    Realized(Shape),
}

impl Cell {
    pub fn kind(&self) -> Kind {
        match self {
            Cell::Realized(shape) => shape.kind(),
            Cell::Blank | Cell::Thunk(_) | Cell::Forcing(_) => Kind::Thunk,
        }
    }

    pub fn is_realized(&self) -> bool {
        matches!(self, Cell::Realized(_))
    }

    pub(crate) fn for_each_child(&self, f: impl FnMut(ValueId)) {
        match self {
            Cell::Blank => {}
            Cell::Thunk(thunk) | Cell::Forcing(thunk) => thunk.for_each_child(f),
            Cell::Realized(shape) => shape.for_each_child(f),
        }
    }
}
