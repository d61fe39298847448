//! The evaluator: forcing, application, and the global namespace.
//!
//! # Collection
//!
//! Collection only happens when the host asks for it, through
//! [`Evaluator::collect_garbage`] or [`Evaluator::collect_garbage_if_due`],
//! and never while evaluation is running. Handles the host holds between
//! those calls stay valid without registration; only handles that must
//! survive an explicit collection need [`Evaluator::keep_alive`].
//!
//! # Blackholing
//!
//! A thunk is replaced by `Cell::Forcing` while it is evaluated. Reaching a
//! `Forcing` cell again is reported as infinite recursion. If evaluation
//! fails the thunk is put back, so the value can be forced again later.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::builtins;
use crate::config::EvalConfig;
use crate::errors::{
    infinite_recursion, not_callable, stack_overflow, type_mismatch, uninitialised, EvalResult,
};
use crate::heap::{GcStats, Heap};
use crate::stack::ensure_sufficient_stack;
use crate::symbol::{InternError, Symbol, SymbolTable};
use crate::value::{Attr, AttrSet, Cell, Function, Kind, List, PrimOp, Shape, Thunk, ValueId};

/// An embedded lazy evaluator with its own heap and name table.
pub struct Evaluator {
    heap: Heap,
    symbols: SymbolTable,
    config: EvalConfig,
    /// The global namespace; permanently rooted.
    builtins: ValueId,
    /// Nesting of thunk forces, bounded by `config.max_depth`.
    depth: usize,
    /// Nesting of `force`/`apply` calls. Zero means no evaluation is running.
    entered: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("config", &self.config)
            .field("symbols", &self.symbols.len())
            .field("heap", &self.heap.stats())
            .finish_non_exhaustive()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self::with_config(EvalConfig::default())
    }

    pub fn with_config(config: EvalConfig) -> Self {
        let mut heap = Heap::new();
        let builtins = heap.alloc(Cell::Realized(Shape::Attrs(AttrSet::empty())));
        heap.add_root(builtins);

        let mut ev = Evaluator {
            heap,
            symbols: SymbolTable::new(),
            config,
            builtins,
            depth: 0,
            entered: 0,
        };
        builtins::install(&mut ev);
        tracing::debug!(?config, "evaluator created");
        ev
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    // Symbols

    pub fn intern(&mut self, name: &str) -> Symbol {
        self.symbols.intern(name)
    }

    pub fn try_intern(&mut self, name: &str) -> Result<Symbol, InternError> {
        self.symbols.try_intern(name)
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    // Cells

    /// Allocate a cell that must be written before it is forced.
    pub fn alloc_blank(&mut self) -> ValueId {
        self.heap.alloc(Cell::Blank)
    }

    /// Allocate an already realized cell.
    pub fn alloc(&mut self, shape: Shape) -> ValueId {
        self.heap.alloc(Cell::Realized(shape))
    }

    pub fn alloc_thunk(&mut self, thunk: Thunk) -> ValueId {
        self.heap.alloc(Cell::Thunk(thunk))
    }

    pub fn cell(&self, id: ValueId) -> &Cell {
        self.heap.cell(id)
    }

    /// # Panics
    /// Panics with "stale value handle" if `id` was collected.
    #[track_caller]
    pub fn assert_live(&self, id: ValueId) {
        self.heap.assert_live(id);
    }

    pub fn kind(&self, id: ValueId) -> Kind {
        self.heap.cell(id).kind()
    }

    /// Realized shape of `id`, or `None` while it is unrealized.
    pub fn shape(&self, id: ValueId) -> Option<&Shape> {
        match self.heap.cell(id) {
            Cell::Realized(shape) => Some(shape),
            Cell::Blank | Cell::Thunk(_) | Cell::Forcing(_) => None,
        }
    }

    /// Panic unless `id` is live and may still be written.
    ///
    /// # Panics
    /// Panics if `id` is stale, already realized, or being forced.
    #[track_caller]
    pub fn check_writable(&self, id: ValueId) {
        match self.heap.cell(id) {
            Cell::Blank | Cell::Thunk(_) => {}
            Cell::Realized(shape) => {
                panic!("value handle {id:?} is already realized as {}", shape.kind())
            }
            Cell::Forcing(_) => panic!("value handle {id:?} is being forced"),
        }
    }

    /// Write the final shape of an unrealized cell.
    ///
    /// # Panics
    /// Panics if `id` is not writable (see [`Evaluator::check_writable`]).
    #[track_caller]
    pub fn realize(&mut self, id: ValueId, shape: Shape) {
        self.check_writable(id);
        self.heap.replace(id, Cell::Realized(shape));
    }

    /// Store a deferred application of `func` to `args` in `id`.
    ///
    /// # Panics
    /// Panics if `id` is not writable.
    #[track_caller]
    pub fn write_lazy_apply(&mut self, id: ValueId, func: ValueId, args: &[ValueId]) {
        self.check_writable(id);
        self.assert_live(func);
        for &arg in args {
            self.assert_live(arg);
        }
        self.heap.replace(
            id,
            Cell::Thunk(Thunk::Apply {
                func,
                args: args.into(),
            }),
        );
    }

    // Evaluation

    /// Realize `id`. A no-op if it is already realized.
    ///
    /// On failure the cell keeps its thunk and may be forced again.
    #[tracing::instrument(level = "debug", skip_all, fields(value = ?id))]
    pub fn force(&mut self, id: ValueId) -> EvalResult {
        if self.heap.cell(id).is_realized() {
            return Ok(());
        }
        self.entered += 1;
        let result = self.force_cell(id);
        self.entered -= 1;
        result
    }

    /// Apply `func` to all of `args` and realize `out` with the result.
    ///
    /// On failure `out` is left unrealized.
    ///
    /// # Panics
    /// Panics if any handle is stale or `out` is not writable.
    #[tracing::instrument(level = "debug", skip_all, fields(args = args.len()))]
    pub fn apply(&mut self, func: ValueId, args: &[ValueId], out: ValueId) -> EvalResult {
        self.check_writable(out);
        self.assert_live(func);
        for &arg in args {
            self.assert_live(arg);
        }

        self.entered += 1;
        let result = self.call(func, args);
        self.entered -= 1;

        self.realize(out, result?);
        Ok(())
    }

    /// Apply `func` to `args` and return the resulting shape.
    pub fn call(&mut self, func: ValueId, args: &[ValueId]) -> EvalResult<Shape> {
        match self.force_shape(func)? {
            Shape::Function(function) => self.call_function(function, args),
            other => Err(not_callable(other.kind())),
        }
    }

    /// Force `id` and return a copy of its shape.
    pub fn force_shape(&mut self, id: ValueId) -> EvalResult<Shape> {
        self.force(id)?;
        match self.heap.cell(id) {
            Cell::Realized(shape) => Ok(shape.clone()),
            Cell::Blank | Cell::Thunk(_) | Cell::Forcing(_) => Err(uninitialised()),
        }
    }

    pub fn force_bool(&mut self, id: ValueId) -> EvalResult<bool> {
        match self.force_shape(id)? {
            Shape::Bool(b) => Ok(b),
            other => Err(type_mismatch("a Boolean", other.kind())),
        }
    }

    pub fn force_int(&mut self, id: ValueId) -> EvalResult<i64> {
        match self.force_shape(id)? {
            Shape::Int(n) => Ok(n),
            other => Err(type_mismatch("an integer", other.kind())),
        }
    }

    pub fn force_float(&mut self, id: ValueId) -> EvalResult<f64> {
        match self.force_shape(id)? {
            Shape::Float(x) => Ok(x),
            other => Err(type_mismatch("a float", other.kind())),
        }
    }

    pub fn force_string(&mut self, id: ValueId) -> EvalResult<Arc<str>> {
        match self.force_shape(id)? {
            Shape::String(s) => Ok(s),
            other => Err(type_mismatch("a string", other.kind())),
        }
    }

    pub fn force_path(&mut self, id: ValueId) -> EvalResult<Arc<str>> {
        match self.force_shape(id)? {
            Shape::Path(p) => Ok(p),
            other => Err(type_mismatch("a path", other.kind())),
        }
    }

    pub fn force_attrs(&mut self, id: ValueId) -> EvalResult<AttrSet> {
        match self.force_shape(id)? {
            Shape::Attrs(set) => Ok(set),
            other => Err(type_mismatch("a set", other.kind())),
        }
    }

    pub fn force_list(&mut self, id: ValueId) -> EvalResult<List> {
        match self.force_shape(id)? {
            Shape::List(list) => Ok(list),
            other => Err(type_mismatch("a list", other.kind())),
        }
    }

    /// Repair state left behind by a panic that unwound out of evaluation.
    ///
    /// Cells caught mid-force get their thunk back and the nesting counters
    /// are reset. Returns the number of repaired cells.
    pub fn recover(&mut self) -> usize {
        let mut repaired = 0;
        for cell in self.heap.cells_mut() {
            if let Cell::Forcing(thunk) = cell {
                *cell = Cell::Thunk(thunk.clone());
                repaired += 1;
            }
        }
        self.depth = 0;
        self.entered = 0;
        if repaired > 0 {
            tracing::debug!(repaired, "recovered evaluator after unwind");
        }
        repaired
    }

    // Namespace

    /// The global namespace attribute set.
    pub fn builtins(&self) -> ValueId {
        self.builtins
    }

    /// Add a foreign primitive to the global namespace.
    ///
    /// Returns the handle of the new function value. A later registration
    /// under the same name replaces the earlier one in the namespace; the
    /// earlier value stays live.
    pub fn register_primop(
        &mut self,
        name: &str,
        arity: usize,
        body: impl Fn(&mut Evaluator, &[ValueId]) -> EvalResult<Shape> + Send + Sync + 'static,
    ) -> ValueId {
        let op = PrimOp::new(name, arity, body);
        let id = self.alloc(Shape::Function(Function::PrimOp(op)));
        self.bind_global(name, id);
        id
    }

    /// Add `name` to the namespace cell.
    ///
    /// The namespace is the one cell that is rewritten after it is realized.
    /// A value displaced by a new binding stays rooted, so snapshots of the
    /// namespace taken earlier never hand out a collected handle.
    pub(crate) fn bind_global(&mut self, name: &str, value: ValueId) {
        let name = self.symbols.intern(name);
        let current = match self.heap.cell(self.builtins) {
            Cell::Realized(Shape::Attrs(set)) => set.clone(),
            _ => AttrSet::empty(),
        };
        if let Some(displaced) = current.get(name) {
            self.heap.add_root(displaced);
        }
        let attrs = current
            .iter()
            .chain(std::iter::once(Attr { name, value }))
            .collect();
        self.heap.replace(
            self.builtins,
            Cell::Realized(Shape::Attrs(AttrSet::from_unsorted(attrs))),
        );
    }

    // Lifetime

    pub fn is_live(&self, id: ValueId) -> bool {
        self.heap.is_live(id)
    }

    /// Register an extra root for `id`. Registrations are counted.
    pub fn keep_alive(&mut self, id: ValueId) {
        self.heap.add_root(id);
    }

    /// Drop one registration made by [`Evaluator::keep_alive`].
    pub fn release(&mut self, id: ValueId) {
        self.heap.remove_root(id);
    }

    /// Keep-alive registrations currently held for `id`.
    pub fn root_count(&self, id: ValueId) -> usize {
        self.heap.root_count(id)
    }

    /// Run a collection cycle now. Returns the number of reclaimed cells.
    ///
    /// # Panics
    /// Panics if called while evaluation is running (from inside a primop).
    pub fn collect_garbage(&mut self) -> usize {
        assert!(
            self.entered == 0,
            "garbage collection requested during evaluation"
        );
        self.heap.collect()
    }

    /// Collect if at least `gc_threshold` cells were allocated since the
    /// last cycle. Returns the number of reclaimed cells when a cycle ran.
    ///
    /// # Panics
    /// Panics if called while evaluation is running.
    pub fn collect_garbage_if_due(&mut self) -> Option<usize> {
        if self.heap.allocs_since_gc() < self.config.gc_threshold {
            return None;
        }
        Some(self.collect_garbage())
    }

    pub fn gc_stats(&self) -> GcStats {
        self.heap.stats()
    }

    fn force_cell(&mut self, id: ValueId) -> EvalResult {
        let thunk = match self.heap.cell(id) {
            Cell::Realized(_) => return Ok(()),
            Cell::Blank => return Err(uninitialised()),
            Cell::Forcing(_) => return Err(infinite_recursion()),
            Cell::Thunk(thunk) => thunk.clone(),
        };
        if self.depth >= self.config.max_depth {
            return Err(stack_overflow(self.config.max_depth));
        }

        self.heap.replace(id, Cell::Forcing(thunk.clone()));
        self.depth += 1;
        let result = ensure_sufficient_stack(|| self.eval_thunk(&thunk));
        self.depth -= 1;

        match result {
            Ok(shape) => {
                self.heap.replace(id, Cell::Realized(shape));
                Ok(())
            }
            Err(err) => {
                self.heap.replace(id, Cell::Thunk(thunk));
                Err(err)
            }
        }
    }

    fn eval_thunk(&mut self, thunk: &Thunk) -> EvalResult<Shape> {
        match thunk {
            Thunk::Apply { func, args } => self.call(*func, args),
        }
    }

    /// Saturate `function` with `args`.
    ///
    /// Too few arguments produce a partial application; extra arguments are
    /// applied to the result.
    fn call_function(&mut self, function: Function, args: &[ValueId]) -> EvalResult<Shape> {
        if args.is_empty() {
            return Ok(Shape::Function(function));
        }

        let (op, mut bound): (PrimOp, SmallVec<[ValueId; 4]>) = match function {
            Function::PrimOp(op) => (op, SmallVec::new()),
            Function::Partial { op, bound } => (op, bound.iter().copied().collect()),
        };
        let needed = op.arity() - bound.len();

        if args.len() < needed {
            bound.extend_from_slice(args);
            return Ok(Shape::Function(Function::Partial {
                op,
                bound: Arc::from(&bound[..]),
            }));
        }

        let (now, rest) = args.split_at(needed);
        bound.extend_from_slice(now);
        let result = op.invoke(self, &bound)?;
        if rest.is_empty() {
            return Ok(result);
        }
        match result {
            Shape::Function(next) => ensure_sufficient_stack(|| self.call_function(next, rest)),
            other => Err(not_callable(other.kind())),
        }
    }
}

#[cfg(test)]
mod tests;
