//! Ferry Heap - the embedded lazy evaluator
//!
//! This crate is the evaluator the ferry bridge drives:
//! - `Symbol`/`SymbolTable` for interned attribute names
//! - `ValueId` handles into a generation-checked slot heap
//! - Thunks, blackholing and primop application in `Evaluator`
//! - A mark/sweep collector that runs only when the host asks for it
//! - The global namespace of builtins
//!
//! # Design Philosophy
//!
//! - **Handles, not pointers**: values are `ValueId(index, generation)`, so
//!   a handle that outlived its cell is detected instead of dereferenced.
//! - **Realize once**: a cell goes from unrealized to realized exactly once.
//! - **No hidden collection**: the collector never runs while a primop holds
//!   intermediate handles.

mod builtins;
mod config;
pub mod errors;
mod eval;
mod heap;
mod stack;
mod symbol;
mod value;

pub use config::{EvalConfig, GC_THRESHOLD_VAR, MAX_DEPTH_VAR};
pub use errors::{EvalError, EvalErrorKind, EvalResult};
pub use eval::Evaluator;
pub use heap::GcStats;
pub use stack::ensure_sufficient_stack;
pub use symbol::{InternError, Symbol, SymbolTable};
pub use value::{Attr, AttrSet, Cell, Function, Kind, List, PrimOp, PrimOpFn, Shape, Thunk, ValueId};
