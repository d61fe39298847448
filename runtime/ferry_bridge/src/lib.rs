//! Ferry Bridge - driving a lazy evaluator from foreign code
//!
//! This crate is the boundary between callers that have no view of the
//! evaluator's node layout, exception model or collector, and the
//! evaluator in `ferry_heap`:
//! - `Context`: shared, locked handle to one evaluator
//! - Symbols: interning and reverse lookup
//! - Values: allocate, force, write, read back
//! - `AttrsBuilder` / `ListBuilder`: two-phase construction of composites
//! - `AttrIter`: walking a set in canonical order without copying it
//! - `Context::apply`: application with fault containment
//! - `Context::keep_alive` / `Rooted`: rooting foreign-held handles
//!
//! # Failures
//!
//! Recoverable failures are [`BridgeError`] values. Misuse of a handle
//! (stale, already realized, out of range) is a panic: there is no sensible
//! way to continue from it.

mod apply;
mod attrs;
mod context;
mod error;
mod lifetime;
mod list;
mod value;

pub use attrs::{AttrIter, AttrsBuilder};
pub use context::Context;
pub use error::{BridgeError, ErrorCode, ErrorContext};
pub use lifetime::Rooted;
pub use list::ListBuilder;

pub use ferry_heap::{
    EvalConfig, EvalError, EvalErrorKind, EvalResult, Evaluator, GcStats, InternError, Kind,
    Shape, Symbol, ValueId,
};
