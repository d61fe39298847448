//! Function application and fault containment.
//!
//! Evaluation runs inside [`contain`]: an `Err` from the evaluator and a
//! panic unwinding out of a foreign primop both come back as
//! [`BridgeError::Evaluation`]. Handle checks happen before the contained
//! region, so contract violations still panic at the call site.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use ferry_heap::{errors, EvalResult, Evaluator, Shape, ValueId};

use crate::context::Context;
use crate::error::BridgeError;

impl Context {
    /// Apply `func` to every argument in `args` and realize `out`.
    ///
    /// Partial application and over-application are resolved by the
    /// evaluator. On failure `out` stays unrealized.
    ///
    /// # Panics
    /// Panics if a handle is stale or `out` is already realized.
    #[tracing::instrument(level = "debug", skip_all, fields(args = args.len()))]
    pub fn apply(&self, func: ValueId, args: &[ValueId], out: ValueId) -> Result<(), BridgeError> {
        let mut ev = self.lock();
        ev.assert_live(func);
        for &arg in args {
            ev.assert_live(arg);
        }
        ev.check_writable(out);

        contain(&mut ev, |ev| ev.apply(func, args, out))
    }

    /// Add a Rust function to the global namespace.
    ///
    /// The body receives exactly `arity` unevaluated arguments. A panic in
    /// the body is contained like any other evaluation failure.
    pub fn register_primop(
        &self,
        name: &str,
        arity: usize,
        body: impl Fn(&mut Evaluator, &[ValueId]) -> EvalResult<Shape> + Send + Sync + 'static,
    ) -> ValueId {
        let id = self.lock().register_primop(name, arity, body);
        tracing::debug!(name, arity, "registered primop");
        id
    }
}

/// Run an evaluation step, turning errors and panics into [`BridgeError`].
///
/// After a panic the evaluator is repaired before it is used again.
pub(crate) fn contain<T>(
    ev: &mut Evaluator,
    f: impl FnOnce(&mut Evaluator) -> EvalResult<T>,
) -> Result<T, BridgeError> {
    match panic::catch_unwind(AssertUnwindSafe(|| f(&mut *ev))) {
        Ok(result) => result.map_err(BridgeError::from),
        Err(payload) => {
            let repaired = ev.recover();
            let message = panic_message(payload.as_ref());
            tracing::warn!(%message, repaired, "contained panic during evaluation");
            Err(errors::foreign_panic(message).into())
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests;
