//! Evaluator context and the symbol bridge.

use std::ffi::CStr;
use std::fmt;
use std::sync::Arc;

use ferry_heap::{EvalConfig, Evaluator, InternError, Symbol, ValueId};
use parking_lot::{Mutex, MutexGuard};

/// Shared handle to one evaluator.
///
/// Cloning is cheap and every clone drives the same evaluator. Every bridge
/// operation holds the lock for its duration. Primops receive the evaluator
/// directly and must not call back into the context.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Mutex<Evaluator>>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Context").field(&*self.lock()).finish()
    }
}

impl Context {
    /// Create a context with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EvalConfig::default())
    }

    /// Create a context configured from `FERRY_*` environment variables.
    pub fn from_env() -> Self {
        Self::with_config(EvalConfig::from_env())
    }

    pub fn with_config(config: EvalConfig) -> Self {
        Context {
            inner: Arc::new(Mutex::new(Evaluator::with_config(config))),
        }
    }

    /// Run `f` with exclusive access to the evaluator.
    pub fn with_evaluator<R>(&self, f: impl FnOnce(&mut Evaluator) -> R) -> R {
        f(&mut self.lock())
    }

    /// Whether both handles drive the same evaluator.
    pub fn same_as(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Evaluator> {
        self.inner.lock()
    }

    // Symbols

    /// Intern `name`. Equal names yield equal symbols.
    ///
    /// # Panics
    /// Panics if `name` contains a NUL byte.
    pub fn intern(&self, name: &str) -> Symbol {
        self.lock().intern(name)
    }

    pub fn try_intern(&self, name: &str) -> Result<Symbol, InternError> {
        self.lock().try_intern(name)
    }

    /// Symbol for `name` if it was interned already. Never grows the table.
    pub fn find_symbol(&self, name: &str) -> Option<Symbol> {
        self.lock().symbols().find(name)
    }

    pub fn symbol_name(&self, symbol: Symbol) -> Arc<str> {
        self.lock().symbols().name_arc(symbol)
    }

    /// NUL-terminated text of `symbol`, owned by the symbol table.
    pub fn symbol_c_name(&self, symbol: Symbol) -> Arc<CStr> {
        self.lock().symbols().c_name(symbol)
    }

    /// The attribute set holding every builtin.
    pub fn global_namespace(&self) -> ValueId {
        self.lock().builtins()
    }
}
