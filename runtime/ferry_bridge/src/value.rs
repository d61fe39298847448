//! Value handle bridge: allocation, forcing, direct writes, typed reads.

use std::sync::Arc;

use ferry_heap::{Kind, Shape, ValueId};

use crate::apply::contain;
use crate::context::Context;
use crate::error::BridgeError;

impl Context {
    /// Allocate a fresh unrealized handle.
    ///
    /// The handle is not rooted; keep it reachable or register it with
    /// [`Context::keep_alive`] before the next collection.
    pub fn alloc_value(&self) -> ValueId {
        self.lock().alloc_blank()
    }

    /// Realize `id`. A no-op if it is already realized.
    ///
    /// On failure the handle stays unrealized and may be forced again.
    #[tracing::instrument(level = "debug", skip_all, fields(value = ?id))]
    pub fn force(&self, id: ValueId) -> Result<(), BridgeError> {
        let mut ev = self.lock();
        ev.assert_live(id);
        contain(&mut ev, |ev| ev.force(id))
    }

    pub fn kind(&self, id: ValueId) -> Kind {
        self.lock().kind(id)
    }

    pub fn is_realized(&self, id: ValueId) -> bool {
        self.lock().cell(id).is_realized()
    }

    // Direct writes. Each panics if `id` is already realized.

    pub fn write_null(&self, id: ValueId) {
        self.lock().realize(id, Shape::Null);
    }

    pub fn write_bool(&self, id: ValueId, value: bool) {
        self.lock().realize(id, Shape::Bool(value));
    }

    pub fn write_int(&self, id: ValueId, value: i64) {
        self.lock().realize(id, Shape::Int(value));
    }

    pub fn write_float(&self, id: ValueId, value: f64) {
        self.lock().realize(id, Shape::Float(value));
    }

    pub fn write_string(&self, id: ValueId, value: &str) {
        self.lock().realize(id, Shape::string(value));
    }

    pub fn write_path(&self, id: ValueId, value: &str) {
        self.lock().realize(id, Shape::Path(value.into()));
    }

    /// Store an application of `func` to `args` without evaluating it.
    pub fn write_lazy_apply(&self, id: ValueId, func: ValueId, args: &[ValueId]) {
        self.lock().write_lazy_apply(id, func, args);
    }

    // Typed reads. Each forces first.

    pub fn get_bool(&self, id: ValueId) -> Result<bool, BridgeError> {
        match self.force_shape(id)? {
            Shape::Bool(b) => Ok(b),
            other => Err(mismatch("a Boolean", &other)),
        }
    }

    pub fn get_int(&self, id: ValueId) -> Result<i64, BridgeError> {
        match self.force_shape(id)? {
            Shape::Int(n) => Ok(n),
            other => Err(mismatch("an integer", &other)),
        }
    }

    pub fn get_float(&self, id: ValueId) -> Result<f64, BridgeError> {
        match self.force_shape(id)? {
            Shape::Float(x) => Ok(x),
            other => Err(mismatch("a float", &other)),
        }
    }

    pub fn get_string(&self, id: ValueId) -> Result<Arc<str>, BridgeError> {
        match self.force_shape(id)? {
            Shape::String(s) => Ok(s),
            other => Err(mismatch("a string", &other)),
        }
    }

    pub fn get_path(&self, id: ValueId) -> Result<Arc<str>, BridgeError> {
        match self.force_shape(id)? {
            Shape::Path(p) => Ok(p),
            other => Err(mismatch("a path", &other)),
        }
    }

    pub fn list_len(&self, id: ValueId) -> Result<usize, BridgeError> {
        match self.force_shape(id)? {
            Shape::List(list) => Ok(list.len()),
            other => Err(mismatch("a list", &other)),
        }
    }

    /// Element `index` of a list, unevaluated. `None` past the end.
    pub fn list_get(&self, id: ValueId, index: usize) -> Result<Option<ValueId>, BridgeError> {
        match self.force_shape(id)? {
            Shape::List(list) => Ok(list.get(index)),
            other => Err(mismatch("a list", &other)),
        }
    }

    pub fn attrs_len(&self, id: ValueId) -> Result<usize, BridgeError> {
        match self.force_shape(id)? {
            Shape::Attrs(set) => Ok(set.len()),
            other => Err(mismatch("a set", &other)),
        }
    }

    /// Force `id` and copy out its shape.
    pub(crate) fn force_shape(&self, id: ValueId) -> Result<Shape, BridgeError> {
        let mut ev = self.lock();
        ev.assert_live(id);
        contain(&mut ev, |ev| ev.force_shape(id))
    }
}

pub(crate) fn mismatch(expected: &'static str, got: &Shape) -> BridgeError {
    BridgeError::TypeMismatch {
        expected,
        got: got.kind(),
    }
}
