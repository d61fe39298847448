//! Attribute sets: the two-phase builder, lookup, and the iterator.

use std::ffi::CStr;
use std::sync::Arc;

use ferry_heap::{Attr, AttrSet, Shape, Symbol, ValueId};
use rustc_hash::FxHashMap;

use crate::apply::contain;
use crate::context::Context;
use crate::error::BridgeError;
use crate::value::mismatch;

/// Upper bound on the staging space reserved up front; larger capacities
/// grow on demand.
const MAX_RESERVED_ATTRS: usize = 1024;

/// Incremental constructor for one attribute set.
///
/// Staged values are rooted until the builder is finalized or dropped.
/// `capacity` bounds the number of distinct names; re-inserting a name
/// replaces its value and does not use up capacity.
pub struct AttrsBuilder {
    ctx: Context,
    capacity: usize,
    /// Position of each staged name in `staged`.
    index: FxHashMap<Symbol, usize>,
    staged: Vec<Attr>,
}

impl AttrsBuilder {
    pub fn new(ctx: &Context, capacity: usize) -> Self {
        AttrsBuilder {
            ctx: ctx.clone(),
            capacity,
            index: FxHashMap::default(),
            staged: Vec::with_capacity(capacity.min(MAX_RESERVED_ATTRS)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Distinct names staged so far.
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Stage `value` under `name`, interning the name.
    ///
    /// # Panics
    /// Panics if `name` contains a NUL byte or `value` is stale.
    pub fn insert(&mut self, name: &str, value: ValueId) -> Result<(), BridgeError> {
        let symbol = self.ctx.intern(name);
        self.insert_symbol(symbol, value)
    }

    /// Stage `value` under an already interned name.
    ///
    /// # Panics
    /// Panics if `name` was not interned by this context or `value` is stale.
    #[track_caller]
    pub fn insert_symbol(&mut self, name: Symbol, value: ValueId) -> Result<(), BridgeError> {
        let mut ev = self.ctx.lock();
        let interned = ev.symbols().len();
        assert!(
            (name.raw() as usize) < interned,
            "{name:?} was not interned by this context ({interned} symbols)"
        );
        ev.assert_live(value);

        if let Some(&pos) = self.index.get(&name) {
            let previous = std::mem::replace(&mut self.staged[pos].value, value);
            ev.keep_alive(value);
            ev.release(previous);
            return Ok(());
        }

        if self.staged.len() >= self.capacity {
            return Err(BridgeError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        ev.keep_alive(value);
        self.index.insert(name, self.staged.len());
        self.staged.push(Attr { name, value });
        Ok(())
    }

    /// Realize `out` as the staged set, in canonical symbol order.
    ///
    /// # Panics
    /// Panics if `out` is stale or already realized.
    pub fn finalize(mut self, out: ValueId) {
        let mut ev = self.ctx.lock();
        ev.check_writable(out);

        let staged = std::mem::take(&mut self.staged);
        self.index.clear();
        for attr in &staged {
            ev.release(attr.value);
        }
        let len = staged.len();
        ev.realize(out, Shape::Attrs(AttrSet::from_unsorted(staged)));
        tracing::debug!(len, capacity = self.capacity, "finalized attribute set");
    }
}

impl Drop for AttrsBuilder {
    fn drop(&mut self) {
        if self.staged.is_empty() {
            return;
        }
        let mut ev = self.ctx.lock();
        for attr in self.staged.drain(..) {
            ev.release(attr.value);
        }
    }
}

impl Context {
    /// Look up `name` in the set `set` without forcing the attribute.
    ///
    /// Forces `set` itself. Returns `Ok(None)` when the name is absent.
    pub fn lookup_by_name(&self, set: ValueId, name: &str) -> Result<Option<ValueId>, BridgeError> {
        let attrs = self.force_attrs(set)?;
        Ok(self.find_symbol(name).and_then(|symbol| attrs.get(symbol)))
    }

    /// Look up `symbol` in the set `set` without forcing the attribute.
    pub fn lookup(&self, set: ValueId, symbol: Symbol) -> Result<Option<ValueId>, BridgeError> {
        Ok(self.force_attrs(set)?.get(symbol))
    }

    fn force_attrs(&self, set: ValueId) -> Result<AttrSet, BridgeError> {
        match self.force_shape(set)? {
            Shape::Attrs(attrs) => Ok(attrs),
            other => Err(mismatch("a set", &other)),
        }
    }
}

/// Cursor over a realized attribute set, in canonical symbol order.
///
/// Holds a root on the set for as long as it lives, so the set and every
/// value in it survive collections in between steps.
pub struct AttrIter {
    ctx: Context,
    set: ValueId,
    attrs: AttrSet,
    position: usize,
}

impl AttrIter {
    /// Force `set` and position the cursor at its first attribute.
    pub fn new(ctx: &Context, set: ValueId) -> Result<Self, BridgeError> {
        let mut ev = ctx.lock();
        ev.assert_live(set);
        let attrs = match contain(&mut ev, |ev| ev.force_shape(set))? {
            Shape::Attrs(attrs) => attrs,
            other => return Err(mismatch("a set", &other)),
        };
        ev.keep_alive(set);
        drop(ev);

        Ok(AttrIter {
            ctx: ctx.clone(),
            set,
            attrs,
            position: 0,
        })
    }

    pub fn is_end(&self) -> bool {
        self.position >= self.attrs.len()
    }

    /// Name of the current attribute.
    ///
    /// # Panics
    /// Panics at end.
    pub fn key(&self) -> Arc<str> {
        self.ctx.symbol_name(self.current().name)
    }

    /// NUL-terminated name of the current attribute, owned by the symbol
    /// table.
    ///
    /// # Panics
    /// Panics at end.
    pub fn c_key(&self) -> Arc<CStr> {
        self.ctx.symbol_c_name(self.current().name)
    }

    /// # Panics
    /// Panics at end.
    pub fn symbol(&self) -> Symbol {
        self.current().name
    }

    /// Value of the current attribute, unevaluated.
    ///
    /// # Panics
    /// Panics at end.
    pub fn value(&self) -> ValueId {
        self.current().value
    }

    /// Step to the next attribute. A no-op at end.
    pub fn advance(&mut self) {
        if !self.is_end() {
            self.position += 1;
        }
    }

    /// The set being iterated.
    pub fn set(&self) -> ValueId {
        self.set
    }

    #[track_caller]
    fn current(&self) -> Attr {
        match self.attrs.at(self.position) {
            Some(attr) => attr,
            None => panic!(
                "attribute iterator read past the end ({} attributes)",
                self.attrs.len()
            ),
        }
    }
}

impl Iterator for AttrIter {
    type Item = (Symbol, ValueId);

    fn next(&mut self) -> Option<Self::Item> {
        let attr = self.attrs.at(self.position)?;
        self.position += 1;
        Some((attr.name, attr.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.attrs.len().saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for AttrIter {}

impl Drop for AttrIter {
    fn drop(&mut self) {
        self.ctx.lock().release(self.set);
    }
}
