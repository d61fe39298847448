//! Fixed-size list construction.

use ferry_heap::{List, Shape, ValueId};

use crate::context::Context;
use crate::error::BridgeError;

/// Incremental constructor for one list of a declared size.
///
/// Every slot must be set before [`ListBuilder::finalize`]. Staged values
/// are rooted until the builder is finalized or dropped.
///
/// Slot storage grows with the highest index set, so declaring a size
/// reserves nothing up front.
pub struct ListBuilder {
    ctx: Context,
    size: usize,
    /// Slots up to the highest index set so far.
    slots: Vec<Option<ValueId>>,
}

impl ListBuilder {
    pub fn new(ctx: &Context, size: usize) -> Self {
        ListBuilder {
            ctx: ctx.clone(),
            size,
            slots: Vec::new(),
        }
    }

    /// Declared size.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Store `value` at `index`, replacing any earlier value there.
    ///
    /// # Panics
    /// Panics if `index` is out of range or `value` is stale.
    #[track_caller]
    pub fn set(&mut self, index: usize, value: ValueId) {
        let size = self.size;
        if index >= size {
            panic!("list builder index {index} out of range for size {size}");
        }
        if index >= self.slots.len() {
            self.slots.resize(index + 1, None);
        }
        let slot = &mut self.slots[index];
        let mut ev = self.ctx.lock();
        ev.assert_live(value);
        ev.keep_alive(value);
        if let Some(previous) = slot.replace(value) {
            ev.release(previous);
        }
    }

    /// Realize `out` as the built list.
    ///
    /// Fails with [`BridgeError::IncompleteList`] if any slot was never set;
    /// `out` is then left untouched.
    ///
    /// # Panics
    /// Panics if `out` is stale or already realized.
    pub fn finalize(mut self, out: ValueId) -> Result<(), BridgeError> {
        let mut ev = self.ctx.lock();
        ev.check_writable(out);

        let size = self.size;
        let unset = self
            .slots
            .iter()
            .position(Option::is_none)
            .or((self.slots.len() < size).then_some(self.slots.len()));
        if let Some(index) = unset {
            return Err(BridgeError::IncompleteList { index, size });
        }

        let items: Vec<ValueId> = std::mem::take(&mut self.slots).into_iter().flatten().collect();
        for &item in &items {
            ev.release(item);
        }
        ev.realize(out, Shape::List(List::new(items)));
        tracing::debug!(size, "finalized list");
        Ok(())
    }
}

impl Drop for ListBuilder {
    fn drop(&mut self) {
        if self.slots.iter().all(Option::is_none) {
            return;
        }
        let mut ev = self.ctx.lock();
        for value in self.slots.drain(..).flatten() {
            ev.release(value);
        }
    }
}
