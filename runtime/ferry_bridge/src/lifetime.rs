//! Cross-heap lifetime: keeping foreign-held handles alive.
//!
//! The evaluator's collector only sees its own roots, and it only runs when
//! the host calls [`Context::collect_garbage`] or
//! [`Context::collect_garbage_if_due`]. A handle held solely by foreign code
//! across such a call must be registered here, or the collection frees it
//! and later access panics with "stale value handle".

use ferry_heap::{GcStats, ValueId};

use crate::context::Context;

impl Context {
    /// Register an extra root for `id`. Registrations are counted, so every
    /// call needs a matching [`Context::release`].
    ///
    /// # Panics
    /// Panics if `id` is stale.
    pub fn keep_alive(&self, id: ValueId) {
        self.lock().keep_alive(id);
    }

    /// Drop one registration made by [`Context::keep_alive`].
    ///
    /// # Panics
    /// Panics if `id` holds no registration.
    pub fn release(&self, id: ValueId) {
        self.lock().release(id);
    }

    /// Root `id` until the returned guard is dropped.
    pub fn root(&self, id: ValueId) -> Rooted {
        self.keep_alive(id);
        Rooted {
            ctx: self.clone(),
            id,
        }
    }

    /// Run a collection cycle now. Returns the number of freed cells.
    pub fn collect_garbage(&self) -> usize {
        self.lock().collect_garbage()
    }

    /// Run a collection cycle if `gc_threshold` allocations happened since
    /// the last one. Returns the number of freed cells, or `None` if no
    /// cycle was due.
    pub fn collect_garbage_if_due(&self) -> Option<usize> {
        self.lock().collect_garbage_if_due()
    }

    /// Whether `id` still names a live cell.
    pub fn is_live(&self, id: ValueId) -> bool {
        self.lock().is_live(id)
    }

    /// Keep-alive registrations currently held for `id`.
    pub fn root_count(&self, id: ValueId) -> usize {
        self.lock().root_count(id)
    }

    pub fn gc_stats(&self) -> GcStats {
        self.lock().gc_stats()
    }
}

/// RAII registration made by [`Context::root`].
#[must_use = "the value is released as soon as the guard is dropped"]
pub struct Rooted {
    ctx: Context,
    id: ValueId,
}

impl Rooted {
    pub fn id(&self) -> ValueId {
        self.id
    }
}

impl Drop for Rooted {
    fn drop(&mut self) {
        self.ctx.release(self.id);
    }
}
