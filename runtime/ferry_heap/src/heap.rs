//! Slot heap with a mark/sweep collector.
//!
//! Cells live in a `Vec` of slots addressed by [`ValueId`]. Every slot
//! carries a generation that is bumped when the slot is swept, so a handle
//! that outlived its cell is detected on the next access instead of
//! silently reading whatever reused the slot.
//!
//! The heap never decides when to collect. [`Heap::collect`] is called by
//! the evaluator when the host asks for a cycle.

use rustc_hash::FxHashMap;

use crate::value::{Cell, ValueId};

#[derive(Debug)]
struct Slot {
    generation: u32,
    /// `None` while the slot is on the free list.
    cell: Option<Cell>,
}

/// Counters describing the heap.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct GcStats {
    /// Occupied slots.
    pub live: usize,
    /// Slots ever allocated, occupied or free.
    pub capacity: usize,
    /// Distinct handles registered as extra roots.
    pub rooted: usize,
    /// Completed collection cycles.
    pub runs: u64,
    /// Cells reclaimed over all cycles.
    pub freed: u64,
    pub allocs_since_gc: usize,
}

/// Storage for heap cells.
#[derive(Debug, Default)]
pub struct Heap {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    /// Extra roots, reference counted.
    roots: FxHashMap<ValueId, usize>,
    live: usize,
    allocs_since_gc: usize,
    runs: u64,
    freed: u64,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `cell` in a fresh slot.
    pub fn alloc(&mut self, cell: Cell) -> ValueId {
        self.live += 1;
        self.allocs_since_gc += 1;

        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.cell.is_none());
            slot.cell = Some(cell);
            return ValueId::new(index, slot.generation);
        }

        let index = u32::try_from(self.slots.len())
            .unwrap_or_else(|_| panic!("heap exhausted: {} slots", self.slots.len()));
        self.slots.push(Slot {
            generation: 1,
            cell: Some(cell),
        });
        ValueId::new(index, 1)
    }

    /// Whether `id` still names an occupied slot.
    pub fn is_live(&self, id: ValueId) -> bool {
        self.slot(id).is_some()
    }

    /// # Panics
    /// Panics with "stale value handle" if the cell was collected.
    #[track_caller]
    pub fn assert_live(&self, id: ValueId) {
        if !self.is_live(id) {
            stale(id);
        }
    }

    /// # Panics
    /// Panics with "stale value handle" if the cell was collected.
    pub fn cell(&self, id: ValueId) -> &Cell {
        match self.slot(id) {
            Some(cell) => cell,
            None => stale(id),
        }
    }

    /// # Panics
    /// Panics with "stale value handle" if the cell was collected.
    pub fn cell_mut(&mut self, id: ValueId) -> &mut Cell {
        let slot = self
            .slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation());
        match slot.and_then(|slot| slot.cell.as_mut()) {
            Some(cell) => cell,
            None => stale(id),
        }
    }

    /// Replace the cell behind `id`, returning the old one.
    pub fn replace(&mut self, id: ValueId, cell: Cell) -> Cell {
        std::mem::replace(self.cell_mut(id), cell)
    }

    /// Register one extra root for `id`.
    ///
    /// # Panics
    /// Panics if `id` is stale.
    pub fn add_root(&mut self, id: ValueId) {
        self.assert_live(id);
        *self.roots.entry(id).or_insert(0) += 1;
    }

    /// Drop one registration made by [`Heap::add_root`].
    ///
    /// # Panics
    /// Panics if `id` holds no registration.
    pub fn remove_root(&mut self, id: ValueId) {
        let Some(count) = self.roots.get_mut(&id) else {
            panic!("{id:?} released more times than it was kept alive");
        };
        *count -= 1;
        if *count == 0 {
            self.roots.remove(&id);
        }
    }

    /// Registrations currently held for `id`.
    pub fn root_count(&self, id: ValueId) -> usize {
        self.roots.get(&id).copied().unwrap_or(0)
    }

    pub fn allocs_since_gc(&self) -> usize {
        self.allocs_since_gc
    }

    pub fn stats(&self) -> GcStats {
        GcStats {
            live: self.live,
            capacity: self.slots.len(),
            rooted: self.roots.len(),
            runs: self.runs,
            freed: self.freed,
            allocs_since_gc: self.allocs_since_gc,
        }
    }

    /// Run one mark/sweep cycle.
    ///
    /// Registered roots are marked, everything they reach survives.
    /// Returns the number of cells reclaimed.
    pub fn collect(&mut self) -> usize {
        let mut marks = vec![false; self.slots.len()];
        let mut worklist: Vec<ValueId> = self.roots.keys().copied().collect();

        // Mark.
        while let Some(id) = worklist.pop() {
            let Some(cell) = self.slot(id) else {
                continue;
            };
            let idx = id.index() as usize;
            if marks[idx] {
                continue;
            }
            marks[idx] = true;
            cell.for_each_child(|child| worklist.push(child));
        }

        // Sweep.
        let mut freed = 0;
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if slot.cell.is_none() || marks[idx] {
                continue;
            }
            slot.cell = None;
            slot.generation = slot.generation.checked_add(1).unwrap_or(1);
            #[expect(
                clippy::cast_possible_truncation,
                reason = "slot count is bounded by u32 in alloc"
            )]
            self.free_list.push(idx as u32);
            freed += 1;
        }

        self.live -= freed;
        self.freed += freed as u64;
        self.runs += 1;
        self.allocs_since_gc = 0;

        tracing::debug!(freed, live = self.live, run = self.runs, "collected garbage");
        freed
    }

    /// Every occupied cell, in slot order.
    pub(crate) fn cells_mut(&mut self) -> impl Iterator<Item = &mut Cell> + '_ {
        self.slots.iter_mut().filter_map(|slot| slot.cell.as_mut())
    }

    fn slot(&self, id: ValueId) -> Option<&Cell> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.cell.as_ref())
    }
}

#[cold]
#[track_caller]
fn stale(id: ValueId) -> ! {
    panic!("stale value handle: {id:?} was collected or never allocated")
}

#[cfg(test)]
mod tests;
