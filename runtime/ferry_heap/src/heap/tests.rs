use super::*;
use crate::value::{List, Shape};
use pretty_assertions::assert_eq;

fn int(n: i64) -> Cell {
    Cell::Realized(Shape::Int(n))
}

#[test]
fn test_alloc_yields_distinct_live_handles() {
    let mut heap = Heap::new();
    let a = heap.alloc(int(1));
    let b = heap.alloc(Cell::Blank);

    assert_ne!(a, b);
    assert!(heap.is_live(a));
    assert!(heap.is_live(b));
    assert_ne!(a.to_raw(), 0);
    assert_eq!(heap.stats().live, 2);
}

#[test]
fn test_unrooted_cells_are_collected() {
    let mut heap = Heap::new();
    let a = heap.alloc(int(1));

    assert_eq!(heap.collect(), 1);
    assert!(!heap.is_live(a));
    assert_eq!(heap.stats().live, 0);
}

#[test]
fn test_rooted_cell_keeps_children_alive() {
    let mut heap = Heap::new();
    let item = heap.alloc(int(7));
    let list = heap.alloc(Cell::Realized(Shape::List(List::new(vec![item]))));
    heap.add_root(list);

    assert_eq!(heap.collect(), 0);
    assert!(heap.is_live(item));
    assert!(heap.is_live(list));
}

#[test]
fn test_roots_are_reference_counted() {
    let mut heap = Heap::new();
    let a = heap.alloc(int(1));
    heap.add_root(a);
    heap.add_root(a);
    heap.remove_root(a);

    assert_eq!(heap.root_count(a), 1);
    heap.collect();
    assert!(heap.is_live(a));

    heap.remove_root(a);
    heap.collect();
    assert!(!heap.is_live(a));
}

#[test]
fn test_reused_slot_rejects_old_handle() {
    let mut heap = Heap::new();
    let old = heap.alloc(int(1));
    heap.collect();
    let new = heap.alloc(int(2));

    assert_eq!(old.index(), new.index());
    assert_ne!(old.generation(), new.generation());
    assert!(!heap.is_live(old));
    assert!(heap.is_live(new));
}

#[test]
#[should_panic(expected = "stale value handle")]
fn test_stale_access_panics() {
    let mut heap = Heap::new();
    let a = heap.alloc(int(1));
    heap.collect();
    let _ = heap.cell(a);
}

#[test]
#[should_panic(expected = "released more times")]
fn test_unbalanced_release_panics() {
    let mut heap = Heap::new();
    let a = heap.alloc(int(1));
    heap.remove_root(a);
}

#[test]
fn test_stats_track_cycles() {
    let mut heap = Heap::new();
    heap.alloc(int(1));
    heap.alloc(int(2));
    assert_eq!(heap.allocs_since_gc(), 2);

    heap.collect();
    let stats = heap.stats();
    assert_eq!(
        stats,
        GcStats {
            live: 0,
            capacity: 2,
            rooted: 0,
            runs: 1,
            freed: 2,
            allocs_since_gc: 0,
        }
    );
}
