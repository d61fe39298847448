use super::*;
use proptest::prelude::*;

#[test]
fn test_intern_and_lookup() {
    let mut table = SymbolTable::new();

    let hello = table.intern("hello");
    let world = table.intern("world");
    let hello2 = table.intern("hello");

    assert_eq!(hello, hello2);
    assert_ne!(hello, world);

    assert_eq!(table.name(hello), "hello");
    assert_eq!(table.name(world), "world");
    assert_eq!(table.len(), 2);
}

#[test]
fn test_symbols_order_by_interning() {
    let mut table = SymbolTable::new();
    let zeta = table.intern("zeta");
    let alpha = table.intern("alpha");
    assert!(zeta < alpha);
}

#[test]
fn test_find_does_not_grow_table() {
    let mut table = SymbolTable::new();
    let x = table.intern("x");

    assert_eq!(table.find("x"), Some(x));
    assert_eq!(table.find("y"), None);
    assert_eq!(table.len(), 1);
}

#[test]
fn test_interior_nul_rejected() {
    let mut table = SymbolTable::new();
    assert_eq!(
        table.try_intern("a\0b"),
        Err(InternError::InteriorNul { position: 1 })
    );
    assert!(table.is_empty());
}

#[test]
#[should_panic(expected = "NUL byte")]
fn test_intern_panics_on_nul() {
    let mut table = SymbolTable::new();
    table.intern("\0");
}

#[test]
fn test_c_name_matches_text() {
    let mut table = SymbolTable::new();
    let sym = table.intern("outPath");
    assert_eq!(table.c_name(sym).to_str(), Ok("outPath"));
    assert_eq!(&*table.name_arc(sym), "outPath");
}

#[test]
fn test_empty_name_is_a_symbol() {
    let mut table = SymbolTable::new();
    let empty = table.intern("");
    assert_eq!(table.name(empty), "");
    assert_eq!(table.intern(""), empty);
}

proptest! {
    #[test]
    fn prop_intern_identity_follows_string_equality(a in "[a-zA-Z_][a-zA-Z0-9_'-]{0,12}", b in "[a-zA-Z_][a-zA-Z0-9_'-]{0,12}") {
        let mut table = SymbolTable::new();
        let sa = table.intern(&a);
        let sb = table.intern(&b);
        prop_assert_eq!(sa == sb, a == b);
        prop_assert_eq!(table.intern(&a), sa);
        prop_assert_eq!(table.name(sa), a.as_str());
    }
}
