//! Attribute sets and lists: builders, lookups, and the attribute iterator.

use std::ffi::c_char;

use ferry_bridge::{AttrIter, AttrsBuilder, BridgeError, ListBuilder, Symbol};

use crate::value::store;
use crate::{
    context, handle, handle_mut, host_str, report, status, take, value_id, FerryContext,
    FerryErrorContext,
};

/// Opaque attribute-set builder.
pub struct FerryAttrsBuilder(AttrsBuilder);

/// Opaque list builder.
pub struct FerryListBuilder(ListBuilder);

/// Opaque attribute iterator.
pub struct FerryAttrIter(AttrIter);

// Attribute-set builder

#[no_mangle]
pub extern "C" fn ferry_attrs_builder_new(
    ctx: *const FerryContext,
    capacity: usize,
) -> *mut FerryAttrsBuilder {
    let builder = AttrsBuilder::new(context(ctx), capacity);
    Box::into_raw(Box::new(FerryAttrsBuilder(builder)))
}

fn attrs_builder<'a>(builder: *mut FerryAttrsBuilder) -> &'a mut AttrsBuilder {
    // SAFETY: host passes a live pointer from ferry_attrs_builder_new
    unsafe { &mut handle_mut(builder, "attrs builder").0 }
}

/// Stage `value` under `name`. Fails with overflow once `capacity`
/// distinct names are staged; the builder stays usable.
#[no_mangle]
pub extern "C" fn ferry_attrs_builder_insert(
    builder: *mut FerryAttrsBuilder,
    name: *const c_char,
    value: u64,
    err: *mut FerryErrorContext,
) -> i32 {
    let name = host_str(name, "attribute name");
    let result = attrs_builder(builder).insert(name, value_id(value));
    status(err, result)
}

#[no_mangle]
pub extern "C" fn ferry_attrs_builder_insert_symbol(
    builder: *mut FerryAttrsBuilder,
    symbol: u32,
    value: u64,
    err: *mut FerryErrorContext,
) -> i32 {
    let result = attrs_builder(builder).insert_symbol(Symbol::from_raw(symbol), value_id(value));
    status(err, result)
}

/// Realize `out` as the staged set. Consumes and frees the builder.
#[no_mangle]
pub extern "C" fn ferry_attrs_builder_finalize(builder: *mut FerryAttrsBuilder, out: u64) {
    // SAFETY: host passes a live pointer from ferry_attrs_builder_new
    let Some(builder) = (unsafe { take(builder) }) else {
        panic!("null attrs builder handle");
    };
    builder.0.finalize(value_id(out));
}

/// Discard an unfinalized builder, releasing its staged values.
#[no_mangle]
pub extern "C" fn ferry_attrs_builder_free(builder: *mut FerryAttrsBuilder) {
    // SAFETY: host passes null or a pointer from ferry_attrs_builder_new
    drop(unsafe { take(builder) });
}

/// Look up `name` in `set` without forcing the attribute.
///
/// Returns `0` with a key error if the name is absent.
#[no_mangle]
pub extern "C" fn ferry_attrs_lookup(
    ctx: *const FerryContext,
    set: u64,
    name: *const c_char,
    err: *mut FerryErrorContext,
) -> u64 {
    let name = host_str(name, "attribute name");
    let result = context(ctx)
        .lookup_by_name(value_id(set), name)
        .and_then(|found| {
            found.ok_or_else(|| BridgeError::MissingAttribute {
                name: name.to_owned(),
            })
        });
    report(err, result).map_or(0, |id| id.to_raw())
}

#[no_mangle]
pub extern "C" fn ferry_attrs_len(
    ctx: *const FerryContext,
    set: u64,
    out: *mut usize,
    err: *mut FerryErrorContext,
) -> i32 {
    let result = context(ctx).attrs_len(value_id(set));
    store(err, result, out)
}

// List builder

#[no_mangle]
pub extern "C" fn ferry_list_builder_new(
    ctx: *const FerryContext,
    size: usize,
) -> *mut FerryListBuilder {
    let builder = ListBuilder::new(context(ctx), size);
    Box::into_raw(Box::new(FerryListBuilder(builder)))
}

#[no_mangle]
pub extern "C" fn ferry_list_builder_set(builder: *mut FerryListBuilder, index: usize, value: u64) {
    // SAFETY: host passes a live pointer from ferry_list_builder_new
    let builder = unsafe { handle_mut(builder, "list builder") };
    builder.0.set(index, value_id(value));
}

/// Realize `out` as the built list. Consumes and frees the builder, even
/// when it fails with a key error because a slot was never set.
#[no_mangle]
pub extern "C" fn ferry_list_builder_finalize(
    builder: *mut FerryListBuilder,
    out: u64,
    err: *mut FerryErrorContext,
) -> i32 {
    // SAFETY: host passes a live pointer from ferry_list_builder_new
    let Some(builder) = (unsafe { take(builder) }) else {
        panic!("null list builder handle");
    };
    let result = builder.0.finalize(value_id(out));
    status(err, result)
}

#[no_mangle]
pub extern "C" fn ferry_list_builder_free(builder: *mut FerryListBuilder) {
    // SAFETY: host passes null or a pointer from ferry_list_builder_new
    drop(unsafe { take(builder) });
}

#[no_mangle]
pub extern "C" fn ferry_list_len(
    ctx: *const FerryContext,
    list: u64,
    out: *mut usize,
    err: *mut FerryErrorContext,
) -> i32 {
    let result = context(ctx).list_len(value_id(list));
    store(err, result, out)
}

/// Element `index` of `list`, unevaluated. Returns `0` on failure.
///
/// An index past the end is a contract violation.
#[no_mangle]
pub extern "C" fn ferry_list_get(
    ctx: *const FerryContext,
    list: u64,
    index: usize,
    err: *mut FerryErrorContext,
) -> u64 {
    let result = context(ctx).list_get(value_id(list), index);
    match report(err, result) {
        Ok(Some(id)) => id.to_raw(),
        Ok(None) => panic!("list index {index} out of range"),
        Err(_) => 0,
    }
}

// Attribute iterator

/// Force `set` and open an iterator over it. Returns null on failure.
#[no_mangle]
pub extern "C" fn ferry_attr_iter_new(
    ctx: *const FerryContext,
    set: u64,
    err: *mut FerryErrorContext,
) -> *mut FerryAttrIter {
    let result = AttrIter::new(context(ctx), value_id(set));
    match report(err, result) {
        Ok(iter) => Box::into_raw(Box::new(FerryAttrIter(iter))),
        Err(_) => std::ptr::null_mut(),
    }
}

fn attr_iter<'a>(iter: *const FerryAttrIter) -> &'a AttrIter {
    // SAFETY: host passes a live pointer from ferry_attr_iter_new
    unsafe { &handle(iter, "attr iterator").0 }
}

#[no_mangle]
pub extern "C" fn ferry_attr_iter_is_end(iter: *const FerryAttrIter) -> bool {
    attr_iter(iter).is_end()
}

/// Name of the current attribute, owned by the context.
#[no_mangle]
pub extern "C" fn ferry_attr_iter_key(iter: *const FerryAttrIter) -> *const c_char {
    let key = attr_iter(iter).c_key();
    // The symbol table keeps its own reference, so the pointer outlives `key`.
    key.as_ptr()
}

#[no_mangle]
pub extern "C" fn ferry_attr_iter_value(iter: *const FerryAttrIter) -> u64 {
    attr_iter(iter).value().to_raw()
}

#[no_mangle]
pub extern "C" fn ferry_attr_iter_advance(iter: *mut FerryAttrIter) {
    // SAFETY: host passes a live pointer from ferry_attr_iter_new
    unsafe { handle_mut(iter, "attr iterator") }.0.advance();
}

#[no_mangle]
pub extern "C" fn ferry_attr_iter_free(iter: *mut FerryAttrIter) {
    // SAFETY: host passes null or a pointer from ferry_attr_iter_new
    drop(unsafe { take(iter) });
}
