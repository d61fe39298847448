//! Value handles: allocation, forcing, direct writes, typed reads.

use std::ffi::c_char;

use ferry_bridge::{BridgeError, ValueId};

use crate::{
    context, host_str, report, status, value_id, ErrorCode, FerryContext, FerryErrorContext,
};

/// Allocate a fresh unrealized value. Not rooted.
#[no_mangle]
pub extern "C" fn ferry_alloc_value(ctx: *const FerryContext) -> u64 {
    context(ctx).alloc_value().to_raw()
}

#[no_mangle]
pub extern "C" fn ferry_force(
    ctx: *const FerryContext,
    value: u64,
    err: *mut FerryErrorContext,
) -> i32 {
    let result = context(ctx).force(value_id(value));
    status(err, result)
}

/// Kind tag of `value` without forcing it. See [`crate::Kind`].
#[no_mangle]
pub extern "C" fn ferry_value_kind(ctx: *const FerryContext, value: u64) -> i32 {
    context(ctx).kind(value_id(value)) as i32
}

#[no_mangle]
pub extern "C" fn ferry_write_null(ctx: *const FerryContext, value: u64) {
    context(ctx).write_null(value_id(value));
}

#[no_mangle]
pub extern "C" fn ferry_write_bool(ctx: *const FerryContext, value: u64, b: bool) {
    context(ctx).write_bool(value_id(value), b);
}

#[no_mangle]
pub extern "C" fn ferry_write_int(ctx: *const FerryContext, value: u64, n: i64) {
    context(ctx).write_int(value_id(value), n);
}

#[no_mangle]
pub extern "C" fn ferry_write_float(ctx: *const FerryContext, value: u64, x: f64) {
    context(ctx).write_float(value_id(value), x);
}

/// Store a copy of the NUL-terminated UTF-8 string `s`.
#[no_mangle]
pub extern "C" fn ferry_write_string(ctx: *const FerryContext, value: u64, s: *const c_char) {
    context(ctx).write_string(value_id(value), host_str(s, "value"));
}

#[no_mangle]
pub extern "C" fn ferry_write_path(ctx: *const FerryContext, value: u64, path: *const c_char) {
    context(ctx).write_path(value_id(value), host_str(path, "path"));
}

/// Store an unevaluated application of `func` to `nargs` values.
#[no_mangle]
pub extern "C" fn ferry_write_lazy_apply(
    ctx: *const FerryContext,
    value: u64,
    func: u64,
    args: *const u64,
    nargs: usize,
) {
    let args = value_ids(args, nargs);
    context(ctx).write_lazy_apply(value_id(value), value_id(func), &args);
}

#[no_mangle]
pub extern "C" fn ferry_get_bool(
    ctx: *const FerryContext,
    value: u64,
    out: *mut bool,
    err: *mut FerryErrorContext,
) -> i32 {
    let result = context(ctx).get_bool(value_id(value));
    store(err, result, out)
}

#[no_mangle]
pub extern "C" fn ferry_get_int(
    ctx: *const FerryContext,
    value: u64,
    out: *mut i64,
    err: *mut FerryErrorContext,
) -> i32 {
    let result = context(ctx).get_int(value_id(value));
    store(err, result, out)
}

#[no_mangle]
pub extern "C" fn ferry_get_float(
    ctx: *const FerryContext,
    value: u64,
    out: *mut f64,
    err: *mut FerryErrorContext,
) -> i32 {
    let result = context(ctx).get_float(value_id(value));
    store(err, result, out)
}

/// Report `result`, writing the value through `out` on success.
pub(crate) fn store<T>(
    err: *mut FerryErrorContext,
    result: Result<T, BridgeError>,
    out: *mut T,
) -> i32 {
    if out.is_null() {
        panic!("null output pointer");
    }
    match report(err, result) {
        Ok(v) => {
            // SAFETY: non-null, and the host passes a writable location
            unsafe { out.write(v) };
            ErrorCode::Ok.as_raw()
        }
        Err(code) => code,
    }
}

/// Decode a host array of value handles.
pub(crate) fn value_ids(args: *const u64, nargs: usize) -> Vec<ValueId> {
    if nargs == 0 {
        return Vec::new();
    }
    if args.is_null() {
        panic!("null argument array with {nargs} arguments");
    }
    // SAFETY: the host passes `nargs` readable handles at `args`
    let raw = unsafe { std::slice::from_raw_parts(args, nargs) };
    raw.iter().copied().map(value_id).collect()
}
