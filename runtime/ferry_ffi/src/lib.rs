//! Ferry C ABI (`libferry_ffi`)
//!
//! C-linkage entry points over `ferry_bridge`, for hosts that link the
//! evaluator as a static or dynamic library.
//!
//! # Build Modes
//!
//! - **rlib**: For Rust consumers and the integration tests
//! - **staticlib** / **cdylib**: For C and C++ hosts
//!
//! # Conventions
//!
//! - Handles (`FerryContext*`, builders, iterators, error contexts) are
//!   boxed and come in `_new`/`_free` pairs. `_finalize` consumes a builder.
//! - Values travel as `uint64_t`, with `0` meaning "no value".
//! - Symbols travel as `uint32_t`.
//! - Fallible functions return an `int32_t` status (see [`ErrorCode`]) and
//!   record the failure in an optional `FerryErrorContext*`, which is
//!   cleared to success on entry.
//!
//! # Safety
//!
//! Functions take raw pointers from the host and are not marked `unsafe`
//! because they are FFI entry points, not Rust API functions. Contract
//! violations (null handles, stale or already realized values, out of range
//! indices) panic. A panic cannot unwind out of an `extern "C"` function,
//! so the process aborts.

#![warn(clippy::allow_attributes_without_reason)]
#![allow(
    unsafe_code,
    reason = "C-ABI entry points require unsafe for raw pointer operations"
)]
#![allow(
    clippy::not_unsafe_ptr_arg_deref,
    reason = "FFI entry points receive pointers from the host, which guarantees validity"
)]

mod apply;
mod collections;
mod value;

use std::ffi::{c_char, CStr};
use std::sync::Once;

use ferry_bridge::{BridgeError, Context, ErrorContext, Symbol, ValueId};

pub use apply::{
    ferry_apply, ferry_collect_garbage, ferry_collect_garbage_if_due, ferry_global_namespace,
    ferry_keep_alive, ferry_release,
};
pub use collections::{
    ferry_attr_iter_advance, ferry_attr_iter_free, ferry_attr_iter_is_end, ferry_attr_iter_key,
    ferry_attr_iter_new, ferry_attr_iter_value, ferry_attrs_builder_finalize,
    ferry_attrs_builder_free, ferry_attrs_builder_insert, ferry_attrs_builder_insert_symbol,
    ferry_attrs_builder_new, ferry_attrs_len, ferry_attrs_lookup, ferry_list_builder_finalize,
    ferry_list_builder_free, ferry_list_builder_new, ferry_list_builder_set, ferry_list_get,
    ferry_list_len, FerryAttrIter, FerryAttrsBuilder, FerryListBuilder,
};
pub use ferry_bridge::{ErrorCode, Kind};
pub use value::{
    ferry_alloc_value, ferry_force, ferry_get_bool, ferry_get_float, ferry_get_int,
    ferry_value_kind, ferry_write_bool, ferry_write_float, ferry_write_int,
    ferry_write_lazy_apply, ferry_write_null, ferry_write_path, ferry_write_string,
};

/// Returned by [`ferry_intern`] when the symbol table is full.
pub const FERRY_NO_SYMBOL: u32 = u32::MAX;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing from `RUST_LOG`.
///
/// Does nothing when `RUST_LOG` is unset. Safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

#[no_mangle]
pub extern "C" fn ferry_init_tracing() {
    init_tracing();
}

// Handles

/// Opaque evaluator context.
pub struct FerryContext(Context);

/// Opaque error context: last status code and message.
pub struct FerryErrorContext(ErrorContext);

/// Borrow a handle, panicking on null.
///
/// # Safety
///
/// `ptr` must be null or come from the matching `_new` function and not
/// have been freed.
unsafe fn handle<'a, T>(ptr: *const T, what: &str) -> &'a T {
    // SAFETY: guaranteed by the caller
    match unsafe { ptr.as_ref() } {
        Some(h) => h,
        None => panic!("null {what} handle"),
    }
}

/// Mutable counterpart of [`handle`].
///
/// # Safety
///
/// Same as [`handle`], and no other reference to `*ptr` may be live.
unsafe fn handle_mut<'a, T>(ptr: *mut T, what: &str) -> &'a mut T {
    // SAFETY: guaranteed by the caller
    match unsafe { ptr.as_mut() } {
        Some(h) => h,
        None => panic!("null {what} handle"),
    }
}

/// Take back ownership of a boxed handle. `None` for null.
///
/// # Safety
///
/// `ptr` must be null or come from `Box::into_raw` and not have been freed.
unsafe fn take<T>(ptr: *mut T) -> Option<Box<T>> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null and produced by Box::into_raw
    Some(unsafe { Box::from_raw(ptr) })
}

fn context<'a>(ctx: *const FerryContext) -> &'a Context {
    // SAFETY: host passes a pointer from ferry_context_new
    unsafe { &handle(ctx, "context").0 }
}

fn value_id(raw: u64) -> ValueId {
    match ValueId::from_raw(raw) {
        Some(id) => id,
        None => panic!("absent value handle"),
    }
}

/// Borrow a host string, panicking on null or invalid UTF-8.
fn host_str<'a>(ptr: *const c_char, what: &str) -> &'a str {
    if ptr.is_null() {
        panic!("null {what} string");
    }
    // SAFETY: host passes a NUL-terminated string that outlives this call
    let c_str = unsafe { CStr::from_ptr(ptr) };
    match c_str.to_str() {
        Ok(s) => s,
        Err(err) => panic!("{what} string is not valid UTF-8: {err}"),
    }
}

/// Record `result` in the optional error context.
///
/// Returns the value on success and the status code on failure.
fn report<T>(err: *mut FerryErrorContext, result: Result<T, BridgeError>) -> Result<T, i32> {
    // SAFETY: host passes null or a pointer from ferry_error_context_new
    let slot = unsafe { err.as_mut() };
    match slot {
        Some(FerryErrorContext(slot)) => {
            let code = result.as_ref().err().map(BridgeError::code);
            slot.capture(result)
                .ok_or_else(|| code.unwrap_or_default().as_raw())
        }
        None => result.map_err(|e| {
            tracing::debug!(code = ?e.code(), %e, "bridge operation failed without error context");
            e.code().as_raw()
        }),
    }
}

fn status(err: *mut FerryErrorContext, result: Result<(), BridgeError>) -> i32 {
    match report(err, result) {
        Ok(()) => ErrorCode::Ok.as_raw(),
        Err(code) => code,
    }
}

// Context

#[no_mangle]
pub extern "C" fn ferry_context_new() -> *mut FerryContext {
    Box::into_raw(Box::new(FerryContext(Context::from_env())))
}

/// Free a context. Builders and iterators created from it keep the
/// evaluator alive until they are freed too.
#[no_mangle]
pub extern "C" fn ferry_context_free(ctx: *mut FerryContext) {
    // SAFETY: host passes null or a pointer from ferry_context_new
    drop(unsafe { take(ctx) });
}

// Error context

#[no_mangle]
pub extern "C" fn ferry_error_context_new() -> *mut FerryErrorContext {
    Box::into_raw(Box::new(FerryErrorContext(ErrorContext::new())))
}

#[no_mangle]
pub extern "C" fn ferry_error_context_free(err: *mut FerryErrorContext) {
    // SAFETY: host passes null or a pointer from ferry_error_context_new
    drop(unsafe { take(err) });
}

#[no_mangle]
pub extern "C" fn ferry_error_code(err: *const FerryErrorContext) -> i32 {
    // SAFETY: host passes a pointer from ferry_error_context_new
    unsafe { handle(err, "error context") }.0.code().as_raw()
}

/// Message of the last failure, or null after a success.
///
/// The pointer is valid until the error context is next used or freed.
#[no_mangle]
pub extern "C" fn ferry_error_message(err: *const FerryErrorContext) -> *const c_char {
    // SAFETY: host passes a pointer from ferry_error_context_new
    let err = unsafe { handle(err, "error context") };
    err.0.c_message().map_or(std::ptr::null(), CStr::as_ptr)
}

// Symbols

/// Intern `name`. Returns [`FERRY_NO_SYMBOL`] if the table is full.
#[no_mangle]
pub extern "C" fn ferry_intern(
    ctx: *const FerryContext,
    name: *const c_char,
    err: *mut FerryErrorContext,
) -> u32 {
    let ctx = context(ctx);
    let name = host_str(name, "symbol name");
    let result = ctx.try_intern(name).map_err(BridgeError::from);
    report(err, result).map_or(FERRY_NO_SYMBOL, Symbol::raw)
}

/// Name of `symbol`. The string is owned by the context and lives as long
/// as it does.
#[no_mangle]
pub extern "C" fn ferry_symbol_name(ctx: *const FerryContext, symbol: u32) -> *const c_char {
    let ctx = context(ctx);
    let name = ctx.symbol_c_name(Symbol::from_raw(symbol));
    // The symbol table keeps its own reference, so the pointer outlives `name`.
    name.as_ptr()
}
