//! Function application, the global namespace, and cross-heap rooting.

use crate::value::value_ids;
use crate::{context, status, value_id, FerryContext, FerryErrorContext};

/// Apply `func` to `nargs` values and realize the result into `out`.
///
/// Evaluation failures, including panics inside primops, are reported
/// through `err`; `out` then stays unrealized.
#[no_mangle]
pub extern "C" fn ferry_apply(
    ctx: *const FerryContext,
    func: u64,
    args: *const u64,
    nargs: usize,
    out: u64,
    err: *mut FerryErrorContext,
) -> i32 {
    let args = value_ids(args, nargs);
    let result = context(ctx).apply(value_id(func), &args, value_id(out));
    status(err, result)
}

/// The set of builtins. Rooted for the lifetime of the context.
#[no_mangle]
pub extern "C" fn ferry_global_namespace(ctx: *const FerryContext) -> u64 {
    context(ctx).global_namespace().to_raw()
}

/// Register an extra root for `value`. Each call needs a matching
/// [`ferry_release`].
#[no_mangle]
pub extern "C" fn ferry_keep_alive(ctx: *const FerryContext, value: u64) {
    context(ctx).keep_alive(value_id(value));
}

#[no_mangle]
pub extern "C" fn ferry_release(ctx: *const FerryContext, value: u64) {
    context(ctx).release(value_id(value));
}

/// Run a collection cycle. Returns the number of freed values.
#[no_mangle]
pub extern "C" fn ferry_collect_garbage(ctx: *const FerryContext) -> usize {
    context(ctx).collect_garbage()
}

/// Run a collection cycle if `FERRY_GC_THRESHOLD` allocations happened
/// since the last one. Returns the number of freed values, `0` if none was
/// due.
#[no_mangle]
pub extern "C" fn ferry_collect_garbage_if_due(ctx: *const FerryContext) -> usize {
    context(ctx).collect_garbage_if_due().unwrap_or(0)
}
