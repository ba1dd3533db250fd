//! C allocation entry points over the process-wide pool.
//!
//! Built with the `c-abi` feature. Statically linking the crate into a
//! program shadows the C runtime's `malloc`, `free`, `realloc` and `calloc`
//! for the whole process. The aligned variants (`memalign`,
//! `posix_memalign`, `aligned_alloc`) are not provided.

use std::ffi::c_void;

use crate::LockedAllocator;

static HEAP: LockedAllocator = LockedAllocator::system();

/// # Safety
///
/// Standard C `malloc` contract.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn malloc(size: usize) -> *mut c_void {
  unsafe { HEAP.allocate(size).cast() }
}

/// # Safety
///
/// `ptr` must be null or come from this module's `malloc`, `calloc` or
/// `realloc` and not have been freed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free(ptr: *mut c_void) {
  unsafe { HEAP.release(ptr.cast()) }
}

/// # Safety
///
/// Same as [`free`] for `ptr`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn realloc(
  ptr: *mut c_void,
  size: usize,
) -> *mut c_void {
  unsafe { HEAP.resize(ptr.cast(), size).cast() }
}

/// Zeroed allocation of `nmemb * size` bytes; null on overflow.
///
/// # Safety
///
/// Standard C `calloc` contract.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn calloc(
  nmemb: usize,
  size: usize,
) -> *mut c_void {
  unsafe { HEAP.allocate_zeroed(nmemb, size).cast() }
}
