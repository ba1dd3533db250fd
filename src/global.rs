//! Locked wrapper making an [`Allocator`] usable from a `static`.
//!
//! ```rust,ignore
//! use coalloc::LockedAllocator;
//!
//! #[global_allocator]
//! static HEAP: LockedAllocator = LockedAllocator::system();
//! ```

use std::{
  alloc::{GlobalAlloc, Layout},
  pin::Pin,
  ptr,
};

use spin::Mutex;

use crate::{
  Allocator, Config, HEADER_ALIGN,
  source::{MemorySource, SystemSource},
};

/// An [`Allocator`] behind a spin lock.
///
/// The allocator inside is pinned in place on first use, so a
/// `LockedAllocator` must not be moved once it has served a request. Placing
/// it in a `static` takes care of that. Any logger installed while it is the
/// global allocator must not allocate from inside `log` calls, or the lock
/// will be re-entered.
pub struct LockedAllocator<S = SystemSource> {
  inner: Mutex<Allocator<S>>,
}

impl LockedAllocator<SystemSource> {
  /// The process-wide pool, fed by the memory source selected at build time.
  pub const fn system() -> Self {
    Self::new(SystemSource::new(), Config::DEFAULT)
  }
}

impl<S: MemorySource> LockedAllocator<S> {
  pub const fn new(
    source: S,
    config: Config,
  ) -> Self {
    Self {
      inner: Mutex::new(Allocator::with_config(source, config)),
    }
  }

  /// Runs `f` with exclusive, pinned access to the allocator.
  pub fn with<R>(
    &self,
    f: impl FnOnce(Pin<&mut Allocator<S>>) -> R,
  ) -> R {
    let mut guard = self.inner.lock();
    // SAFETY: the allocator never leaves the mutex, and the mutex never
    // moves while `self` is in use.
    let heap = unsafe { Pin::new_unchecked(&mut *guard) };
    f(heap)
  }

  /// # Safety
  ///
  /// See [`Allocator::allocate`].
  pub unsafe fn allocate(
    &self,
    nbytes: usize,
  ) -> *mut u8 {
    self.with(|heap| unsafe { heap.allocate(nbytes) })
  }

  /// Zero-filled block of `count * size` bytes. Null when the product
  /// overflows, without touching the pool.
  ///
  /// # Safety
  ///
  /// See [`Allocator::allocate`].
  pub unsafe fn allocate_zeroed(
    &self,
    count: usize,
    size: usize,
  ) -> *mut u8 {
    let Some(nbytes) = count.checked_mul(size) else {
      return ptr::null_mut();
    };

    unsafe {
      let block = self.allocate(nbytes);
      if !block.is_null() {
        ptr::write_bytes(block, 0, nbytes);
      }
      block
    }
  }

  /// # Safety
  ///
  /// See [`Allocator::release`].
  pub unsafe fn release(
    &self,
    payload: *mut u8,
  ) {
    self.with(|heap| unsafe { heap.release(payload) })
  }

  /// # Safety
  ///
  /// See [`Allocator::resize`].
  pub unsafe fn resize(
    &self,
    payload: *mut u8,
    nbytes: usize,
  ) -> *mut u8 {
    self.with(|heap| unsafe { heap.resize(payload, nbytes) })
  }
}

unsafe impl<S: MemorySource + Send> GlobalAlloc for LockedAllocator<S> {
  unsafe fn alloc(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() > HEADER_ALIGN {
      return ptr::null_mut();
    }
    unsafe { self.allocate(layout.size()) }
  }

  unsafe fn alloc_zeroed(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() > HEADER_ALIGN {
      return ptr::null_mut();
    }
    unsafe { self.allocate_zeroed(1, layout.size()) }
  }

  unsafe fn dealloc(
    &self,
    ptr: *mut u8,
    _layout: Layout,
  ) {
    unsafe { self.release(ptr) }
  }

  unsafe fn realloc(
    &self,
    ptr: *mut u8,
    layout: Layout,
    new_size: usize,
  ) -> *mut u8 {
    if layout.align() > HEADER_ALIGN {
      return ptr::null_mut();
    }
    unsafe { self.resize(ptr, new_size) }
  }
}
