//! The allocator proper.
//!
//! ```text
//!   Free list (address ordered, circular):
//!
//!        freep
//!          │
//!          ▼
//!   ┌────────────┐    ┌────────────┐    ┌────────────┐
//!   │ 0x1000 [8] │───▶│ 0x1400 [2] │───▶│ 0x2000 [64]│───┐
//!   └────────────┘    └────────────┘    └────────────┘   │
//!          ▲                                             │
//!          └──────────────── wrap link ──────────────────┘
//! ```
//!
//! The sentinel is a zero-sized member of that cycle living inside the
//! [`Allocator`] value itself. Since free blocks may link to it, the
//! allocator must stay put once used, which is why every mutating entry
//! point takes `Pin<&mut Self>`.

mod coalesce;
mod fit;

use std::{marker::PhantomPinned, pin::Pin, ptr};

use crate::{
  Config, HEADER_SIZE, Strategy,
  error::HeapError,
  header::Header,
  source::MemorySource,
  units,
};

/// A free-list allocator serving variable-size requests from memory pulled
/// out of a [`MemorySource`].
///
/// Not thread safe: wrap it in a lock (see [`LockedAllocator`](crate::LockedAllocator))
/// before sharing it.
pub struct Allocator<S> {
  base: Header,
  freep: *mut Header,
  source: S,
  config: Config,
  _pinned: PhantomPinned,
}

// Every pointer held refers either to `base` or to memory owned by the pool.
unsafe impl<S: Send> Send for Allocator<S> {}

/// A free block as seen by [`Allocator::free_blocks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeBlock {
  /// Address of the block's header.
  pub addr: usize,
  /// Size in header units, header included.
  pub units: usize,
}

impl FreeBlock {
  pub fn bytes(&self) -> usize {
    self.units * HEADER_SIZE
  }

  /// Address one past the end of the block.
  pub fn end(&self) -> usize {
    self.addr + self.bytes()
  }
}

impl<S: MemorySource> Allocator<S> {
  pub const fn new(source: S) -> Self {
    Self::with_config(source, Config::DEFAULT)
  }

  pub const fn with_config(
    source: S,
    config: Config,
  ) -> Self {
    Self {
      base: Header::sentinel(),
      freep: ptr::null_mut(),
      source,
      config,
      _pinned: PhantomPinned,
    }
  }

  pub fn source(&self) -> &S {
    &self.source
  }

  fn state(self: Pin<&mut Self>) -> &mut Self {
    // SAFETY: nothing below moves the allocator out of its pinned place.
    unsafe { self.get_unchecked_mut() }
  }

  fn base_ptr(&mut self) -> *mut Header {
    &raw mut self.base
  }

  /// Sets up the one-node sentinel cycle on first use.
  fn ensure_init(&mut self) {
    if self.freep.is_null() {
      let base = self.base_ptr();
      self.base.next = base;
      self.base.size = 0;
      self.freep = base;
    }
  }

  /// Allocates `nbytes` bytes and returns a pointer to them, or null if
  /// `nbytes` is zero or the memory source is exhausted.
  ///
  /// The pointer is aligned to [`HEADER_ALIGN`](crate::HEADER_ALIGN).
  ///
  /// # Safety
  ///
  /// Every block previously released into this allocator must have come
  /// from it, and must not have been released twice.
  pub unsafe fn allocate(
    self: Pin<&mut Self>,
    nbytes: usize,
  ) -> *mut u8 {
    unsafe { self.state().allocate_inner(nbytes) }
  }

  unsafe fn allocate_inner(
    &mut self,
    nbytes: usize,
  ) -> *mut u8 {
    if nbytes == 0 {
      return ptr::null_mut();
    }

    let nunits = units!(nbytes);
    self.ensure_init();

    let block = unsafe {
      match self.config.strategy {
        Strategy::FirstFit => self.first_fit(nunits),
        Strategy::BestFit => self.best_fit(nunits),
      }
    };

    match block {
      Some(block) => unsafe { Header::payload(block) },
      None => ptr::null_mut(),
    }
  }

  /// Returns a block to the free list, merging it with address-adjacent
  /// free neighbours. Null is ignored.
  ///
  /// # Safety
  ///
  /// `payload` must be null or a live pointer returned by this allocator.
  pub unsafe fn release(
    self: Pin<&mut Self>,
    payload: *mut u8,
  ) {
    unsafe { self.state().release_inner(payload) }
  }

  unsafe fn release_inner(
    &mut self,
    payload: *mut u8,
  ) {
    if payload.is_null() {
      return;
    }

    self.ensure_init();
    unsafe { self.release_block(Header::from_payload(payload)) }
  }

  /// Moves a block's contents into a freshly allocated block of `nbytes`.
  ///
  /// A null `payload` behaves like [`allocate`](Self::allocate); a zero
  /// `nbytes` behaves like [`release`](Self::release) and returns null. If
  /// the new allocation fails, null is returned and the old block stays
  /// valid.
  ///
  /// # Safety
  ///
  /// Same as [`release`](Self::release) for `payload`.
  pub unsafe fn resize(
    self: Pin<&mut Self>,
    payload: *mut u8,
    nbytes: usize,
  ) -> *mut u8 {
    let heap = self.state();

    unsafe {
      if payload.is_null() {
        return heap.allocate_inner(nbytes);
      }

      if nbytes == 0 {
        heap.release_inner(payload);
        return ptr::null_mut();
      }

      let moved = heap.allocate_inner(nbytes);
      if moved.is_null() {
        return ptr::null_mut();
      }

      let old = Header::from_payload(payload);
      let old_payload = ((*old).size - 1) * HEADER_SIZE;
      ptr::copy_nonoverlapping(payload, moved, nbytes.min(old_payload));
      heap.release_inner(payload);

      moved
    }
  }

  /// Usable bytes behind a pointer returned by this allocator.
  ///
  /// # Safety
  ///
  /// `payload` must be a live pointer returned by this allocator.
  pub unsafe fn usable_size(
    &self,
    payload: *mut u8,
  ) -> usize {
    unsafe { ((*Header::from_payload(payload)).size - 1) * HEADER_SIZE }
  }

  /// Walks the free list once, starting right after the cursor.
  pub fn free_blocks(&self) -> FreeBlocks<'_, S> {
    let next = if self.freep.is_null() {
      ptr::null_mut()
    } else {
      unsafe { (*self.freep).next }
    };

    FreeBlocks {
      heap: self,
      next,
      done: self.freep.is_null(),
    }
  }

  /// Checks every free-list invariant and reports the first one broken.
  pub fn verify(&self) -> Result<(), HeapError> {
    if self.freep.is_null() {
      return Ok(());
    }

    let base = (&raw const self.base).cast_mut();
    let mut descents = 0;
    let mut cursor_seen = false;
    let mut slow = base;
    let mut p = base;
    let mut steps = 0usize;

    unsafe {
      loop {
        let next = (*p).next;
        if next.is_null() {
          return Err(HeapError::Unterminated);
        }

        cursor_seen |= p == self.freep;

        if p != base && (*p).size == 0 {
          return Err(HeapError::EmptyBlock { at: p as usize });
        }

        if p >= next {
          descents += 1;
          if descents > 1 {
            return Err(HeapError::Unordered {
              at: p as usize,
              next: next as usize,
            });
          }
        } else if Header::adjoins(p, next) {
          return Err(HeapError::Adjacent {
            lower: p as usize,
            upper: next as usize,
          });
        } else if p != base && next != base && Header::end(p) > next {
          return Err(HeapError::Overlap {
            lower: p as usize,
            upper: next as usize,
          });
        }

        p = next;
        if p == base {
          break;
        }

        // Half-speed follower: meeting it again means a cycle that skips
        // the sentinel.
        steps += 1;
        if steps % 2 == 0 {
          slow = (*slow).next;
        }
        if p == slow {
          return Err(HeapError::Unterminated);
        }
      }
    }

    if !cursor_seen {
      return Err(HeapError::CursorDetached {
        at: self.freep as usize,
      });
    }

    Ok(())
  }
}

/// Iterator returned by [`Allocator::free_blocks`].
pub struct FreeBlocks<'a, S> {
  heap: &'a Allocator<S>,
  next: *mut Header,
  done: bool,
}

impl<S> Iterator for FreeBlocks<'_, S> {
  type Item = FreeBlock;

  fn next(&mut self) -> Option<FreeBlock> {
    let base = (&raw const self.heap.base).cast_mut();

    while !self.done {
      let p = self.next;
      self.done = p == self.heap.freep;
      self.next = unsafe { (*p).next };

      if p != base {
        return Some(FreeBlock {
          addr: p as usize,
          units: unsafe { (*p).size },
        });
      }
    }

    None
  }
}
