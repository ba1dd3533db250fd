use std::{mem::MaybeUninit, ptr::NonNull};

use super::{Extent, MemorySource};
use crate::{HEADER_SIZE, error::SourceError, header::Header};

/// Hands out extents from one owned, fixed-size region.
///
/// Extents are carved front to back, so consecutive grants are always
/// address-contiguous. Every request is recorded, and failures can be
/// injected on a chosen call, which makes the source handy for exercising
/// growth and out-of-memory paths deterministically.
#[derive(Debug)]
pub struct FixedSource {
  region: NonNull<Header>,
  capacity: usize,
  used: usize,
  requests: Vec<usize>,
  fail_on: Option<usize>,
  fail_always: bool,
}

// The region is owned exclusively by this value.
unsafe impl Send for FixedSource {}

impl FixedSource {
  /// A source owning `units` header units of fresh memory.
  pub fn new(units: usize) -> Self {
    let storage: Box<[MaybeUninit<Header>]> = Box::new_uninit_slice(units);
    let region = NonNull::new(Box::into_raw(storage).cast::<Header>()).unwrap_or(NonNull::dangling());

    Self {
      region,
      capacity: units,
      used: 0,
      requests: Vec::new(),
      fail_on: None,
      fail_always: false,
    }
  }

  /// Makes the `call`-th request (counting from 1, including past ones) fail.
  pub fn fail_on(
    mut self,
    call: usize,
  ) -> Self {
    self.fail_on = Some(call);
    self
  }

  /// Makes every further request fail until switched off again.
  pub fn set_fail_always(
    &mut self,
    fail: bool,
  ) {
    self.fail_always = fail;
  }

  /// Units requested by each call so far, in order, failed calls included.
  pub fn requests(&self) -> &[usize] {
    &self.requests
  }

  pub fn remaining(&self) -> usize {
    self.capacity - self.used
  }

  /// Whether `address` falls inside the owned region.
  pub fn contains(
    &self,
    address: *const u8,
  ) -> bool {
    let start = self.region.as_ptr() as usize;
    let address = address as usize;
    address >= start && address < start + self.capacity * HEADER_SIZE
  }
}

impl MemorySource for FixedSource {
  fn acquire(
    &mut self,
    units: usize,
  ) -> Result<Extent, SourceError> {
    self.requests.push(units);
    let call = self.requests.len();

    if self.fail_always || self.fail_on == Some(call) {
      return Err(SourceError::Injected { call });
    }

    let available = self.remaining();
    if units == 0 || units > available {
      return Err(SourceError::Exhausted {
        requested: units,
        available,
      });
    }

    let base = unsafe { self.region.add(self.used) };
    self.used += units;

    unsafe { Ok(Extent::new(base.cast(), units)) }
  }
}

impl Drop for FixedSource {
  fn drop(&mut self) {
    let slice = NonNull::slice_from_raw_parts(self.region.cast::<MaybeUninit<Header>>(), self.capacity);
    drop(unsafe { Box::from_raw(slice.as_ptr()) });
  }
}
