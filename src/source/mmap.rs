use std::{io, ptr, ptr::NonNull};

use libc::{
  MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ, PROT_WRITE, _SC_PAGESIZE, c_void, mmap, sbrk,
  sysconf,
};

use super::{Extent, MemorySource, units_to_bytes};
use crate::{HEADER_SIZE, error::SourceError};

const FALLBACK_PAGE_SIZE: usize = 4096;

/// Grows the pool with anonymous private mappings.
///
/// Requests are rounded up to whole pages. The source remembers the highest
/// end of any mapping so far (starting at the program break) and passes that as the
/// placement hint for the next one, so extents tend to be laid out at
/// increasing, often contiguous, addresses. The kernel is free to ignore the
/// hint.
#[derive(Debug)]
pub struct Mmap {
  end_of_heap: *mut u8,
  page_size: usize,
}

impl Mmap {
  pub const fn new() -> Self {
    Self {
      end_of_heap: ptr::null_mut(),
      page_size: 0,
    }
  }

  /// Address the next mapping will be requested at, once known.
  pub fn end_of_heap(&self) -> *mut u8 {
    self.end_of_heap
  }

  pub fn page_size(&mut self) -> usize {
    if self.page_size == 0 {
      let queried = unsafe { sysconf(_SC_PAGESIZE) };
      self.page_size = usize::try_from(queried)
        .ok()
        .filter(|size| size.is_power_of_two() && *size >= HEADER_SIZE)
        .unwrap_or(FALLBACK_PAGE_SIZE);
    }
    self.page_size
  }
}

impl Default for Mmap {
  fn default() -> Self {
    Self::new()
  }
}

// The hint is only ever handed back to the kernel.
unsafe impl Send for Mmap {}

impl MemorySource for Mmap {
  fn acquire(
    &mut self,
    units: usize,
  ) -> Result<Extent, SourceError> {
    let bytes = units_to_bytes(units)?;
    let page_size = self.page_size();
    let length = bytes
      .div_ceil(page_size)
      .checked_mul(page_size)
      .ok_or(SourceError::Overflow { units })?;

    let hint = if self.end_of_heap.is_null() {
      unsafe { sbrk(0) }.cast::<u8>()
    } else {
      self.end_of_heap
    };

    let address = unsafe {
      mmap(
        hint.cast::<c_void>(),
        length,
        PROT_READ | PROT_WRITE,
        MAP_PRIVATE | MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if address == MAP_FAILED {
      return Err(SourceError::Os(io::Error::last_os_error()));
    }

    let base = address.cast::<u8>();
    let end = base.wrapping_add(length);
    // A mapping placed below the hint never pulls it back.
    if end as usize > self.end_of_heap as usize {
      self.end_of_heap = end;
    }

    unsafe { Ok(Extent::new(NonNull::new_unchecked(base), length / HEADER_SIZE)) }
  }
}
