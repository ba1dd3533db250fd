use std::ptr::NonNull;

use libc::{c_void, intptr_t, sbrk};

use super::{Extent, MemorySource, units_to_bytes};
use crate::{HEADER_ALIGN, HEADER_SIZE, error::SourceError};

/// Grows the pool by moving the program break with `sbrk(2)`.
///
/// Successive extents are normally address-contiguous, so the free list ends
/// up merging them into one large block. The break is shared with anything
/// else in the process that calls `brk`/`sbrk`; if someone else moved it in
/// between, the new extent simply lands elsewhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sbrk;

impl Sbrk {
  pub const fn new() -> Self {
    Self
  }
}

fn failed(address: *mut c_void) -> bool {
  address == usize::MAX as *mut c_void
}

/// Bytes to skip at `address` to reach header alignment.
fn padding(address: usize) -> usize {
  address.wrapping_neg() & (HEADER_ALIGN - 1)
}

impl MemorySource for Sbrk {
  fn acquire(
    &mut self,
    units: usize,
  ) -> Result<Extent, SourceError> {
    let bytes = units_to_bytes(units)?;

    unsafe {
      let current = sbrk(0);
      if failed(current) {
        return Err(SourceError::Os(std::io::Error::last_os_error()));
      }

      // The break is not guaranteed to sit on a header boundary.
      let expected = padding(current as usize);
      let increment = bytes
        .checked_add(expected)
        .ok_or(SourceError::Overflow { units })?;
      let delta = intptr_t::try_from(increment).map_err(|_| SourceError::Overflow { units })?;

      let address = sbrk(delta);
      if failed(address) {
        return Err(SourceError::Os(std::io::Error::last_os_error()));
      }

      // Someone else may have moved the break since it was read.
      let (skip, granted) = usable(address as usize, increment);
      if granted == 0 {
        return Err(SourceError::Exhausted {
          requested: units,
          available: 0,
        });
      }

      let base = address.cast::<u8>().add(skip);
      Ok(Extent::new(NonNull::new_unchecked(base), granted))
    }
  }
}

/// Padding and whole units usable in `increment` bytes starting at `address`.
fn usable(
  address: usize,
  increment: usize,
) -> (usize, usize) {
  let skip = padding(address);
  (skip, increment.saturating_sub(skip) / HEADER_SIZE)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_aligned_break_keeps_every_unit() {
    let address = HEADER_ALIGN * 64;
    assert_eq!(usable(address, 10 * HEADER_SIZE), (0, 10));
  }

  #[test]
  fn test_padding_follows_returned_address() {
    // Padding was planned for an aligned break, but the break had moved.
    let address = HEADER_ALIGN * 64 + 3;
    let (skip, units) = usable(address, 10 * HEADER_SIZE);

    assert_eq!(skip, HEADER_ALIGN - 3);
    assert_eq!((address + skip) % HEADER_ALIGN, 0);
    assert_eq!(units, 9);
    assert!(skip + units * HEADER_SIZE <= 10 * HEADER_SIZE);
  }

  #[test]
  fn test_planned_padding_still_grants_full_request() {
    let address = HEADER_ALIGN * 64 + 3;
    let increment = 10 * HEADER_SIZE + padding(address);

    assert_eq!(usable(address, increment), (HEADER_ALIGN - 3, 10));
  }
}
