//! Where the pool gets its memory from.
//!
//! The allocator never talks to the operating system directly. It asks a
//! [`MemorySource`] for an [`Extent`] of at least some number of header
//! units and folds whatever comes back into its free list.

mod fixed;
mod mmap;
mod sbrk;

use std::ptr::NonNull;

pub use fixed::FixedSource;
pub use mmap::Mmap;
pub use sbrk::Sbrk;

use crate::{HEADER_ALIGN, HEADER_SIZE, error::SourceError};

/// Memory source used by [`LockedAllocator::system`](crate::LockedAllocator::system).
#[cfg(not(feature = "mmap"))]
pub type SystemSource = Sbrk;
#[cfg(feature = "mmap")]
pub type SystemSource = Mmap;

/// A contiguous range of memory newly handed to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
  base: NonNull<u8>,
  units: usize,
}

impl Extent {
  /// # Safety
  ///
  /// `base` must be aligned to [`HEADER_ALIGN`], valid for reads and writes of
  /// `units * HEADER_SIZE` bytes, and not used by anything else for as long
  /// as the pool that receives it is alive. `units` must be at least 1.
  pub unsafe fn new(
    base: NonNull<u8>,
    units: usize,
  ) -> Self {
    debug_assert_eq!(base.as_ptr() as usize % HEADER_ALIGN, 0);
    debug_assert!(units >= 1);
    Self { base, units }
  }

  pub fn base(&self) -> NonNull<u8> {
    self.base
  }

  pub fn units(&self) -> usize {
    self.units
  }

  pub fn bytes(&self) -> usize {
    self.units * HEADER_SIZE
  }
}

/// Provider of raw memory for an [`Allocator`](crate::Allocator).
pub trait MemorySource {
  /// Returns an extent of at least `units` header units. A source that
  /// loses a race over shared memory may hand back slightly less; the pool
  /// keeps it and asks again on the next lap.
  ///
  /// On failure the source must be left exactly as it was before the call.
  fn acquire(
    &mut self,
    units: usize,
  ) -> Result<Extent, SourceError>;
}

impl<S: MemorySource + ?Sized> MemorySource for &mut S {
  fn acquire(
    &mut self,
    units: usize,
  ) -> Result<Extent, SourceError> {
    (**self).acquire(units)
  }
}

/// Byte length of `units` header units.
pub(crate) fn units_to_bytes(units: usize) -> Result<usize, SourceError> {
  units
    .checked_mul(HEADER_SIZE)
    .filter(|bytes| *bytes <= isize::MAX as usize)
    .ok_or(SourceError::Overflow { units })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_units_to_bytes() {
    assert_eq!(units_to_bytes(3).unwrap(), 3 * HEADER_SIZE);
    assert!(matches!(
      units_to_bytes(usize::MAX),
      Err(SourceError::Overflow { units: usize::MAX })
    ));
  }
}
