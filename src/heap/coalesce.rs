use super::Allocator;
use crate::{error::SourceError, header::Header, source::MemorySource};

impl<S: MemorySource> Allocator<S> {
  /// Links `bp` into the free list at its address-ordered position and
  /// merges it with whichever neighbours it touches. Leaves the cursor on the
  /// block that now precedes (or swallowed) `bp`.
  pub(super) unsafe fn release_block(
    &mut self,
    bp: *mut Header,
  ) {
    unsafe {
      let mut p = self.freep;

      while !(bp > p && bp < (*p).next) {
        // On the wrap link: `bp` lies above the highest or below the lowest
        // free block.
        if p >= (*p).next && (bp > p || bp < (*p).next) {
          break;
        }
        p = (*p).next;
      }

      let upper = (*p).next;
      if Header::adjoins(bp, upper) {
        Header::absorb(bp, upper);
      } else {
        (*bp).next = upper;
      }

      if Header::adjoins(p, bp) {
        Header::absorb(p, bp);
      } else {
        (*p).next = bp;
      }

      self.freep = p;
    }
  }

  /// Pulls at least `nunits` (and no less than the configured batch) from the
  /// memory source and releases it into the free list as one block.
  ///
  /// Returns the cursor to resume searching from. Nothing is touched when the
  /// source fails.
  pub(super) unsafe fn grow(
    &mut self,
    nunits: usize,
  ) -> Result<*mut Header, SourceError> {
    let units = nunits.max(self.config.min_batch_units);

    let extent = self.source.acquire(units).inspect_err(|err| {
      log::warn!("failed to get more memory for {units} units: {err}");
    })?;

    log::trace!(
      "pool grew by {} units at {:p}",
      extent.units(),
      extent.base()
    );

    unsafe {
      let block = extent.base().as_ptr().cast::<Header>();
      (*block).size = extent.units();
      self.release_block(block);
    }

    Ok(self.freep)
  }
}

#[cfg(test)]
mod tests {
  use std::pin::pin;

  use crate::{Allocator, Config, FixedSource, HEADER_SIZE, Strategy};

  fn heap(units: usize) -> Allocator<FixedSource> {
    let config = Config::new()
      .strategy(Strategy::FirstFit)
      .min_batch_units(units);
    Allocator::with_config(FixedSource::new(units), config)
  }

  /// Carves `count` blocks of `units` each from a pool sized to fit exactly.
  unsafe fn carve(
    heap: std::pin::Pin<&mut Allocator<FixedSource>>,
    count: usize,
    units: usize,
  ) -> Vec<*mut u8> {
    let mut heap = heap;
    let mut blocks: Vec<*mut u8> = (0..count)
      .map(|_| unsafe { heap.as_mut().allocate((units - 1) * HEADER_SIZE) })
      .collect();
    blocks.sort();
    blocks
  }

  #[test]
  fn test_release_merges_with_successor() {
    let mut heap = pin!(heap(12));

    unsafe {
      let blocks = carve(heap.as_mut(), 3, 4);
      heap.as_mut().release(blocks[2]);
      heap.as_mut().release(blocks[1]);

      let free: Vec<_> = heap.free_blocks().collect();
      assert_eq!(free.len(), 1);
      assert_eq!(free[0].addr, blocks[1] as usize - HEADER_SIZE);
      assert_eq!(free[0].units, 8);
    }
  }

  #[test]
  fn test_release_merges_with_predecessor() {
    let mut heap = pin!(heap(12));

    unsafe {
      let blocks = carve(heap.as_mut(), 3, 4);
      heap.as_mut().release(blocks[0]);
      heap.as_mut().release(blocks[1]);

      let free: Vec<_> = heap.free_blocks().collect();
      assert_eq!(free.len(), 1);
      assert_eq!(free[0].addr, blocks[0] as usize - HEADER_SIZE);
      assert_eq!(free[0].units, 8);
    }
  }

  #[test]
  fn test_release_bridges_both_neighbours() {
    let mut heap = pin!(heap(12));

    unsafe {
      let blocks = carve(heap.as_mut(), 3, 4);
      heap.as_mut().release(blocks[0]);
      heap.as_mut().release(blocks[2]);
      assert_eq!(heap.free_blocks().count(), 2);

      heap.as_mut().release(blocks[1]);

      let free: Vec<_> = heap.free_blocks().collect();
      assert_eq!(free.len(), 1);
      assert_eq!(free[0].units, 12);
      assert!(heap.verify().is_ok());
    }
  }

  #[test]
  fn test_release_keeps_address_order_across_wrap() {
    let mut heap = pin!(heap(20));

    unsafe {
      let blocks = carve(heap.as_mut(), 5, 4);

      // Lowest and highest first, so later releases land on both sides of
      // the wrap link.
      for index in [4, 0, 2] {
        heap.as_mut().release(blocks[index]);
        assert!(heap.verify().is_ok());
      }

      let mut addrs: Vec<usize> = heap.free_blocks().map(|block| block.addr).collect();
      addrs.sort_unstable();
      let expected: Vec<usize> = [0, 2, 4]
        .iter()
        .map(|&index| blocks[index] as usize - HEADER_SIZE)
        .collect();
      assert_eq!(addrs, expected);

      heap.as_mut().release(blocks[3]);
      heap.as_mut().release(blocks[1]);
      assert_eq!(heap.free_blocks().count(), 1);
      assert!(heap.verify().is_ok());
    }
  }

  #[test]
  fn test_cursor_left_before_released_block() {
    let mut heap = pin!(heap(12));

    unsafe {
      let blocks = carve(heap.as_mut(), 3, 4);
      heap.as_mut().release(blocks[0]);
      heap.as_mut().release(blocks[2]);

      // The walk starts right after the cursor, which sits on the block
      // preceding the last release.
      let first = heap.free_blocks().next().unwrap();
      assert_eq!(first.addr, blocks[2] as usize - HEADER_SIZE);
    }
  }
}
