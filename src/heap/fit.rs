//! Placement strategies.
//!
//! Both walk the circular free list starting right after the cursor. When a
//! chosen block is larger than needed, the allocation is carved from its
//! tail so the remainder keeps its place (and its link) in the list.

use super::Allocator;
use crate::{header::Header, source::MemorySource};

impl<S: MemorySource> Allocator<S> {
  /// Hands out the first block of at least `nunits`, growing the pool each
  /// time the walk comes back around to the cursor empty handed.
  pub(super) unsafe fn first_fit(
    &mut self,
    nunits: usize,
  ) -> Option<*mut Header> {
    unsafe {
      let mut prevp = self.freep;
      let mut p = (*prevp).next;

      loop {
        if (*p).size >= nunits {
          let block = if (*p).size == nunits {
            (*prevp).next = (*p).next;
            p
          } else {
            Header::split_tail(p, nunits)
          };

          self.freep = prevp;
          return Some(block);
        }

        if p == self.freep {
          p = self.grow(nunits).ok()?;
        }

        prevp = p;
        p = (*p).next;
      }
    }
  }

  /// Hands out the smallest block of at least `nunits`. An exact match is
  /// taken as soon as it is seen; otherwise the whole cycle is walked and the
  /// earliest of the smallest candidates is split.
  pub(super) unsafe fn best_fit(
    &mut self,
    nunits: usize,
  ) -> Option<*mut Header> {
    unsafe {
      let mut prevp = self.freep;
      let mut p = (*prevp).next;
      let mut best: Option<(*mut Header, *mut Header)> = None;

      loop {
        if (*p).size == nunits {
          (*prevp).next = (*p).next;
          self.freep = prevp;
          return Some(p);
        }

        if (*p).size > nunits && best.is_none_or(|(_, candidate)| (*p).size < (*candidate).size) {
          best = Some((prevp, p));
        }

        if p == self.freep {
          if let Some((prev_best, candidate)) = best {
            let block = Header::split_tail(candidate, nunits);
            self.freep = prev_best;
            return Some(block);
          }

          p = self.grow(nunits).ok()?;
        }

        prevp = p;
        p = (*p).next;
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::pin::pin;

  use crate::{Allocator, Config, FixedSource, HEADER_SIZE, Strategy};

  /// Bytes that make a block of exactly `units` units.
  fn bytes(units: usize) -> usize {
    (units - 1) * HEADER_SIZE
  }

  /// Lays out one 96-unit extent as free blocks of 10, 30 and 50 units
  /// separated by 2-unit allocations, with the cursor parked on the 30-unit
  /// block so a walk meets them as 50, 10, 30.
  ///
  /// Returns the payloads of the 10- and 50-unit blocks.
  unsafe fn fragment(heap: std::pin::Pin<&mut Allocator<FixedSource>>) -> (*mut u8, *mut u8) {
    let mut heap = heap;
    unsafe {
      let _top = heap.as_mut().allocate(bytes(2));
      let fifty = heap.as_mut().allocate(bytes(50));
      let _upper = heap.as_mut().allocate(bytes(2));
      let thirty = heap.as_mut().allocate(bytes(30));
      let _lower = heap.as_mut().allocate(bytes(2));
      let ten = heap.as_mut().allocate(bytes(10));
      assert!(heap.free_blocks().next().is_none());

      heap.as_mut().release(ten);
      heap.as_mut().release(thirty);
      heap.as_mut().release(fifty);

      let walk: Vec<usize> = heap.free_blocks().map(|block| block.units).collect();
      assert_eq!(walk, [50, 10, 30]);

      (ten, fifty)
    }
  }

  fn heap(strategy: Strategy) -> Allocator<FixedSource> {
    let config = Config::new().strategy(strategy).min_batch_units(96);
    Allocator::with_config(FixedSource::new(96), config)
  }

  #[test]
  fn test_first_fit_takes_first_large_enough() {
    let mut heap = pin!(heap(Strategy::FirstFit));

    unsafe {
      let (ten, fifty) = fragment(heap.as_mut());
      let block = heap.as_mut().allocate(bytes(10));

      assert_ne!(block, ten);
      // Carved from the tail of the 50-unit block.
      assert_eq!(block as usize, fifty as usize + 40 * HEADER_SIZE);

      let walk: Vec<usize> = heap.free_blocks().map(|block| block.units).collect();
      assert_eq!(walk, [40, 10, 30]);
      assert!(heap.verify().is_ok());
    }
  }

  #[test]
  fn test_best_fit_takes_exact_match() {
    let mut heap = pin!(heap(Strategy::BestFit));

    unsafe {
      let (ten, _) = fragment(heap.as_mut());
      let block = heap.as_mut().allocate(bytes(10));

      assert_eq!(block, ten);

      // The cursor sits on the taken block's predecessor, so the next walk
      // starts at its successor.
      let walk: Vec<usize> = heap.free_blocks().map(|block| block.units).collect();
      assert_eq!(walk, [30, 50]);
      assert!(heap.verify().is_ok());
    }
  }

  #[test]
  fn test_best_fit_splits_smallest_candidate() {
    let mut heap = pin!(heap(Strategy::BestFit));

    unsafe {
      fragment(heap.as_mut());
      let block = heap.as_mut().allocate(bytes(20));

      assert!(!block.is_null());

      // The 30-unit block was split; the walk starts at its remainder.
      let walk: Vec<usize> = heap.free_blocks().map(|block| block.units).collect();
      assert_eq!(walk, [10, 50, 10]);
      assert!(heap.verify().is_ok());
    }
  }

  #[test]
  fn test_best_fit_cursor_precedes_split_block() {
    let mut heap = pin!(heap(Strategy::BestFit));

    unsafe {
      let (_, fifty) = fragment(heap.as_mut());
      // Only the 50-unit block fits, and the lap ends on the cursor after it.
      let block = heap.as_mut().allocate(bytes(40));

      assert_eq!(block as usize, fifty as usize + 10 * HEADER_SIZE);

      let walk: Vec<usize> = heap.free_blocks().map(|block| block.units).collect();
      assert_eq!(walk, [10, 10, 30]);
      assert!(heap.verify().is_ok());
    }
  }

  #[test]
  fn test_first_fit_splits_first_candidate() {
    let mut heap = pin!(heap(Strategy::FirstFit));

    unsafe {
      fragment(heap.as_mut());
      heap.as_mut().allocate(bytes(20));

      let walk: Vec<usize> = heap.free_blocks().map(|block| block.units).collect();
      assert_eq!(walk, [30, 10, 30]);
    }
  }
}
