use std::{mem, ptr};

/// Bookkeeping prefixed to every block, free or allocated.
///
/// `size` counts whole headers, the header's own unit included. `next` is
/// only meaningful while the block sits on the free list.
#[repr(C)]
pub(crate) struct Header {
  pub(crate) next: *mut Header,
  pub(crate) size: usize,
}

/// Size of one header, and therefore of one allocation unit.
pub const HEADER_SIZE: usize = mem::size_of::<Header>();

/// Alignment of every header and of every payload handed out.
pub const HEADER_ALIGN: usize = mem::align_of::<Header>();

const _: () = assert!(HEADER_SIZE.is_power_of_two());
const _: () = assert!(HEADER_SIZE % HEADER_ALIGN == 0);
const _: () = assert!(HEADER_ALIGN >= mem::align_of::<usize>());

impl Header {
  /// Zero-sized node that bootstraps the free list.
  pub(crate) const fn sentinel() -> Self {
    Self {
      next: ptr::null_mut(),
      size: 0,
    }
  }

  /// Steps back one header from a payload pointer.
  ///
  /// # Safety
  ///
  /// `payload` must have been produced by [`Header::payload`].
  pub(crate) unsafe fn from_payload(payload: *mut u8) -> *mut Header {
    unsafe { payload.cast::<Header>().sub(1) }
  }

  /// First byte after the header.
  ///
  /// # Safety
  ///
  /// `block` must point to a header followed by at least one unit.
  pub(crate) unsafe fn payload(block: *mut Header) -> *mut u8 {
    unsafe { block.add(1).cast() }
  }

  /// Address one past the last unit of `block`, i.e. where an
  /// address-adjacent successor would start. Only used for comparisons.
  ///
  /// # Safety
  ///
  /// `block` must point to a readable header.
  pub(crate) unsafe fn end(block: *mut Header) -> *mut Header {
    unsafe { block.wrapping_add((*block).size) }
  }

  /// Whether `upper` starts exactly where `lower` ends.
  ///
  /// The sentinel has no extent, so it never adjoins anything in either
  /// direction.
  ///
  /// # Safety
  ///
  /// Both pointers must point to readable headers.
  pub(crate) unsafe fn adjoins(
    lower: *mut Header,
    upper: *mut Header,
  ) -> bool {
    unsafe { (*lower).size != 0 && (*upper).size != 0 && Header::end(lower) == upper }
  }

  /// Folds `upper` into `lower`, inheriting its free-list link.
  ///
  /// # Safety
  ///
  /// `Header::adjoins(lower, upper)` must hold and `upper` must be free.
  pub(crate) unsafe fn absorb(
    lower: *mut Header,
    upper: *mut Header,
  ) {
    unsafe {
      (*lower).size += (*upper).size;
      (*lower).next = (*upper).next;
    }
  }

  /// Carves `nunits` off the tail of `block` and returns the carved header.
  ///
  /// The leading remainder keeps its address and its list link.
  ///
  /// # Safety
  ///
  /// `block` must be a free block with `size > nunits`.
  pub(crate) unsafe fn split_tail(
    block: *mut Header,
    nunits: usize,
  ) -> *mut Header {
    unsafe {
      (*block).size -= nunits;
      let tail = block.add((*block).size);
      (*tail).size = nunits;
      tail
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn region<const N: usize>() -> [Header; N] {
    std::array::from_fn(|_| Header::sentinel())
  }

  #[test]
  fn test_payload_round_trip() {
    let mut blocks = region::<4>();
    let block = blocks.as_mut_ptr();

    unsafe {
      let payload = Header::payload(block);
      assert_eq!(payload as usize, block as usize + HEADER_SIZE);
      assert_eq!(payload as usize % HEADER_ALIGN, 0);
      assert_eq!(Header::from_payload(payload), block);
    }
  }

  #[test]
  fn test_split_tail_keeps_head_in_place() {
    let mut blocks = region::<8>();
    let block = blocks.as_mut_ptr();

    unsafe {
      (*block).size = 8;
      let tail = Header::split_tail(block, 3);

      assert_eq!((*block).size, 5);
      assert_eq!((*tail).size, 3);
      assert_eq!(tail, block.add(5));
      assert!(Header::adjoins(block, tail));
    }
  }

  #[test]
  fn test_absorb_merges_neighbours() {
    let mut blocks = region::<6>();
    let base = blocks.as_mut_ptr();

    unsafe {
      let upper = base.add(2);
      (*base).size = 2;
      (*upper).size = 4;
      (*upper).next = base;

      assert!(Header::adjoins(base, upper));
      assert!(!Header::adjoins(upper, base));

      Header::absorb(base, upper);
      assert_eq!((*base).size, 6);
      assert_eq!((*base).next, base);
    }
  }

  #[test]
  fn test_sentinel_never_adjoins() {
    let mut blocks = region::<2>();
    let base = blocks.as_mut_ptr();

    unsafe {
      let next = base.add(1);
      (*next).size = 1;

      assert!(!Header::adjoins(base, base));
      assert!(!Header::adjoins(base, next));
    }
  }
}
