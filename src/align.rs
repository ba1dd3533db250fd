/// Rounds a byte count up to the next multiple of the header size.
///
/// Every block in the pool is a whole number of headers long, so this is the
/// granularity at which memory is handed out.
///
/// # Examples
///
/// ```rust
/// use coalloc::{HEADER_SIZE, align};
///
/// assert_eq!(align!(1), HEADER_SIZE);
/// assert_eq!(align!(HEADER_SIZE), HEADER_SIZE);
/// assert_eq!(align!(HEADER_SIZE + 1), 2 * HEADER_SIZE);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + $crate::HEADER_SIZE - 1) & !($crate::HEADER_SIZE - 1)
  };
}

/// Number of header units a block needs to serve `bytes` of payload,
/// including the unit taken by the header itself.
///
/// Never overflows: the division happens before the extra unit is added.
///
/// ```rust
/// use coalloc::{HEADER_SIZE, units};
///
/// assert_eq!(units!(1), 2);
/// assert_eq!(units!(HEADER_SIZE), 2);
/// assert_eq!(units!(HEADER_SIZE + 1), 3);
/// ```
#[macro_export]
macro_rules! units {
  ($bytes:expr) => {
    usize::div_ceil($bytes, $crate::HEADER_SIZE) + 1
  };
}

#[cfg(test)]
mod tests {
  use crate::HEADER_SIZE;

  #[test]
  fn test_align() {
    let mut alignments = Vec::new();

    for i in 0..10 {
      let sizes = (HEADER_SIZE * i + 1)..=(HEADER_SIZE * (i + 1));

      let expected_alignment = HEADER_SIZE * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align!(size));
      }
    }
  }

  #[test]
  fn test_units_reserve_header() {
    for i in 1..10 {
      let size = HEADER_SIZE * i;
      assert_eq!(units!(size), i + 1);
      assert_eq!(units!(size + 1), i + 2);
      assert_eq!(units!(size), align!(size) / HEADER_SIZE + 1);
    }
  }

  #[test]
  fn test_units_saturate_without_overflow() {
    assert_eq!(units!(usize::MAX), usize::MAX / HEADER_SIZE + 2);
  }
}
