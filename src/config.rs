//! Allocator configuration.
//!
//! Placement strategy and memory source used to be chosen when the library
//! was compiled. Here they are plain values picked at construction time, so
//! several differently configured pools can live in one process. The cargo
//! features `best-fit` and `mmap` only change the defaults.

/// Minimum number of header units requested from a memory source per growth.
pub const NALLOC: usize = 1024;

/// How the free list is searched for a block to hand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
  /// Take the first block that is large enough, starting after the cursor.
  FirstFit,
  /// Take the smallest block that is large enough; an exact match ends the
  /// search early.
  BestFit,
}

impl Strategy {
  #[cfg(not(feature = "best-fit"))]
  pub const DEFAULT: Self = Strategy::FirstFit;
  #[cfg(feature = "best-fit")]
  pub const DEFAULT: Self = Strategy::BestFit;
}

impl Default for Strategy {
  fn default() -> Self {
    Self::DEFAULT
  }
}

/// Tunables for an [`Allocator`](crate::Allocator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
  pub strategy: Strategy,
  /// Lower bound, in header units, on every request made to the memory source.
  pub min_batch_units: usize,
}

impl Config {
  pub const DEFAULT: Self = Self {
    strategy: Strategy::DEFAULT,
    min_batch_units: NALLOC,
  };

  pub const fn new() -> Self {
    Self::DEFAULT
  }

  pub const fn strategy(
    mut self,
    strategy: Strategy,
  ) -> Self {
    self.strategy = strategy;
    self
  }

  pub const fn min_batch_units(
    mut self,
    units: usize,
  ) -> Self {
    self.min_batch_units = units;
    self
  }
}

impl Default for Config {
  fn default() -> Self {
    Self::DEFAULT
  }
}
