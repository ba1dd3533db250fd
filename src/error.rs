use std::io;

use thiserror::Error;

/// Why a memory source could not provide a new extent.
#[derive(Debug, Error)]
pub enum SourceError {
  #[error("request for {units} units does not fit in the address space")]
  Overflow { units: usize },

  #[error("region exhausted: {requested} units requested, {available} available")]
  Exhausted { requested: usize, available: usize },

  #[error("failed to get more memory: {0}")]
  Os(#[from] io::Error),

  #[error("injected failure on request {call}")]
  Injected { call: usize },
}

/// A free-list invariant found broken by [`Allocator::verify`](crate::Allocator::verify).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeapError {
  #[error("free blocks at {lower:#x} and {upper:#x} are adjacent but not merged")]
  Adjacent { lower: usize, upper: usize },

  #[error("free list is out of address order at {at:#x} -> {next:#x}")]
  Unordered { at: usize, next: usize },

  #[error("free block at {at:#x} has zero size")]
  EmptyBlock { at: usize },

  #[error("free blocks at {lower:#x} and {upper:#x} overlap")]
  Overlap { lower: usize, upper: usize },

  #[error("free list does not cycle back to its sentinel")]
  Unterminated,

  #[error("cursor at {at:#x} is not on the free list")]
  CursorDetached { at: usize },
}
