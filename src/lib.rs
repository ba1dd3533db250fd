//! # coalloc - A Coalescing Free-List Allocator
//!
//! This crate provides a general-purpose **free-list allocator** that serves
//! variable-size requests from a pool of raw memory, reclaiming and merging
//! freed blocks to keep fragmentation down.
//!
//! ## Overview
//!
//! Every block, free or allocated, starts with a one-unit header. Free blocks
//! are threaded into a circular list ordered by address:
//!
//! ```text
//!   Pool Memory:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │ ┌───┬──────┐ ┌───┬────────┐ ┌───┬────┐ ┌───┬──────────┐ ┌───┬────┐  │
//!   │ │ H │ free │ │ H │  used  │ │ H │free│ │ H │   used   │ │ H │free│  │
//!   │ └───┴──────┘ └───┴────────┘ └───┴────┘ └───┴──────────┘ └───┴────┘  │
//!   │   │    ▲                      │  ▲                        │         │
//!   │   └────┼──────────────────────┘  └────────────────────────┘         │
//!   │        └──────────────────────── wrap ────────────────────┘         │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Sizes are counted in header units. Two free blocks are never adjacent:
//!   releasing a block merges it with any free neighbour on either side.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   coalloc
//!   ├── align      - Unit arithmetic macros (align!, units!)
//!   ├── header     - Block header and pointer primitives (internal)
//!   ├── config     - Strategy and batch-size configuration
//!   ├── source     - Memory sources (Sbrk, Mmap, FixedSource)
//!   ├── heap       - Allocator: allocate, release, resize, growth
//!   ├── global     - LockedAllocator and GlobalAlloc support
//!   └── abi        - C malloc/free/realloc/calloc (feature `c-abi`)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::pin::pin;
//! use coalloc::{Allocator, Config, FixedSource, Strategy};
//!
//! let config = Config::new().strategy(Strategy::BestFit);
//! let mut heap = pin!(Allocator::with_config(FixedSource::new(4096), config));
//!
//! unsafe {
//!     let ptr = heap.as_mut().allocate(8) as *mut u64;
//!     *ptr = 42;
//!     assert_eq!(*ptr, 42);
//!
//!     let ptr = heap.as_mut().resize(ptr as *mut u8, 64) as *mut u64;
//!     assert_eq!(*ptr, 42);
//!
//!     heap.as_mut().release(ptr as *mut u8);
//! }
//!
//! assert!(heap.verify().is_ok());
//! ```
//!
//! ## How It Works
//!
//! An allocation rounds the request up to whole units, plus one for the
//! header, and walks the free list from the cursor:
//!
//! ```text
//!   Splitting a free block (allocation taken from the tail):
//!
//!   before:  ┌───┬────────────────────────────────────┐
//!            │ H │              free [12]             │
//!            └───┴────────────────────────────────────┘
//!
//!   after:   ┌───┬───────────────────┐┌───┬───────────┐
//!            │ H │     free [8]      ││ H │ used [4]  │
//!            └───┴───────────────────┘└───┴───────────┘
//!                                          ▲
//!                                          └── pointer returned to user
//! ```
//!
//! When a full lap finds nothing, the pool grows: at least
//! [`NALLOC`] units are requested from the [`MemorySource`] and released into
//! the list as one block, merging with a neighbouring extent if the source
//! happened to hand back contiguous memory.
//!
//! ## Limitations
//!
//! - **Single-threaded core**: [`Allocator`] has no synchronization; use
//!   [`LockedAllocator`] to share it
//! - **Word alignment only**: payloads are aligned to [`HEADER_ALIGN`]
//! - **Memory is never returned**: extents stay in the pool for its lifetime
//! - **Zero-byte requests** return null
//!
//! ## Safety
//!
//! Releasing a pointer that did not come from the same allocator, or
//! releasing it twice, corrupts the free list. Nothing checks for it; the
//! entry points are `unsafe` for that reason.

#[cfg(feature = "c-abi")]
pub mod abi;
pub mod align;
mod config;
mod error;
mod global;
mod header;
mod heap;
pub mod source;

pub use config::{Config, NALLOC, Strategy};
pub use error::{HeapError, SourceError};
pub use global::LockedAllocator;
pub use header::{HEADER_ALIGN, HEADER_SIZE};
pub use heap::{Allocator, FreeBlock, FreeBlocks};
pub use source::{Extent, FixedSource, MemorySource, Mmap, Sbrk, SystemSource};
