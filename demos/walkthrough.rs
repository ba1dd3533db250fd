use std::{io::Read, pin::pin, ptr};

use coalloc::{Allocator, Config, FreeBlock, Sbrk, Strategy};
use libc::sbrk;

/// Waits until the user presses ENTER, when run with `--step`.
/// Useful when you want to inspect memory state with tools like `pmap`
/// or `gdb` between steps.
fn pause(step: bool) {
  if step {
    println!("\n>>> Press ENTER to continue...");
    let _ = std::io::stdin().bytes().next();
  }
}

/// Prints the current program break using `sbrk(0)`.
fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { sbrk(0) },
  );
}

fn print_free_list(blocks: impl Iterator<Item = FreeBlock>) {
  println!("    free list (from cursor):");
  for block in blocks {
    println!(
      "      {:#x}..{:#x}  {} units",
      block.addr,
      block.end(),
      block.units
    );
  }
}

fn main() {
  let step = std::env::args().any(|arg| arg == "--step");
  let strategy = if std::env::args().any(|arg| arg == "--best-fit") {
    Strategy::BestFit
  } else {
    Strategy::FirstFit
  };

  let mut heap = pin!(Allocator::with_config(
    Sbrk::new(),
    Config::new().strategy(strategy)
  ));
  println!("strategy: {strategy:?}");

  unsafe {
    print_program_break("start");
    pause(step);

    // --------------------------------------------------------------------
    // 1) The first allocation grows the pool by one batch.
    // --------------------------------------------------------------------
    let first = heap.as_mut().allocate(4) as *mut u32;
    first.write(0xDEADBEEF);
    println!("\n[1] Allocate u32 at {first:?} = 0x{:X}", first.read());
    print_program_break("after first allocation");
    print_free_list(heap.free_blocks());
    pause(step);

    // --------------------------------------------------------------------
    // 2) Three equal blocks, carved from the tail of the free block.
    // --------------------------------------------------------------------
    let blocks: Vec<*mut u8> = (0..3).map(|_| heap.as_mut().allocate(48)).collect();
    for (i, block) in blocks.iter().enumerate() {
      ptr::write_bytes(*block, 0xA0 + i as u8, 48);
      println!("[2] block {i} at {block:?}");
    }
    print_free_list(heap.free_blocks());
    pause(step);

    // --------------------------------------------------------------------
    // 3) Release the middle block, then its neighbours: they coalesce.
    // --------------------------------------------------------------------
    for index in [1, 0, 2] {
      heap.as_mut().release(blocks[index]);
      println!("\n[3] Released block {index}");
      print_free_list(heap.free_blocks());
    }
    pause(step);

    // --------------------------------------------------------------------
    // 4) Resize copies into a new block and releases the old one.
    // --------------------------------------------------------------------
    let grown = heap.as_mut().resize(first as *mut u8, 256) as *mut u32;
    println!(
      "\n[4] Resized to 256 bytes at {grown:?}, value still 0x{:X}",
      grown.read()
    );
    pause(step);

    // --------------------------------------------------------------------
    // 5) A request larger than the batch forces another growth.
    // --------------------------------------------------------------------
    print_program_break("before large allocation");
    let big = heap.as_mut().allocate(64 * 1024);
    println!("\n[5] Allocated 64 KiB at {big:?}");
    print_program_break("after large allocation");
    print_free_list(heap.free_blocks());

    heap.as_mut().release(big);
    heap.as_mut().release(grown as *mut u8);
    println!("\n[6] Released everything, heap check: {:?}", heap.verify());
    print_free_list(heap.free_blocks());
  }
}
