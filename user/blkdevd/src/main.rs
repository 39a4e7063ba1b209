//! VirtIO block round-trip demo.
//!
//! Writes a 0..255 repeating pattern to sector 1000, reads it back into a
//! fresh buffer, and confirms the two match.

#![no_std]
#![no_main]

use libmnos::{blk_read, blk_write, debug_println, entry_point};

const SECTOR: u64 = 1000;
const SECTOR_SIZE: usize = 512;

entry_point!(main);

fn main() -> ! {
    let mut out = [0u8; SECTOR_SIZE];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = (i % 256) as u8;
    }

    if !blk_write(SECTOR, &out, 1) {
        debug_println("BLK: write failed");
        libmnos::thread_exit(1);
    }

    let mut back = [0u8; SECTOR_SIZE];
    if !blk_read(SECTOR, &mut back, 1) {
        debug_println("BLK: read failed");
        libmnos::thread_exit(1);
    }

    if back == out {
        debug_println("BLK: rw ok");
    } else {
        debug_println("BLK: mismatch");
    }

    libmnos::thread_exit(0);
}
