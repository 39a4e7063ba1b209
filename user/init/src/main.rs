//! First user process. The kernel spawns this right after the other seed
//! processes, once its own subsystems (IPC, shared memory, the service
//! registry, the block driver) are all up.
//!
//! Doesn't do much: announces itself, then parks forever yielding the CPU.
//! A real init would supervise the rest of the seed processes and restart
//! ones that exit; that's future work, not something this milestone needs.

#![no_std]
#![no_main]

use libmnos::{debug_println, entry_point, yield_now};

entry_point!(main);

fn main() -> ! {
    debug_println("init: alive");

    loop {
        yield_now();
    }
}
