//! Shared memory demo, writer side.
//!
//! Creates a 4 KiB region, fills it with `i mod 256`, computes the 32-bit
//! sum of its bytes, and hands `{handle, checksum}` to `shm_reader` over
//! IPC once that service has registered.

#![no_std]
#![no_main]

use libmnos::{debug_println, entry_point, ipc_send, service_lookup, shm_create, shm_map, yield_now};

const REGION_SIZE: u64 = 4096;

entry_point!(main);

fn main() -> ! {
    let handle = shm_create(REGION_SIZE);
    assert!(handle != 0, "shm_create failed");

    let vaddr = shm_map(handle as u32, 0);
    assert!(vaddr != 0, "shm_map failed");

    let region = unsafe { core::slice::from_raw_parts_mut(vaddr as *mut u8, REGION_SIZE as usize) };
    let mut checksum: u32 = 0;
    for (i, byte) in region.iter_mut().enumerate() {
        *byte = (i % 256) as u8;
        checksum = checksum.wrapping_add(*byte as u32);
    }

    let reader_port = loop {
        if let Some(port) = service_lookup("shm_reader") {
            break port;
        }
        yield_now();
    };

    let mut msg = [0u8; 8];
    msg[..4].copy_from_slice(&(handle as u32).to_le_bytes());
    msg[4..8].copy_from_slice(&checksum.to_le_bytes());
    ipc_send(reader_port, &msg);

    debug_println("SHM: writer done");
    libmnos::thread_exit(0);
}
