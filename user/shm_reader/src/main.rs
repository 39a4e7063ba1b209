//! Shared memory demo, reader side.
//!
//! Registers as `shm_reader`, blocks for `{handle, checksum}` from
//! `shm_writer`, maps the region into its own address space, and checks
//! the checksum recomputes to the same value.

#![no_std]
#![no_main]

use libmnos::{debug_println, entry_point, ipc_create_port, ipc_recv, service_register, shm_map};

const REGION_SIZE: u64 = 4096;

entry_point!(main);

fn main() -> ! {
    let port = ipc_create_port();
    service_register("shm_reader", port);

    let mut buf = [0u8; 256];
    let (size, _sender) = ipc_recv(port, &mut buf).expect("recv failed");
    assert!(size as usize >= 8);

    let handle = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let expected = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);

    let vaddr = shm_map(handle, 0);
    assert!(vaddr != 0, "shm_map failed");

    let region = unsafe { core::slice::from_raw_parts(vaddr as *const u8, REGION_SIZE as usize) };
    let actual: u32 = region.iter().fold(0u32, |acc, &b| acc.wrapping_add(b as u32));

    if actual == expected {
        debug_println("SHM: checksum ok");
    } else {
        debug_println("SHM: checksum mismatch");
    }

    libmnos::thread_exit(0);
}
