//! MinimalOS userspace library.
//!
//! Safe Rust wrappers around the kernel's `int 0x80` syscall ABI. This is
//! the only way a Ring 3 process talks to the kernel — there is no libc,
//! no dynamic linking, just this crate linked directly into each flat
//! binary the process loader runs.
//!
//! Also provides the one `#[panic_handler]` every seed binary needs (a
//! user-mode panic kills the process, it does not take down the kernel)
//! and a small heap so callers can use `alloc` if they want to.

#![no_std]

extern crate alloc;

use core::panic::PanicInfo;

pub mod syscall;

pub use syscall::*;

/// Prints a message to the kernel's debug console via `SYS_DEBUG_WRITE`.
pub fn debug_print(s: &str) {
    syscall::debug_write(s.as_bytes());
}

/// Like [`debug_print`] but appends a trailing newline.
pub fn debug_println(s: &str) {
    debug_print(s);
    debug_print("\n");
}

/// A process-wide heap, backed by a fixed BSS region. 16 KiB is enough for
/// the small, short-lived seed processes this library supports — none of
/// them do sustained allocation.
const HEAP_SIZE: usize = 16 * 1024;

#[repr(align(16))]
struct HeapArea([u8; HEAP_SIZE]);

static mut HEAP_AREA: HeapArea = HeapArea([0; HEAP_SIZE]);

#[global_allocator]
static ALLOCATOR: linked_list_allocator::LockedHeap = linked_list_allocator::LockedHeap::empty();

/// Initializes the process heap. Call once, before the first allocation.
///
/// # Safety
/// Must be called exactly once, before any use of `alloc::boxed::Box`,
/// `alloc::vec::Vec`, etc.
pub unsafe fn init_heap() {
    unsafe {
        let area = core::ptr::addr_of_mut!(HEAP_AREA);
        ALLOCATOR.lock().init((*area).0.as_mut_ptr(), HEAP_SIZE);
    }
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    debug_print("panic: ");
    if let Some(location) = info.location() {
        debug_print(location.file());
        debug_print(": process aborting\n");
    } else {
        debug_println("process aborting");
    }
    syscall::thread_exit(1)
}

/// Declares the process entry point.
///
/// The loader jumps to byte 0 of the flat image with an undefined `rsp`
/// alignment beyond "points at mapped, writable memory", so the real
/// entry is a tiny `_start` that sets up the frame pointer and calls into
/// normal Rust before anything can unwind or rely on a prior frame.
#[macro_export]
macro_rules! entry_point {
    ($main:path) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn _start() -> ! {
            let f: fn() -> ! = $main;
            f()
        }
    };
}
