//! Trap dispatch — CPU exceptions, IRQs, and (via its own gate) syscalls.
//!
//! Every vector 0-47 lands in the same raw frame and the same Rust
//! dispatcher in [`frame`]; `int 0x80` is wired straight to
//! `arch::syscall::syscall_entry` instead, since its register-argument
//! convention doesn't fit the general trap frame.

mod frame;
mod idt;

pub use frame::arm_page_fault_recovery;
pub use idt::{init, tss_ptr};

/// Triggers a breakpoint exception, for exercising the trap path in tests.
#[inline]
pub fn trigger_breakpoint() {
    unsafe {
        core::arch::asm!("int3");
    }
}
