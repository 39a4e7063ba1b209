//! Kernel tick counter.
//!
//! Monotonically increasing counter incremented on every PIT timer IRQ
//! (IRQ line 0). Backs the `SYS_TIME_NOW` syscall; there is no wall-clock
//! source in this kernel, only ticks since boot.

use core::sync::atomic::{AtomicU64, Ordering};

/// Global tick counter.
static TICKS: AtomicU64 = AtomicU64::new(0);

/// Called by the trap dispatcher on every timer IRQ.
#[inline]
pub fn tick() {
    TICKS.fetch_add(1, Ordering::Relaxed);
}

/// Returns the current tick count.
#[inline]
pub fn ticks() -> u64 {
    TICKS.load(Ordering::Relaxed)
}
