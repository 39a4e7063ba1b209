// =============================================================================
// MinimalOS NextGen — Kernel Logger (kprint! / kprintln!)
// =============================================================================
//
// Provides formatted text output for the kernel, similar to Linux's printk().
// Output goes to the serial port (COM1), always, from the earliest boot.
//
// WHY NOT USE THE `log` CRATE DIRECTLY?
//   The `log` crate requires a global logger to be set at runtime, which
//   needs heap allocation. We need output BEFORE the heap is initialized.
//   Our macros work from the very first instruction of kmain().
//
// DESIGN:
//   - kprint!() / kprintln!() write straight to the serial port
//   - The macros use Rust's format_args!() for zero-allocation formatting
//
// USAGE:
//   kprintln!("Hello, {}!", "world");
//   kprintln!("Memory: {} MB free", free_pages * 4096 / 1024 / 1024);
//   kprint!("Loading..."); // No newline
//   kprintln!(" done!");
//
// THREAD SAFETY:
//   The serial port is protected by a SpinLock, so a kprintln!() call from
//   an interrupt handler and one from task context never interleave.
//
// =============================================================================

use crate::arch::serial::SERIAL;
use core::fmt;
use core::fmt::Write;

/// The internal print function that sends formatted text to serial output.
///
/// This is not meant to be called directly — use the `kprint!()` and
/// `kprintln!()` macros instead.
///
/// # Arguments
/// - `args`: Format arguments created by `format_args!()` macro.
///
/// # How it works
/// 1. Acquires the serial port spinlock (disabling interrupts)
/// 2. Writes the formatted text to serial
/// 3. Releases the lock (restoring interrupts)
///
/// The lock ensures that a complete message is written atomically — no
/// interleaving from other cores or interrupt handlers.
#[doc(hidden)]
pub fn _kprint(args: fmt::Arguments) {
    // Acquire the serial port lock. This disables interrupts on the
    // current core to prevent deadlock if an interrupt handler also
    // tries to print.
    let mut serial = SERIAL.lock();
    let _ = serial.write_fmt(args);
}

/// Prints formatted text to the kernel console (serial).
///
/// Works exactly like `print!()` in standard Rust, but outputs to the
/// serial port instead of stdout.
///
/// # Examples
/// ```
/// kprint!("Loading");
/// kprint!(".");
/// kprint!(".");
/// kprintln!(" done!"); // "Loading... done!\n"
/// ```
#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => {
        $crate::util::logger::_kprint(format_args!($($arg)*))
    };
}

/// Prints formatted text followed by a newline to the kernel console.
///
/// Works exactly like `println!()` in standard Rust.
///
/// # Examples
/// ```
/// kprintln!();                          // Just a newline
/// kprintln!("Hello!");                  // Simple string
/// kprintln!("x = {}", 42);             // Formatted
/// kprintln!("addr = {:#018X}", 0xDEAD); // Hex formatted
/// ```
#[macro_export]
macro_rules! kprintln {
    () => {
        $crate::kprint!("\n")
    };
    ($($arg:tt)*) => {
        $crate::kprint!("{}\n", format_args!($($arg)*))
    };
}
