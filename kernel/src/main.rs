#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(crate::test_runner)]
#![reexport_test_harness_main = "test_main"]

extern crate alloc;

mod arch;
mod drivers;
mod ipc;
mod memory;
mod registry;
mod shm;
mod sync;
mod task;
mod traps;
mod util;

use arch::boot;
use arch::serial::SERIAL;
use crate::kprintln;

/// Kernel entry point called by the Limine bootloader.
///
/// Follows the documented boot flow: serial, descriptor tables, physical
/// and virtual memory, the kernel heap, the legacy interrupt controller
/// and timer, the scheduler, the IPC/SHM/registry tables (already live
/// from their `const` initializers — nothing to call), PCI discovery and
/// the VirtIO block driver, the seed user processes, and finally the two
/// kernel demo threads — in that order, exactly once, before `sti`.
#[unsafe(no_mangle)]
unsafe extern "C" fn _start() -> ! {
    if !boot::base_revision_supported() {
        // Limine did not accept our requests; nothing is safe to touch.
        loop {
            unsafe { core::arch::asm!("cli", "hlt") };
        }
    }

    SERIAL.lock().init();
    kprintln!("KERNEL: boot ok");

    // `#[test_case]`-annotated unit tests scattered across the tree (PMM
    // bitmap math, VirtIO layout formulas, PCI config-address encoding)
    // run here, before any hardware state they don't touch is set up, and
    // exit the VM through the debug-exit port instead of falling through
    // to the rest of boot.
    #[cfg(test)]
    test_main();

    traps::init();

    unsafe {
        memory::address::init_hhdm(boot::get_hhdm_offset());
        memory::pmm::init(boot::get_memory_map());
        memory::vmm::init_kernel_pml4();
    }
    let stats = memory::pmm::stats();
    kprintln!(
        "MM: {} usable pages ({} used, {} free)",
        stats.total_frames,
        stats.used_frames,
        stats.free_frames
    );

    if arch::cpu::read_cr0() & (1 << 31) != 0 {
        kprintln!("MM: paging=on");
    } else {
        kprintln!("MM: paging=off");
    }

    memory::heap::init();

    unsafe {
        arch::pic::init();
        arch::pit::init(100);
        task::process::init();
    }
    kprintln!("sched: idle thread ready, round-robin online");

    kprintln!("ipc: {} ports, {} deep", ipc::MAX_PORTS, ipc::PORT_DEPTH);
    kprintln!("shm: {} regions available", shm::MAX_REGIONS);
    kprintln!("registry: {} service slots", registry::MAX_SERVICES);

    drivers::pci::scan_and_log();
    match drivers::virtio_blk::init() {
        Ok(()) => kprintln!("virtio-blk: ready"),
        Err(e) => kprintln!("virtio-blk: unavailable ({:?})", e),
    }

    task::seed::spawn_all();

    task::process::spawn_kernel_thread(thread_a);
    task::process::spawn_kernel_thread(thread_b);

    kprintln!("KERNEL: enabling interrupts, preemption begins");
    unsafe { core::arch::asm!("sti") };

    loop {
        unsafe { core::arch::asm!("hlt") };
    }
}

/// Demo kernel thread: prints 'A' forever. Together with [`thread_b`], it
/// makes preemptive round-robin scheduling directly observable on the
/// serial line (alternating runs of 'A' and 'B', one scheduler slice
/// each) without requiring a user process or a test harness.
extern "C" fn thread_a() {
    loop {
        SERIAL.lock().write_byte(b'A');
    }
}

/// Demo kernel thread: prints 'B' forever. See [`thread_a`].
extern "C" fn thread_b() {
    loop {
        SERIAL.lock().write_byte(b'B');
    }
}

/// Runs every `#[test_case]` in the tree, then exits QEMU with a status
/// derived from whether any of them panicked.
///
/// A panicking test still reaches [`util::panic::panic`]'s `#[cfg(test)]`
/// variant, which exits with [`drivers::qemu::ExitCode::Failed`] directly
/// rather than returning here — so reaching the end of this loop means
/// every test passed.
#[cfg(test)]
pub fn test_runner(tests: &[&dyn Fn()]) {
    kprintln!("running {} tests", tests.len());
    for test in tests {
        test();
    }
    drivers::qemu::exit(drivers::qemu::ExitCode::Success);
}
