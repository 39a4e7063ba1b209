//! GDT, TSS and IDT construction and loading.

use core::sync::atomic::{AtomicPtr, Ordering};

use spin::Once;

use crate::arch::gdt::Gdt;
use crate::arch::idt::{EntryOptions, GateType, Idt, PrivilegeLevel};
use crate::arch::syscall;
use crate::arch::tss::Tss;

use super::frame;

static IDT: Once<Idt> = Once::new();
static TSS: Once<Tss> = Once::new();
static GDT: Once<Gdt> = Once::new();

/// Raw pointer to the live TSS, published once at init so the scheduler
/// can patch RSP0 on every context switch without re-deriving it.
static TSS_PTR: AtomicPtr<Tss> = AtomicPtr::new(core::ptr::null_mut());

/// IST index carrying the double fault's dedicated stack.
const DOUBLE_FAULT_IST_INDEX: u8 = 1;

/// Builds and loads the GDT, TSS and IDT.
///
/// Every vector 0-47 is routed through the shared stub table in
/// [`frame`]; vector `0x80` gets its own dedicated gate straight to
/// [`syscall::syscall_entry`], at DPL 3 so `int 0x80` from Ring 3 is
/// actually permitted.
pub fn init() {
    let tss_ref = TSS.call_once(|| {
        let mut tss = Tss::new();
        tss.init();
        tss
    });
    TSS_PTR.store(tss_ref as *const Tss as *mut Tss, Ordering::Relaxed);

    let (gdt, selectors) = Gdt::new(tss_ref);
    let gdt_ref = GDT.call_once(|| gdt);
    unsafe { gdt_ref.load(&selectors) };
    crate::kprintln!(
        "gdt: loaded (code={:#06x} data={:#06x} tss={:#06x})",
        selectors.kernel_code,
        selectors.kernel_data,
        selectors.tss
    );

    let mut idt = Idt::new();
    let kernel_opts = EntryOptions::new()
        .set_present(true)
        .set_gate_type(GateType::Interrupt)
        .set_privilege_level(PrivilegeLevel::Ring0);
    let double_fault_opts = kernel_opts.set_stack_index(DOUBLE_FAULT_IST_INDEX);

    for (vector, &stub) in frame::STUBS.iter().enumerate() {
        let opts = if vector == 8 { double_fault_opts } else { kernel_opts };
        idt.set_handler(vector as u8, stub as usize, selectors.kernel_code, opts);
    }

    let syscall_opts = EntryOptions::new()
        .set_present(true)
        .set_gate_type(GateType::Interrupt)
        .set_privilege_level(PrivilegeLevel::Ring3);
    idt.set_handler(
        0x80,
        syscall::syscall_entry as usize,
        selectors.kernel_code,
        syscall_opts,
    );

    let idt_ref = IDT.call_once(|| idt);
    idt_ref.load();
    crate::kprintln!("idt: loaded, 48 trap vectors + syscall gate at 0x80");
}

/// Raw pointer to the live TSS, for the scheduler's RSP0 patching.
/// Null until [`init`] has run.
pub fn tss_ptr() -> *mut Tss {
    TSS_PTR.load(Ordering::Relaxed)
}
