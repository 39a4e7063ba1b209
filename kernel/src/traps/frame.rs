//! The raw trap frame and the common entry stub shared by every CPU
//! exception and IRQ vector (everything except `int 0x80`, which has its
//! own dedicated gate in `arch::syscall`).
//!
//! Every vector gets a two-instruction stub: push a synthesized error code
//! if the CPU didn't already push a real one, push the vector number, then
//! jump into the shared body. The shared body saves the general-purpose
//! registers in the same fixed order `arch::syscall::syscall_entry` uses,
//! builds a pointer to a `TrapFrame` sitting on the stack, and calls
//! `dispatch`.

use core::arch::naked_asm;
use core::sync::atomic::{AtomicU64, Ordering};

/// Saved machine state at the point a trap was taken: the GPRs this kernel
/// saves, the vector and (real or synthesized) error code, and the frame
/// the CPU itself pushed (RIP, CS, RFLAGS, RSP, SS).
///
/// Field order matches the push order in `common_entry`, last push first,
/// so this can be overlaid directly on the stack.
#[repr(C)]
pub struct TrapFrame {
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub r11: u64,
    pub r10: u64,
    pub r9: u64,
    pub r8: u64,
    pub rbp: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rdx: u64,
    pub rcx: u64,
    pub rbx: u64,
    pub rax: u64,
    pub vector: u64,
    pub error_code: u64,
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

impl TrapFrame {
    /// True if the trapped context was running in Ring 3.
    #[inline]
    pub fn from_user_mode(&self) -> bool {
        self.cs & 0x3 != 0
    }
}

macro_rules! stub_noerr {
    ($name:ident, $vec:literal) => {
        #[unsafe(naked)]
        unsafe extern "C" fn $name() {
            naked_asm!("push 0", "push {v}", "jmp {c}", v = const $vec, c = sym common_entry);
        }
    };
}

macro_rules! stub_err {
    ($name:ident, $vec:literal) => {
        #[unsafe(naked)]
        unsafe extern "C" fn $name() {
            naked_asm!("push {v}", "jmp {c}", v = const $vec, c = sym common_entry);
        }
    };
}

stub_noerr!(vec00, 0);
stub_noerr!(vec01, 1);
stub_noerr!(vec02, 2);
stub_noerr!(vec03, 3);
stub_noerr!(vec04, 4);
stub_noerr!(vec05, 5);
stub_noerr!(vec06, 6);
stub_noerr!(vec07, 7);
stub_err!(vec08, 8);
stub_noerr!(vec09, 9);
stub_err!(vec10, 10);
stub_err!(vec11, 11);
stub_err!(vec12, 12);
stub_err!(vec13, 13);
stub_err!(vec14, 14);
stub_noerr!(vec15, 15);
stub_noerr!(vec16, 16);
stub_err!(vec17, 17);
stub_noerr!(vec18, 18);
stub_noerr!(vec19, 19);
stub_noerr!(vec20, 20);
stub_noerr!(vec21_, 21);
stub_noerr!(vec22, 22);
stub_noerr!(vec23, 23);
stub_noerr!(vec24, 24);
stub_noerr!(vec25, 25);
stub_noerr!(vec26, 26);
stub_noerr!(vec27, 27);
stub_noerr!(vec28, 28);
stub_noerr!(vec29, 29);
stub_noerr!(vec30, 30);
stub_noerr!(vec31, 31);
stub_noerr!(irq00, 32);
stub_noerr!(irq01, 33);
stub_noerr!(irq02, 34);
stub_noerr!(irq03, 35);
stub_noerr!(irq04, 36);
stub_noerr!(irq05, 37);
stub_noerr!(irq06, 38);
stub_noerr!(irq07, 39);
stub_noerr!(irq08, 40);
stub_noerr!(irq09, 41);
stub_noerr!(irq10, 42);
stub_noerr!(irq11, 43);
stub_noerr!(irq12, 44);
stub_noerr!(irq13, 45);
stub_noerr!(irq14, 46);
stub_noerr!(irq15, 47);

/// One entry stub per vector 0-47, in vector order. `arch::syscall` wires
/// vector 0x80 separately, through its own dedicated gate.
pub static STUBS: [unsafe extern "C" fn(); 48] = [
    vec00, vec01, vec02, vec03, vec04, vec05, vec06, vec07, vec08, vec09, vec10, vec11, vec12,
    vec13, vec14, vec15, vec16, vec17, vec18, vec19, vec20, vec21_, vec22, vec23, vec24, vec25,
    vec26, vec27, vec28, vec29, vec30, vec31, irq00, irq01, irq02, irq03, irq04, irq05, irq06,
    irq07, irq08, irq09, irq10, irq11, irq12, irq13, irq14, irq15,
];

#[unsafe(naked)]
unsafe extern "C" fn common_entry() {
    naked_asm!(
        "push rax",
        "push rbx",
        "push rcx",
        "push rdx",
        "push rsi",
        "push rdi",
        "push rbp",
        "push r8",
        "push r9",
        "push r10",
        "push r11",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        "mov rdi, rsp",
        "call {dispatch}",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop r11",
        "pop r10",
        "pop r9",
        "pop r8",
        "pop rbp",
        "pop rdi",
        "pop rsi",
        "pop rdx",
        "pop rcx",
        "pop rbx",
        "pop rax",
        "add rsp, 16", // drop vector + error_code
        "iretq",
        dispatch = sym dispatch,
    );
}

/// The recovery RIP a test harness has armed for the next page fault, or 0
/// if none is armed. Consumed (and cleared) by the first page fault taken
/// after it is set.
static RECOVERY_RIP: AtomicU64 = AtomicU64::new(0);

/// Arms a one-shot recovery landing pad: if a page fault is taken before
/// this is consumed, the fault is treated as handled and execution resumes
/// at `rip` in the faulting context instead of killing or halting it.
pub fn arm_page_fault_recovery(rip: u64) {
    RECOVERY_RIP.store(rip, Ordering::SeqCst);
}

#[unsafe(no_mangle)]
unsafe extern "C" fn dispatch(frame: *mut TrapFrame) {
    let frame = unsafe { &mut *frame };
    match frame.vector {
        32..=47 => handle_irq(frame),
        14 => handle_page_fault(frame),
        3 => crate::kprintln!("[trap] breakpoint at rip={:#018x}", frame.rip),
        _ => handle_exception(frame),
    }
}

fn handle_irq(frame: &TrapFrame) {
    let irq = (frame.vector - 32) as u8;
    if irq == 0 {
        crate::task::clock::tick();
        unsafe { crate::arch::pic::send_eoi(irq) };
        crate::task::process::schedule();
    } else {
        unsafe { crate::arch::pic::send_eoi(irq) };
    }
}

fn handle_page_fault(frame: &mut TrapFrame) {
    let cr2 = crate::arch::cpu::read_cr2();
    crate::kprintln!(
        "[trap] page fault addr={:#018x} error={:#x} rip={:#018x} cs={:#x}",
        cr2,
        frame.error_code,
        frame.rip,
        frame.cs
    );

    let recovery = RECOVERY_RIP.swap(0, Ordering::SeqCst);
    if recovery != 0 {
        frame.rip = recovery;
        return;
    }

    if frame.from_user_mode() {
        kill_current(frame.vector);
    } else {
        crate::kprintln!("[trap] unrecoverable page fault in ring 0, halting");
        crate::arch::cpu::halt_forever();
    }
}

fn handle_exception(frame: &TrapFrame) {
    crate::kprintln!(
        "[trap] exception vector={} error={:#x} rip={:#018x} cs={:#x}",
        frame.vector,
        frame.error_code,
        frame.rip,
        frame.cs
    );

    if frame.from_user_mode() {
        kill_current(frame.vector);
    } else {
        crate::kprintln!("[trap] unhandled exception in ring 0, halting");
        crate::arch::cpu::halt_forever();
    }
}

fn kill_current(vector: u64) {
    let tid = crate::task::process::current_tid();
    crate::kprintln!("[trap] killing thread {} on vector {}", tid, vector);
    crate::task::process::thread_exit();
}
