//! Threads and the round-robin scheduler.
//!
//! Threads live in a dense arena (`Vec<Thread>`) indexed directly by thread
//! id — the arena *is* the circular list the design talks about; walking
//! "next" is just `(tid + 1) % len`. Thread 0 is the boot idle thread: it
//! owns no stack of its own (it is already running on whatever stack got
//! us here) and is never dead.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};

use crate::memory::vmm;
use crate::sync::spinlock::SpinLock;
use crate::task::usermode::IretqFrame;

/// User code selector (Ring 3), matching `arch::gdt::Gdt::new`.
const USER_CS: u16 = 0x20 | 3;
/// User data/stack selector (Ring 3).
const USER_SS: u16 = 0x18 | 3;

/// The possible states of a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Ready,
    Running,
    Blocked,
    Dead,
}

/// Size of each thread's kernel-mode stack.
pub const KERNEL_STACK_SIZE: usize = 4096 * 8;

#[repr(C, align(16))]
struct KernelStack {
    data: [u8; KERNEL_STACK_SIZE],
}

impl KernelStack {
    fn top(&self) -> u64 {
        self.data.as_ptr() as u64 + KERNEL_STACK_SIZE as u64
    }
}

/// A kernel thread of control.
pub struct Thread {
    pub tid: u64,
    pub state: ThreadState,
    /// Saved kernel stack pointer; valid whenever this thread is not Running.
    kernel_rsp: u64,
    /// Physical address of this thread's PML4, or 0 for the kernel.
    pub address_space: u64,
    /// Top of this thread's kernel stack, for TSS.RSP0 on ring transitions.
    /// 0 for the idle thread (which never takes a ring-3 -> ring-0 trap).
    kernel_stack_top: u64,
    /// For a not-yet-run thread: the kernel function pointer (kernel
    /// thread) or the user RIP (user thread). Unused once the thread has
    /// actually entered its body for the first time.
    entry: u64,
    /// User RSP for a user thread's first entry. 0 for kernel threads.
    user_rsp: u64,
    /// Owning allocation for `kernel_rsp`'s stack. `None` only for idle.
    stack: Option<Box<KernelStack>>,
}

struct Arena {
    threads: Vec<Thread>,
}

static THREADS: SpinLock<Arena> = SpinLock::new(Arena {
    threads: Vec::new(),
});
static CURRENT: AtomicU64 = AtomicU64::new(0);

/// Sets up the idle thread (tid 0) as the initial "current" thread.
///
/// # Safety
/// Must be called exactly once, early in boot, before `schedule()` or any
/// syscall/IRQ that might call into the scheduler.
pub unsafe fn init() {
    let mut arena = THREADS.lock();
    arena.threads.push(Thread {
        tid: 0,
        state: ThreadState::Running,
        kernel_rsp: 0,
        address_space: 0,
        kernel_stack_top: 0,
        entry: 0,
        user_rsp: 0,
        stack: None,
    });
    CURRENT.store(0, Ordering::Relaxed);
}

/// The thread id currently executing.
pub fn current_tid() -> u64 {
    CURRENT.load(Ordering::Relaxed)
}

/// Physical address of the current thread's address space (0 for kernel).
pub fn current_address_space() -> u64 {
    THREADS.lock().threads[current_tid() as usize].address_space
}

/// Spawns a new kernel-mode thread that begins at `entry`. If `entry`
/// returns normally, execution falls into `thread_exit` rather than
/// running off the end of the function, so `entry` is free to return
/// instead of looping forever.
///
/// Returns the new thread's id.
pub fn spawn_kernel_thread(entry: extern "C" fn()) -> u64 {
    spawn(0, entry as u64, 0)
}

/// Spawns a new user-mode thread in address space `pml4_phys`, entering
/// ring 3 at `entry_rip` with stack `user_rsp`.
pub fn spawn_user_thread(pml4_phys: u64, entry_rip: u64, user_rsp: u64) -> u64 {
    spawn(pml4_phys, entry_rip, user_rsp)
}

fn spawn(address_space: u64, entry: u64, user_rsp: u64) -> u64 {
    let stack = {
        let layout = core::alloc::Layout::new::<KernelStack>();
        let ptr = unsafe { alloc::alloc::alloc_zeroed(layout) as *mut KernelStack };
        if ptr.is_null() {
            panic!("out of memory allocating a kernel stack");
        }
        unsafe { Box::from_raw(ptr) }
    };

    let top = stack.top();
    // Lay the stack out so the first `context_switch_asm` return lands on
    // `thread_trampoline` (see `context_switch_asm`'s pop order below).
    let sp = top - 7 * 8;
    unsafe {
        let ptr = sp as *mut u64;
        ptr.add(0).write(0); // r15
        ptr.add(1).write(0); // r14
        ptr.add(2).write(0); // r13
        ptr.add(3).write(0); // r12
        ptr.add(4).write(0); // rbx
        ptr.add(5).write(0); // rbp
        ptr.add(6).write(thread_trampoline as u64); // rip (ret target)
    }

    let mut arena = THREADS.lock();
    let tid = arena.threads.len() as u64;
    arena.threads.push(Thread {
        tid,
        state: ThreadState::Ready,
        kernel_rsp: sp,
        address_space,
        kernel_stack_top: top,
        entry,
        user_rsp,
        stack: Some(stack),
    });
    tid
}

/// Marks `tid` Ready if it is currently Blocked (e.g. parked on an IPC
/// port whose `send` just delivered a message). A no-op otherwise — a
/// thread that isn't Blocked has nothing to be woken from.
pub fn wake(tid: u64) {
    let mut arena = THREADS.lock();
    if let Some(t) = arena.threads.get_mut(tid as usize) {
        if t.state == ThreadState::Blocked {
            t.state = ThreadState::Ready;
        }
    }
}

/// Marks the current thread Blocked and reschedules. Returns once another
/// `wake()` call has made it Ready again and the scheduler picked it back up.
pub fn block_current() {
    {
        let mut arena = THREADS.lock();
        let tid = current_tid() as usize;
        arena.threads[tid].state = ThreadState::Blocked;
    }
    schedule();
}

/// Marks the current thread Dead and never returns.
pub fn thread_exit() -> ! {
    {
        let mut arena = THREADS.lock();
        let tid = current_tid() as usize;
        arena.threads[tid].state = ThreadState::Dead;
    }
    schedule();
    // A Dead thread is never rescheduled, so `schedule()` above never
    // actually returns control here. Satisfy the `!` return type.
    loop {
        core::hint::spin_loop();
    }
}

core::arch::global_asm!(
    ".global context_switch_asm",
    "context_switch_asm:",
    // rdi = &mut old_kernel_rsp, rsi = new_kernel_rsp
    "push rbp",
    "push rbx",
    "push r12",
    "push r13",
    "push r14",
    "push r15",
    "mov [rdi], rsp",
    "mov rsp, rsi",
    "pop r15",
    "pop r14",
    "pop r13",
    "pop r12",
    "pop rbx",
    "pop rbp",
    "ret",
);

unsafe extern "C" {
    fn context_switch_asm(old_rsp_ptr: *mut u64, new_rsp: u64);
}

/// First-entry trampoline for a freshly spawned thread. Reached by `ret`
/// out of `context_switch_asm` the first time a thread is scheduled.
///
/// Both branches are reached with IF=0: `context_switch_asm` is only ever
/// called from `schedule()`, and every caller of `schedule()` (the timer
/// IRQ gate, the `int 0x80` trap gate, and the blocking branch of `recv`)
/// runs with interrupts disabled. A user thread gets IF=1 back from the
/// IretqFrame RFLAGS value (`usermode.rs`); a kernel thread needs the
/// same done explicitly here, or it runs forever non-preemptible.
extern "C" fn thread_trampoline() -> ! {
    let tid = current_tid();
    let (address_space, entry, user_rsp) = {
        let arena = THREADS.lock();
        let t = &arena.threads[tid as usize];
        (t.address_space, t.entry, t.user_rsp)
    };

    if address_space == 0 {
        unsafe { core::arch::asm!("sti", options(nomem, nostack)) };

        // Push `thread_exit_landing` as `entry`'s return address, then
        // jump (not call) into `entry` — the same stack trick the
        // reference scheduler uses (pushing `thread_exit` as `func`'s
        // return address) so a kernel thread that returns normally
        // lands in `thread_exit` instead of running off the end of its
        // `-> !` caller.
        let f = entry as usize;
        unsafe {
            core::arch::asm!(
                "push {exit}",
                "jmp {f}",
                exit = sym thread_exit_landing,
                f = in(reg) f,
                options(noreturn),
            );
        }
    } else {
        let frame = IretqFrame::new(entry, USER_CS, USER_SS, user_rsp);
        unsafe { crate::task::usermode::jump_to_ring3(&frame) }
    }
}

/// Landing pad for a kernel thread's entry function returning normally.
extern "C" fn thread_exit_landing() -> ! {
    thread_exit()
}

/// Picks the next Ready thread in round-robin order and switches to it.
///
/// The only transition point in the scheduler. If the current thread's
/// state is Running on entry it is demoted to Ready before the search; if
/// no other thread is Ready, the search wraps back to the current thread
/// and this returns without switching (restoring Running if it was
/// demoted). Must be called with interrupts disabled, or from interrupt
/// context.
pub fn schedule() {
    let (old_rsp_ptr, new_rsp, switch_address_space, new_kstack_top): (*mut u64, u64, Option<u64>, u64) = {
        let mut arena = THREADS.lock();
        let n = arena.threads.len();
        let current_tid = current_tid();
        let was_running = arena.threads[current_tid as usize].state == ThreadState::Running;
        if was_running {
            arena.threads[current_tid as usize].state = ThreadState::Ready;
        }

        let mut chosen = None;
        for offset in 1..n as u64 {
            let candidate = (current_tid + offset) % n as u64;
            if arena.threads[candidate as usize].state == ThreadState::Ready {
                chosen = Some(candidate);
                break;
            }
        }

        let Some(next_tid) = chosen else {
            if was_running {
                arena.threads[current_tid as usize].state = ThreadState::Running;
            }
            return;
        };

        arena.threads[next_tid as usize].state = ThreadState::Running;
        let old_address_space = arena.threads[current_tid as usize].address_space;
        let new_address_space = arena.threads[next_tid as usize].address_space;
        CURRENT.store(next_tid, Ordering::Relaxed);

        let old_rsp_ptr = &mut arena.threads[current_tid as usize].kernel_rsp as *mut u64;
        let new_rsp = arena.threads[next_tid as usize].kernel_rsp;
        let new_kstack_top = arena.threads[next_tid as usize].kernel_stack_top;
        let switch_address_space = if new_address_space != old_address_space {
            Some(new_address_space)
        } else {
            None
        };

        (old_rsp_ptr, new_rsp, switch_address_space, new_kstack_top)
        // lock dropped here, before the raw context switch
    };

    if let Some(pml4) = switch_address_space {
        let target = if pml4 == 0 { vmm::kernel_pml4().as_u64() } else { pml4 };
        unsafe { crate::arch::cpu::write_cr3(target) };
    }
    if new_kstack_top != 0 {
        unsafe {
            let tss = crate::traps::tss_ptr();
            if !tss.is_null() {
                crate::arch::tss::Tss::set_rsp0(tss, new_kstack_top);
            }
        }
    }

    unsafe { context_switch_asm(old_rsp_ptr, new_rsp) };
}
