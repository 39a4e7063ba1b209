//! Syscall infrastructure for x86_64.
//!
//! User processes enter the kernel with `int 0x80`, not `syscall`/`sysret`.
//! A software interrupt through an IDT trap gate is slower than the MSR
//! fast path, but it composes cleanly with the same IDT that already
//! handles every CPU exception and IRQ, and it needs no STAR/LSTAR MSR
//! setup — the CPU does the Ring 3 -> Ring 0 stack switch via the TSS
//! exactly like it does for any other trap.

use core::arch::naked_asm;

use crate::ipc;
use crate::kprintln;
use crate::registry;
use crate::shm;
use crate::task::process;

/// Syscall numbers, matching the kernel/user ABI exactly. Thirteen calls,
/// numbered non-contiguously to leave room for numbers this kernel never
/// implements (thread spawn within a process, explicit VM map/unmap).
pub mod nr {
    pub const SYS_DEBUG_WRITE: u64 = 0;
    pub const SYS_THREAD_EXIT: u64 = 2;
    pub const SYS_YIELD: u64 = 3;
    pub const SYS_SHM_CREATE: u64 = 6;
    pub const SYS_SHM_MAP: u64 = 7;
    pub const SYS_IPC_SEND: u64 = 8;
    pub const SYS_IPC_RECV: u64 = 9;
    pub const SYS_TIME_NOW: u64 = 10;
    pub const SYS_IPC_CREATE_PORT: u64 = 11;
    pub const SYS_SERVICE_REGISTER: u64 = 12;
    pub const SYS_SERVICE_LOOKUP: u64 = 13;
    pub const SYS_BLK_READ: u64 = 14;
    pub const SYS_BLK_WRITE: u64 = 15;
    pub const SYS_PROCESS_SPAWN: u64 = 16;
}

/// The upper bound of user-space canonical addresses.
/// Anything at or above this address is kernel memory.
const USER_SPACE_END: u64 = 0x0000_8000_0000_0000;

/// Validate that a user-space pointer range `[ptr, ptr+len)` is safe for
/// the kernel to dereference on behalf of a user process.
///
/// Returns `false` if `ptr` is null, `ptr + len` overflows, or any byte
/// in the range falls in kernel address space. This is a coarse check —
/// it does not verify the range is actually mapped, only that it can't
/// reach kernel memory.
#[inline]
fn validate_user_ptr(ptr: u64, len: usize) -> bool {
    if ptr == 0 {
        return false;
    }
    if len == 0 {
        return true;
    }
    match ptr.checked_add(len as u64) {
        Some(end) => end <= USER_SPACE_END,
        None => false,
    }
}

/// Register layout pushed onto the kernel stack by [`syscall_entry`] before
/// calling [`dispatch`], in the reverse order of the `push` sequence (the
/// last push is the first field).
#[repr(C)]
struct SyscallRegs {
    r15: u64,
    r14: u64,
    r13: u64,
    r12: u64,
    r11: u64,
    r10: u64,
    r9: u64,
    r8: u64,
    rbp: u64,
    rdi: u64,
    rsi: u64,
    rdx: u64,
    rcx: u64,
    rbx: u64,
    rax: u64,
}

/// The `int 0x80` entry stub.
///
/// The CPU has already pushed SS, RSP, RFLAGS, CS, RIP (this is a Ring 3
/// -> Ring 0 transition through a trap gate, so the stack switch to
/// TSS.RSP0 already happened in hardware). We push the GPRs on top of
/// that, call into Rust with a pointer to the saved registers, then pop
/// and `iretq`.
///
/// # Safety
/// Only ever reached via the IDT gate at vector 0x80; never call directly.
#[unsafe(naked)]
pub unsafe extern "C" fn syscall_entry() {
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
        "iretq",
        dispatch = sym dispatch,
    );
}

/// Rust-side dispatcher. `regs.rax` holds the syscall number on entry and
/// the return value on exit; `rdi`/`rsi`/`rdx` hold up to three arguments,
/// matching the convention of the original syscall ABI this kernel grew
/// out of.
///
/// # Safety
/// `regs` must point at a valid, live `SyscallRegs` on the kernel stack.
#[unsafe(no_mangle)]
unsafe extern "C" fn dispatch(regs: *mut SyscallRegs) {
    let regs = unsafe { &mut *regs };
    let num = regs.rax;
    let arg1 = regs.rdi;
    let arg2 = regs.rsi;
    let arg3 = regs.rdx;

    regs.rax = match num {
        nr::SYS_DEBUG_WRITE => sys_debug_write(arg1, arg2),
        nr::SYS_THREAD_EXIT => process::thread_exit(),
        nr::SYS_YIELD => {
            process::schedule();
            0
        }
        nr::SYS_TIME_NOW => crate::task::clock::ticks(),
        nr::SYS_SHM_CREATE => shm::create(arg1) as u64,
        nr::SYS_SHM_MAP => shm::map(arg1 as u32, arg2),
        nr::SYS_IPC_SEND => sys_ipc_send(arg1 as u32, arg2, arg3),
        nr::SYS_IPC_RECV => sys_ipc_recv(arg1 as u32, arg2, arg3),
        nr::SYS_IPC_CREATE_PORT => ipc::create_port(process::current_tid()) as u64,
        nr::SYS_SERVICE_REGISTER => sys_service_register(arg1, arg2),
        nr::SYS_SERVICE_LOOKUP => sys_service_lookup(arg1),
        nr::SYS_BLK_READ => sys_blk_read(arg1, arg2, arg3),
        nr::SYS_BLK_WRITE => sys_blk_write(arg1, arg2, arg3),
        nr::SYS_PROCESS_SPAWN => sys_process_spawn(arg1, arg2),
        _ => {
            kprintln!("[syscall] unknown syscall nr={}", num);
            u64::MAX
        }
    };
}

fn sys_debug_write(ptr: u64, len: u64) -> u64 {
    let len = len as usize;
    if !validate_user_ptr(ptr, len) {
        return u64::MAX;
    }
    let slice = unsafe { core::slice::from_raw_parts(ptr as *const u8, len) };
    for &byte in slice {
        crate::arch::serial::SERIAL.lock().write_byte(byte);
    }
    len as u64
}

fn sys_ipc_send(port: u32, buf_ptr: u64, size: u64) -> u64 {
    let size = size as usize;
    if !validate_user_ptr(buf_ptr, size) || size > ipc::IPC_MSG_MAX_SIZE {
        return u64::MAX;
    }
    let slice = unsafe { core::slice::from_raw_parts(buf_ptr as *const u8, size) };
    let sender = process::current_tid();
    match ipc::send(port, sender, slice) {
        Ok(()) => 0,
        Err(_) => u64::MAX,
    }
}

/// `ipc_recv(port, buf, sender_out) -> size or -1`. `buf` must hold at
/// least [`ipc::IPC_MSG_MAX_SIZE`] bytes; the sender's thread id is
/// written through `sender_out` only if that pointer validates (a null
/// `sender_out` is a legitimate "don't care" from the caller).
fn sys_ipc_recv(port: u32, buf_ptr: u64, sender_out: u64) -> u64 {
    if !validate_user_ptr(buf_ptr, ipc::IPC_MSG_MAX_SIZE) {
        return u64::MAX;
    }
    let mut buf = [0u8; ipc::IPC_MSG_MAX_SIZE];
    match ipc::recv(port, &mut buf) {
        Ok((size, sender)) => {
            let dst = buf_ptr as *mut u8;
            unsafe { core::ptr::copy_nonoverlapping(buf.as_ptr(), dst, size as usize) };
            if sender_out != 0 && validate_user_ptr(sender_out, 8) {
                unsafe { (sender_out as *mut u64).write_unaligned(sender) };
            }
            size as u64
        }
        Err(_) => u64::MAX,
    }
}

fn sys_service_register(name_ptr: u64, port: u64) -> u64 {
    if !validate_user_ptr(name_ptr, registry::SERVICE_NAME_MAX) {
        return u64::MAX;
    }
    let name = unsafe { read_c_string(name_ptr, registry::SERVICE_NAME_MAX) };
    match registry::register(name, port as u32) {
        Ok(()) => 0,
        Err(_) => u64::MAX,
    }
}

fn sys_service_lookup(name_ptr: u64) -> u64 {
    if !validate_user_ptr(name_ptr, registry::SERVICE_NAME_MAX) {
        return u64::MAX;
    }
    let name = unsafe { read_c_string(name_ptr, registry::SERVICE_NAME_MAX) };
    registry::lookup(name).map(|p| p as u64).unwrap_or(u64::MAX)
}

fn sys_blk_read(sector: u64, buf_ptr: u64, count: u64) -> u64 {
    let count = count as u32;
    let len = count as usize * 512;
    if !validate_user_ptr(buf_ptr, len) {
        return u64::MAX;
    }
    let slice = unsafe { core::slice::from_raw_parts_mut(buf_ptr as *mut u8, len) };
    match crate::drivers::virtio_blk::read(sector, slice, count) {
        Ok(()) => 0,
        Err(_) => u64::MAX,
    }
}

fn sys_blk_write(sector: u64, buf_ptr: u64, count: u64) -> u64 {
    let count = count as u32;
    let len = count as usize * 512;
    if !validate_user_ptr(buf_ptr, len) {
        return u64::MAX;
    }
    let slice = unsafe { core::slice::from_raw_parts(buf_ptr as *const u8, len) };
    match crate::drivers::virtio_blk::write(sector, slice, count) {
        Ok(()) => 0,
        Err(_) => u64::MAX,
    }
}

fn sys_process_spawn(bin_ptr: u64, bin_size: u64) -> u64 {
    let bin_size = bin_size as usize;
    if bin_size == 0 || bin_size > 64 * 1024 || !validate_user_ptr(bin_ptr, bin_size) {
        return u64::MAX;
    }
    let slice = unsafe { core::slice::from_raw_parts(bin_ptr as *const u8, bin_size) };
    match crate::task::loader::spawn_flat_binary(slice) {
        Some(tid) => tid,
        None => u64::MAX,
    }
}

/// Reads a NUL-terminated user-space string into a fixed kernel buffer,
/// truncating at `max_len` bytes (the service-name table's own width).
///
/// # Safety
/// `ptr` must already have passed [`validate_user_ptr`] for `max_len` bytes.
unsafe fn read_c_string(ptr: u64, max_len: usize) -> &'static str {
    static mut NAME_BUF: [u8; 64] = [0; 64];
    let max_len = max_len.min(64);
    let src = ptr as *const u8;
    let buf = unsafe { &mut *core::ptr::addr_of_mut!(NAME_BUF) };
    let mut n = 0;
    while n < max_len {
        let byte = unsafe { *src.add(n) };
        if byte == 0 {
            break;
        }
        buf[n] = byte;
        n += 1;
    }
    core::str::from_utf8(&buf[..n]).unwrap_or("")
}
