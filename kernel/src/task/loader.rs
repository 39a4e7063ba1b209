//! Process loader — places a flat binary into a fresh address space.
//!
//! No ELF parsing, no relocation: the binary is mapped verbatim at a fixed
//! code base and entered at its first byte. This is deliberately primitive
//! — the seed processes this kernel boots are built to run exactly this way.

use crate::memory::address::VirtAddr;
use crate::memory::vmm::PageTableFlags;
use crate::memory::{pmm, vmm};
use crate::task::process;

/// Fixed virtual address every flat binary is mapped and entered at.
pub const USER_CODE_BASE: u64 = 0x0000_0000_0040_0000;

/// Fixed virtual address of the (single-page) user stack.
pub const USER_STACK_BASE: u64 = 0x0000_0000_7000_0000;

/// Largest flat binary the loader accepts.
pub const MAX_BINARY_SIZE: usize = 64 * 1024;

const USER_RW: PageTableFlags = PageTableFlags::PRESENT
    .union(PageTableFlags::WRITABLE)
    .union(PageTableFlags::USER);

/// Loads `binary` into a new address space and spawns a user thread to run
/// it. Returns the new thread's id, or `None` on any failure (oversize
/// binary, out of physical memory, or a mapping error).
///
/// Maps `ceil(binary.len() / 4096) + 2` pages at [`USER_CODE_BASE`] (the
/// two extra pages zero-fill a BSS tail past the copied bytes) and one
/// stack page at [`USER_STACK_BASE`].
pub fn spawn_flat_binary(binary: &[u8]) -> Option<u64> {
    if binary.is_empty() || binary.len() > MAX_BINARY_SIZE {
        return None;
    }

    let pml4 = vmm::create_address_space()?;
    let active = pml4 == vmm::active_pml4();

    let code_pages = binary.len().div_ceil(4096) + 2;
    for i in 0..code_pages {
        let frame = pmm::alloc_frame_zeroed()?;
        let vaddr = VirtAddr::new(USER_CODE_BASE + (i * 4096) as u64);
        unsafe {
            vmm::map_page(pml4, vaddr, frame, USER_RW).ok()?;
            if active {
                vmm::flush(vaddr);
            }

            let start = i * 4096;
            if start < binary.len() {
                let end = (start + 4096).min(binary.len());
                let dst = frame.to_virt().as_mut_ptr::<u8>();
                core::ptr::copy_nonoverlapping(binary[start..end].as_ptr(), dst, end - start);
            }
        }
    }

    let stack_frame = pmm::alloc_frame_zeroed()?;
    let stack_vaddr = VirtAddr::new(USER_STACK_BASE);
    unsafe {
        vmm::map_page(pml4, stack_vaddr, stack_frame, USER_RW).ok()?;
        if active {
            vmm::flush(stack_vaddr);
        }
    }
    let user_rsp = USER_STACK_BASE + 4096;

    Some(process::spawn_user_thread(pml4.as_u64(), USER_CODE_BASE, user_rsp))
}
