//! Shared memory — named handles to single-page physical regions that can
//! be mapped into any address space.
//!
//! Lifetime is from `create` to process teardown; there is no explicit
//! destroy or refcounting in this core (see spec §4.6 — out of scope).

use crate::memory::address::{PhysAddr, VirtAddr};
use crate::memory::vmm::PageTableFlags;
use crate::memory::{pmm, vmm};
use crate::task::process;

/// Maximum live shared-memory regions.
pub const MAX_REGIONS: usize = 32;

/// Default mapping address used when a caller passes a zero `vaddr_hint`.
pub const DEFAULT_VADDR: u64 = 0x0000_0000_6000_0000;

const USER_RW: PageTableFlags = PageTableFlags::PRESENT
    .union(PageTableFlags::WRITABLE)
    .union(PageTableFlags::USER);

struct Region {
    /// 0 ⇒ slot unused.
    handle: u32,
    frame: PhysAddr,
    size: usize,
}

impl Region {
    const fn empty() -> Self {
        Self {
            handle: 0,
            frame: PhysAddr::zero(),
            size: 0,
        }
    }
}

struct Table {
    regions: [Region; MAX_REGIONS],
    next_handle: u32,
}

static REGIONS: crate::sync::spinlock::SpinLock<Table> =
    crate::sync::spinlock::SpinLock::new(Table {
        regions: [const { Region::empty() }; MAX_REGIONS],
        next_handle: 1,
    });

/// Allocates a zeroed single page and records it under a fresh handle.
/// Returns 0 on failure (bad size, out of frames, or out of region slots).
pub fn create(size: u64) -> u32 {
    if size == 0 || size > 4096 {
        return 0;
    }
    let Some(frame) = pmm::alloc_frame_zeroed() else {
        return 0;
    };

    let mut table = REGIONS.lock();
    let Some(slot) = table.regions.iter().position(|r| r.handle == 0) else {
        pmm::free_frame(frame);
        return 0;
    };
    let handle = table.next_handle;
    table.next_handle += 1;
    table.regions[slot] = Region {
        handle,
        frame,
        size: size as usize,
    };
    handle
}

/// Maps `handle`'s backing frame into the current address space.
///
/// If `vaddr_hint` is 0, [`DEFAULT_VADDR`] is used instead. Two mappings
/// of the same handle (in the same or different address spaces) share the
/// underlying frame coherently — a write through one is visible through
/// the other.
pub fn map(handle: u32, vaddr_hint: u64) -> u64 {
    let frame = {
        let table = REGIONS.lock();
        match table.regions.iter().find(|r| r.handle == handle) {
            Some(r) => r.frame,
            None => return 0,
        }
    };

    let vaddr_raw = if vaddr_hint == 0 { DEFAULT_VADDR } else { vaddr_hint };
    let vaddr = VirtAddr::new(vaddr_raw & !0xFFF);

    let address_space = process::current_address_space();
    let pml4 = if address_space == 0 {
        vmm::kernel_pml4()
    } else {
        PhysAddr::new(address_space)
    };

    let active = pml4 == vmm::active_pml4();
    unsafe {
        if vmm::map_page(pml4, vaddr, frame, USER_RW).is_err() {
            return 0;
        }
        if active {
            vmm::flush(vaddr);
        }
    }

    vaddr.as_u64()
}
