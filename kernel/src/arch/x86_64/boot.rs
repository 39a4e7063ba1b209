// =============================================================================
// MinimalOS NextGen — Limine Boot Protocol Interface
// =============================================================================
//
// This module communicates with the Limine bootloader using its request/response
// protocol. Here's how it works:
//
// LIMINE PROTOCOL OVERVIEW:
//   1. The kernel binary contains static "request" structures in its .rodata
//   2. During boot, Limine scans the kernel binary for these magic patterns
//   3. Limine fulfills each request by writing a pointer to a "response" struct
//   4. When the kernel starts, it reads the response pointers to get boot info
//
//   This is elegant: the kernel declares what it NEEDS as static data,
//   and the bootloader provides it. No complex handshake protocol.
//
// WHAT WE ASK LIMINE FOR:
//   - HHDM (Higher Half Direct Map) offset — where physical memory is mapped
//   - Memory map — which physical regions are free, reserved, or used
//
// =============================================================================

use limine::BaseRevision;
use limine::request::{HhdmRequest, MemoryMapRequest};

/// Limine base revision tag — required by Limine v1+ protocol.
/// This tells Limine which revision of the protocol we support.
#[used]
#[unsafe(link_section = ".limine_requests")]
static BASE_REVISION: BaseRevision = BaseRevision::new();

/// Request for the Higher Half Direct Map offset.
///
/// The HHDM is Limine's direct mapping of ALL physical memory at a fixed
/// virtual offset. This means:
///   phys_addr + hhdm_offset = virt_addr_in_kernel
///
/// Without this, we'd need to manually map physical memory before we could
/// access it — a chicken-and-egg problem since the page tables themselves
/// are in physical memory.
#[used]
#[unsafe(link_section = ".limine_requests")]
static HHDM_REQUEST: HhdmRequest = HhdmRequest::new();

/// Request for the physical memory map.
///
/// This is the most critical boot information. It tells us which regions
/// of physical memory are:
///   - USABLE: free RAM we can allocate
///   - RESERVED: hardware-reserved (BIOS, ACPI, etc.)
///   - ACPI_RECLAIMABLE: ACPI tables (can be freed after parsing)
///   - ACPI_NVS: ACPI Non-Volatile Storage (never touch)
///   - BAD_MEMORY: defective RAM regions
///   - BOOTLOADER_RECLAIMABLE: Limine's own memory (can be freed later)
///   - KERNEL_AND_MODULES: where our kernel is loaded
///
/// The memory map is sorted by base address (lowest first) and
/// non-overlapping. This makes it easy to iterate and build our
/// physical memory bitmap.
#[used]
#[unsafe(link_section = ".limine_requests")]
static MEMORY_MAP_REQUEST: MemoryMapRequest = MemoryMapRequest::new();

// =============================================================================
// Boot Information API
// =============================================================================
//
// These functions provide safe, typed access to Limine's boot information.
// They should only be called after Limine has filled in the responses
// (i.e., only from kmain and onwards — not before the kernel is entered).
// =============================================================================

/// Retrieves the HHDM (Higher Half Direct Map) offset from Limine.
///
/// This is the virtual address offset where Limine maps all physical memory.
/// Physical address P is accessible at virtual address P + hhdm_offset.
///
/// # Panics
/// Panics if the Limine HHDM response is not available (should never happen
/// if Limine booted us correctly).
pub fn get_hhdm_offset() -> u64 {
    HHDM_REQUEST
        .get_response()
        .expect("Limine HHDM response not available — boot protocol error")
        .offset()
}

/// Retrieves the physical memory map from Limine.
///
/// Returns a slice of memory map entries, sorted by base address.
/// Each entry describes a contiguous region of physical memory with its
/// type (usable, reserved, etc.).
///
/// Iterate over entries and look for `USABLE` regions to build the
/// physical memory manager's free page bitmap.
///
/// # Panics
/// Panics if the memory map response is not available.
pub fn get_memory_map() -> &'static [&'static limine::memory_map::Entry] {
    MEMORY_MAP_REQUEST
        .get_response()
        .expect("Limine memory map response not available — boot protocol error")
        .entries()
}

/// Returns whether the base revision Limine negotiated is one we support.
pub fn base_revision_supported() -> bool {
    BASE_REVISION.is_supported()
}
