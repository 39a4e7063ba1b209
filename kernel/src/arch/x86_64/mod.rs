// =============================================================================
// MinimalOS NextGen — x86_64 Architecture HAL (Hardware Abstraction Layer)
// =============================================================================
//
// This module contains ALL hardware-specific code for x86_64. If we ever
// port to another architecture (aarch64, riscv64), we add a sibling module
// and the rest of the kernel doesn't change.
//
// DESIGN RULE: All `unsafe` in the kernel should be concentrated here.
// Higher-level kernel code (IPC, scheduler, registry) should be safe Rust
// calling into safe abstractions defined here.
//
// This module provides:
//   serial.rs — COM1 UART for debug I/O (the first thing that works)
//   cpu.rs    — CPU feature detection, control registers, HLT
//   boot.rs   — Limine boot protocol request/response handling
//   pic.rs    — legacy 8259 PIC remap and EOI
//   pit.rs    — 8253/8254 PIT programming for the scheduler tick
//
// GDT/IDT/TSS and paging live one level up in `arch::{gdt,idt,tss}` and
// `memory::vmm` — they're shared structure, not x86_64-specific in the
// sense this module is (there's nowhere else they'd go on this target,
// but they aren't raw port I/O either).
// =============================================================================

pub mod serial;
pub mod cpu;
pub mod boot;
pub mod pic;
pub mod pit;

