//! Kernel-resident device drivers.
//!
//! Everything here lives in the kernel because it's needed before any
//! user process can run: PCI discovery finds the block device, and the
//! block device is how the rest of the system gets at persistent storage.

pub mod pci;
pub mod virtio_blk;

#[cfg(test)]
pub mod qemu;
