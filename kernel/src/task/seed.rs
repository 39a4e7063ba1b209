//! Seed user processes.
//!
//! The flat binaries embedded here are built from the `user/*` crates in
//! this workspace before the kernel itself is linked: each one is built
//! for a freestanding target against its own `build/linker-<name>.ld`,
//! then turned into a headerless flat image (no ELF, per the loader's own
//! "no ELF parsing" contract) and dropped into `build/`. This mirrors the
//! reference kernel's own `user_bins.asm`, which NASM-embedded the same
//! flat images as named symbols; `include_bytes!` is the Rust equivalent
//! of that assembly step, not a new build stage.
//!
//! Receivers are spawned before senders, so the first `ipc_recv` on each
//! side blocks instead of racing a `send` that has nowhere to land yet.

use crate::kprintln;
use crate::task::loader;

static INIT_BIN: &[u8] = include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/../build/init.bin"));
static PONG_BIN: &[u8] = include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/../build/pong.bin"));
static PING_BIN: &[u8] = include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/../build/ping.bin"));
static SHM_READER_BIN: &[u8] =
    include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/../build/shm_reader.bin"));
static SHM_WRITER_BIN: &[u8] =
    include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/../build/shm_writer.bin"));
static BLKDEVD_BIN: &[u8] =
    include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/../build/blkdevd.bin"));

/// Spawns every seed process in the order the reference boot sequence
/// uses: `init` first, then the IPC demo (receiver before sender), then
/// the SHM demo (receiver before sender), then the block-device
/// exerciser last, since it is the only one that touches the disk.
pub fn spawn_all() {
    spawn_one("init", INIT_BIN);
    spawn_one("pong", PONG_BIN);
    spawn_one("ping", PING_BIN);
    spawn_one("shm_reader", SHM_READER_BIN);
    spawn_one("shm_writer", SHM_WRITER_BIN);
    spawn_one("blkdevd", BLKDEVD_BIN);
}

fn spawn_one(name: &str, binary: &[u8]) {
    match loader::spawn_flat_binary(binary) {
        Some(tid) => kprintln!("[loader] spawned '{}' as tid {}", name, tid),
        None => kprintln!("[loader] failed to spawn '{}'", name),
    }
}
