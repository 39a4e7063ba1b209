//! Interactive QEMU boot, for local iteration.
//!
//! The in-kernel `#[test_case]` suite does not go through this module at
//! all: `xtask test` is a thin wrapper over `cargo test`, and the QEMU
//! invocation for *that* lives in `build/qemu-test-runner.sh`, wired up as
//! this target's cargo `runner` in `.cargo/config.toml` so cargo itself
//! handles locating the built test binary and propagating pass/fail.
//!
//! Producing an installable boot medium (a Limine-deployed ISO) is this
//! repo's boundary, not this kernel's (see spec §1's "bootloader hand-off"
//! non-goal) -- `run` below passes the freestanding ELF straight to
//! QEMU's `-kernel` flag, which is enough to exercise everything from
//! `_start` onward without building that image.

use crate::config::Config;
use anyhow::{Context, Result};
use std::path::Path;
use xshell::{cmd, Shell};

pub fn run(config: &Config, kernel_elf: &Path, extra_args: Vec<String>) -> Result<()> {
    let sh = Shell::new()?;
    sh.change_dir(&config.workspace_root);

    let mut args: Vec<String> = vec![
        "-kernel".into(),
        kernel_elf.to_string_lossy().into_owned(),
        "-serial".into(),
        "stdio".into(),
        "-m".into(),
        "256M".into(),
        "-drive".into(),
        "file=build/blk.img,format=raw,if=none,id=blk0".into(),
        "-device".into(),
        "virtio-blk-pci,drive=blk0".into(),
    ];
    args.extend(extra_args);

    cmd!(sh, "qemu-system-x86_64 {args...}")
        .run()
        .context("failed to launch qemu-system-x86_64")?;
    Ok(())
}
