//! Workspace paths shared by every xtask subcommand.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Freestanding target every kernel/user crate cross-compiles for.
pub const KERNEL_TARGET: &str = "x86_64-unknown-none";

/// The six seed processes the kernel's `task::seed` embeds, in the order
/// they should be linked (does not need to match spawn order).
pub const USER_BINS: &[&str] = &["init", "pong", "ping", "shm_reader", "shm_writer", "blkdevd"];

pub struct Config {
    pub workspace_root: PathBuf,
    pub target_dir: PathBuf,
    /// `<workspace_root>/build` — linker scripts live here, and
    /// `build-user` drops the flattened seed-process binaries here too,
    /// matching what `kernel/src/task/seed.rs`'s `include_bytes!` expects.
    pub build_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let workspace_root = find_workspace_root()?;
        let target_dir = workspace_root.join("target");
        let build_dir = workspace_root.join("build");
        Ok(Self {
            workspace_root,
            target_dir,
            build_dir,
        })
    }
}

fn find_workspace_root() -> Result<PathBuf> {
    let mut dir = std::env::current_dir().context("failed to get current directory")?;
    loop {
        let cargo_toml = dir.join("Cargo.toml");
        if cargo_toml.exists() {
            let content = std::fs::read_to_string(&cargo_toml)?;
            if content.contains("[workspace]") {
                return Ok(dir);
            }
        }
        if !dir.pop() {
            anyhow::bail!("could not find workspace root (no Cargo.toml with [workspace] found)");
        }
    }
}
