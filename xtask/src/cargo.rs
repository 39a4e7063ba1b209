//! Shared cargo invocation for every no_std workspace member.
//!
//! `x86_64-unknown-none` has no prebuilt `core`/`alloc`, so every build of
//! the kernel or a `user/*` crate needs `-Zbuild-std`, which in turn needs
//! nightly (see `rust-toolchain.toml`). Centralizing the flag list here
//! means a subcommand only has to name the package and the profile.

use crate::config::{Config, KERNEL_TARGET};
use anyhow::{Context, Result};
use xshell::{cmd, Shell};

pub struct CargoCommand<'a> {
    pub subcommand: &'a str,
    pub package: &'a str,
    pub release: bool,
}

impl CargoCommand<'_> {
    pub fn run(&self, config: &Config) -> Result<()> {
        let sh = Shell::new()?;
        sh.change_dir(&config.workspace_root);

        let mut args: Vec<String> = vec![self.subcommand.to_string(), "-p".into(), self.package.into()];
        args.push("--target".into());
        args.push(KERNEL_TARGET.into());
        args.push("-Zbuild-std=core,compiler_builtins,alloc".into());
        args.push("-Zbuild-std-features=compiler-builtins-mem".into());
        if self.release {
            args.push("--release".into());
        }

        cmd!(sh, "cargo {args...}")
            .run()
            .with_context(|| format!("cargo {} -p {} failed", self.subcommand, self.package))?;
        Ok(())
    }

    /// Path cargo placed the built binary at, given this command's package
    /// and release flag. Assumes the package's `[[bin]]` name equals the
    /// package name, true for every kernel/user crate in this workspace.
    pub fn artifact_path(&self, config: &Config) -> std::path::PathBuf {
        let profile = if self.release { "release" } else { "debug" };
        config
            .target_dir
            .join(KERNEL_TARGET)
            .join(profile)
            .join(self.package)
    }
}
