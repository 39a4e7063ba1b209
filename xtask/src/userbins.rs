//! Builds each `user/*` seed process and flattens it into `build/<name>.bin`.
//!
//! `kernel/src/task::loader::spawn_flat_binary` does no ELF parsing — it
//! copies a binary image verbatim starting at the fixed user code base —
//! so the link step that matters here isn't "produce an ELF", it's
//! "strip the ELF down to its loadable bytes". `objcopy -O binary` is the
//! standard tool for that; every `user/*` crate already links against
//! `build/linker-user.ld`, which lays out `.text`/`.rodata`/`.data`/`.bss`
//! contiguously from a single `PT_LOAD` segment for exactly this reason.

use crate::cargo::CargoCommand;
use crate::config::{Config, USER_BINS};
use anyhow::{Context, Result};
use xshell::{cmd, Shell};

pub fn build_user_bins(config: &Config, release: bool) -> Result<()> {
    std::fs::create_dir_all(&config.build_dir)
        .with_context(|| format!("creating {}", config.build_dir.display()))?;

    for &name in USER_BINS {
        println!("xtask: building seed process '{name}'");
        let build = CargoCommand {
            subcommand: "build",
            package: name,
            release,
        };
        build.run(config)?;

        let elf_path = build.artifact_path(config);
        let bin_path = config.build_dir.join(format!("{name}.bin"));

        let sh = Shell::new()?;
        cmd!(sh, "objcopy -O binary {elf_path} {bin_path}")
            .run()
            .with_context(|| format!("objcopy failed for '{name}'"))?;
        println!("xtask: wrote {}", bin_path.display());
    }

    Ok(())
}
