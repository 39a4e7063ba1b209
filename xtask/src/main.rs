//! Build automation for the MinimalOS NextGen kernel.
//!
//! Usage:
//!   cargo run -p xtask -- build-user   - build the six seed processes and
//!                                        flatten them into build/*.bin
//!   cargo run -p xtask -- build        - build-user, then link the kernel
//!   cargo run -p xtask -- run          - build, then boot it under QEMU
//!   cargo run -p xtask -- test         - build, then run the in-kernel
//!                                        #[test_case] suite under QEMU
//!                                        via the `runner` configured for
//!                                        this target in .cargo/config.toml
//!
//! Kept as a workspace member excluded from `default-members` (see the
//! root `Cargo.toml`) precisely so a bare `cargo build` at the repo root
//! builds this host-target crate instead of tripping over the kernel and
//! `user/*` crates' need for `-Zbuild-std` and a freestanding target.

mod cargo;
mod config;
mod qemu;
mod userbins;

use crate::cargo::CargoCommand;
use crate::config::Config;
use anyhow::Result;
use clap::{Parser, Subcommand};

const KERNEL_PACKAGE: &str = "minimalos-kernel";

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation for the MinimalOS NextGen kernel")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every user/* seed process and flatten it into build/<name>.bin.
    BuildUser {
        #[arg(short, long)]
        release: bool,
    },
    /// Build the seed processes, then the kernel that embeds them.
    Build {
        #[arg(short, long)]
        release: bool,
    },
    /// Build everything, then boot it under QEMU.
    Run {
        #[arg(short, long)]
        release: bool,
        /// Extra arguments appended to the qemu-system-x86_64 invocation.
        #[arg(last = true)]
        extra_args: Vec<String>,
    },
    /// Build everything, then run the in-kernel #[test_case] suite.
    Test {
        #[arg(short, long)]
        release: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::BuildUser { release } => {
            userbins::build_user_bins(&config, release)?;
        }
        Commands::Build { release } => {
            userbins::build_user_bins(&config, release)?;
            let kernel = build_kernel(&config, release)?;
            println!("xtask: built {}", kernel.display());
        }
        Commands::Run { release, extra_args } => {
            userbins::build_user_bins(&config, release)?;
            let kernel = build_kernel(&config, release)?;
            qemu::run(&config, &kernel, extra_args)?;
        }
        Commands::Test { release } => {
            userbins::build_user_bins(&config, release)?;
            CargoCommand {
                subcommand: "test",
                package: KERNEL_PACKAGE,
                release,
            }
            .run(&config)?;
            println!("xtask: all in-kernel tests passed");
        }
    }

    Ok(())
}

fn build_kernel(config: &Config, release: bool) -> Result<std::path::PathBuf> {
    let cmd = CargoCommand {
        subcommand: "build",
        package: KERNEL_PACKAGE,
        release,
    };
    cmd.run(config)?;
    Ok(cmd.artifact_path(config))
}
