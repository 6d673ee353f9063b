//! Build command for llamarunner.
//!
//! Rebuilds an existing llama.cpp checkout, e.g. after `git pull` or after
//! installing CUDA.
//!
//! ## Usage
//!
//! ```bash
//! llamarunner build                       # Build <llama_cpp_path>/llama.cpp
//! llamarunner build ~/src/llama.cpp       # Build another checkout
//! llamarunner build --force-cpu           # Skip CUDA detection
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use super::install::CHECKOUT_DIR;
use super::registry::{Command, CommandContext, parse_args, usage_of};
use crate::config::SettingsStore;
use crate::toolchain::build_llama_cpp;

/// Arguments for the build command.
#[derive(Parser, Debug)]
#[command(name = "build", about = "Build an existing llama.cpp checkout")]
pub struct BuildArgs {
    /// llama.cpp source directory.
    ///
    /// Defaults to `<llama_cpp_path>/llama.cpp`.
    pub dir: Option<PathBuf>,

    /// Build for CPU even when CUDA is available.
    #[arg(long)]
    pub force_cpu: bool,
}

/// `build [dir] [--force-cpu]`
pub struct BuildCommand;

impl Command for BuildCommand {
    fn name(&self) -> &'static str {
        "build"
    }

    fn description(&self) -> &'static str {
        "Build an existing llama.cpp checkout"
    }

    fn usage(&self) -> String {
        usage_of::<BuildArgs>(self.name())
    }

    fn run(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<()> {
        let Some(args) = parse_args::<BuildArgs>(self.name(), args)? else {
            return Ok(());
        };

        let source_dir = match args.dir {
            Some(dir) => dir,
            None => SettingsStore::new(ctx.layout)
                .load()
                .llama_cpp_path
                .join(CHECKOUT_DIR),
        };

        let install_dir = build_llama_cpp(
            ctx.layout,
            &source_dir,
            args.force_cpu,
            ctx.prompter,
            ctx.launcher,
            ctx.probe,
        )?;

        println!("Build finished. Binaries are in {}", install_dir.display());
        Ok(())
    }
}
