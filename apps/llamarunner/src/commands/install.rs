//! Install command for llamarunner.
//!
//! Clones llama.cpp and builds it.
//!
//! ## Usage
//!
//! ```bash
//! llamarunner install                  # Prompt for the directory
//! llamarunner install /opt/llama       # Clone into /opt/llama/llama.cpp
//! llamarunner install --force-cpu      # Skip CUDA detection
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use super::registry::{Command, CommandContext, parse_args, usage_of};
use crate::config::SettingsStore;
use crate::errors::RunnerError;
use crate::prompt::{ask_or_default, confirm_default_no};
use crate::toolchain::probe::require;
use crate::toolchain::{ProcessSpec, build_llama_cpp};

/// Upstream llama.cpp repository.
pub const LLAMA_CPP_REPO: &str = "https://github.com/ggml-org/llama.cpp.git";

/// Directory name of the checkout inside the installation directory.
pub const CHECKOUT_DIR: &str = "llama.cpp";

/// Arguments for the install command.
#[derive(Parser, Debug)]
#[command(name = "install", about = "Clone and build llama.cpp")]
pub struct InstallArgs {
    /// Installation directory; llama.cpp is cloned into `<DIR>/llama.cpp`.
    ///
    /// Prompted for when omitted, defaulting to `llama_cpp_path`.
    pub dir: Option<PathBuf>,

    /// Build for CPU even when CUDA is available.
    #[arg(long)]
    pub force_cpu: bool,
}

/// `install [dir] [--force-cpu]`
pub struct InstallCommand;

impl Command for InstallCommand {
    fn name(&self) -> &'static str {
        "install"
    }

    fn description(&self) -> &'static str {
        "Clone and build llama.cpp"
    }

    fn usage(&self) -> String {
        usage_of::<InstallArgs>(self.name())
    }

    /// # Process
    ///
    /// 1. Check that `git` is on PATH
    /// 2. Pick the installation directory
    /// 3. Confirm replacing an existing checkout
    /// 4. Clone llama.cpp
    /// 5. Build it
    /// 6. Remember the installation directory in the settings
    fn run(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<()> {
        let Some(args) = parse_args::<InstallArgs>(self.name(), args)? else {
            return Ok(());
        };

        require(ctx.probe, "git")?;

        let store = SettingsStore::new(ctx.layout);
        let default_dir = store.load().llama_cpp_path;

        let install_dir = match args.dir {
            Some(dir) => dir,
            None => PathBuf::from(ask_or_default(
                ctx.prompter,
                &format!("Enter installation directory [{}]: ", default_dir.display()),
                &default_dir.to_string_lossy(),
            )?),
        };
        let checkout = install_dir.join(CHECKOUT_DIR);

        if checkout.exists() {
            let question = format!(
                "{} already exists. Remove it and clone again? (y/n) ",
                checkout.display()
            );
            if !confirm_default_no(ctx.prompter, &question)? {
                return Err(RunnerError::declined("Installation cancelled").into());
            }
            std::fs::remove_dir_all(&checkout)
                .with_context(|| format!("Failed to remove {}", checkout.display()))?;
        }

        std::fs::create_dir_all(&install_dir)
            .with_context(|| format!("Failed to create directory: {}", install_dir.display()))?;

        println!("Cloning llama.cpp into {}...", checkout.display());
        ctx.launcher.launch(
            &ProcessSpec::new("git")
                .args(["clone", LLAMA_CPP_REPO])
                .arg(&checkout),
        )?;

        build_llama_cpp(
            ctx.layout,
            &checkout,
            args.force_cpu,
            ctx.prompter,
            ctx.launcher,
            ctx.probe,
        )?;

        // The build may have updated force_cpu.
        let mut settings = store.load();
        settings.llama_cpp_path = install_dir;
        store.save(&settings)?;

        println!(
            "llama.cpp installed in {}",
            settings.llama_cpp_path.display()
        );
        Ok(())
    }
}
