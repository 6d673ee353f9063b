#![warn(clippy::pedantic)]

//! # llamarunner
//!
//! Installs, builds and launches [llama.cpp](https://github.com/ggml-org/llama.cpp)
//! from named presets.
//!
//! ## Commands
//!
//! - `install [dir]` - Clone and build llama.cpp
//! - `build [dir]` - Rebuild an existing checkout
//! - `run <preset> [args...]` - Launch llama-server with a preset
//! - `init` - Create a preset interactively
//! - `list` - List presets
//! - `set {d|e}` - Reset or edit the settings
//! - `update [--check|--force]` - Self-update
//! - `help [command]` - Show commands and usage
//!
//! Any other first argument is taken as a preset name, so
//! `llamarunner mistral` runs the `mistral` preset.
//!
//! ## Environment Variables
//!
//! - `LLAMA_PRESETS_HOME` - User directory (default: `~/.llama-presets`)
//! - `LLAMA_PRESETS_SYSTEM_DIR` - Shared directory (default: `/usr/local/share/llama-presets`)
//! - `LLAMARUNNER_RELEASES_URL` - Release metadata endpoint
//! - `LLAMARUNNER_LOG` - Log filter, e.g. `debug` (default: `warn`)

mod commands;
mod config;
mod errors;
mod prompt;
mod toolchain;

use anyhow::Result;
use env_logger::Env;

use commands::{CommandContext, CommandRegistry, dispatch};
use config::Layout;
use prompt::StdinPrompter;
use toolchain::{PathProbe, SystemLauncher};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "LLAMARUNNER_LOG";

fn main() {
    env_logger::Builder::from_env(Env::default().filter_or(LOG_ENV, "warn"))
        .format_timestamp(None)
        .init();

    if let Err(e) = run() {
        let exit_code = handle_error(&e);
        std::process::exit(exit_code);
    }
}

/// Prints the error chain and returns the exit code.
fn handle_error(e: &anyhow::Error) -> i32 {
    eprintln!("Error: {e:?}");
    1
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();

    let layout = Layout::new()?;
    let registry = CommandRegistry::builtin();
    let mut prompter = StdinPrompter;
    let mut launcher = SystemLauncher;
    let probe = PathProbe;

    let mut ctx = CommandContext {
        registry: &registry,
        layout: &layout,
        prompter: &mut prompter,
        launcher: &mut launcher,
        probe: &probe,
    };
    dispatch(&mut ctx, &args)
}
