//! Command modules for the llamarunner CLI.
//!
//! [`registry`] holds the [`Command`](registry::Command) trait, the registry
//! and dispatch. Each remaining module implements one command.
//!
//! ## llama.cpp Commands
//!
//! - [`install`] - Clone and build llama.cpp
//! - [`build`] - Rebuild an existing checkout
//!
//! ## Preset Commands
//!
//! - [`run`] - Launch llama-server with a preset
//! - [`init`] - Create a preset interactively
//! - [`list`] - List presets
//!
//! ## Maintenance Commands
//!
//! - [`set`] - Reset or edit the settings
//! - [`update`] - Self-update from the latest release
//! - [`help`] - Show commands and usage

pub mod build;
pub mod help;
pub mod init;
pub mod install;
pub mod list;
pub mod registry;
pub mod run;
pub mod set;
pub mod update;

pub use registry::{CommandContext, CommandRegistry, dispatch};
