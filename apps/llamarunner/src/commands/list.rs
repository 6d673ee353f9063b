//! List command for llamarunner.
//!
//! Shows the presets in the config directory.

use anyhow::Result;
use clap::Parser;

use super::registry::{Command, CommandContext, parse_args, usage_of};
use crate::config::preset::{list_presets, resolve_config_dir};

/// Arguments for the list command.
#[derive(Parser, Debug)]
#[command(name = "list", about = "List available presets")]
pub struct ListArgs {}

/// `list`
pub struct ListCommand;

impl Command for ListCommand {
    fn name(&self) -> &'static str {
        "list"
    }

    fn description(&self) -> &'static str {
        "List available presets"
    }

    fn usage(&self) -> String {
        usage_of::<ListArgs>(self.name())
    }

    fn run(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<()> {
        if parse_args::<ListArgs>(self.name(), args)?.is_none() {
            return Ok(());
        }

        let config_dir = resolve_config_dir(ctx.layout, ctx.prompter)?;
        let presets = list_presets(&config_dir)?;
        print!("{}", render_listing(&presets));
        Ok(())
    }
}

fn render_listing(presets: &[String]) -> String {
    let mut out = String::from("Available presets:\n");
    if presets.is_empty() {
        out.push_str("  No presets found\n");
        return out;
    }
    for name in presets {
        out.push_str(&format!("  - {name}\n"));
    }
    out.push_str(&format!("\nTotal presets: {}\n", presets.len()));
    out
}
