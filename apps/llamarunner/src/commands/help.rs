//! Help command for llamarunner.

use anyhow::Result;
use clap::Parser;

use super::registry::{BIN_NAME, Command, CommandContext, CommandRegistry, parse_args, usage_of};
use crate::errors::RunnerError;

/// Arguments for the help command.
#[derive(Parser, Debug)]
#[command(name = "help", about = "Show commands, or usage of one command")]
pub struct HelpArgs {
    /// Command to describe.
    pub command: Option<String>,
}

/// `help [command]`
pub struct HelpCommand;

impl Command for HelpCommand {
    fn name(&self) -> &'static str {
        "help"
    }

    fn description(&self) -> &'static str {
        "Show commands, or usage of one command"
    }

    fn usage(&self) -> String {
        usage_of::<HelpArgs>(self.name())
    }

    fn run(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<()> {
        let Some(args) = parse_args::<HelpArgs>(self.name(), args)? else {
            return Ok(());
        };

        match args.command {
            None => print!("{}", render_overview(ctx.registry)),
            Some(name) => {
                let command = ctx
                    .registry
                    .lookup(&name)
                    .ok_or_else(|| RunnerError::unknown_command(name.as_str()))?;
                println!("{}\n\n{}", command.description(), command.usage());
            }
        }
        Ok(())
    }
}

fn render_overview(registry: &CommandRegistry) -> String {
    let width = registry
        .list_all()
        .map(|command| command.name().len())
        .max()
        .unwrap_or(0);

    let mut out = format!(
        "{BIN_NAME} {}\n\
         Install, build and launch llama.cpp from named presets.\n\n\
         Usage: {BIN_NAME} <command> [args...]\n       \
         {BIN_NAME} <preset>\n\n\
         Commands:\n",
        env!("CARGO_PKG_VERSION")
    );
    for command in registry.list_all() {
        out.push_str(&format!(
            "  {:<width$}  {}\n",
            command.name(),
            command.description()
        ));
    }
    out.push_str(&format!(
        "\nAny other first argument is run as a preset.\n\
         Run '{BIN_NAME} help <command>' for the usage of a command.\n"
    ));
    out
}
