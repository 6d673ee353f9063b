//! Command registry and dispatch.
//!
//! Every subcommand is a [`Command`] registered under its name. Dispatch
//! looks up the first CLI token; a token that is not a command but names a
//! preset file runs that preset, so `llamarunner mistral` is shorthand for
//! `llamarunner run mistral`.

use std::collections::BTreeMap;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, FromArgMatches};

use super::{build, help, init, install, list, run, set, update};
use crate::config::Layout;
use crate::config::layout::preset_file;
use crate::config::preset::{existing_config_dir, validate_name};
use crate::errors::RunnerError;
use crate::prompt::Prompter;
use crate::toolchain::{Launcher, ToolProbe};

/// Name of the binary, used in usage lines.
pub const BIN_NAME: &str = "llamarunner";

/// A registered subcommand.
pub trait Command {
    /// Name the command is dispatched under.
    fn name(&self) -> &'static str;

    /// One-line description shown by `help`.
    fn description(&self) -> &'static str;

    /// Usage line shown by `help <command>`.
    fn usage(&self) -> String;

    /// Runs the command with the arguments following its name.
    ///
    /// # Errors
    ///
    /// Returns whatever the command fails with; the caller reports it and
    /// exits non-zero.
    fn run(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<()>;
}

/// Everything a command may touch besides the filesystem.
pub struct CommandContext<'a> {
    pub registry: &'a CommandRegistry,
    pub layout: &'a Layout,
    pub prompter: &'a mut dyn Prompter,
    pub launcher: &'a mut dyn Launcher,
    pub probe: &'a dyn ToolProbe,
}

/// Commands by name, iterated in name order.
#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<&'static str, Box<dyn Command>>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in command.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(install::InstallCommand));
        registry.register(Box::new(build::BuildCommand));
        registry.register(Box::new(run::RunCommand));
        registry.register(Box::new(init::InitCommand));
        registry.register(Box::new(list::ListCommand));
        registry.register(Box::new(set::SetCommand));
        registry.register(Box::new(update::UpdateCommand));
        registry.register(Box::new(help::HelpCommand));
        registry
    }

    /// Adds `command`, replacing any command with the same name.
    pub fn register(&mut self, command: Box<dyn Command>) {
        if self.commands.insert(command.name(), command).is_some() {
            log::debug!("replaced an existing command registration");
        }
    }

    /// Finds a command by exact name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&dyn Command> {
        self.commands.get(name).map(|command| &**command)
    }

    /// Returns whether `name` is a registered command.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Iterates commands in name order.
    pub fn list_all(&self) -> impl Iterator<Item = &dyn Command> {
        self.commands.values().map(|command| &**command)
    }
}

/// Routes CLI arguments (without the program name) to a command.
///
/// # Errors
///
/// Returns the command's error, or `UnknownCommand` when the first token is
/// neither a command nor an existing preset.
pub fn dispatch(ctx: &mut CommandContext<'_>, args: &[String]) -> Result<()> {
    let registry = ctx.registry;

    let Some((first, rest)) = args.split_first() else {
        return run_named(registry, ctx, "help", &[]);
    };

    match first.as_str() {
        "-h" | "--help" => return run_named(registry, ctx, "help", rest),
        "-V" | "--version" => {
            println!("{}", version_string());
            return Ok(());
        }
        _ => {}
    }

    if let Some(command) = registry.lookup(first) {
        log::debug!("dispatching to command '{first}'");
        return command.run(ctx, rest);
    }

    if preset_exists(ctx.layout, first) {
        if !rest.is_empty() {
            log::warn!(
                "ignoring {} argument(s) after preset '{first}'; use '{BIN_NAME} run {first} ...' to pass extra arguments",
                rest.len()
            );
        }
        log::debug!("'{first}' is not a command, running it as a preset");
        return run_named(registry, ctx, "run", std::slice::from_ref(first));
    }

    Err(RunnerError::unknown_command(first.as_str()).into())
}

fn run_named(
    registry: &CommandRegistry,
    ctx: &mut CommandContext<'_>,
    name: &str,
    args: &[String],
) -> Result<()> {
    match registry.lookup(name) {
        Some(command) => command.run(ctx, args),
        None => Err(RunnerError::unknown_command(name).into()),
    }
}

/// Whether `<name>.cfg` exists in the directory `run` would read it from.
fn preset_exists(layout: &Layout, name: &str) -> bool {
    validate_name(name).is_ok()
        && existing_config_dir(layout).is_some_and(|dir| preset_file(&dir, name).is_file())
}

/// Version line printed by `--version`.
#[must_use]
pub fn version_string() -> String {
    format!(
        "{BIN_NAME} {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("LLAMARUNNER_GIT_COMMIT")
    )
}

/// Renders the usage line of a clap argument struct.
pub fn usage_of<A: CommandFactory>(name: &str) -> String {
    A::command()
        .bin_name(format!("{BIN_NAME} {name}"))
        .render_usage()
        .to_string()
}

/// Parses a command's arguments with clap.
///
/// Returns `None` when `--help` was requested and has been printed.
///
/// # Errors
///
/// Returns `InvalidArguments` carrying clap's explanation.
pub fn parse_args<A>(name: &str, args: &[String]) -> Result<Option<A>>
where
    A: CommandFactory + FromArgMatches,
{
    let argv = std::iter::once(name.to_string()).chain(args.iter().cloned());
    let matches = A::command()
        .bin_name(format!("{BIN_NAME} {name}"))
        .try_get_matches_from(argv);

    let matches = match matches {
        Ok(matches) => matches,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{e}");
            return Ok(None);
        }
        Err(e) => return Err(clap_error(&e).into()),
    };

    A::from_arg_matches(&matches)
        .map(Some)
        .map_err(|e| clap_error(&e).into())
}

fn clap_error(e: &clap::Error) -> RunnerError {
    let rendered = e.to_string();
    let message = rendered.trim().trim_start_matches("error: ");
    RunnerError::invalid_arguments(message)
}


#[cfg(test)]
mod tests {
    use super::testing::TestEnv;
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    #[command(name = "demo")]
    struct DemoArgs {
        dir: Option<String>,
        #[arg(long)]
        force_cpu: bool,
    }

    #[test]
    fn builtin_registry_lists_commands_in_name_order() {
        let registry = CommandRegistry::builtin();
        let names: Vec<_> = registry.list_all().map(|c| c.name()).collect();

        assert_eq!(
            names,
            vec!["build", "help", "init", "install", "list", "run", "set", "update"]
        );
    }

    #[test]
    fn every_command_has_description_and_usage() {
        let registry = CommandRegistry::builtin();
        for command in registry.list_all() {
            assert!(!command.description().is_empty(), "{}", command.name());
            assert!(
                command
                    .usage()
                    .contains(&format!("{BIN_NAME} {}", command.name())),
                "{}",
                command.usage()
            );
        }
    }

    #[test]
    fn lookup_is_exact() {
        let registry = CommandRegistry::builtin();
        assert!(registry.lookup("list").is_some());
        assert!(registry.lookup("lis").is_none());
        assert!(registry.lookup("LIST").is_none());
    }

    #[test]
    fn unknown_token_without_preset_is_unknown_command() {
        let mut env = TestEnv::new().with_user_dir();

        let err = env.run(&["foo"]).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<RunnerError>(),
            Some(RunnerError::UnknownCommand { name }) if name == "foo"
        ));
        assert!(env.launcher.launched.is_empty());
    }

    #[test]
    fn unknown_token_with_preset_runs_it() {
        let mut env = TestEnv::new().preset("fast", "-c 512");
        let binary = env.temp.path().join("llama-server");
        std::fs::write(&binary, "").unwrap();
        std::fs::write(
            env.layout.user_settings_file(),
            format!("llama_cpp_path = \"{}\"\n", env.temp.path().display()),
        )
        .unwrap();

        env.run(&["fast"]).unwrap();

        assert_eq!(env.launcher.launched.len(), 1);
        assert_eq!(env.launcher.launched[0].program, binary.into_os_string());
    }

    #[test]
    fn system_preset_is_ignored_when_user_dir_exists() {
        let mut env = TestEnv::new().with_user_dir();
        std::fs::create_dir_all(&env.layout.system_dir).unwrap();
        std::fs::write(preset_file(&env.layout.system_dir, "shared"), "-c 512").unwrap();

        let err = env.run(&["shared"]).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<RunnerError>(),
            Some(RunnerError::UnknownCommand { name }) if name == "shared"
        ));
        assert!(env.launcher.launched.is_empty());
    }

    #[test]
    fn system_preset_runs_when_user_dir_is_missing() {
        let mut env = TestEnv::new();
        std::fs::create_dir_all(&env.layout.system_dir).unwrap();
        std::fs::write(preset_file(&env.layout.system_dir, "shared"), "-c 512").unwrap();
        let binary = env.temp.path().join("llama-server");
        std::fs::write(&binary, "").unwrap();
        std::fs::write(
            env.layout.system_settings_file(),
            format!("llama_cpp_path = \"{}\"\n", env.temp.path().display()),
        )
        .unwrap();

        env.run(&["shared"]).unwrap();

        assert_eq!(env.launcher.launched.len(), 1);
        assert_eq!(env.launcher.launched[0].program, binary.into_os_string());
    }

    #[test]
    fn command_wins_over_preset_with_same_name() {
        let mut env = TestEnv::new().preset("list", "-c 512");

        env.run(&["list"]).unwrap();

        assert!(env.launcher.launched.is_empty());
    }

    #[test]
    fn empty_arguments_show_help() {
        let mut env = TestEnv::new();
        env.run(&[]).unwrap();
        env.run(&["--help"]).unwrap();
        env.run(&["-h"]).unwrap();
        assert!(env.launcher.launched.is_empty());
    }

    #[test]
    fn version_flag_succeeds() {
        let mut env = TestEnv::new();
        env.run(&["--version"]).unwrap();
        assert!(version_string().starts_with("llamarunner "));
    }

    #[test]
    fn parse_args_accepts_valid_arguments() {
        let args: DemoArgs =
            parse_args("demo", &["/src".to_string(), "--force-cpu".to_string()])
                .unwrap()
                .unwrap();
        assert_eq!(args.dir.as_deref(), Some("/src"));
        assert!(args.force_cpu);
    }

    #[test]
    fn parse_args_reports_invalid_arguments() {
        let err = parse_args::<DemoArgs>("demo", &["--bogus".to_string()]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RunnerError>(),
            Some(RunnerError::InvalidArguments { .. })
        ));
    }

    #[test]
    fn parse_args_help_returns_none() {
        let parsed = parse_args::<DemoArgs>("demo", &["--help".to_string()]).unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn usage_names_binary_and_command() {
        let usage = usage_of::<DemoArgs>("demo");
        assert!(usage.contains("llamarunner demo"), "{usage}");
        assert!(usage.contains("[DIR]"), "{usage}");
    }
}
