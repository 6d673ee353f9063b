//! Run command for llamarunner.
//!
//! Launches `llama-server` with a preset.
//!
//! ## Execution Pipeline
//!
//! 1. **Resolve** - Find `<preset>.cfg` and compose the command line from
//!    the settings (`--host`, `--port`) and the preset content
//! 2. **Split** - Tokenize the command line and append any extra arguments
//! 3. **Check** - Make sure the server binary exists
//! 4. **Execute** - Run it in the foreground until it exits
//!
//! ```bash
//! llamarunner run mistral                  # Launch the mistral preset
//! llamarunner run mistral --verbose        # Append extra server flags
//! llamarunner mistral                      # Same as the first form
//! ```

use anyhow::Result;
use clap::Parser;

use super::registry::{BIN_NAME, Command, CommandContext, parse_args, usage_of};
use crate::config::preset::{PresetFormat, SERVER_BINARY, resolve_preset, tokenize};
use crate::errors::RunnerError;
use crate::toolchain::ProcessSpec;

/// Arguments for the run command.
#[derive(Parser, Debug)]
#[command(name = "run", about = "Launch llama-server with a preset")]
pub struct RunArgs {
    /// Preset name (the file name without `.cfg`).
    pub preset: String,

    /// Extra arguments appended after the preset's own.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub extra: Vec<String>,
}

/// `run <preset> [extra args...]`
pub struct RunCommand;

impl Command for RunCommand {
    fn name(&self) -> &'static str {
        "run"
    }

    fn description(&self) -> &'static str {
        "Launch llama-server with a preset"
    }

    fn usage(&self) -> String {
        usage_of::<RunArgs>(self.name())
    }

    fn run(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<()> {
        let Some(args) = parse_args::<RunArgs>(self.name(), args)? else {
            return Ok(());
        };

        let resolved = resolve_preset(ctx.layout, ctx.prompter, &args.preset)?;
        if resolved.format == PresetFormat::LegacyKeyValue {
            log::warn!(
                "preset {} uses the old key=value format; rewrite it as server arguments",
                resolved.path.display()
            );
        }

        let mut tokens = tokenize(&resolved.command_line)
            .map_err(|message| RunnerError::invalid_preset(resolved.path.clone(), message))?;
        tokens.extend(args.extra);

        if !resolved.binary.is_file() {
            return Err(RunnerError::missing_prerequisite(
                SERVER_BINARY,
                format!(
                    "Expected it at {}.\n\
                     Run '{BIN_NAME} install' or '{BIN_NAME} build', \
                     or point llama_cpp_path at your installation with '{BIN_NAME} set e'.",
                    resolved.binary.display()
                ),
            )
            .into());
        }

        let Some((program, rest)) = tokens.split_first() else {
            return Err(RunnerError::invalid_preset(resolved.path, "empty command line").into());
        };

        println!("Running preset '{}': {}", resolved.name, resolved.command_line);
        ctx.launcher.launch(&ProcessSpec::new(program).args(rest))
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::registry::testing::TestEnv;
    use crate::errors::RunnerError;
    use std::ffi::OsString;

    fn env_with_server(preset: &str, content: &str) -> TestEnv {
        let env = TestEnv::new().preset(preset, content);
        let root = env.temp.path().join("llama");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("llama-server"), "").unwrap();
        std::fs::write(
            env.layout.user_settings_file(),
            format!(
                "llama_cpp_path = \"{}\"\nhost = \"127.0.0.1\"\nport = 9000\n",
                root.display()
            ),
        )
        .unwrap();
        env
    }

    fn args_of(env: &TestEnv) -> Vec<OsString> {
        env.launcher.launched[0].args.clone()
    }

    #[test]
    fn run_launches_server_with_preset_arguments() {
        let mut env = env_with_server("mistral", "-m '/models/my model.gguf' -c 4096\n");

        env.run(&["run", "mistral"]).unwrap();

        assert_eq!(env.launcher.launched.len(), 1);
        assert_eq!(
            env.launcher.launched[0].program,
            env.temp.path().join("llama").join("llama-server").into_os_string()
        );
        assert_eq!(
            args_of(&env),
            [
                "--host",
                "127.0.0.1",
                "--port",
                "9000",
                "-m",
                "/models/my model.gguf",
                "-c",
                "4096"
            ]
            .map(OsString::from)
        );
    }

    #[test]
    fn run_appends_extra_arguments() {
        let mut env = env_with_server("mistral", "-c 4096");

        env.run(&["run", "mistral", "--verbose", "-ngl", "99"]).unwrap();

        let args = args_of(&env);
        assert_eq!(
            args[args.len() - 3..],
            ["--verbose", "-ngl", "99"].map(OsString::from)
        );
    }

    #[test]
    fn run_translates_legacy_presets() {
        let mut env = env_with_server("old", "model=/m.gguf\nthreads=4\n");

        env.run(&["run", "old"]).unwrap();

        assert_eq!(
            args_of(&env)[4..],
            ["-m", "/m.gguf", "-t", "4"].map(OsString::from)
        );
    }

    #[test]
    fn run_reports_missing_server_binary() {
        let mut env = env_with_server("mistral", "-c 4096");
        std::fs::remove_file(env.temp.path().join("llama").join("llama-server")).unwrap();

        let err = env.run(&["run", "mistral"]).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<RunnerError>(),
            Some(RunnerError::MissingPrerequisite { tool, .. }) if tool == "llama-server"
        ));
        assert!(env.launcher.launched.is_empty());
    }

    #[test]
    fn run_reports_missing_preset() {
        let mut env = env_with_server("mistral", "-c 4096");

        let err = env.run(&["run", "llama3"]).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<RunnerError>(),
            Some(RunnerError::PresetNotFound { name, .. }) if name == "llama3"
        ));
    }

    #[test]
    fn run_rejects_unterminated_quote() {
        let mut env = env_with_server("broken", "-m 'oops");

        let err = env.run(&["run", "broken"]).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<RunnerError>(),
            Some(RunnerError::InvalidPreset { .. })
        ));
        assert!(env.launcher.launched.is_empty());
    }

    #[test]
    fn run_requires_preset_name() {
        let mut env = TestEnv::new();
        let err = env.run(&["run"]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RunnerError>(),
            Some(RunnerError::InvalidArguments { .. })
        ));
    }
}
