//! Init command for llamarunner.
//!
//! Interactively creates a preset file in the config directory.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use super::registry::{BIN_NAME, Command, CommandContext, parse_args, usage_of};
use crate::config::SettingsStore;
use crate::config::layout::preset_file;
use crate::config::preset::{render_preset, resolve_config_dir, validate_name};
use crate::errors::RunnerError;
use crate::prompt::ask_or_default;

const DEFAULT_THREADS: &str = "8";
const DEFAULT_N_PREDICT: &str = "200";
const DEFAULT_CTX_SIZE: &str = "2048";

/// Arguments for the init command.
#[derive(Parser, Debug)]
#[command(name = "init", about = "Create a new preset interactively")]
pub struct InitArgs {}

/// `init`
pub struct InitCommand;

impl Command for InitCommand {
    fn name(&self) -> &'static str {
        "init"
    }

    fn description(&self) -> &'static str {
        "Create a new preset interactively"
    }

    fn usage(&self) -> String {
        usage_of::<InitArgs>(self.name())
    }

    fn run(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<()> {
        if parse_args::<InitArgs>(self.name(), args)?.is_none() {
            return Ok(());
        }

        let config_dir = resolve_config_dir(ctx.layout, ctx.prompter)?;

        let name = ctx.prompter.ask("Preset name: ")?;
        validate_name(&name)?;
        let path = preset_file(&config_dir, &name);
        if path.exists() {
            return Err(RunnerError::invalid_arguments(format!(
                "preset '{name}' already exists: {}",
                path.display()
            ))
            .into());
        }
        if ctx.registry.contains(&name) {
            println!(
                "Note: '{name}' is also a command. Start this preset with '{BIN_NAME} run {name}'."
            );
        }

        let settings = SettingsStore::new(ctx.layout).load();
        let model = ctx.prompter.ask(&format!(
            "Model path (relative paths resolve in {}): ",
            settings.model_path.display()
        ))?;
        if model.is_empty() {
            return Err(RunnerError::invalid_arguments("model path is required").into());
        }
        let model = {
            let model = PathBuf::from(model);
            if model.is_absolute() {
                model
            } else {
                settings.model_path.join(model)
            }
        };

        let threads = ask_count(ctx, "Threads", DEFAULT_THREADS)?;
        let n_predict = ask_count(ctx, "Tokens to predict (n_predict)", DEFAULT_N_PREDICT)?;
        let ctx_size = ask_count(ctx, "Context size", DEFAULT_CTX_SIZE)?;

        let content = render_preset(&model.to_string_lossy(), &threads, &n_predict, &ctx_size);
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write preset {}", path.display()))?;

        println!("Preset '{name}' saved to {}", path.display());
        println!("Start it with '{BIN_NAME} run {name}'.");
        Ok(())
    }
}

/// Prompts for a positive integer, with a default for an empty answer.
fn ask_count(ctx: &mut CommandContext<'_>, label: &str, default: &str) -> Result<String> {
    let answer = ask_or_default(ctx.prompter, &format!("{label} [{default}]: "), default)?;
    match answer.parse::<u32>() {
        Ok(value) if value > 0 => Ok(answer),
        _ => Err(RunnerError::invalid_arguments(format!(
            "{label} must be a positive integer, got '{answer}'"
        ))
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::registry::testing::TestEnv;
    use crate::config::layout::preset_file;
    use crate::config::preset::tokenize;
    use crate::errors::RunnerError;

    #[test]
    fn init_writes_preset_with_defaults() {
        let mut env = TestEnv::new()
            .with_user_dir()
            .answers(&["mistral", "/models/mistral.gguf", "", "", ""]);

        env.run(&["init"]).unwrap();

        let content =
            std::fs::read_to_string(preset_file(&env.layout.user_dir, "mistral")).unwrap();
        assert_eq!(content, "-m /models/mistral.gguf -t 8 -n 200 -c 2048\n");
    }

    #[test]
    fn init_uses_answers_and_resolves_relative_model() {
        let mut env = TestEnv::new()
            .with_user_dir()
            .answers(&["big", "my model.gguf", "16", "512", "8192"]);

        env.run(&["init"]).unwrap();

        let content = std::fs::read_to_string(preset_file(&env.layout.user_dir, "big")).unwrap();
        let model = env.layout.models_dir().join("my model.gguf");
        assert_eq!(
            tokenize(&content).unwrap(),
            vec![
                "-m".to_string(),
                model.to_string_lossy().into_owned(),
                "-t".to_string(),
                "16".to_string(),
                "-n".to_string(),
                "512".to_string(),
                "-c".to_string(),
                "8192".to_string(),
            ]
        );
    }

    #[test]
    fn init_refuses_to_overwrite_existing_preset() {
        let mut env = TestEnv::new()
            .preset("mistral", "-c 1")
            .answers(&["mistral", "/m.gguf"]);

        let err = env.run(&["init"]).unwrap_err();

        assert!(err.to_string().contains("already exists"));
        let content =
            std::fs::read_to_string(preset_file(&env.layout.user_dir, "mistral")).unwrap();
        assert_eq!(content, "-c 1");
    }

    #[test]
    fn init_requires_model_path() {
        let mut env = TestEnv::new().with_user_dir().answers(&["mistral", ""]);

        let err = env.run(&["init"]).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<RunnerError>(),
            Some(RunnerError::InvalidArguments { .. })
        ));
        assert!(!preset_file(&env.layout.user_dir, "mistral").exists());
    }

    #[test]
    fn init_rejects_bad_names_and_counts() {
        let mut env = TestEnv::new().with_user_dir().answers(&["a/b"]);
        assert!(env.run(&["init"]).is_err());

        let mut env = TestEnv::new()
            .with_user_dir()
            .answers(&["ok", "/m.gguf", "many"]);
        assert!(env.run(&["init"]).is_err());
        assert!(!preset_file(&env.layout.user_dir, "ok").exists());
    }

    #[test]
    fn init_allows_names_shadowed_by_commands() {
        let mut env = TestEnv::new()
            .with_user_dir()
            .answers(&["list", "/m.gguf", "", "", ""]);

        env.run(&["init"]).unwrap();

        assert!(preset_file(&env.layout.user_dir, "list").exists());
    }

    #[test]
    fn init_creates_config_directory_when_missing() {
        let mut env = TestEnv::new().answers(&["", "first", "/m.gguf", "", "", ""]);

        env.run(&["init"]).unwrap();

        assert!(preset_file(&env.layout.user_dir, "first").exists());
    }
}
