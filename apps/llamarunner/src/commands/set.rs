//! Set command for llamarunner.
//!
//! Manages the settings file.
//!
//! ## Usage
//!
//! ```bash
//! llamarunner set d    # Reset settings to defaults
//! llamarunner set e    # Edit settings in $VISUAL / $EDITOR
//! ```

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::Path;

use super::registry::{Command, CommandContext, parse_args, usage_of};
use crate::config::SettingsStore;
use crate::config::preset::tokenize;
use crate::toolchain::{ProcessSpec, ToolProbe};

/// Editors tried when neither `$VISUAL` nor `$EDITOR` is set.
const FALLBACK_EDITORS: [&str; 2] = ["nano", "vi"];

/// What to do with the settings.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetAction {
    /// Reset settings to defaults.
    #[value(name = "d", alias = "defaults")]
    Defaults,
    /// Open settings in an editor.
    #[value(name = "e", alias = "edit")]
    Edit,
}

/// Arguments for the set command.
#[derive(Parser, Debug)]
#[command(name = "set", about = "Reset (d) or edit (e) the settings")]
pub struct SetArgs {
    /// `d` resets to defaults, `e` opens an editor.
    #[arg(value_enum)]
    pub action: SetAction,
}

/// `set {d|e}`
pub struct SetCommand;

impl Command for SetCommand {
    fn name(&self) -> &'static str {
        "set"
    }

    fn description(&self) -> &'static str {
        "Reset (d) or edit (e) the settings"
    }

    fn usage(&self) -> String {
        usage_of::<SetArgs>(self.name())
    }

    fn run(&self, ctx: &mut CommandContext<'_>, args: &[String]) -> Result<()> {
        let Some(args) = parse_args::<SetArgs>(self.name(), args)? else {
            return Ok(());
        };

        let store = SettingsStore::new(ctx.layout);
        match args.action {
            SetAction::Defaults => {
                store.save(&store.defaults())?;
                println!(
                    "Settings reset to defaults: {}",
                    ctx.layout.user_settings_file().display()
                );
                Ok(())
            }
            SetAction::Edit => edit(ctx, &store),
        }
    }
}

fn edit(ctx: &mut CommandContext<'_>, store: &SettingsStore<'_>) -> Result<()> {
    let settings = store.load();
    println!("Current settings:\n{settings}");

    // Edits always go to the user file, even when the values came from the
    // system file.
    let path = ctx.layout.user_settings_file();
    if !path.is_file() {
        store.save(&settings)?;
    }

    let Some(editor) = find_editor(ctx.probe) else {
        println!(
            "No editor found. Set $EDITOR or edit {} manually.",
            path.display()
        );
        return Ok(());
    };

    ctx.launcher.launch(&editor_command(&editor, &path))?;

    match store.read_file(&path) {
        Ok(_) => println!("Settings saved: {}", path.display()),
        Err(e) => {
            log::warn!("settings file failed to parse after editing: {e:#}");
            eprintln!(
                "Warning: {} is not valid anymore ({e:#}). Defaults apply until it is fixed.",
                path.display()
            );
        }
    }
    Ok(())
}

/// `$VISUAL`, then `$EDITOR`, then the first fallback editor on PATH.
fn find_editor(probe: &dyn ToolProbe) -> Option<String> {
    ["VISUAL", "EDITOR"]
        .into_iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .or_else(|| {
            FALLBACK_EDITORS
                .into_iter()
                .find(|editor| probe.find(editor).is_some())
                .map(ToString::to_string)
        })
}

/// Builds the editor invocation; `$EDITOR` may carry flags, e.g. `code -w`.
fn editor_command(editor: &str, path: &Path) -> ProcessSpec {
    let mut words = tokenize(editor).unwrap_or_else(|_| vec![editor.to_string()]);
    if words.is_empty() {
        words.push(editor.to_string());
    }
    let program = words.remove(0);
    ProcessSpec::new(program).args(words).arg(path)
}
