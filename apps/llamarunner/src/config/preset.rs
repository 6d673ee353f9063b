//! Preset discovery and launch command composition.
//!
//! A preset is a `<name>.cfg` file holding free-form trailing arguments for
//! `llama-server`, for example:
//!
//! ```text
//! -m /models/mistral-7b-instruct.Q4_K_M.gguf -t 8 -n 200 -c 4096
//! ```
//!
//! Running a preset composes
//! `<llama-server> --host <host> --port <port> <preset content>` from the
//! current settings and the file content.
//!
//! ## Legacy Presets
//!
//! Older presets were written as `key=value` lines (`model`, `threads`,
//! `n_predict`, `ctx_size`). Those are recognized and rewritten in memory
//! to the equivalent arguments; a `key=value` file using any other key is
//! rejected instead of being passed through as arguments.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::layout::{Layout, PRESET_EXTENSION, preset_file};
use super::settings::SettingsStore;
use crate::errors::RunnerError;
use crate::prompt::Prompter;

/// Name of the inference server binary.
pub const SERVER_BINARY: &str = "llama-server";

/// Legacy keys and the server flags they translate to, in emission order.
const LEGACY_KEYS: [(&str, &str); 4] = [
    ("model", "-m"),
    ("threads", "-t"),
    ("n_predict", "-n"),
    ("ctx_size", "-c"),
];

/// Interior format a preset file was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetFormat {
    /// Free-form trailing arguments (current format).
    Arguments,
    /// `key=value` lines, translated to arguments on load.
    LegacyKeyValue,
}

/// A preset resolved into a launchable command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPreset {
    /// Preset name.
    pub name: String,
    /// File the preset was read from.
    pub path: PathBuf,
    /// Server binary the command line starts with.
    pub binary: PathBuf,
    /// Format the file was written in.
    pub format: PresetFormat,
    /// Full command line, ready for [`tokenize`].
    pub command_line: String,
}

/// Locates the directory presets live in.
///
/// Tries the user directory, then the system directory. When neither exists
/// the user is asked for a path; an empty answer creates and returns the
/// user directory.
///
/// # Errors
///
/// Returns an error if prompting fails or the default directory cannot be
/// created.
pub fn resolve_config_dir(layout: &Layout, prompter: &mut dyn Prompter) -> Result<PathBuf> {
    if let Some(dir) = existing_config_dir(layout) {
        log::debug!("using config directory {}", dir.display());
        return Ok(dir);
    }

    println!("Config directory not found: {}", layout.user_dir.display());
    let answer =
        prompter.ask("Enter config directory path (or press Enter to create it): ")?;
    if !answer.is_empty() {
        return Ok(PathBuf::from(answer));
    }

    layout.ensure_user_dir()?;
    println!("Created config directory: {}", layout.user_dir.display());
    Ok(layout.user_dir.clone())
}

/// The first existing directory of user, then system. Never prompts.
#[must_use]
pub fn existing_config_dir(layout: &Layout) -> Option<PathBuf> {
    [&layout.user_dir, &layout.system_dir]
        .into_iter()
        .find(|dir| dir.is_dir())
        .cloned()
}

/// Checks that `name` can be used as a preset file stem.
///
/// # Errors
///
/// Returns `InvalidArguments` for empty names, names with path separators or
/// whitespace, and names starting with a dot.
pub fn validate_name(name: &str) -> Result<(), RunnerError> {
    if name.is_empty() {
        return Err(RunnerError::invalid_arguments("preset name cannot be empty"));
    }
    if name.starts_with('.') {
        return Err(RunnerError::invalid_arguments(format!(
            "preset name '{name}' cannot start with '.'"
        )));
    }
    if name
        .chars()
        .any(|c| c == '/' || c == '\\' || c.is_whitespace())
    {
        return Err(RunnerError::invalid_arguments(format!(
            "preset name '{name}' cannot contain path separators or whitespace"
        )));
    }
    Ok(())
}

/// Lists the preset names in `dir`, sorted.
///
/// Only regular files with the `.cfg` extension count.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn list_presets(dir: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read presets directory: {}", dir.display()))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| "Failed to read directory entry")?;
        let path = entry.path();
        if path.is_file()
            && path.extension().and_then(|ext| ext.to_str()) == Some(PRESET_EXTENSION)
            && let Some(stem) = path.file_stem().and_then(|stem| stem.to_str())
        {
            names.push(stem.to_string());
        }
    }

    names.sort();
    Ok(names)
}

/// Returns the `llama-server` binary for an installation directory.
///
/// Checks, in order, the directory itself (where builds copy binaries),
/// the in-tree build output under `llama.cpp/`, and a build output directly
/// under the installation directory. Falls back to the first candidate when
/// none exists.
#[must_use]
pub fn server_binary(llama_cpp_path: &Path) -> PathBuf {
    let candidates = [
        llama_cpp_path.join(SERVER_BINARY),
        llama_cpp_path
            .join("llama.cpp")
            .join("build")
            .join("bin")
            .join(SERVER_BINARY),
        llama_cpp_path.join("build").join("bin").join(SERVER_BINARY),
    ];

    candidates
        .iter()
        .find(|candidate| candidate.is_file())
        .unwrap_or(&candidates[0])
        .clone()
}

/// Resolves preset `name` into a launch command line.
///
/// # Errors
///
/// Returns `PresetNotFound` when `<name>.cfg` does not exist in the resolved
/// config directory, `InvalidPreset` for unusable legacy files, and I/O
/// errors from reading the file.
pub fn resolve_preset(
    layout: &Layout,
    prompter: &mut dyn Prompter,
    name: &str,
) -> Result<ResolvedPreset> {
    validate_name(name)?;

    let config_dir = resolve_config_dir(layout, prompter)?;
    let path = preset_file(&config_dir, name);
    if !path.is_file() {
        return Err(RunnerError::preset_not_found(name, path).into());
    }

    let settings = SettingsStore::new(layout).load();

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read preset {}", path.display()))?;
    let (arguments, format) = preset_arguments(&path, &raw)?;

    let binary = server_binary(&settings.llama_cpp_path);
    let command_line = compose_command_line(&binary, &settings.host, &settings.port, &arguments);
    log::debug!("preset '{name}' resolved to: {command_line}");

    Ok(ResolvedPreset {
        name: name.to_string(),
        path,
        binary,
        format,
        command_line,
    })
}

/// Joins binary, host, port and preset arguments into one command line.
#[must_use]
pub fn compose_command_line(binary: &Path, host: &str, port: &str, arguments: &str) -> String {
    let mut line = format!(
        "{} --host {} --port {}",
        quote(&binary.to_string_lossy()),
        quote(host),
        quote(port)
    );
    if !arguments.is_empty() {
        line.push(' ');
        line.push_str(arguments);
    }
    line
}

/// Turns raw preset file content into an argument string.
///
/// # Errors
///
/// Returns `InvalidPreset` for `key=value` content using unknown keys.
pub fn preset_arguments(path: &Path, raw: &str) -> Result<(String, PresetFormat), RunnerError> {
    let content = raw.trim();
    let Some(pairs) = key_value_lines(content) else {
        return Ok((content.to_string(), PresetFormat::Arguments));
    };

    if let Some((key, _)) = pairs
        .iter()
        .find(|(key, _)| !LEGACY_KEYS.iter().any(|(known, _)| known == key))
    {
        return Err(RunnerError::invalid_preset(
            path.to_path_buf(),
            format!(
                "unknown key '{key}'; write presets as llama-server arguments, e.g. '-m model.gguf -c 4096'"
            ),
        ));
    }

    let mut arguments = Vec::new();
    for (key, flag) in LEGACY_KEYS {
        if let Some((_, value)) = pairs.iter().find(|(k, _)| *k == key)
            && !value.is_empty()
        {
            arguments.push(flag.to_string());
            arguments.push(quote(value));
        }
    }

    Ok((arguments.join(" "), PresetFormat::LegacyKeyValue))
}

/// Renders the preset file content `init` writes.
#[must_use]
pub fn render_preset(model: &str, threads: &str, n_predict: &str, ctx_size: &str) -> String {
    format!(
        "-m {} -t {} -n {} -c {}\n",
        quote(model),
        quote(threads),
        quote(n_predict),
        quote(ctx_size)
    )
}

/// Splits `content` into `key=value` pairs if every non-blank line is one.
fn key_value_lines(content: &str) -> Option<Vec<(&str, &str)>> {
    if content.is_empty() {
        return None;
    }

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            let is_identifier = !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
                && !key.starts_with(|c: char| c.is_ascii_digit());
            is_identifier.then_some((key, value.trim()))
        })
        .collect()
}

/// Quotes `arg` for [`tokenize`] when it contains anything beyond a safe set.
#[must_use]
pub fn quote(arg: &str) -> String {
    let is_safe = |c: char| c.is_ascii_alphanumeric() || "-_./:=+,@%".contains(c);
    if !arg.is_empty() && arg.chars().all(is_safe) {
        return arg.to_string();
    }
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// Splits a command line into arguments.
///
/// Whitespace (including newlines) separates arguments. Single quotes keep
/// their content literally, double quotes allow `\"` and `\\` escapes, and
/// a backslash outside quotes escapes the next character.
///
/// # Errors
///
/// Returns a description of the problem for unterminated quotes or a
/// trailing backslash.
pub fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            '\'' => {
                in_token = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(inner) => current.push(inner),
                        None => return Err("unterminated single quote".to_string()),
                    }
                }
            }
            '"' => {
                in_token = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(escaped @ ('"' | '\\')) => current.push(escaped),
                            Some(other) => {
                                current.push('\\');
                                current.push(other);
                            }
                            None => return Err("unterminated double quote".to_string()),
                        },
                        Some(inner) => current.push(inner),
                        None => return Err("unterminated double quote".to_string()),
                    }
                }
            }
            '\\' => {
                in_token = true;
                match chars.next() {
                    Some(escaped) => current.push(escaped),
                    None => return Err("trailing backslash".to_string()),
                }
            }
            other => {
                in_token = true;
                current.push(other);
            }
        }
    }

    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}
