//! Directory layout for llamarunner's configuration.
//!
//! Two directories are consulted. The user directory holds the settings
//! file that is read and written on every invocation; the system directory
//! holds read-only shared defaults and presets.
//!
//! ## Directory Structure
//!
//! ```text
//! ~/.llama-presets/              # User directory (or LLAMA_PRESETS_HOME)
//!   settings.toml                # Settings record
//!   <preset>.cfg                 # Presets
//!   models/                      # Default model directory
//!
//! /usr/local/share/llama-presets/  # System directory (or LLAMA_PRESETS_SYSTEM_DIR)
//!   settings.toml                # Shared default settings
//!   <preset>.cfg                 # Shared presets
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable overriding the user directory.
pub const HOME_ENV: &str = "LLAMA_PRESETS_HOME";

/// Environment variable overriding the system directory.
pub const SYSTEM_DIR_ENV: &str = "LLAMA_PRESETS_SYSTEM_DIR";

/// Name of the user directory under `$HOME`.
const USER_DIR_NAME: &str = ".llama-presets";

/// Default system directory.
const DEFAULT_SYSTEM_DIR: &str = "/usr/local/share/llama-presets";

/// Settings file name, identical in both directories.
pub const SETTINGS_FILE: &str = "settings.toml";

/// Extension of preset files, without the dot.
pub const PRESET_EXTENSION: &str = "cfg";

/// Resolved user and system directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Per-user directory (`~/.llama-presets` or `LLAMA_PRESETS_HOME`).
    pub user_dir: PathBuf,
    /// Shared read-only directory.
    pub system_dir: PathBuf,
}

impl Layout {
    /// Creates a new `Layout` from the environment.
    ///
    /// The user directory is `LLAMA_PRESETS_HOME` when set, otherwise
    /// `~/.llama-presets`. The system directory is `LLAMA_PRESETS_SYSTEM_DIR`
    /// when set, otherwise `/usr/local/share/llama-presets`. Empty values are
    /// treated as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined and no
    /// override is set.
    pub fn new() -> Result<Self> {
        let user_dir = match env_path(HOME_ENV) {
            Some(dir) => dir,
            None => dirs::home_dir()
                .context("Cannot determine home directory. Set LLAMA_PRESETS_HOME.")?
                .join(USER_DIR_NAME),
        };
        let system_dir =
            env_path(SYSTEM_DIR_ENV).unwrap_or_else(|| PathBuf::from(DEFAULT_SYSTEM_DIR));

        Ok(Self::with_dirs(user_dir, system_dir))
    }

    /// Creates a `Layout` from explicit directories.
    #[must_use = "returns new layout without side effects"]
    pub fn with_dirs(user_dir: PathBuf, system_dir: PathBuf) -> Self {
        Self {
            user_dir,
            system_dir,
        }
    }

    /// Returns the path to the user-scoped settings file.
    #[must_use = "returns the path without side effects"]
    pub fn user_settings_file(&self) -> PathBuf {
        self.user_dir.join(SETTINGS_FILE)
    }

    /// Returns the path to the system-scoped settings file.
    #[must_use = "returns the path without side effects"]
    pub fn system_settings_file(&self) -> PathBuf {
        self.system_dir.join(SETTINGS_FILE)
    }

    /// Returns the default model directory.
    #[must_use = "returns the path without side effects"]
    pub fn models_dir(&self) -> PathBuf {
        self.user_dir.join("models")
    }

    /// Creates the user directory if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn ensure_user_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.user_dir)
            .with_context(|| format!("Failed to create directory: {}", self.user_dir.display()))
    }
}

/// Returns the path of preset `name` inside `dir`.
#[must_use]
pub fn preset_file(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.{PRESET_EXTENSION}"))
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var(var)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn with_dirs_derives_settings_paths() {
        let layout = Layout::with_dirs(PathBuf::from("/home/u/.lp"), PathBuf::from("/srv/lp"));

        assert_eq!(
            layout.user_settings_file(),
            PathBuf::from("/home/u/.lp/settings.toml")
        );
        assert_eq!(
            layout.system_settings_file(),
            PathBuf::from("/srv/lp/settings.toml")
        );
        assert_eq!(layout.models_dir(), PathBuf::from("/home/u/.lp/models"));
    }

    #[test]
    fn preset_file_appends_extension() {
        assert_eq!(
            preset_file(Path::new("/presets"), "mistral"),
            PathBuf::from("/presets/mistral.cfg")
        );
    }

    #[test]
    #[serial_test::serial]
    fn new_honors_environment_overrides() {
        // SAFETY: serialized with the other env-mutating tests and restored below.
        unsafe {
            env::set_var(HOME_ENV, "/tmp/llamarunner-home");
            env::set_var(SYSTEM_DIR_ENV, "/tmp/llamarunner-system");
        }

        let layout = Layout::new();

        // SAFETY: cleanup of the variables set above.
        unsafe {
            env::remove_var(HOME_ENV);
            env::remove_var(SYSTEM_DIR_ENV);
        }

        let layout = layout.expect("layout from env");
        assert_eq!(layout.user_dir, PathBuf::from("/tmp/llamarunner-home"));
        assert_eq!(layout.system_dir, PathBuf::from("/tmp/llamarunner-system"));
    }

    #[test]
    #[serial_test::serial]
    fn blank_override_falls_back_to_defaults() {
        // SAFETY: serialized with the other env-mutating tests and restored below.
        unsafe {
            env::set_var(SYSTEM_DIR_ENV, "   ");
        }

        let layout = Layout::new();

        // SAFETY: cleanup of the variable set above.
        unsafe {
            env::remove_var(SYSTEM_DIR_ENV);
        }

        let layout = layout.expect("layout from env");
        assert_eq!(layout.system_dir, PathBuf::from(DEFAULT_SYSTEM_DIR));
    }

    #[test]
    fn ensure_user_dir_creates_nested_directories() {
        let temp = assert_fs::TempDir::new().unwrap();
        let layout = Layout::with_dirs(temp.path().join("a").join("b"), temp.path().join("sys"));

        layout.ensure_user_dir().unwrap();

        assert!(layout.user_dir.is_dir());
    }
}
