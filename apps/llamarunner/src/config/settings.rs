//! The persisted settings record and its layered loader.
//!
//! ## Resolution Order
//!
//! 1. User file (`<user dir>/settings.toml`)
//! 2. System file (`<system dir>/settings.toml`)
//! 3. Built-in defaults, written back to the user file
//!
//! A file that is missing or cannot be parsed counts as absent and the next
//! source is tried. Fields missing from a file that does parse are filled from
//! the defaults, so a loaded record is always complete.
//!
//! ## File Format
//!
//! ```toml
//! llama_cpp_path = "/usr/local/llama.cpp"
//! model_path = "/home/user/.llama-presets/models"
//! config_path = "/home/user/.llama-presets"
//! host = "localhost"
//! port = "8080"
//! force_cpu = false
//! version = "0.3.0"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use super::layout::Layout;

/// Default llama.cpp installation directory.
pub const DEFAULT_LLAMA_CPP_PATH: &str = "/usr/local/llama.cpp";

/// Default server host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default server port.
pub const DEFAULT_PORT: &str = "8080";

/// The tool's own configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// Directory llama.cpp is installed into; binaries land here after a build.
    pub llama_cpp_path: PathBuf,
    /// Directory models are expected in.
    pub model_path: PathBuf,
    /// Directory presets are kept in.
    pub config_path: PathBuf,
    /// Host passed to `llama-server --host`.
    pub host: String,
    /// Port passed to `llama-server --port`.
    pub port: String,
    /// Skip GPU-accelerated builds.
    pub force_cpu: bool,
    /// Installed llamarunner release.
    pub version: String,
}

impl Settings {
    /// Returns the built-in defaults for `layout`.
    #[must_use = "returns new settings without side effects"]
    pub fn defaults(layout: &Layout) -> Self {
        Self {
            llama_cpp_path: PathBuf::from(DEFAULT_LLAMA_CPP_PATH),
            model_path: layout.models_dir(),
            config_path: layout.user_dir.clone(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT.to_string(),
            force_cpu: false,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "llama_cpp_path: {}", self.llama_cpp_path.display())?;
        writeln!(f, "model_path:     {}", self.model_path.display())?;
        writeln!(f, "config_path:    {}", self.config_path.display())?;
        writeln!(f, "host:           {}", self.host)?;
        writeln!(f, "port:           {}", self.port)?;
        writeln!(f, "force_cpu:      {}", self.force_cpu)?;
        write!(f, "version:        {}", self.version)
    }
}

/// On-disk shape of the settings file. Every field may be missing.
#[derive(Debug, Default, Deserialize)]
struct StoredSettings {
    llama_cpp_path: Option<PathBuf>,
    model_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<StoredPort>,
    force_cpu: Option<bool>,
    version: Option<String>,
}

/// Ports written by hand are often bare integers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredPort {
    Text(String),
    Number(u16),
}

impl StoredSettings {
    fn fill(self, defaults: Settings) -> Settings {
        Settings {
            llama_cpp_path: self.llama_cpp_path.unwrap_or(defaults.llama_cpp_path),
            model_path: self.model_path.unwrap_or(defaults.model_path),
            config_path: self.config_path.unwrap_or(defaults.config_path),
            host: self.host.unwrap_or(defaults.host),
            port: match self.port {
                Some(StoredPort::Text(port)) => port,
                Some(StoredPort::Number(port)) => port.to_string(),
                None => defaults.port,
            },
            force_cpu: self.force_cpu.unwrap_or(defaults.force_cpu),
            version: self.version.unwrap_or(defaults.version),
        }
    }
}

/// Where a loaded settings record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsSource {
    /// The user-scoped file.
    User,
    /// The system-scoped file.
    System,
    /// Freshly generated defaults.
    Defaults,
}

impl fmt::Display for SettingsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::User => "user settings file",
            Self::System => "system settings file",
            Self::Defaults => "built-in defaults",
        };
        f.write_str(label)
    }
}

/// Loads and saves the settings record for a [`Layout`].
#[derive(Debug, Clone, Copy)]
pub struct SettingsStore<'a> {
    layout: &'a Layout,
}

impl<'a> SettingsStore<'a> {
    /// Creates a store over `layout`.
    #[must_use]
    pub fn new(layout: &'a Layout) -> Self {
        Self { layout }
    }

    /// Returns the built-in defaults for this store's layout.
    #[must_use]
    pub fn defaults(&self) -> Settings {
        Settings::defaults(self.layout)
    }

    /// Loads the settings record through the fallback chain.
    ///
    /// Never fails: the last source is the built-in defaults.
    #[must_use]
    pub fn load(&self) -> Settings {
        self.load_with_source().0
    }

    /// Like [`load`](Self::load), also reporting which source won.
    #[must_use]
    pub fn load_with_source(&self) -> (Settings, SettingsSource) {
        let file_sources = [
            (SettingsSource::User, self.layout.user_settings_file()),
            (SettingsSource::System, self.layout.system_settings_file()),
        ];

        let loaded = file_sources
            .iter()
            .find_map(|(source, path)| self.try_file(path).map(|settings| (settings, *source)));

        match loaded {
            Some((settings, source)) => {
                log::debug!("settings loaded from {source}");
                (settings, source)
            }
            None => (self.create_defaults(), SettingsSource::Defaults),
        }
    }

    /// Parses the settings file at `path`, filling missing fields from defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid settings TOML.
    pub fn read_file(&self, path: &Path) -> Result<Settings> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let stored: StoredSettings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))?;
        Ok(stored.fill(self.defaults()))
    }

    /// Writes `settings` to the user file, replacing its previous content.
    ///
    /// The record is written to a sibling temporary file first and renamed
    /// into place.
    ///
    /// # Errors
    ///
    /// Returns an error if the user directory or the file cannot be written.
    pub fn save(&self, settings: &Settings) -> Result<()> {
        self.layout.ensure_user_dir()?;

        let path = self.layout.user_settings_file();
        let content = toml::to_string_pretty(settings).context("Failed to serialize settings")?;
        let temp_path = path.with_extension("toml.tmp");

        std::fs::write(&temp_path, content)
            .with_context(|| format!("Failed to write settings to {}", temp_path.display()))?;
        std::fs::rename(&temp_path, &path).with_context(|| {
            format!(
                "Failed to move {} into place at {}",
                temp_path.display(),
                path.display()
            )
        })?;

        log::debug!("settings saved to {}", path.display());
        Ok(())
    }

    fn try_file(&self, path: &Path) -> Option<Settings> {
        if !path.exists() {
            log::debug!("no settings file at {}", path.display());
            return None;
        }
        match self.read_file(path) {
            Ok(settings) => Some(settings),
            Err(e) => {
                log::warn!("ignoring unreadable settings file: {e:#}");
                None
            }
        }
    }

    fn create_defaults(&self) -> Settings {
        let settings = self.defaults();
        if let Err(e) = self.save(&settings) {
            log::warn!("could not persist default settings: {e:#}");
        } else {
            log::info!(
                "created default settings at {}",
                self.layout.user_settings_file().display()
            );
        }
        settings
    }
}
