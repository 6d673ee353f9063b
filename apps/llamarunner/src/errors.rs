//! Error types for the llamarunner CLI.
//!
//! Commands return `anyhow::Result` and attach context as they go. The
//! variants here cover the failures callers need to tell apart: a missing
//! external tool, a missing preset, a refused prompt, a child process that
//! exited unsuccessfully. Malformed settings files never surface here; the
//! settings loader treats them as absent.

use std::path::PathBuf;
use thiserror::Error;

/// Consolidated error type for llamarunner operations.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// A required external program is not on PATH.
    #[error("{tool} is required but was not found in PATH\n\n{hint}")]
    MissingPrerequisite {
        /// Program name as looked up on PATH.
        tool: String,
        /// How to get it installed.
        hint: String,
    },

    /// No `<name>.cfg` in the resolved config directory.
    #[error("preset '{name}' not found: {}", path.display())]
    PresetNotFound {
        /// The requested preset name.
        name: String,
        /// The path that was checked.
        path: PathBuf,
    },

    /// The first CLI token is neither a command nor a preset.
    #[error("unknown command or preset: '{name}'\n\nRun 'llamarunner help' to see available commands.")]
    UnknownCommand {
        /// The unrecognized token.
        name: String,
    },

    /// Invalid command line arguments.
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        /// Description of what was invalid.
        message: String,
    },

    /// A preset file could not be turned into launch arguments.
    #[error("invalid preset {}: {message}", path.display())]
    InvalidPreset {
        /// The preset file.
        path: PathBuf,
        /// What is wrong with it.
        message: String,
    },

    /// The user answered a confirmation prompt negatively.
    #[error("{message}")]
    Declined {
        /// Explanation printed to the user.
        message: String,
    },

    /// A spawned program exited with a non-zero status.
    #[error("{program} exited with code {code}")]
    ProcessFailed {
        /// The program that was run.
        program: String,
        /// Its exit code (1 when terminated by a signal).
        code: i32,
    },

    /// A build finished without producing the expected binaries.
    #[error("{message}: {}", path.display())]
    BuildOutputMissing {
        /// Directory the binaries were expected in.
        path: PathBuf,
        /// What was missing.
        message: String,
    },

    /// The release metadata could not be fetched or used.
    #[error("release error: {message}")]
    Release {
        /// Description of the release error.
        message: String,
    },

    /// Checksum verification failed.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The expected checksum.
        expected: String,
        /// The actual checksum.
        actual: String,
    },

    /// The running OS/architecture has no published binary.
    #[error("unsupported platform: {os} on {arch}")]
    UnsupportedPlatform {
        /// `std::env::consts::OS`.
        os: String,
        /// `std::env::consts::ARCH`.
        arch: String,
    },
}

impl RunnerError {
    /// Creates a new `MissingPrerequisite` error.
    #[must_use]
    pub fn missing_prerequisite(tool: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::MissingPrerequisite {
            tool: tool.into(),
            hint: hint.into(),
        }
    }

    /// Creates a new `PresetNotFound` error.
    #[must_use]
    pub fn preset_not_found(name: impl Into<String>, path: PathBuf) -> Self {
        Self::PresetNotFound {
            name: name.into(),
            path,
        }
    }

    /// Creates a new `UnknownCommand` error.
    #[must_use]
    pub fn unknown_command(name: impl Into<String>) -> Self {
        Self::UnknownCommand { name: name.into() }
    }

    /// Creates a new `InvalidArguments` error.
    #[must_use]
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidPreset` error.
    #[must_use]
    pub fn invalid_preset(path: PathBuf, message: impl Into<String>) -> Self {
        Self::InvalidPreset {
            path,
            message: message.into(),
        }
    }

    /// Creates a new `Declined` error.
    #[must_use]
    pub fn declined(message: impl Into<String>) -> Self {
        Self::Declined {
            message: message.into(),
        }
    }

    /// Creates a new `ProcessFailed` error.
    #[must_use]
    pub fn process_failed(program: impl Into<String>, code: i32) -> Self {
        Self::ProcessFailed {
            program: program.into(),
            code,
        }
    }

    /// Creates a new `BuildOutputMissing` error.
    #[must_use]
    pub fn build_output_missing(path: PathBuf, message: impl Into<String>) -> Self {
        Self::BuildOutputMissing {
            path,
            message: message.into(),
        }
    }

    /// Creates a new `Release` error.
    #[must_use]
    pub fn release(message: impl Into<String>) -> Self {
        Self::Release {
            message: message.into(),
        }
    }

    /// Creates a new `ChecksumMismatch` error.
    #[must_use]
    pub fn checksum_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::ChecksumMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a new `UnsupportedPlatform` error for the running host.
    #[must_use]
    pub fn unsupported_platform() -> Self {
        Self::UnsupportedPlatform {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}
