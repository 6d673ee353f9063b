//! Spawning external programs.
//!
//! Commands describe what to run as a [`ProcessSpec`] and hand it to a
//! [`Launcher`]. [`SystemLauncher`] runs it with inherited stdio and waits.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};

use crate::errors::RunnerError;

/// A program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    /// Program name or path.
    pub program: OsString,
    /// Arguments, without the program.
    pub args: Vec<OsString>,
    /// Working directory, or the current one when `None`.
    pub cwd: Option<PathBuf>,
}

impl ProcessSpec {
    /// Creates a spec for `program` with no arguments.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Program name as shown in messages.
    #[must_use]
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

impl fmt::Display for ProcessSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Runs programs to completion.
pub trait Launcher {
    /// Runs `spec` and waits for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be started, or
    /// `ProcessFailed` if it exits unsuccessfully.
    fn launch(&mut self, spec: &ProcessSpec) -> Result<()>;
}

/// Launcher spawning real processes with inherited stdio.
#[derive(Debug, Default)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn launch(&mut self, spec: &ProcessSpec) -> Result<()> {
        log::info!("running: {spec}");

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }

        let status = cmd
            .status()
            .with_context(|| format!("Failed to execute {}", spec.program_name()))?;

        if status.success() {
            Ok(())
        } else {
            // Killed by a signal: no code.
            let code = status.code().unwrap_or(1);
            Err(RunnerError::process_failed(spec.program_name(), code).into())
        }
    }
}

#[cfg(test)]
pub mod testing {
    use anyhow::Result;

    use super::{Launcher, ProcessSpec};
    use crate::errors::RunnerError;

    /// Records launches instead of running them.
    ///
    /// Launches whose program name is in `failing` report exit code 1. A
    /// `git clone` creates its target directory and a `cmake --build`
    /// leaves `llama-cli` and `llama-server` in `build/bin`, so later steps
    /// find a checkout and build output. Set `skip_build_output` to leave
    /// `build/bin` untouched.
    #[derive(Debug, Default)]
    pub struct RecordingLauncher {
        pub launched: Vec<ProcessSpec>,
        pub failing: Vec<String>,
        pub skip_build_output: bool,
    }

    impl RecordingLauncher {
        pub fn failing_on(program: &str) -> Self {
            Self {
                failing: vec![program.to_string()],
                ..Self::default()
            }
        }

        pub fn without_build_output() -> Self {
            Self {
                skip_build_output: true,
                ..Self::default()
            }
        }

        /// Launched commands rendered as strings.
        pub fn commands(&self) -> Vec<String> {
            self.launched.iter().map(ToString::to_string).collect()
        }
    }

    impl Launcher for RecordingLauncher {
        fn launch(&mut self, spec: &ProcessSpec) -> Result<()> {
            self.launched.push(spec.clone());
            let program = spec.program_name();
            if self.failing.contains(&program) {
                return Err(RunnerError::process_failed(program, 1).into());
            }

            let first = spec.args.first();
            if program == "git"
                && first.is_some_and(|arg| arg == "clone")
                && let Some(target) = spec.args.last()
            {
                std::fs::create_dir_all(target)?;
            }
            if program == "cmake"
                && first.is_some_and(|arg| arg == "--build")
                && !self.skip_build_output
                && let Some(cwd) = &spec.cwd
            {
                let bin_dir = cwd.join("build").join("bin");
                std::fs::create_dir_all(&bin_dir)?;
                for name in ["llama-cli", "llama-server"] {
                    std::fs::write(bin_dir.join(name), "")?;
                }
            }
            Ok(())
        }
    }
}
