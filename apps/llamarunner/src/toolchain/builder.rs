//! Building llama.cpp from source with cmake.
//!
//! ## Build Pipeline
//!
//! 1. **Validate** - The source directory exists and `cmake` is on PATH
//! 2. **Backend** - CUDA when `nvcc` is found, CPU when forced or confirmed
//! 3. **Configure** - `cmake -B build` with static libs and the backend flags
//! 4. **Compile** - Release build of `llama-cli`, `llama-gguf-split` and
//!    `llama-server`
//! 5. **Collect** - Move `build/bin/llama-*` next to the source directory
//!
//! A CPU build the user had to confirm can be remembered through the
//! `force_cpu` setting so later builds skip the prompt.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::probe::{ToolProbe, has_cuda, require};
use super::process::{Launcher, ProcessSpec};
use crate::config::{Layout, SettingsStore};
use crate::errors::RunnerError;
use crate::prompt::{Prompter, confirm_default_no, confirm_non_empty};

/// Targets compiled by every build.
const BUILD_TARGETS: [&str; 3] = ["llama-cli", "llama-gguf-split", "llama-server"];

/// Compute backend for a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Cpu,
    Cuda,
}

impl Backend {
    /// Backend-specific cmake configure flags.
    #[must_use]
    pub fn cmake_flags(self) -> &'static [&'static str] {
        match self {
            Self::Cpu => &["-DGGML_CUDA=OFF"],
            Self::Cuda => &["-DGGML_CUDA=ON", "-DGGML_CUDA_FA_ALL_QUANTS=ON"],
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "CPU"),
            Self::Cuda => write!(f, "CUDA"),
        }
    }
}

/// Outcome of [`decide_backend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendChoice {
    pub backend: Backend,
    /// The user asked to persist `force_cpu = true`.
    pub remember_cpu: bool,
}

/// Picks the build backend.
///
/// A forced CPU build (flag or stored setting) wins over CUDA detection.
/// Without CUDA the user must confirm a CPU build, and is then asked whether
/// to remember that choice; only an explicit answer other than "n" does.
///
/// # Errors
///
/// Returns `Declined` when the user refuses the CPU-only build.
pub fn decide_backend(
    cuda_available: bool,
    force_cpu_flag: bool,
    stored_force_cpu: bool,
    prompter: &mut dyn Prompter,
) -> Result<BackendChoice> {
    if force_cpu_flag || stored_force_cpu {
        log::debug!("CPU build forced (flag: {force_cpu_flag}, setting: {stored_force_cpu})");
        return Ok(BackendChoice {
            backend: Backend::Cpu,
            remember_cpu: false,
        });
    }

    if cuda_available {
        return Ok(BackendChoice {
            backend: Backend::Cuda,
            remember_cpu: false,
        });
    }

    if !confirm_default_no(prompter, "CUDA not detected. Build with CPU only? (y/N) ")? {
        return Err(RunnerError::declined("Build cancelled: CUDA not available").into());
    }

    // An empty answer keeps CPU for this build only.
    let remember_cpu = confirm_non_empty(
        prompter,
        "Update settings to force CPU builds for future builds? (Y/n) ",
    )?;

    Ok(BackendChoice {
        backend: Backend::Cpu,
        remember_cpu,
    })
}

/// The `cmake` configure step for `backend`.
#[must_use]
pub fn configure_step(source_dir: &Path, backend: Backend) -> ProcessSpec {
    ProcessSpec::new("cmake")
        .args(["-B", "build", "-DBUILD_SHARED_LIBS=OFF", "-DLLAMA_CURL=ON"])
        .args(backend.cmake_flags().iter().copied())
        .current_dir(source_dir)
}

/// The `cmake --build` step.
#[must_use]
pub fn compile_step(source_dir: &Path) -> ProcessSpec {
    let targets = BUILD_TARGETS
        .iter()
        .flat_map(|&target| ["--target", target]);

    ProcessSpec::new("cmake")
        .args([
            "--build",
            "build",
            "--config",
            "Release",
            "-j",
            "--clean-first",
        ])
        .args(targets)
        .current_dir(source_dir)
}

/// Builds the llama.cpp checkout at `source_dir`.
///
/// Returns the directory the binaries were moved into (the parent of
/// `source_dir`).
///
/// # Errors
///
/// Returns an error if the source directory is missing, `cmake` is not on
/// PATH, the user declines a CPU build, a cmake step fails, or the binaries
/// cannot be moved.
pub fn build_llama_cpp(
    layout: &Layout,
    source_dir: &Path,
    force_cpu_flag: bool,
    prompter: &mut dyn Prompter,
    launcher: &mut dyn Launcher,
    probe: &dyn ToolProbe,
) -> Result<PathBuf> {
    if !source_dir.is_dir() {
        return Err(RunnerError::invalid_arguments(format!(
            "llama.cpp source directory not found: {}",
            source_dir.display()
        ))
        .into());
    }

    require(probe, "cmake")?;

    let store = SettingsStore::new(layout);
    let mut settings = store.load();

    let choice = decide_backend(has_cuda(probe), force_cpu_flag, settings.force_cpu, prompter)?;
    if choice.remember_cpu {
        settings.force_cpu = true;
        store.save(&settings)?;
        println!("Settings updated: future builds will use CPU only.");
    }

    println!(
        "Building llama.cpp ({}) in {}",
        choice.backend,
        source_dir.display()
    );
    launcher.launch(&configure_step(source_dir, choice.backend))?;
    launcher.launch(&compile_step(source_dir))?;

    let install_dir = match source_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        Some(_) => PathBuf::from("."),
        None => source_dir.to_path_buf(),
    };
    let moved = collect_binaries(&source_dir.join("build").join("bin"), &install_dir)?;
    println!(
        "Installed {} binaries into {}",
        moved.len(),
        install_dir.display()
    );

    Ok(install_dir)
}

/// Moves every `llama-*` file from `bin_dir` into `dest_dir`.
///
/// Returns the names moved, sorted.
///
/// # Errors
///
/// Returns `BuildOutputMissing` when `bin_dir` does not exist or holds no
/// `llama-*` file.
fn collect_binaries(bin_dir: &Path, dest_dir: &Path) -> Result<Vec<String>> {
    if !bin_dir.is_dir() {
        return Err(RunnerError::build_output_missing(
            bin_dir.to_path_buf(),
            "build output directory not found",
        )
        .into());
    }

    let entries = std::fs::read_dir(bin_dir)
        .with_context(|| format!("Failed to read {}", bin_dir.display()))?;

    let mut moved = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| "Failed to read directory entry")?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with("llama-") || !entry.path().is_file() {
            continue;
        }

        let dest = dest_dir.join(&name);
        move_file(&entry.path(), &dest)?;
        log::debug!("moved {name} to {}", dest.display());
        moved.push(name);
    }

    if moved.is_empty() {
        return Err(
            RunnerError::build_output_missing(bin_dir.to_path_buf(), "no llama-* binaries found")
                .into(),
        );
    }

    moved.sort();
    Ok(moved)
}

/// Renames `from` to `to`, copying when they are on different filesystems.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }

    std::fs::copy(from, to)
        .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;
    std::fs::remove_file(from)
        .with_context(|| format!("Failed to remove {}", from.display()))?;
    Ok(())
}
