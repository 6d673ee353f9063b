//! Detection of external tools on PATH.

use std::path::PathBuf;

use crate::errors::RunnerError;

/// Looks up external programs.
pub trait ToolProbe {
    /// Returns the resolved path of `tool`, or `None` when it is not on PATH.
    fn find(&self, tool: &str) -> Option<PathBuf>;
}

/// Probe backed by a PATH search.
#[derive(Debug, Default)]
pub struct PathProbe;

impl ToolProbe for PathProbe {
    fn find(&self, tool: &str) -> Option<PathBuf> {
        let found = which::which(tool).ok();
        log::debug!("probe {tool}: {found:?}");
        found
    }
}

/// Fails with `MissingPrerequisite` unless `tool` is available.
///
/// # Errors
///
/// Returns `MissingPrerequisite` naming the tool and how to install it.
pub fn require(probe: &dyn ToolProbe, tool: &str) -> Result<PathBuf, RunnerError> {
    probe
        .find(tool)
        .ok_or_else(|| RunnerError::missing_prerequisite(tool, install_hint(tool)))
}

/// CUDA counts as available when the `nvcc` compiler is on PATH.
#[must_use]
pub fn has_cuda(probe: &dyn ToolProbe) -> bool {
    probe.find("nvcc").is_some()
}

fn install_hint(tool: &str) -> String {
    match tool {
        "git" => "Install git with your package manager, e.g.:\n  \
                  - Debian/Ubuntu: sudo apt install git\n  \
                  - Fedora: sudo dnf install git"
            .to_string(),
        "cmake" => "Install cmake and a C++ toolchain, e.g.:\n  \
                    - Debian/Ubuntu: sudo apt install cmake build-essential\n  \
                    - Fedora: sudo dnf install cmake gcc-c++"
            .to_string(),
        other => format!("Install {other} and make sure it is on PATH."),
    }
}
