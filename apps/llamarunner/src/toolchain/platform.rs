//! Platform detection for self-update.
//!
//! Release binaries are published for Linux only.
//!
//! ## Supported Platforms
//!
//! - Linux `x86_64` (`llamarunner-linux-amd64`)
//! - Linux ARM64 (`llamarunner-linux-arm64`)

use std::fmt;

use crate::errors::RunnerError;

/// A platform with a published llamarunner binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Linux on `x86_64`
    LinuxAmd64,
    /// Linux on `aarch64`
    LinuxArm64,
}

impl Platform {
    /// Detects the running platform.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedPlatform` when no binary is published for this
    /// OS/architecture combination.
    pub fn detect() -> Result<Self, RunnerError> {
        Self::from_parts(std::env::consts::OS, std::env::consts::ARCH)
            .ok_or_else(RunnerError::unsupported_platform)
    }

    /// Maps an OS and architecture name to a platform.
    #[must_use]
    pub fn from_parts(os: &str, arch: &str) -> Option<Self> {
        match (os, arch) {
            ("linux", "x86_64") => Some(Self::LinuxAmd64),
            ("linux", "aarch64") => Some(Self::LinuxArm64),
            _ => None,
        }
    }

    /// Returns the architecture label used in release asset names.
    #[must_use = "returns the label without side effects"]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LinuxAmd64 => "linux-amd64",
            Self::LinuxArm64 => "linux-arm64",
        }
    }

    /// Returns the release asset name for this platform.
    #[must_use = "returns the asset name without side effects"]
    pub fn asset_name(self) -> String {
        format!("llamarunner-{}", self.as_str())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_names_match_release_naming() {
        assert_eq!(Platform::LinuxAmd64.asset_name(), "llamarunner-linux-amd64");
        assert_eq!(Platform::LinuxArm64.asset_name(), "llamarunner-linux-arm64");
    }

    #[test]
    fn from_parts_maps_linux_architectures() {
        assert_eq!(
            Platform::from_parts("linux", "x86_64"),
            Some(Platform::LinuxAmd64)
        );
        assert_eq!(
            Platform::from_parts("linux", "aarch64"),
            Some(Platform::LinuxArm64)
        );
        assert_eq!(Platform::from_parts("macos", "aarch64"), None);
        assert_eq!(Platform::from_parts("windows", "x86_64"), None);
    }

    #[test]
    fn detect_matches_build_target() {
        let result = Platform::detect();

        #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
        assert!(matches!(result, Ok(Platform::LinuxAmd64)));

        #[cfg(all(target_os = "linux", target_arch = "aarch64"))]
        assert!(matches!(result, Ok(Platform::LinuxArm64)));

        #[cfg(not(target_os = "linux"))]
        assert!(matches!(
            result,
            Err(RunnerError::UnsupportedPlatform { .. })
        ));
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(Platform::LinuxArm64.to_string(), "linux-arm64");
    }
}
