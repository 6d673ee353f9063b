//! External tooling: building llama.cpp and self-update.
//!
//! ## Module Structure
//!
//! - [`probe`] - Finding programs on PATH
//! - [`process`] - Launching programs with inherited stdio
//! - [`builder`] - cmake build orchestration
//! - [`platform`] - OS and architecture detection
//! - [`release`] - Latest-release metadata
//! - [`download`] - Streaming download, hashed while written
//! - [`verify`] - SHA256 digest comparison

pub mod builder;
pub mod download;
pub mod platform;
pub mod probe;
pub mod process;
pub mod release;
pub mod verify;

pub use builder::build_llama_cpp;
pub use download::download_binary;
pub use platform::Platform;
pub use probe::{PathProbe, ToolProbe};
pub use process::{Launcher, ProcessSpec, SystemLauncher};
pub use release::{Release, fetch_latest_release};
pub use verify::verify_sha256;
