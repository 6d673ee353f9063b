//! Configuration for llamarunner.
//!
//! - [`layout`] - User and system directory locations
//! - [`settings`] - The persisted settings record and its layered loader
//! - [`preset`] - Preset discovery and launch command composition

pub mod layout;
pub mod preset;
pub mod settings;

pub use layout::Layout;
pub use settings::{Settings, SettingsSource, SettingsStore};
