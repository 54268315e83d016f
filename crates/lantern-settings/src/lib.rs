//! # lantern-settings
//!
//! Layered configuration for the Lantern MCP server.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`LanternSettings::default()`]
//! 2. **Settings file**: `~/.lantern/settings.json` or `$LANTERN_SETTINGS`
//!    (deep-merged over defaults)
//! 3. **Environment variables**: `LANTERN_*` and `GLEAN_*` overrides

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
