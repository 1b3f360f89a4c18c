//! # neurofeed-settings
//!
//! Configuration for the neurofeed client, reference server and CLI.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`NeurofeedSettings::default()`]
//! 2. **User file**: `~/.neurofeed/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `NEUROFEED_*` overrides (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use neurofeed_settings::get_settings;
//!
//! let settings = get_settings();
//! println!("feed server: {}", settings.client.base_url);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::OnceLock;

/// Global settings singleton.
static SETTINGS: OnceLock<NeurofeedSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// On first call, loads settings from `~/.neurofeed/settings.json` with env
/// var overrides. Falls back to compiled defaults if loading fails.
pub fn get_settings() -> &'static NeurofeedSettings {
    SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            NeurofeedSettings::default()
        })
    })
}

/// Initialize the global settings with a specific value.
///
/// Returns the settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: NeurofeedSettings) -> std::result::Result<(), NeurofeedSettings> {
    SETTINGS.set(settings)
}
