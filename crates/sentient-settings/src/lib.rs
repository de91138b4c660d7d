//! # sentient-settings
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`SentientSettings::default()`]
//! 2. **User file**: `~/.sentient/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `SENTIENT_*` overrides (highest priority)
//!
//! Secrets (the model API key) are never read from the settings file.

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, sentient_dir, settings_path};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = SentientSettings::default();
        assert!(settings_path().ends_with("settings.json"));
    }
}
