//! Settings loading with deep merge and environment variable overrides.
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::SentientSettings;

/// `~/.sentient`, falling back to `/tmp/.sentient` without a home directory.
pub fn sentient_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".sentient")
}

/// Resolve the path to the settings file (`~/.sentient/settings.json`).
pub fn settings_path() -> PathBuf {
    sentient_dir().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<SentientSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<SentientSettings> {
    let defaults = serde_json::to_value(SentientSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: SentientSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `SENTIENT_*` environment overrides.
pub fn apply_env_overrides(settings: &mut SentientSettings) {
    apply_overrides_with(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable source. Invalid values are
/// ignored with a warning.
pub fn apply_overrides_with<F>(settings: &mut SentientSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvSource(lookup);

    if let Some(v) = env.string("SENTIENT_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.checked("SENTIENT_PORT", |v| parse_u16_range(v, 1, 65535)) {
        settings.server.port = v;
    }
    if let Some(v) = env.string("SENTIENT_MODEL") {
        settings.llm.model = v;
    }
    if let Some(v) = env.string("SENTIENT_LLM_BASE_URL") {
        settings.llm.base_url = v;
    }
    if let Some(v) = env.string("SENTIENT_TOKEN_PATH") {
        settings.google.token_path = v;
    }
    if let Some(v) = env.string("SENTIENT_MEMORY_DB") {
        settings.storage.memory_db_path = v;
    }
    if let Some(v) = env.checked("SENTIENT_MAX_CYCLES", |v| parse_u32_range(v, 1, 1000)) {
        settings.agent.max_cycles = v;
    }
    if let Some(v) = env.checked("SENTIENT_TOOL_TIMEOUT_SECS", |v| parse_u64_range(v, 1, 3600)) {
        settings.agent.tool_timeout_secs = v;
    }
    if let Some(v) = env.string("SENTIENT_TIMEZONE") {
        settings.agent.timezone = v;
    }
    if let Some(v) = env.checked("SENTIENT_LOG_JSON", parse_bool) {
        settings.logging.json = v;
    }
}

struct EnvSource<F>(F);

impl<F> EnvSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|v| !v.is_empty())
    }

    fn checked<T>(&self, name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        let val = self.string(name)?;
        let result = parse(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid env var, ignoring");
        }
        result
    }
}

/// Parse a string as a boolean (`true/1/yes/on`, `false/0/no/off`).
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u32` within a range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}
