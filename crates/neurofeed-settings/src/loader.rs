//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`NeurofeedSettings::default()`]
//! 2. If `~/.neurofeed/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `NEUROFEED_*` environment variable overrides
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::NeurofeedSettings;

/// Resolve the path to the settings file (`~/.neurofeed/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".neurofeed").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<NeurofeedSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or a value that fails
/// [`NeurofeedSettings::validate`] is an error.
pub fn load_settings_from_path(path: &Path) -> Result<NeurofeedSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Defaults with the settings file merged over them, without env overrides.
fn load_file_layer(path: &Path) -> Result<NeurofeedSettings> {
    let defaults = serde_json::to_value(NeurofeedSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Overlay `source` onto `target` following the module-level merge rules.
pub fn deep_merge(mut target: Value, source: Value) -> Value {
    merge_into(&mut target, source);
    target
}

fn merge_into(slot: &mut Value, source: Value) {
    match (slot, source) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay.into_iter().filter(|(_, v)| !v.is_null()) {
                match base.get_mut(&key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        let _ = base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Apply `NEUROFEED_*` environment variable overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut NeurofeedSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Each variable has strict parsing rules:
/// - Integers must be valid and within the specified range
/// - Empty strings are treated as unset
/// - Invalid values are ignored with a warning (fall back to file/default)
pub fn apply_overrides_from<F>(settings: &mut NeurofeedSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    // ── Client settings ─────────────────────────────────────────────
    if let Some(v) = env.string("NEUROFEED_BASE_URL") {
        settings.client.base_url = v;
    }
    if let Some(v) = env.i64("NEUROFEED_USER_ID", 1, i64::MAX) {
        settings.client.user_id = Some(v);
    }

    // ── Server settings ─────────────────────────────────────────────
    if let Some(v) = env.string("NEUROFEED_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.u16("NEUROFEED_PORT", 1, 65535) {
        settings.server.port = v;
    }
    if let Some(v) = env.usize("NEUROFEED_MAX_CONNECTIONS", 1, 100_000) {
        settings.server.max_connections = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("NEUROFEED_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as an `i64` within a range.
pub fn parse_i64_range(val: &str, min: i64, max: i64) -> Option<i64> {
    let n: i64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, name: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
        let val = self.string(name)?;
        let result = parse(&val);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid env var, ignoring");
        }
        result
    }

    fn u16(&self, name: &str, min: u16, max: u16) -> Option<u16> {
        self.parsed(name, |v| parse_u16_range(v, min, max))
    }

    fn i64(&self, name: &str, min: i64, max: i64) -> Option<i64> {
        self.parsed(name, |v| parse_i64_range(v, min, max))
    }

    fn usize(&self, name: &str, min: usize, max: usize) -> Option<usize> {
        self.parsed(name, |v| parse_usize_range(v, min, max))
    }
}
