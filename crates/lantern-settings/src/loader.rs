//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`LanternSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::LanternSettings;

/// Resolve the settings file path.
///
/// `LANTERN_SETTINGS` names the file explicitly; otherwise
/// `~/.lantern/settings.json`.
pub fn settings_path() -> PathBuf {
    if let Some(path) = read_env_string("LANTERN_SETTINGS") {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".lantern").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<LanternSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or an invalid value is an
/// error.
pub fn load_settings_from_path(path: &Path) -> Result<LanternSettings> {
    let defaults = serde_json::to_value(LanternSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: LanternSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
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

/// Apply environment variable overrides to loaded settings.
///
/// Numeric values must parse and fall within range; invalid values are
/// logged and ignored.
pub fn apply_env_overrides(settings: &mut LanternSettings) {
    // ── Server settings ─────────────────────────────────────────────
    if let Some(v) = read_env_string("LANTERN_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_env_u16("LANTERN_PORT", 1, 65535) {
        settings.server.port = v;
    }
    if let Some(v) = read_env_u64("LANTERN_SESSION_TIMEOUT_MS", 1000, 86_400_000) {
        settings.server.session_timeout_ms = v;
    }
    if let Some(v) = read_env_usize("LANTERN_PUSH_CAPACITY", 1, 65_536) {
        settings.server.push_channel_capacity = v;
    }
    if let Some(v) = read_env_u64("LANTERN_HANDLER_TIMEOUT_MS", 100, 600_000) {
        settings.engine.handler_timeout_ms = v;
    }
    if let Some(v) = read_env_string("LANTERN_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_env_string("LANTERN_LOG_FORMAT") {
        settings.logging.format = v;
    }

    // ── API settings ────────────────────────────────────────────────
    if let Some(v) = read_env_string("GLEAN_INSTANCE") {
        settings.api.instance = Some(v);
    }
    if let Some(v) = read_env_string("GLEAN_BASE_URL") {
        settings.api.base_url = Some(v);
    }
    if let Some(v) = read_env_string("GLEAN_API_TOKEN") {
        settings.api.api_token = Some(v);
    }
    if let Some(v) = read_env_string("GLEAN_ACT_AS") {
        settings.api.act_as = Some(v);
    }
}

/// Reject settings the server cannot run with.
pub fn validate(settings: &LanternSettings) -> Result<()> {
    if settings.server.session_timeout_ms == 0 {
        return Err(SettingsError::InvalidValue(
            "server.sessionTimeoutMs must be positive".to_string(),
        ));
    }
    if settings.server.push_channel_capacity == 0 {
        return Err(SettingsError::InvalidValue(
            "server.pushChannelCapacity must be positive".to_string(),
        ));
    }
    if settings.engine.inbound_queue_capacity == 0 {
        return Err(SettingsError::InvalidValue(
            "engine.inboundQueueCapacity must be positive".to_string(),
        ));
    }
    Ok(())
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u16(name: &str, min: u16, max: u16) -> Option<u16> {
    let val = std::env::var(name).ok()?;
    let result = parse_u16_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}
