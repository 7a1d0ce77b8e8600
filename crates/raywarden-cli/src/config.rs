//! Configuration loading – reads a TOML file into [`RaywardenConfig`].
//!
//! The file is re-read on every reload, so nothing here is cached.

use std::fs;
use std::path::{Path, PathBuf};

use raywarden_types::RayError;
use raywarden_types::config::RaywardenConfig;

/// Default location when `--config` is not given.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("raywarden.toml")
}

/// Read, override and validate the configuration at `path`.
///
/// # Errors
///
/// * [`RayError::Io`] – the file cannot be read.
/// * [`RayError::Config`] – the TOML does not match the schema, or
///   validation fails.
pub fn load_from(path: &Path) -> Result<RaywardenConfig, RayError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| RayError::Io(format!("failed to read config at {}: {e}", path.display())))?;
    let mut cfg = parse(&raw)?;
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

/// Parse TOML text without overrides or validation.
pub fn parse(raw: &str) -> Result<RaywardenConfig, RayError> {
    toml::from_str(raw).map_err(|e| RayError::Config(format!("failed to parse config: {e}")))
}

/// Apply `RAYWARDEN_*` environment variable overrides to `cfg`.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `RAYWARDEN_HEALTH_PORT` | `health.port` |
/// | `RAYWARDEN_BRIDGE_PORT` | `bridge.port` |
/// | `RAYWARDEN_TICK_INTERVAL` | `attribute.interval` of every work area |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut RaywardenConfig) {
    apply_overrides_from(cfg, |key| std::env::var(key).ok());
}

pub(crate) fn apply_overrides_from(cfg: &mut RaywardenConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(port) = lookup("RAYWARDEN_HEALTH_PORT").and_then(|v| v.parse::<u16>().ok()) {
        cfg.health.port = port;
    }
    if let Some(port) = lookup("RAYWARDEN_BRIDGE_PORT").and_then(|v| v.parse::<u16>().ok()) {
        cfg.bridge.port = port;
    }
    if let Some(interval) = lookup("RAYWARDEN_TICK_INTERVAL")
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|i| i.is_finite())
    {
        for workarea in &mut cfg.workareas {
            workarea.attribute.interval = interval;
        }
    }
}
