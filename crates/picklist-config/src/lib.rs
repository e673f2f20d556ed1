//! Shared configuration for picklist tools.
//!
//! Serialized defaults, then the TOML file, then `PICKLIST_` environment
//! variables, translated into `picklist_core::EngineConfig` and
//! `picklist_sync::SyncConfig`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use picklist_core::EngineConfig;
use picklist_sync::SyncConfig;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub sync: SyncSection,

    #[serde(default)]
    pub defaults: Defaults,
}

/// `[engine]`: catalog seeding and flush cadence. Zero intervals turn the
/// timer off.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EngineSection {
    #[serde(default = "default_seed_count")]
    pub seed_count: u64,

    #[serde(default = "default_add_flush_ms")]
    pub add_flush_ms: u64,

    #[serde(default = "default_action_flush_ms")]
    pub action_flush_ms: u64,

    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            seed_count: default_seed_count(),
            add_flush_ms: default_add_flush_ms(),
            action_flush_ms: default_action_flush_ms(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

/// `[sync]`: client polling.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SyncSection {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            page_size: default_page_size(),
        }
    }
}

/// `[defaults]`: CLI presentation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_seed_count() -> u64 {
    picklist_core::config::DEFAULT_SEED_COUNT
}
fn default_add_flush_ms() -> u64 {
    duration_ms(picklist_core::config::DEFAULT_ADD_FLUSH_INTERVAL)
}
fn default_action_flush_ms() -> u64 {
    duration_ms(picklist_core::config::DEFAULT_ACTION_FLUSH_INTERVAL)
}
fn default_page_size() -> usize {
    picklist_core::config::DEFAULT_PAGE_SIZE
}
fn default_max_page_size() -> usize {
    picklist_core::config::DEFAULT_MAX_PAGE_SIZE
}
fn default_poll_interval_ms() -> u64 {
    duration_ms(picklist_sync::config::DEFAULT_POLL_INTERVAL)
}
fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// Reject values no component can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, reason: &str| {
            Err(ConfigError::Validation {
                field: field.into(),
                reason: reason.into(),
            })
        };
        if self.engine.default_page_size == 0 {
            return invalid("engine.default_page_size", "must be at least 1");
        }
        if self.engine.max_page_size == 0 {
            return invalid("engine.max_page_size", "must be at least 1");
        }
        if self.sync.page_size == 0 {
            return invalid("sync.page_size", "must be at least 1");
        }
        if self.engine.default_page_size > self.engine.max_page_size {
            return invalid(
                "engine.default_page_size",
                "must not exceed engine.max_page_size",
            );
        }
        if self.sync.page_size > self.engine.max_page_size {
            return invalid("sync.page_size", "must not exceed engine.max_page_size");
        }
        if self.sync.poll_interval_ms == 0 {
            return invalid("sync.poll_interval_ms", "must be at least 1");
        }
        if !matches!(self.defaults.output.as_str(), "table" | "json" | "plain") {
            return invalid(
                "defaults.output",
                &format!(
                    "expected 'table', 'json', or 'plain', got '{}'",
                    self.defaults.output
                ),
            );
        }
        Ok(())
    }

    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        self.validate()?;
        let e = &self.engine;
        Ok(EngineConfig {
            seed_count: e.seed_count,
            add_flush_interval: Duration::from_millis(e.add_flush_ms),
            action_flush_interval: Duration::from_millis(e.action_flush_ms),
            default_page_size: e.default_page_size,
            max_page_size: e.max_page_size,
        })
    }

    pub fn sync_config(&self) -> Result<SyncConfig, ConfigError> {
        self.validate()?;
        Ok(SyncConfig {
            poll_interval: Duration::from_millis(self.sync.poll_interval_ms),
            page_size: self.sync.page_size,
        })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "picklist", "picklist").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("picklist");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from the canonical path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file plus environment. A missing file is not an
/// error; its layer is simply empty.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("PICKLIST_").split("__"))
        .extract()?;
    config.validate()?;
    Ok(config)
}

/// Load config, falling back to defaults on any error.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_component_defaults() {
        let cfg = Config::default();
        let engine = cfg.engine_config().unwrap();
        assert_eq!(engine.seed_count, 1_000_000);
        assert_eq!(engine.add_flush_interval, Duration::from_secs(10));
        assert_eq!(engine.action_flush_interval, Duration::from_secs(1));
        let sync = cfg.sync_config().unwrap();
        assert_eq!(sync.poll_interval, Duration::from_secs(1));
        assert_eq!(sync.page_size, 20);
    }

    #[test]
    fn file_layer_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[engine]\nseed_count = 50\naction_flush_ms = 0\n\n[sync]\npage_size = 5\n",
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.engine.seed_count, 50);
        assert_eq!(cfg.engine.add_flush_ms, 10_000);
        assert_eq!(cfg.sync.page_size, 5);
        assert!(cfg.engine_config().unwrap().action_flush_interval.is_zero());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.engine, EngineSection::default());
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[sync]\npage_size = 0\n").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "sync.page_size"));
    }

    #[test]
    fn page_size_above_engine_cap_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[engine]\nmax_page_size = 10\n\n[sync]\npage_size = 30\n").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "sync.page_size"));
    }

    #[test]
    fn default_page_size_above_engine_cap_is_rejected() {
        let mut cfg = Config::default();
        cfg.engine.max_page_size = 10;
        cfg.sync.page_size = 10;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Validation { ref field, .. }) if field == "engine.default_page_size"
        ));

        cfg.engine.default_page_size = 10;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.engine.seed_count = 42;
        cfg.defaults.output = "json".into();

        save_config_to(&cfg, &path).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), cfg);
    }
}
