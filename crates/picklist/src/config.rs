//! CLI configuration: thin wrapper around `picklist_config`.
//!
//! Honors `--config` and layers shell flags over the resolved values.

use std::path::PathBuf;
use std::time::Duration;

use picklist_core::EngineConfig;
use picklist_sync::SyncConfig;

use crate::cli::{GlobalOpts, OutputFormat, ShellArgs};
use crate::error::CliError;

pub use picklist_config::{Config, config_path, save_config_to};

/// The file `--config` points at, or the platform default.
pub fn active_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(picklist_config::load_config_from(&active_path(global))?)
}

/// Flag > config file > built-in default.
pub fn output_format(global: &GlobalOpts, cfg: &Config) -> OutputFormat {
    global.output.unwrap_or(match cfg.defaults.output.as_str() {
        "json" => OutputFormat::Json,
        "plain" => OutputFormat::Plain,
        _ => OutputFormat::Table,
    })
}

/// Engine and session settings with shell flag overrides applied.
pub fn resolve_shell(cfg: &Config, args: &ShellArgs) -> Result<(EngineConfig, SyncConfig), CliError> {
    let mut engine = cfg.engine_config()?;
    let mut sync = cfg.sync_config()?;

    if let Some(seed) = args.seed {
        engine.seed_count = seed;
    }
    if let Some(ms) = args.add_flush_ms {
        engine.add_flush_interval = Duration::from_millis(ms);
    }
    if let Some(ms) = args.action_flush_ms {
        engine.action_flush_interval = Duration::from_millis(ms);
    }
    if let Some(ms) = args.poll_ms {
        sync.poll_interval = Duration::from_millis(ms);
    }
    if let Some(size) = args.page_size {
        if size == 0 {
            return Err(CliError::Validation {
                field: "page-size".into(),
                reason: "must be at least 1".into(),
            });
        }
        if size > engine.max_page_size {
            return Err(CliError::Validation {
                field: "page-size".into(),
                reason: format!("must not exceed {}", engine.max_page_size),
            });
        }
        sync.page_size = size;
    }
    Ok((engine, sync))
}
