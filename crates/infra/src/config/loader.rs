//! Configuration loader.
//!
//! Every field has a default, so a bare environment still starts. Loading
//! goes in two steps: read a config file when one exists, then let
//! environment variables override individual fields. Calendar credentials
//! are env-only and never read from files.
//!
//! ## Environment Variables
//! - `SLOTWISE_DB_PATH`: database file path
//! - `SLOTWISE_DB_POOL_SIZE`: connection pool size
//! - `SLOTWISE_CALENDAR_ID`: target calendar id
//! - `SLOTWISE_TIMEZONE`: salon timezone (IANA name)
//! - `SLOTWISE_GRANULARITY_MINUTES`: slot alignment step
//! - `SLOTWISE_GRACE_PERIOD_MINUTES`: pending booking grace period
//! - `SLOTWISE_REMINDER_LEAD_MINUTES`: reminder lead time
//! - `SLOTWISE_RECONCILE_CRON` / `SLOTWISE_REMINDER_CRON`: pass schedules
//! - `GOOGLE_CALENDAR_CLIENT_ID` / `GOOGLE_CALENDAR_CLIENT_SECRET` /
//!   `GOOGLE_CALENDAR_REFRESH_TOKEN`: OAuth credentials (env-only)
//!
//! ## File Locations
//! Probes `config.toml`, `slotwise.toml`, `config.json`, `slotwise.json` in
//! the working directory, then next to the executable.

use std::path::{Path, PathBuf};

use slotwise_domain::{Config, Result, SchedulingError};
use tracing::{debug, info};

/// Load configuration: file (when present) plus environment overrides.
pub fn load() -> Result<Config> {
    let mut config = match probe_config_paths() {
        Some(path) => load_from_file(Some(path))?,
        None => {
            debug!("no config file found, starting from defaults");
            Config::default()
        }
    };
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Load configuration from a file. With `None`, probes the standard
/// locations.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(SchedulingError::Config(format!(
                    "config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            SchedulingError::Config("no config file found in any standard location".into())
        })?,
    };

    info!(path = %config_path.display(), "loading configuration from file");
    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| SchedulingError::Config(format!("failed to read config file: {e}")))?;
    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("toml") {
        "toml" => toml::from_str(contents)
            .map_err(|e| SchedulingError::Config(format!("invalid TOML: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| SchedulingError::Config(format!("invalid JSON: {e}"))),
        other => Err(SchedulingError::Config(format!("unsupported config format: {other}"))),
    }
}

/// First existing config file among the standard locations.
pub fn probe_config_paths() -> Option<PathBuf> {
    const NAMES: [&str; 4] = ["config.toml", "slotwise.toml", "config.json", "slotwise.json"];

    let mut candidates = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(NAMES.iter().map(|n| cwd.join(n)));
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(NAMES.iter().map(|n| exe_dir.join(n)));
        }
    }
    candidates.into_iter().find(|path| path.exists())
}

fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Some(path) = env_opt("SLOTWISE_DB_PATH") {
        config.database.path = path;
    }
    if let Some(size) = env_parsed::<u32>("SLOTWISE_DB_POOL_SIZE")? {
        config.database.pool_size = size;
    }

    if let Some(id) = env_opt("SLOTWISE_CALENDAR_ID") {
        config.calendar.calendar_id = id;
    }
    // Credentials are deliberately env-only.
    config.calendar.client_id = env_opt("GOOGLE_CALENDAR_CLIENT_ID");
    config.calendar.client_secret = env_opt("GOOGLE_CALENDAR_CLIENT_SECRET");
    config.calendar.refresh_token = env_opt("GOOGLE_CALENDAR_REFRESH_TOKEN");

    if let Some(tz) = env_opt("SLOTWISE_TIMEZONE") {
        config.hours.timezone = tz;
    }
    if let Some(v) = env_parsed::<u32>("SLOTWISE_GRANULARITY_MINUTES")? {
        config.scheduling.granularity_minutes = v;
    }
    if let Some(v) = env_parsed::<i64>("SLOTWISE_GRACE_PERIOD_MINUTES")? {
        config.scheduling.grace_period_minutes = v;
    }
    if let Some(v) = env_parsed::<i64>("SLOTWISE_REMINDER_LEAD_MINUTES")? {
        config.scheduling.reminder_lead_minutes = v;
    }
    if let Some(cron) = env_opt("SLOTWISE_RECONCILE_CRON") {
        config.scheduling.reconcile_cron = cron;
    }
    if let Some(cron) = env_opt("SLOTWISE_REMINDER_CRON") {
        config.scheduling.reminder_cron = cron;
    }
    Ok(())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| SchedulingError::Config(format!("invalid {key}: {e}"))),
    }
}
