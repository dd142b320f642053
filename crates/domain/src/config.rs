//! Application configuration structures.
//!
//! Loaded once at startup (see `slotwise-infra::config::loader`) and treated
//! as immutable afterwards.

use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SchedulingError};
use crate::types::{Service, ServiceId};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub calendar: CalendarConfig,
    pub scheduling: SchedulingConfig,
    pub hours: BusinessHoursConfig,
    pub services: Vec<ServiceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            calendar: CalendarConfig::default(),
            scheduling: SchedulingConfig::default(),
            hours: BusinessHoursConfig::default(),
            services: default_services(),
        }
    }
}

/// SQLite storage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "slotwise.db".into(), pool_size: 5 }
    }
}

/// External calendar provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Provider name; only `"google"` is currently implemented.
    pub provider: String,
    /// Identifier of the shared business calendar.
    pub calendar_id: String,
    /// OAuth client for the refresh-token grant. Secrets come from the
    /// environment, never from config files.
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    /// Per-request timeout applied to every provider call.
    pub request_timeout_secs: u64,
    /// Attempts for transient provider failures before surfacing
    /// `CalendarUnavailable`.
    pub max_retries: u32,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            provider: "google".into(),
            calendar_id: "primary".into(),
            client_id: None,
            client_secret: None,
            refresh_token: None,
            request_timeout_secs: 10,
            max_retries: 3,
        }
    }
}

/// Engine timing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    /// Candidate slots align to this boundary (minutes).
    pub granularity_minutes: u32,
    /// How long a Pending booking may stay unconfirmed before the sweep
    /// expires it.
    pub grace_period_minutes: i64,
    /// Cron expression for the reconciliation sweep.
    pub reconcile_cron: String,
    /// Cron expression for the reminder pass.
    pub reminder_cron: String,
    /// Reminders fire when a confirmed booking starts within this lead time.
    pub reminder_lead_minutes: i64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            granularity_minutes: 15,
            grace_period_minutes: 10,
            reconcile_cron: "0 */2 * * * *".into(), // every 2 minutes
            reminder_cron: "0 * * * * *".into(),    // every minute
            reminder_lead_minutes: 120,
        }
    }
}

/// Salon opening hours, expressed in the salon's local timezone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessHoursConfig {
    /// IANA timezone name, e.g. `"Europe/Moscow"`.
    pub timezone: String,
    /// Opening time, `"HH:MM"`.
    pub open: String,
    /// Closing time, `"HH:MM"`.
    pub close: String,
    /// Weekdays the salon stays closed, e.g. `["sun"]`.
    pub closed_days: Vec<String>,
}

impl Default for BusinessHoursConfig {
    fn default() -> Self {
        Self {
            timezone: "Europe/Moscow".into(),
            open: "09:00".into(),
            close: "18:00".into(),
            closed_days: Vec::new(),
        }
    }
}

impl BusinessHoursConfig {
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| SchedulingError::Config(format!("invalid timezone: {}", self.timezone)))
    }

    pub fn open_time(&self) -> Result<NaiveTime> {
        parse_hhmm(&self.open)
    }

    pub fn close_time(&self) -> Result<NaiveTime> {
        parse_hhmm(&self.close)
    }

    pub fn closed_weekdays(&self) -> Result<Vec<Weekday>> {
        self.closed_days.iter().map(|day| parse_weekday(day)).collect()
    }
}

fn parse_hhmm(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|_| SchedulingError::Config(format!("invalid time of day: {s}")))
}

fn parse_weekday(s: &str) -> Result<Weekday> {
    s.parse::<Weekday>()
        .map_err(|_| SchedulingError::Config(format!("invalid weekday: {s}")))
}

/// One catalog entry as configured. Order in the config file is the display
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub id: String,
    pub name: String,
    pub duration_minutes: u32,
    #[serde(default)]
    pub buffer_before_minutes: u32,
    #[serde(default)]
    pub buffer_after_minutes: u32,
}

impl From<&ServiceConfig> for Service {
    fn from(cfg: &ServiceConfig) -> Self {
        Service {
            id: ServiceId::new(cfg.id.clone()),
            name: cfg.name.clone(),
            duration_minutes: cfg.duration_minutes,
            buffer_before_minutes: cfg.buffer_before_minutes,
            buffer_after_minutes: cfg.buffer_after_minutes,
        }
    }
}

fn default_services() -> Vec<ServiceConfig> {
    [
        ("manicure", "Manicure"),
        ("pedicure", "Pedicure"),
        ("eyebrows", "Eyebrow shaping"),
        ("eyelashes", "Eyelash extensions"),
    ]
    .into_iter()
    .map(|(id, name)| ServiceConfig {
        id: id.into(),
        name: name.into(),
        duration_minutes: 60,
        buffer_before_minutes: 0,
        buffer_after_minutes: 0,
    })
    .collect()
}
