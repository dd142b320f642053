//! Offered services and their timing parameters.

use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Stable identifier of a service in the catalog (e.g. `"manicure"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(String);

impl ServiceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One bookable service. Immutable configuration, loaded once at startup and
/// never mutated by requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    /// Display name shown to clients.
    pub name: String,
    pub duration_minutes: u32,
    pub buffer_before_minutes: u32,
    pub buffer_after_minutes: u32,
}

impl Service {
    /// Full slot length: service duration plus both buffers.
    pub fn slot_duration(&self) -> Duration {
        Duration::minutes(i64::from(
            self.duration_minutes + self.buffer_before_minutes + self.buffer_after_minutes,
        ))
    }
}
