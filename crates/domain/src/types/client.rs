//! Registered client profiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::booking::ClientId;

/// Intake registration data collected by the conversation adapter before the
/// first booking. Also feeds the contact block of created calendar events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientProfile {
    pub id: ClientId,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    /// Whether the client wants pre-appointment reminders.
    pub reminders_enabled: bool,
    pub registered_at: DateTime<Utc>,
}

impl ClientProfile {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
