//! Vendor calendar API clients.

pub mod google;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use slotwise_core::EventMetadata;
use slotwise_domain::{Result, TimeSlot};

pub use google::GoogleCalendarApi;

/// One event as the provider reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEvent {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Raw provider operations, one HTTP call each. Retry, timeouts, and
/// idempotent-create semantics live a level up in the gateway.
#[async_trait]
pub trait CalendarApi: Send + Sync {
    /// Non-cancelled events intersecting `window`, expanded recurrences
    /// included.
    async fn list_events(&self, window: TimeSlot) -> Result<Vec<ProviderEvent>>;

    /// Insert an event with a caller-chosen id. Fails with `CalendarRejected`
    /// when the id already exists.
    async fn insert_event(
        &self,
        event_id: &str,
        slot: TimeSlot,
        metadata: &EventMetadata,
    ) -> Result<ProviderEvent>;

    /// Fetch one event by id; `None` when it does not exist or is cancelled.
    async fn get_event(&self, event_id: &str) -> Result<Option<ProviderEvent>>;

    /// Delete by id. Unknown or already-deleted ids succeed.
    async fn delete_event(&self, event_id: &str) -> Result<()>;
}
