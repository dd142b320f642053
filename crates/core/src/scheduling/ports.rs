//! Port interfaces for scheduling
//!
//! These traits define the boundaries between core business logic and
//! infrastructure implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use slotwise_domain::{
    Booking, BookingId, BookingStatus, BusyInterval, ClientId, EventRef, Result, TimeSlot,
};

/// Event payload handed to the calendar provider on confirmation. Built by
/// the conversation adapter from the client profile and service name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMetadata {
    pub summary: String,
    pub description: String,
}

/// Abstraction over the external calendar provider.
///
/// Implementations own authentication, pagination, and rate limiting; the
/// engine only relies on the retry contract: transient faults surface as
/// `CalendarUnavailable` after bounded retries, permanent refusals as
/// `CalendarRejected`, and every call carries a bounded timeout.
#[async_trait]
pub trait CalendarGateway: Send + Sync {
    /// Busy intervals covering `window`, regardless of who created them.
    async fn list_busy(&self, window: TimeSlot) -> Result<Vec<BusyInterval>>;

    /// Create an event for `slot`. `idempotency_key` is derived from the
    /// booking id; a retried create after a prior success must return the
    /// same reference instead of duplicating the event.
    async fn create_event(
        &self,
        slot: TimeSlot,
        metadata: &EventMetadata,
        idempotency_key: &str,
    ) -> Result<EventRef>;

    /// Delete an event. Deleting an unknown or already-deleted reference
    /// succeeds, since cancellation may race with manual deletion.
    async fn delete_event(&self, event_ref: &EventRef) -> Result<()>;
}

/// Durable source of truth for what the engine believes exists.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Persist a new booking. The overlap check against active bookings and
    /// the insert happen atomically; this is the sole serialization point
    /// preventing double-booking. Fails with `SlotTaken` on overlap.
    async fn create(&self, booking: Booking) -> Result<Booking>;

    /// Apply a state transition with optimistic concurrency.
    ///
    /// Fails with `VersionConflict` when `expected_version` is stale,
    /// `NotFound` for unknown ids, and `InvalidTransition` when the state
    /// machine forbids the move. `event_ref` replaces the stored reference
    /// when given; an absent value leaves the stored reference untouched.
    async fn transition(
        &self,
        id: BookingId,
        expected_version: i64,
        new_status: BookingStatus,
        event_ref: Option<EventRef>,
    ) -> Result<Booking>;

    async fn get(&self, id: BookingId) -> Result<Booking>;

    /// Pending/Confirmed bookings overlapping `window`.
    async fn list_active(&self, window: TimeSlot) -> Result<Vec<Booking>>;

    /// Pending bookings created strictly before `cutoff` (expiry sweep).
    async fn list_pending_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>>;

    /// Confirmed bookings whose slot overlaps `window` (external sync).
    async fn list_confirmed(&self, window: TimeSlot) -> Result<Vec<Booking>>;

    /// Confirmed, not-yet-reminded bookings starting in `[from, until)`.
    async fn list_unreminded_confirmed_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Booking>>;

    /// Record that the reminder for `id` went out. Leaves the version
    /// untouched so the flag never fails a concurrent user transition.
    async fn mark_reminded(&self, id: BookingId) -> Result<()>;

    /// Every booking of one client, newest first ("my bookings" view).
    async fn list_for_client(&self, client_id: ClientId) -> Result<Vec<Booking>>;
}

/// Delivery channel for pre-appointment reminders. The chat transport
/// implements this at the adapter layer.
#[async_trait]
pub trait ReminderNotifier: Send + Sync {
    async fn notify(&self, booking: &Booking) -> Result<()>;
}
