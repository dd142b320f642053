//! In-memory fakes for the scheduling ports.
//!
//! Used by the unit tests in this crate and, behind the `test-utils`
//! feature, by downstream integration tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use slotwise_domain::{
    Booking, BookingId, BookingStatus, BusinessHoursConfig, BusyInterval, ClientId, Config,
    EventRef, Result, SchedulingConfig, SchedulingError, ServiceConfig, TimeSlot,
};

use super::ports::{BookingStore, CalendarGateway, EventMetadata, ReminderNotifier};
use crate::catalog::SlotCatalog;

/// Catalog fixture matching the worked example: one 30-minute "haircut",
/// 09:00-18:00 UTC, 15-minute granularity, Sundays closed.
pub fn haircut_catalog() -> SlotCatalog {
    let config = Config {
        services: vec![ServiceConfig {
            id: "haircut".into(),
            name: "Haircut".into(),
            duration_minutes: 30,
            buffer_before_minutes: 0,
            buffer_after_minutes: 0,
        }],
        hours: BusinessHoursConfig {
            timezone: "UTC".into(),
            open: "09:00".into(),
            close: "18:00".into(),
            closed_days: vec!["sun".into()],
        },
        scheduling: SchedulingConfig { granularity_minutes: 15, ..Default::default() },
        ..Default::default()
    };
    #[allow(clippy::unwrap_used)]
    SlotCatalog::from_config(&config).unwrap()
}

#[derive(Default)]
struct FakeGatewayState {
    busy: Vec<BusyInterval>,
    // idempotency key -> (ref, slot)
    events: HashMap<String, (EventRef, TimeSlot)>,
    deletes: usize,
    fail_list: Option<SchedulingError>,
    fail_create: Option<SchedulingError>,
    fail_delete: Option<SchedulingError>,
}

/// Scriptable in-memory calendar.
#[derive(Default)]
pub struct FakeGateway {
    state: Mutex<FakeGatewayState>,
}

impl FakeGateway {
    /// Add an externally-owned busy interval (no event reference).
    pub fn push_busy(&self, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.state.lock().busy.push(BusyInterval::new(start, end));
    }

    /// Make every `list_busy` call fail with `error`.
    pub fn fail_list_with(&self, error: SchedulingError) {
        self.state.lock().fail_list = Some(error);
    }

    /// Make every `create_event` call fail with `error`.
    pub fn fail_create_with(&self, error: SchedulingError) {
        self.state.lock().fail_create = Some(error);
    }

    /// Make every `delete_event` call fail with `error`.
    pub fn fail_delete_with(&self, error: SchedulingError) {
        self.state.lock().fail_delete = Some(error);
    }

    /// Drop a previously created event, as if deleted manually in the
    /// provider UI.
    pub fn remove_event(&self, event_ref: &EventRef) {
        self.state.lock().events.retain(|_, (r, _)| r != event_ref);
    }

    /// Number of distinct events currently known to the fake provider plus
    /// those deleted; i.e. how many creates actually happened.
    pub fn created_count(&self) -> usize {
        let state = self.state.lock();
        state.events.len() + state.deletes
    }

    pub fn deleted_count(&self) -> usize {
        self.state.lock().deletes
    }
}

#[async_trait]
impl CalendarGateway for FakeGateway {
    async fn list_busy(&self, window: TimeSlot) -> Result<Vec<BusyInterval>> {
        let state = self.state.lock();
        if let Some(err) = &state.fail_list {
            return Err(err.clone());
        }
        let mut intervals: Vec<BusyInterval> = state
            .busy
            .iter()
            .filter(|b| window.start < b.end && b.start < window.end)
            .cloned()
            .collect();
        intervals.extend(state.events.values().filter(|(_, slot)| slot.overlaps(&window)).map(
            |(r, slot)| BusyInterval::with_event_ref(slot.start, slot.end, r.as_str().to_string()),
        ));
        Ok(intervals)
    }

    async fn create_event(
        &self,
        slot: TimeSlot,
        _metadata: &EventMetadata,
        idempotency_key: &str,
    ) -> Result<EventRef> {
        let mut state = self.state.lock();
        if let Some(err) = &state.fail_create {
            return Err(err.clone());
        }
        if let Some((existing, _)) = state.events.get(idempotency_key) {
            return Ok(existing.clone());
        }
        let event_ref = EventRef::new(format!("evt-{idempotency_key}"));
        state.events.insert(idempotency_key.to_string(), (event_ref.clone(), slot));
        Ok(event_ref)
    }

    async fn delete_event(&self, event_ref: &EventRef) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(err) = &state.fail_delete {
            return Err(err.clone());
        }
        let before = state.events.len();
        state.events.retain(|_, (r, _)| r != event_ref);
        if state.events.len() < before {
            state.deletes += 1;
        }
        // Unknown references succeed silently, mirroring the real contract.
        Ok(())
    }
}

/// Mutex-serialized booking store; the lock makes create's check-and-insert
/// atomic, mirroring the SQLite transaction in `slotwise-infra`.
#[derive(Default)]
pub struct InMemoryBookingStore {
    bookings: Mutex<HashMap<BookingId, Booking>>,
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn create(&self, booking: Booking) -> Result<Booking> {
        let mut bookings = self.bookings.lock();
        let taken = bookings
            .values()
            .any(|existing| existing.is_active() && existing.slot.overlaps(&booking.slot));
        if taken {
            return Err(SchedulingError::SlotTaken);
        }
        bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn transition(
        &self,
        id: BookingId,
        expected_version: i64,
        new_status: BookingStatus,
        event_ref: Option<EventRef>,
    ) -> Result<Booking> {
        let mut bookings = self.bookings.lock();
        let booking =
            bookings.get_mut(&id).ok_or_else(|| SchedulingError::NotFound(id.to_string()))?;
        if booking.version != expected_version {
            return Err(SchedulingError::VersionConflict {
                expected: expected_version,
                stored: booking.version,
            });
        }
        if !booking.status.can_transition_to(new_status) {
            return Err(SchedulingError::InvalidTransition {
                from: booking.status,
                to: new_status,
            });
        }
        booking.status = new_status;
        booking.version += 1;
        if event_ref.is_some() {
            booking.event_ref = event_ref;
        }
        Ok(booking.clone())
    }

    async fn get(&self, id: BookingId) -> Result<Booking> {
        self.bookings
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| SchedulingError::NotFound(id.to_string()))
    }

    async fn list_active(&self, window: TimeSlot) -> Result<Vec<Booking>> {
        Ok(self
            .bookings
            .lock()
            .values()
            .filter(|b| b.is_active() && b.slot.overlaps(&window))
            .cloned()
            .collect())
    }

    async fn list_pending_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>> {
        Ok(self
            .bookings
            .lock()
            .values()
            .filter(|b| b.status == BookingStatus::Pending && b.created_at < cutoff)
            .cloned()
            .collect())
    }

    async fn list_confirmed(&self, window: TimeSlot) -> Result<Vec<Booking>> {
        Ok(self
            .bookings
            .lock()
            .values()
            .filter(|b| b.status == BookingStatus::Confirmed && b.slot.overlaps(&window))
            .cloned()
            .collect())
    }

    async fn list_unreminded_confirmed_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Booking>> {
        Ok(self
            .bookings
            .lock()
            .values()
            .filter(|b| {
                b.status == BookingStatus::Confirmed
                    && !b.reminded
                    && b.slot.start >= from
                    && b.slot.start < until
            })
            .cloned()
            .collect())
    }

    async fn mark_reminded(&self, id: BookingId) -> Result<()> {
        let mut bookings = self.bookings.lock();
        let booking =
            bookings.get_mut(&id).ok_or_else(|| SchedulingError::NotFound(id.to_string()))?;
        booking.reminded = true;
        Ok(())
    }

    async fn list_for_client(&self, client_id: ClientId) -> Result<Vec<Booking>> {
        let mut result: Vec<Booking> = self
            .bookings
            .lock()
            .values()
            .filter(|b| b.client_id == client_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }
}

/// Records notified bookings; optionally fails every delivery.
#[derive(Default)]
pub struct RecordingNotifier {
    pub notified: Mutex<Vec<BookingId>>,
    pub fail: Mutex<Option<SchedulingError>>,
}

#[async_trait]
impl ReminderNotifier for RecordingNotifier {
    async fn notify(&self, booking: &Booking) -> Result<()> {
        if let Some(err) = self.fail.lock().clone() {
            return Err(err);
        }
        self.notified.lock().push(booking.id);
        Ok(())
    }
}
