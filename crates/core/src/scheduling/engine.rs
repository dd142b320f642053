//! Scheduling engine - core booking orchestration.
//!
//! The engine is stateless aside from the store and gateway it drives; all
//! per-request context arrives as explicit arguments. Suspension points are
//! exactly the port calls.

use std::sync::Arc;

use slotwise_domain::{
    Booking, BookingId, BookingStatus, BusyInterval, ClientId, Result, SchedulingError, ServiceId,
    TimeSlot,
};
use tracing::{info, instrument, warn};

use super::ports::{BookingStore, CalendarGateway, EventMetadata};
use crate::catalog::SlotCatalog;

/// Orchestrates slot selection, reservation, and the confirm/cancel
/// transitions.
pub struct SchedulingEngine {
    catalog: Arc<SlotCatalog>,
    gateway: Arc<dyn CalendarGateway>,
    store: Arc<dyn BookingStore>,
}

impl SchedulingEngine {
    pub fn new(
        catalog: Arc<SlotCatalog>,
        gateway: Arc<dyn CalendarGateway>,
        store: Arc<dyn BookingStore>,
    ) -> Self {
        Self { catalog, gateway, store }
    }

    /// Reserve the earliest free slot for `service_id` inside `window`.
    ///
    /// Availability is the union of external busy intervals and active
    /// bookings. A create that loses a race (`SlotTaken`) is retried once
    /// against a refreshed busy set before giving up with `NoAvailability`.
    /// The returned booking is Pending and must be confirmed within the
    /// grace period or the reconciliation sweep expires it.
    #[instrument(skip(self), fields(client = %client_id, service = %service_id))]
    pub async fn request_booking(
        &self,
        client_id: ClientId,
        service_id: &ServiceId,
        window: TimeSlot,
    ) -> Result<Booking> {
        let candidates = self.catalog.candidate_slots(service_id, window)?;
        if candidates.is_empty() {
            return Err(SchedulingError::NoAvailability);
        }

        // One initial attempt plus one refresh-and-retry after SlotTaken.
        for attempt in 0..2 {
            let busy = self.busy_set(window).await?;
            let slot = candidates
                .iter()
                .find(|slot| !busy.iter().any(|b| slot.overlaps_interval(b)))
                .copied()
                .ok_or(SchedulingError::NoAvailability)?;

            let booking = Booking::pending(client_id, service_id.clone(), slot);
            match self.store.create(booking).await {
                Ok(created) => {
                    info!(booking = %created.id, slot = %created.slot, "reserved pending booking");
                    return Ok(created);
                }
                Err(SchedulingError::SlotTaken) if attempt == 0 => {
                    warn!(slot = %slot, "slot lost to concurrent request, refreshing busy set");
                }
                Err(SchedulingError::SlotTaken) => return Err(SchedulingError::NoAvailability),
                Err(other) => return Err(other),
            }
        }

        Err(SchedulingError::NoAvailability)
    }

    /// Confirm a Pending booking: create the external event (idempotency key
    /// derived from the booking id), then transition the store record.
    ///
    /// On `CalendarUnavailable` the booking stays Pending and the caller may
    /// retry. If the store transition loses to a concurrent cancel/expiry,
    /// the just-created event is rolled back to avoid an orphan. Losing to
    /// a concurrent confirm of the same booking is not an error: the event
    /// is shared, so the already-confirmed record is returned instead.
    #[instrument(skip(self, metadata), fields(booking = %id))]
    pub async fn confirm(&self, id: BookingId, metadata: &EventMetadata) -> Result<Booking> {
        let booking = self.store.get(id).await?;
        if booking.status != BookingStatus::Pending {
            return Err(SchedulingError::InvalidTransition {
                from: booking.status,
                to: BookingStatus::Confirmed,
            });
        }

        let key = booking.id.as_simple_hex();
        let event_ref = self.gateway.create_event(booking.slot, metadata, &key).await?;

        match self
            .store
            .transition(id, booking.version, BookingStatus::Confirmed, Some(event_ref.clone()))
            .await
        {
            Ok(confirmed) => {
                info!(event = %event_ref, "booking confirmed");
                Ok(confirmed)
            }
            Err(conflict @ SchedulingError::VersionConflict { .. }) => {
                // The conflicting writer may have been another confirm of
                // this booking. The idempotent create handed both callers
                // the same event, so deleting here would destroy the live
                // event under a Confirmed booking. Only roll back when the
                // record did not end up Confirmed with this reference.
                match self.store.get(id).await {
                    Ok(current)
                        if current.status == BookingStatus::Confirmed
                            && current.event_ref.as_ref() == Some(&event_ref) =>
                    {
                        info!(event = %event_ref, "booking was confirmed concurrently");
                        Ok(current)
                    }
                    Ok(_) => {
                        if let Err(err) = self.gateway.delete_event(&event_ref).await {
                            warn!(event = %event_ref, error = %err, "failed to roll back orphaned event");
                        }
                        Err(conflict)
                    }
                    Err(err) => {
                        // Cannot tell who won; leaving the event in place is
                        // recoverable, deleting a live one is not.
                        warn!(error = %err, "could not re-read booking after version conflict");
                        Err(conflict)
                    }
                }
            }
            Err(other) => Err(other),
        }
    }

    /// Cancel a booking. Idempotent: cancelling a Cancelled/Expired booking
    /// is a no-op. For Confirmed bookings the external event is deleted
    /// first; a transient deletion failure aborts with state unchanged.
    #[instrument(skip(self), fields(booking = %id))]
    pub async fn cancel(&self, id: BookingId) -> Result<Booking> {
        let booking = self.store.get(id).await?;
        match booking.status {
            BookingStatus::Cancelled | BookingStatus::Expired => Ok(booking),
            BookingStatus::Pending => {
                self.store.transition(id, booking.version, BookingStatus::Cancelled, None).await
            }
            BookingStatus::Confirmed => {
                if let Some(event_ref) = &booking.event_ref {
                    match self.gateway.delete_event(event_ref).await {
                        Ok(()) => {}
                        Err(err @ SchedulingError::CalendarUnavailable(_)) => return Err(err),
                        Err(SchedulingError::CalendarRejected(_))
                        | Err(SchedulingError::NotFound(_)) => {
                            // Already deleted externally; proceed.
                        }
                        Err(other) => return Err(other),
                    }
                }
                let cancelled = self
                    .store
                    .transition(id, booking.version, BookingStatus::Cancelled, None)
                    .await?;
                info!("confirmed booking cancelled");
                Ok(cancelled)
            }
        }
    }

    async fn busy_set(&self, window: TimeSlot) -> Result<Vec<BusyInterval>> {
        let mut busy = self.gateway.list_busy(window).await?;
        let active = self.store.list_active(window).await?;
        busy.extend(active.into_iter().map(|b| BusyInterval::from(b.slot)));
        Ok(busy)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use slotwise_domain::EventRef;

    use super::*;
    use crate::scheduling::testkit::{haircut_catalog, FakeGateway, InMemoryBookingStore};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
    }

    fn slot(sh: u32, sm: u32, eh: u32, em: u32) -> TimeSlot {
        TimeSlot::new(at(sh, sm), at(eh, em))
    }

    fn engine_with(
        gateway: Arc<FakeGateway>,
        store: Arc<dyn BookingStore>,
    ) -> SchedulingEngine {
        SchedulingEngine::new(Arc::new(haircut_catalog()), gateway, store)
    }

    fn metadata() -> EventMetadata {
        EventMetadata { summary: "Haircut".into(), description: "client".into() }
    }

    #[tokio::test]
    async fn empty_busy_set_books_the_earliest_slot() {
        let gateway = Arc::new(FakeGateway::default());
        let store = Arc::new(InMemoryBookingStore::default());
        let engine = engine_with(gateway, store);

        let booking = engine
            .request_booking(ClientId(1), &ServiceId::new("haircut"), slot(9, 0, 10, 0))
            .await
            .unwrap();
        assert_eq!(booking.slot, slot(9, 0, 9, 30));
        assert_eq!(booking.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn busy_prefix_shifts_selection_to_first_free_slot() {
        // Busy [09:30, 10:00) leaves [09:00, 09:30) as the only candidate.
        let gateway = Arc::new(FakeGateway::default());
        gateway.push_busy(at(9, 30), at(10, 0));
        let store = Arc::new(InMemoryBookingStore::default());
        let engine = engine_with(gateway, store);

        let booking = engine
            .request_booking(ClientId(1), &ServiceId::new("haircut"), slot(9, 0, 10, 0))
            .await
            .unwrap();
        assert_eq!(booking.slot, slot(9, 0, 9, 30));

        // The next request must avoid the pending booking as well.
        let second = engine
            .request_booking(ClientId(2), &ServiceId::new("haircut"), slot(9, 0, 11, 0))
            .await
            .unwrap();
        assert_eq!(second.slot, slot(10, 0, 10, 30));
    }

    #[tokio::test]
    async fn fully_busy_window_yields_no_availability() {
        let gateway = Arc::new(FakeGateway::default());
        gateway.push_busy(at(9, 0), at(11, 0));
        let store = Arc::new(InMemoryBookingStore::default());
        let engine = engine_with(gateway, store);

        let err = engine
            .request_booking(ClientId(1), &ServiceId::new("haircut"), slot(9, 0, 11, 0))
            .await
            .unwrap_err();
        assert_eq!(err, SchedulingError::NoAvailability);
    }

    #[tokio::test]
    async fn unknown_service_propagates() {
        let gateway = Arc::new(FakeGateway::default());
        let store = Arc::new(InMemoryBookingStore::default());
        let engine = engine_with(gateway, store);

        let err = engine
            .request_booking(ClientId(1), &ServiceId::new("massage"), slot(9, 0, 11, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulingError::UnknownService(_)));
    }

    /// A store decorator that reports `SlotTaken` for the first `failures`
    /// creates, emulating a concurrent request winning the slot.
    struct RacingStore {
        inner: InMemoryBookingStore,
        failures: AtomicU32,
        creates: AtomicU32,
    }

    impl RacingStore {
        fn failing_once() -> Self {
            Self {
                inner: InMemoryBookingStore::default(),
                failures: AtomicU32::new(1),
                creates: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl BookingStore for RacingStore {
        async fn create(&self, booking: Booking) -> Result<Booking> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            if self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(SchedulingError::SlotTaken);
            }
            self.inner.create(booking).await
        }

        async fn transition(
            &self,
            id: BookingId,
            expected_version: i64,
            new_status: BookingStatus,
            event_ref: Option<EventRef>,
        ) -> Result<Booking> {
            self.inner.transition(id, expected_version, new_status, event_ref).await
        }

        async fn get(&self, id: BookingId) -> Result<Booking> {
            self.inner.get(id).await
        }

        async fn list_active(&self, window: TimeSlot) -> Result<Vec<Booking>> {
            self.inner.list_active(window).await
        }

        async fn list_pending_created_before(
            &self,
            cutoff: DateTime<Utc>,
        ) -> Result<Vec<Booking>> {
            self.inner.list_pending_created_before(cutoff).await
        }

        async fn list_confirmed(&self, window: TimeSlot) -> Result<Vec<Booking>> {
            self.inner.list_confirmed(window).await
        }

        async fn list_unreminded_confirmed_between(
            &self,
            from: DateTime<Utc>,
            until: DateTime<Utc>,
        ) -> Result<Vec<Booking>> {
            self.inner.list_unreminded_confirmed_between(from, until).await
        }

        async fn mark_reminded(&self, id: BookingId) -> Result<()> {
            self.inner.mark_reminded(id).await
        }

        async fn list_for_client(&self, client_id: ClientId) -> Result<Vec<Booking>> {
            self.inner.list_for_client(client_id).await
        }
    }

    #[tokio::test]
    async fn slot_taken_race_is_retried_once_and_succeeds() {
        let gateway = Arc::new(FakeGateway::default());
        let store = Arc::new(RacingStore::failing_once());
        let engine = engine_with(gateway, store.clone());

        let booking = engine
            .request_booking(ClientId(1), &ServiceId::new("haircut"), slot(9, 0, 10, 0))
            .await
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(store.creates.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn persistent_slot_taken_surfaces_as_no_availability() {
        let gateway = Arc::new(FakeGateway::default());
        let store = Arc::new(RacingStore {
            inner: InMemoryBookingStore::default(),
            failures: AtomicU32::new(u32::MAX),
            creates: AtomicU32::new(0),
        });
        let engine = engine_with(gateway, store.clone());

        let err = engine
            .request_booking(ClientId(1), &ServiceId::new("haircut"), slot(9, 0, 10, 0))
            .await
            .unwrap_err();
        assert_eq!(err, SchedulingError::NoAvailability);
        assert_eq!(store.creates.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn confirm_creates_event_and_transitions() {
        let gateway = Arc::new(FakeGateway::default());
        let store = Arc::new(InMemoryBookingStore::default());
        let engine = engine_with(gateway.clone(), store);

        let booking = engine
            .request_booking(ClientId(1), &ServiceId::new("haircut"), slot(9, 0, 10, 0))
            .await
            .unwrap();
        let confirmed = engine.confirm(booking.id, &metadata()).await.unwrap();

        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        assert!(confirmed.event_ref.is_some());
        assert_eq!(confirmed.version, booking.version + 1);
        assert_eq!(gateway.created_count(), 1);
    }

    #[tokio::test]
    async fn double_confirm_is_an_invalid_transition() {
        let gateway = Arc::new(FakeGateway::default());
        let store = Arc::new(InMemoryBookingStore::default());
        let engine = engine_with(gateway.clone(), store);

        let booking = engine
            .request_booking(ClientId(1), &ServiceId::new("haircut"), slot(9, 0, 10, 0))
            .await
            .unwrap();
        engine.confirm(booking.id, &metadata()).await.unwrap();

        let err = engine.confirm(booking.id, &metadata()).await.unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidTransition { .. }));
        // No duplicate event was created.
        assert_eq!(gateway.created_count(), 1);
    }

    #[tokio::test]
    async fn confirm_with_unavailable_calendar_keeps_booking_pending() {
        let gateway = Arc::new(FakeGateway::default());
        gateway.fail_create_with(SchedulingError::CalendarUnavailable("timeout".into()));
        let store = Arc::new(InMemoryBookingStore::default());
        let engine = engine_with(gateway, store.clone());

        let booking = engine
            .request_booking(ClientId(1), &ServiceId::new("haircut"), slot(9, 0, 10, 0))
            .await
            .unwrap();
        let err = engine.confirm(booking.id, &metadata()).await.unwrap_err();

        assert!(matches!(err, SchedulingError::CalendarUnavailable(_)));
        let stored = store.get(booking.id).await.unwrap();
        assert_eq!(stored.status, BookingStatus::Pending);
        assert_eq!(stored.version, booking.version);
    }

    /// A store decorator that hands out stale versions, emulating a
    /// transition that lost to a concurrent mutation.
    struct StaleVersionStore(InMemoryBookingStore);

    #[async_trait]
    impl BookingStore for StaleVersionStore {
        async fn create(&self, booking: Booking) -> Result<Booking> {
            self.0.create(booking).await
        }

        async fn transition(
            &self,
            id: BookingId,
            expected_version: i64,
            new_status: BookingStatus,
            event_ref: Option<EventRef>,
        ) -> Result<Booking> {
            // The stored record is always one version ahead of the caller.
            let _ = (expected_version, new_status, event_ref);
            let stored = self.0.get(id).await?;
            Err(SchedulingError::VersionConflict {
                expected: expected_version,
                stored: stored.version + 1,
            })
        }

        async fn get(&self, id: BookingId) -> Result<Booking> {
            self.0.get(id).await
        }

        async fn list_active(&self, window: TimeSlot) -> Result<Vec<Booking>> {
            self.0.list_active(window).await
        }

        async fn list_pending_created_before(
            &self,
            cutoff: DateTime<Utc>,
        ) -> Result<Vec<Booking>> {
            self.0.list_pending_created_before(cutoff).await
        }

        async fn list_confirmed(&self, window: TimeSlot) -> Result<Vec<Booking>> {
            self.0.list_confirmed(window).await
        }

        async fn list_unreminded_confirmed_between(
            &self,
            from: DateTime<Utc>,
            until: DateTime<Utc>,
        ) -> Result<Vec<Booking>> {
            self.0.list_unreminded_confirmed_between(from, until).await
        }

        async fn mark_reminded(&self, id: BookingId) -> Result<()> {
            self.0.mark_reminded(id).await
        }

        async fn list_for_client(&self, client_id: ClientId) -> Result<Vec<Booking>> {
            self.0.list_for_client(client_id).await
        }
    }

    /// A store decorator whose transition takes effect but reports a
    /// conflict to its caller, the way a second confirmer with a stale
    /// snapshot experiences a race it actually lost.
    struct FirstWriterWinsStore {
        inner: InMemoryBookingStore,
        conflicts: AtomicU32,
    }

    impl FirstWriterWinsStore {
        fn conflicting_once() -> Self {
            Self { inner: InMemoryBookingStore::default(), conflicts: AtomicU32::new(1) }
        }
    }

    #[async_trait]
    impl BookingStore for FirstWriterWinsStore {
        async fn create(&self, booking: Booking) -> Result<Booking> {
            self.inner.create(booking).await
        }

        async fn transition(
            &self,
            id: BookingId,
            expected_version: i64,
            new_status: BookingStatus,
            event_ref: Option<EventRef>,
        ) -> Result<Booking> {
            let updated =
                self.inner.transition(id, expected_version, new_status, event_ref).await?;
            if self
                .conflicts
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(SchedulingError::VersionConflict {
                    expected: expected_version,
                    stored: updated.version,
                });
            }
            Ok(updated)
        }

        async fn get(&self, id: BookingId) -> Result<Booking> {
            self.inner.get(id).await
        }

        async fn list_active(&self, window: TimeSlot) -> Result<Vec<Booking>> {
            self.inner.list_active(window).await
        }

        async fn list_pending_created_before(
            &self,
            cutoff: DateTime<Utc>,
        ) -> Result<Vec<Booking>> {
            self.inner.list_pending_created_before(cutoff).await
        }

        async fn list_confirmed(&self, window: TimeSlot) -> Result<Vec<Booking>> {
            self.inner.list_confirmed(window).await
        }

        async fn list_unreminded_confirmed_between(
            &self,
            from: DateTime<Utc>,
            until: DateTime<Utc>,
        ) -> Result<Vec<Booking>> {
            self.inner.list_unreminded_confirmed_between(from, until).await
        }

        async fn mark_reminded(&self, id: BookingId) -> Result<()> {
            self.inner.mark_reminded(id).await
        }

        async fn list_for_client(&self, client_id: ClientId) -> Result<Vec<Booking>> {
            self.inner.list_for_client(client_id).await
        }
    }

    #[tokio::test]
    async fn losing_a_confirm_race_keeps_the_winners_event() {
        let gateway = Arc::new(FakeGateway::default());
        let store = Arc::new(FirstWriterWinsStore::conflicting_once());
        let booking = store
            .create(Booking::pending(ClientId(1), ServiceId::new("haircut"), slot(9, 0, 9, 30)))
            .await
            .unwrap();
        let engine = engine_with(gateway.clone(), store.clone());

        // The "losing" confirm sees a conflict, but the record it re-reads
        // is Confirmed with the very event it just created.
        let confirmed = engine.confirm(booking.id, &metadata()).await.unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        assert!(confirmed.event_ref.is_some());

        // The live event must survive.
        assert_eq!(gateway.created_count(), 1);
        assert_eq!(gateway.deleted_count(), 0);
        assert_eq!(store.get(booking.id).await.unwrap().status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn version_conflict_on_confirm_rolls_back_the_event() {
        let gateway = Arc::new(FakeGateway::default());
        let inner = InMemoryBookingStore::default();
        let booking = inner
            .create(Booking::pending(
                ClientId(1),
                ServiceId::new("haircut"),
                slot(9, 0, 9, 30),
            ))
            .await
            .unwrap();
        let store = Arc::new(StaleVersionStore(inner));
        let engine = engine_with(gateway.clone(), store);

        let err = engine.confirm(booking.id, &metadata()).await.unwrap_err();
        assert!(matches!(err, SchedulingError::VersionConflict { .. }));
        assert_eq!(gateway.created_count(), 1);
        assert_eq!(gateway.deleted_count(), 1);
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let gateway = Arc::new(FakeGateway::default());
        let store = Arc::new(InMemoryBookingStore::default());
        let engine = engine_with(gateway.clone(), store);

        let booking = engine
            .request_booking(ClientId(1), &ServiceId::new("haircut"), slot(9, 0, 10, 0))
            .await
            .unwrap();
        engine.confirm(booking.id, &metadata()).await.unwrap();

        let first = engine.cancel(booking.id).await.unwrap();
        assert_eq!(first.status, BookingStatus::Cancelled);
        assert_eq!(gateway.deleted_count(), 1);

        let second = engine.cancel(booking.id).await.unwrap();
        assert_eq!(second.status, BookingStatus::Cancelled);
        // No second destructive delete.
        assert_eq!(gateway.deleted_count(), 1);
    }

    #[tokio::test]
    async fn cancel_aborts_when_calendar_is_unavailable() {
        let gateway = Arc::new(FakeGateway::default());
        let store = Arc::new(InMemoryBookingStore::default());
        let engine = engine_with(gateway.clone(), store.clone());

        let booking = engine
            .request_booking(ClientId(1), &ServiceId::new("haircut"), slot(9, 0, 10, 0))
            .await
            .unwrap();
        engine.confirm(booking.id, &metadata()).await.unwrap();

        gateway.fail_delete_with(SchedulingError::CalendarUnavailable("timeout".into()));
        let err = engine.cancel(booking.id).await.unwrap_err();
        assert!(matches!(err, SchedulingError::CalendarUnavailable(_)));
        assert_eq!(store.get(booking.id).await.unwrap().status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn cancel_treats_missing_event_as_already_deleted() {
        let gateway = Arc::new(FakeGateway::default());
        let store = Arc::new(InMemoryBookingStore::default());
        let engine = engine_with(gateway.clone(), store);

        let booking = engine
            .request_booking(ClientId(1), &ServiceId::new("haircut"), slot(9, 0, 10, 0))
            .await
            .unwrap();
        engine.confirm(booking.id, &metadata()).await.unwrap();

        gateway.fail_delete_with(SchedulingError::NotFound("event gone".into()));
        let cancelled = engine.cancel(booking.id).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn concurrent_requests_never_overlap() {
        let gateway = Arc::new(FakeGateway::default());
        let store = Arc::new(InMemoryBookingStore::default());
        let engine = Arc::new(engine_with(gateway, store.clone()));

        let window = slot(9, 0, 12, 0);
        let mut handles = Vec::new();
        for client in 0..16 {
            let engine = Arc::clone(&engine);
            handles.push(tokio::spawn(async move {
                engine.request_booking(ClientId(client), &ServiceId::new("haircut"), window).await
            }));
        }

        let mut booked = Vec::new();
        for handle in handles {
            if let Ok(booking) = handle.await.unwrap() {
                booked.push(booking);
            }
        }

        assert!(!booked.is_empty());
        for (i, a) in booked.iter().enumerate() {
            for b in booked.iter().skip(i + 1) {
                assert!(!a.slot.overlaps(&b.slot), "{} overlaps {}", a.slot, b.slot);
            }
        }
    }
}
