//! Periodic reconciliation between the booking store and the live calendar.
//!
//! Two independent passes, both safe to run concurrently with live requests:
//! overdue Pending bookings expire (their grace period has already elapsed,
//! a monotone fact), and Confirmed bookings whose external event vanished
//! are cancelled. Both use the normal version-checked transition, so a
//! racing confirm/cancel simply wins.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use slotwise_domain::{BookingStatus, Result, SchedulingError, TimeSlot};
use tracing::{debug, info, instrument, warn};

use super::ports::{BookingStore, CalendarGateway};

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Pending bookings transitioned to Expired.
    pub expired: usize,
    /// Confirmed bookings cancelled because their event disappeared.
    pub cancelled: usize,
}

/// The reconciliation sweep.
pub struct ReconciliationService {
    store: Arc<dyn BookingStore>,
    gateway: Arc<dyn CalendarGateway>,
    grace_period: Duration,
    /// How far ahead confirmed bookings are checked against the calendar.
    lookahead: Duration,
}

impl ReconciliationService {
    pub fn new(
        store: Arc<dyn BookingStore>,
        gateway: Arc<dyn CalendarGateway>,
        grace_period: Duration,
    ) -> Self {
        Self { store, gateway, grace_period, lookahead: Duration::days(60) }
    }

    pub fn with_lookahead(mut self, lookahead: Duration) -> Self {
        self.lookahead = lookahead;
        self
    }

    /// Run both passes once. The expiry pass never needs the calendar, so a
    /// provider outage only skips the external sync.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<ReconcileReport> {
        let expired = self.expire_overdue_pending().await?;
        let cancelled = match self.sync_externally_deleted().await {
            Ok(count) => count,
            Err(err) if err.is_transient() => {
                warn!(error = %err, "calendar unavailable, skipping external sync pass");
                0
            }
            Err(err) => return Err(err),
        };
        if expired > 0 || cancelled > 0 {
            info!(expired, cancelled, "reconciliation pass finished");
        }
        Ok(ReconcileReport { expired, cancelled })
    }

    async fn expire_overdue_pending(&self) -> Result<usize> {
        let cutoff = Utc::now() - self.grace_period;
        let overdue = self.store.list_pending_created_before(cutoff).await?;
        let mut expired = 0;
        for booking in overdue {
            match self
                .store
                .transition(booking.id, booking.version, BookingStatus::Expired, None)
                .await
            {
                Ok(_) => {
                    debug!(booking = %booking.id, "pending booking expired");
                    expired += 1;
                }
                Err(SchedulingError::VersionConflict { .. })
                | Err(SchedulingError::InvalidTransition { .. }) => {
                    // A concurrent confirm or cancel got there first.
                    debug!(booking = %booking.id, "skipped, booking changed underneath sweep");
                }
                Err(other) => return Err(other),
            }
        }
        Ok(expired)
    }

    async fn sync_externally_deleted(&self) -> Result<usize> {
        let now = Utc::now();
        let window = TimeSlot::new(now, now + self.lookahead);
        let confirmed = self.store.list_confirmed(window).await?;
        if confirmed.is_empty() {
            return Ok(0);
        }

        let busy = self.gateway.list_busy(window).await?;
        let live_refs: HashSet<&str> =
            busy.iter().filter_map(|b| b.event_ref.as_deref()).collect();
        if live_refs.is_empty() && busy.iter().any(|b| b.event_ref.is_none()) {
            // The provider reported busy time without event ids; matching is
            // impossible, so do not cancel anything on this pass.
            warn!("busy intervals carry no event references, skipping external sync");
            return Ok(0);
        }

        let mut cancelled = 0;
        for booking in confirmed {
            let vanished = booking
                .event_ref
                .as_ref()
                .is_some_and(|r| !live_refs.contains(r.as_str()));
            if !vanished {
                continue;
            }
            match self
                .store
                .transition(booking.id, booking.version, BookingStatus::Cancelled, None)
                .await
            {
                Ok(_) => {
                    info!(booking = %booking.id, "event deleted externally, booking cancelled");
                    cancelled += 1;
                }
                Err(SchedulingError::VersionConflict { .. })
                | Err(SchedulingError::InvalidTransition { .. }) => {
                    debug!(booking = %booking.id, "skipped, booking changed underneath sweep");
                }
                Err(other) => return Err(other),
            }
        }
        Ok(cancelled)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone};
    use slotwise_domain::{Booking, ClientId, ServiceId};

    use super::*;
    use crate::scheduling::ports::EventMetadata;
    use crate::scheduling::testkit::{FakeGateway, InMemoryBookingStore};

    fn future_slot(hours: i64) -> TimeSlot {
        let start = Utc::now() + Duration::hours(hours);
        TimeSlot::from_start(start, Duration::minutes(30))
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
    }

    async fn pending_booking(store: &InMemoryBookingStore, slot: TimeSlot) -> Booking {
        store
            .create(Booking::pending(ClientId(1), ServiceId::new("haircut"), slot))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn overdue_pending_bookings_expire_and_free_their_slot() {
        let store = Arc::new(InMemoryBookingStore::default());
        let gateway = Arc::new(FakeGateway::default());

        let slot = TimeSlot::new(at(9, 0), at(9, 30));
        let mut stale = Booking::pending(ClientId(1), ServiceId::new("haircut"), slot);
        stale.created_at = Utc::now() - Duration::minutes(30);
        store.create(stale).await.unwrap();

        let service =
            ReconciliationService::new(store.clone(), gateway, Duration::minutes(10));
        let report = service.run_once().await.unwrap();
        assert_eq!(report, ReconcileReport { expired: 1, cancelled: 0 });

        // The slot is free again: a fresh booking for the same window works.
        let rebooked = pending_booking(&store, slot).await;
        assert_eq!(rebooked.slot, slot);
    }

    #[tokio::test]
    async fn fresh_pending_bookings_are_left_alone() {
        let store = Arc::new(InMemoryBookingStore::default());
        let gateway = Arc::new(FakeGateway::default());
        let booking = pending_booking(&store, future_slot(2)).await;

        let service =
            ReconciliationService::new(store.clone(), gateway, Duration::minutes(10));
        let report = service.run_once().await.unwrap();
        assert_eq!(report.expired, 0);
        assert_eq!(store.get(booking.id).await.unwrap().status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn externally_deleted_event_cancels_the_booking() {
        let store = Arc::new(InMemoryBookingStore::default());
        let gateway = Arc::new(FakeGateway::default());

        // Confirm two bookings through the gateway so it knows their events.
        let keep = pending_booking(&store, future_slot(3)).await;
        let drop = pending_booking(&store, future_slot(5)).await;
        let metadata = EventMetadata { summary: "Haircut".into(), description: String::new() };
        let mut refs = Vec::new();
        for booking in [&keep, &drop] {
            let event_ref = gateway
                .create_event(booking.slot, &metadata, &booking.id.as_simple_hex())
                .await
                .unwrap();
            store
                .transition(
                    booking.id,
                    booking.version,
                    BookingStatus::Confirmed,
                    Some(event_ref.clone()),
                )
                .await
                .unwrap();
            refs.push(event_ref);
        }

        // Someone deletes the second event in the provider UI.
        gateway.remove_event(&refs[1]);

        let service =
            ReconciliationService::new(store.clone(), gateway, Duration::minutes(10));
        let report = service.run_once().await.unwrap();

        assert_eq!(report.cancelled, 1);
        assert_eq!(store.get(keep.id).await.unwrap().status, BookingStatus::Confirmed);
        assert_eq!(store.get(drop.id).await.unwrap().status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn calendar_outage_skips_external_sync_but_still_expires() {
        let store = Arc::new(InMemoryBookingStore::default());
        let gateway = Arc::new(FakeGateway::default());

        let mut stale =
            Booking::pending(ClientId(1), ServiceId::new("haircut"), future_slot(4));
        stale.created_at = Utc::now() - Duration::hours(1);
        store.create(stale).await.unwrap();

        let confirmed = pending_booking(&store, future_slot(6)).await;
        store
            .transition(
                confirmed.id,
                confirmed.version,
                BookingStatus::Confirmed,
                Some(slotwise_domain::EventRef::new("evt-x")),
            )
            .await
            .unwrap();

        gateway.fail_list_with(SchedulingError::CalendarUnavailable("down".into()));

        let service =
            ReconciliationService::new(store.clone(), gateway, Duration::minutes(10));
        let report = service.run_once().await.unwrap();
        assert_eq!(report.expired, 1);
        assert_eq!(report.cancelled, 0);
        assert_eq!(store.get(confirmed.id).await.unwrap().status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn refless_busy_intervals_do_not_cause_mass_cancellation() {
        let store = Arc::new(InMemoryBookingStore::default());
        let gateway = Arc::new(FakeGateway::default());

        let booking = pending_booking(&store, future_slot(2)).await;
        store
            .transition(
                booking.id,
                booking.version,
                BookingStatus::Confirmed,
                Some(slotwise_domain::EventRef::new("evt-unlisted")),
            )
            .await
            .unwrap();

        // The provider reports opaque busy time with no ids at all.
        let start = Utc::now() + Duration::hours(1);
        gateway.push_busy(start, start + Duration::hours(8));

        let service =
            ReconciliationService::new(store.clone(), gateway, Duration::minutes(10));
        let report = service.run_once().await.unwrap();
        assert_eq!(report.cancelled, 0);
        assert_eq!(store.get(booking.id).await.unwrap().status, BookingStatus::Confirmed);
    }
}
