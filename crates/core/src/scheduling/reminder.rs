//! Pre-appointment reminder pass.
//!
//! Confirmed bookings starting within the configured lead time get one
//! reminder through the [`ReminderNotifier`] port. The reminded flag is set
//! only after successful delivery, so a failed send is retried on the next
//! pass.

use std::sync::Arc;

use chrono::{Duration, Utc};
use slotwise_domain::Result;
use tracing::{info, instrument, warn};

use super::ports::{BookingStore, ReminderNotifier};

pub struct ReminderService {
    store: Arc<dyn BookingStore>,
    notifier: Arc<dyn ReminderNotifier>,
    lead: Duration,
}

impl ReminderService {
    pub fn new(
        store: Arc<dyn BookingStore>,
        notifier: Arc<dyn ReminderNotifier>,
        lead: Duration,
    ) -> Self {
        Self { store, notifier, lead }
    }

    /// Deliver due reminders once; returns how many went out.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<usize> {
        let now = Utc::now();
        let due = self.store.list_unreminded_confirmed_between(now, now + self.lead).await?;

        let mut sent = 0;
        for booking in due {
            match self.notifier.notify(&booking).await {
                Ok(()) => {
                    self.store.mark_reminded(booking.id).await?;
                    sent += 1;
                }
                Err(err) => {
                    // Leave the flag unset; the next pass retries.
                    warn!(booking = %booking.id, error = %err, "reminder delivery failed");
                }
            }
        }

        if sent > 0 {
            info!(sent, "reminders delivered");
        }
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use slotwise_domain::{
        Booking, BookingStatus, ClientId, EventRef, SchedulingError, ServiceId, TimeSlot,
    };

    use super::*;
    use crate::scheduling::testkit::{InMemoryBookingStore, RecordingNotifier};

    async fn confirmed_booking(store: &InMemoryBookingStore, starts_in: Duration) -> Booking {
        let slot = TimeSlot::from_start(Utc::now() + starts_in, Duration::minutes(30));
        let booking = store
            .create(Booking::pending(ClientId(7), ServiceId::new("manicure"), slot))
            .await
            .unwrap();
        store
            .transition(
                booking.id,
                booking.version,
                BookingStatus::Confirmed,
                Some(EventRef::new("evt-1")),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn due_bookings_are_notified_once() {
        let store = Arc::new(InMemoryBookingStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let booking = confirmed_booking(&store, Duration::minutes(90)).await;

        let service =
            ReminderService::new(store.clone(), notifier.clone(), Duration::minutes(120));
        assert_eq!(service.run_once().await.unwrap(), 1);
        assert_eq!(notifier.notified.lock().as_slice(), &[booking.id]);

        // Second pass: already reminded, nothing goes out.
        assert_eq!(service.run_once().await.unwrap(), 0);
        assert_eq!(notifier.notified.lock().len(), 1);
    }

    #[tokio::test]
    async fn far_future_bookings_are_not_reminded_yet() {
        let store = Arc::new(InMemoryBookingStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        confirmed_booking(&store, Duration::hours(8)).await;

        let service =
            ReminderService::new(store.clone(), notifier.clone(), Duration::minutes(120));
        assert_eq!(service.run_once().await.unwrap(), 0);
        assert!(notifier.notified.lock().is_empty());
    }

    #[tokio::test]
    async fn failed_delivery_leaves_booking_unreminded() {
        let store = Arc::new(InMemoryBookingStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        *notifier.fail.lock() =
            Some(SchedulingError::Network("chat transport down".into()));
        let booking = confirmed_booking(&store, Duration::minutes(60)).await;

        let service =
            ReminderService::new(store.clone(), notifier.clone(), Duration::minutes(120));
        assert_eq!(service.run_once().await.unwrap(), 0);
        assert!(!store.get(booking.id).await.unwrap().reminded);

        // Transport recovers; the next pass delivers.
        *notifier.fail.lock() = None;
        assert_eq!(service.run_once().await.unwrap(), 1);
        assert!(store.get(booking.id).await.unwrap().reminded);
    }
}
