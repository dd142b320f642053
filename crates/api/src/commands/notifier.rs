//! Reminder delivery.

use std::sync::Arc;

use async_trait::async_trait;
use slotwise_core::ReminderNotifier;
use slotwise_domain::{Booking, Result};
use slotwise_infra::database::SqliteClientRepository;
use tracing::{debug, info};

/// Logs reminders instead of sending them. Stands in until a chat transport
/// implements [`ReminderNotifier`].
pub struct TracingReminderNotifier;

#[async_trait]
impl ReminderNotifier for TracingReminderNotifier {
    async fn notify(&self, booking: &Booking) -> Result<()> {
        info!(
            booking = %booking.id,
            client = %booking.client_id,
            start = %booking.slot.start,
            "reminder due"
        );
        Ok(())
    }
}

/// Applies the per-client opt-out before delegating delivery.
///
/// A skipped reminder reports success, so the booking is still marked
/// reminded and the pass does not revisit it. Clients without a profile
/// are delivered to.
pub struct OptInReminderNotifier {
    clients: Arc<SqliteClientRepository>,
    inner: Arc<dyn ReminderNotifier>,
}

impl OptInReminderNotifier {
    pub fn new(clients: Arc<SqliteClientRepository>, inner: Arc<dyn ReminderNotifier>) -> Self {
        Self { clients, inner }
    }
}

#[async_trait]
impl ReminderNotifier for OptInReminderNotifier {
    async fn notify(&self, booking: &Booking) -> Result<()> {
        if let Some(profile) = self.clients.get(booking.client_id)? {
            if !profile.reminders_enabled {
                debug!(client = %booking.client_id, "reminders disabled, skipping");
                return Ok(());
            }
        }
        self.inner.notify(booking).await
    }
}
