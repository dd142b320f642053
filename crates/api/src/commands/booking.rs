//! Booking commands: request, confirm, cancel, list.

use chrono::{DateTime, Utc};
use serde::Serialize;
use slotwise_core::EventMetadata;
use slotwise_domain::{
    Booking, BookingId, ClientId, Result, SchedulingError, ServiceId, TimeSlot,
};
use tracing::instrument;

use crate::context::AppContext;

/// One booking as shown to the client.
#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    pub id: String,
    pub service_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: String,
    pub event_ref: Option<String>,
}

impl From<&Booking> for BookingView {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id.to_string(),
            service_id: booking.service_id.to_string(),
            start: booking.slot.start,
            end: booking.slot.end,
            status: booking.status.to_string(),
            event_ref: booking.event_ref.as_ref().map(|r| r.as_str().to_string()),
        }
    }
}

fn parse_booking_id(raw: &str) -> Result<BookingId> {
    BookingId::parse(raw)
        .ok_or_else(|| SchedulingError::NotFound(format!("unknown booking: {raw}")))
}

/// Reserve the earliest free slot for `service_id` within `window`. The
/// returned booking is pending until confirmed.
#[instrument(skip(context))]
pub async fn request_booking(
    context: &AppContext,
    client_id: i64,
    service_id: &str,
    window: TimeSlot,
) -> Result<BookingView> {
    let booking = context
        .engine
        .request_booking(ClientId(client_id), &ServiceId::new(service_id), window)
        .await?;
    Ok(BookingView::from(&booking))
}

/// Confirm a pending booking, creating the calendar event. The event summary
/// carries the service name; the description carries the client's contact
/// details when a profile exists.
#[instrument(skip(context))]
pub async fn confirm_booking(context: &AppContext, booking_id: &str) -> Result<BookingView> {
    let id = parse_booking_id(booking_id)?;
    let booking = context.store.get(id).await?;

    let service = context.catalog.service(&booking.service_id)?;
    let description = match context.clients.get(booking.client_id)? {
        Some(profile) => format!("{}, {}", profile.display_name(), profile.phone),
        None => format!("client #{}", booking.client_id),
    };
    let metadata = EventMetadata { summary: service.name.clone(), description };

    let confirmed = context.engine.confirm(id, &metadata).await?;
    Ok(BookingView::from(&confirmed))
}

/// Cancel a booking. Safe to repeat.
#[instrument(skip(context))]
pub async fn cancel_booking(context: &AppContext, booking_id: &str) -> Result<BookingView> {
    let id = parse_booking_id(booking_id)?;
    let cancelled = context.engine.cancel(id).await?;
    Ok(BookingView::from(&cancelled))
}

/// Every booking of one client, newest first.
#[instrument(skip(context))]
pub async fn list_bookings(context: &AppContext, client_id: i64) -> Result<Vec<BookingView>> {
    let bookings = context.store.list_for_client(ClientId(client_id)).await?;
    Ok(bookings.iter().map(BookingView::from).collect())
}
