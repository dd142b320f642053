//! Bookings and their lifecycle state machine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::service::ServiceId;
use super::slot::TimeSlot;

/// Opaque, unique booking identifier. Terminal bookings are never reused; a
/// new request always mints a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(Uuid);

impl BookingId {
    /// Mint a fresh time-sortable identifier.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Stable lowercase-hex form, suitable as a provider idempotency key.
    pub fn as_simple_hex(&self) -> String {
        self.0.simple().to_string()
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of the chat user the booking belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub i64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Reference to the event the gateway created in the external calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventRef(String);

impl EventRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Booking lifecycle status.
///
/// Allowed transitions: Pending -> Confirmed, Pending -> Cancelled,
/// Pending -> Expired, Confirmed -> Cancelled. Cancelled and Expired are
/// terminal; Confirmed never expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Expired,
}

impl BookingStatus {
    /// Active bookings count against availability.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Expired)
    }

    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed)
                | (Self::Pending, Self::Cancelled)
                | (Self::Pending, Self::Expired)
                | (Self::Confirmed, Self::Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "cancelled" => Some(Self::Cancelled),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One appointment as the engine believes it exists.
///
/// Invariants:
/// - `status == Confirmed` implies `event_ref.is_some()`
/// - `version` strictly increases on every state transition
/// - no two active bookings hold overlapping slots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub client_id: ClientId,
    pub service_id: ServiceId,
    pub slot: TimeSlot,
    pub status: BookingStatus,
    pub event_ref: Option<EventRef>,
    pub created_at: DateTime<Utc>,
    pub version: i64,
    /// Set once the pre-appointment reminder has been delivered.
    pub reminded: bool,
}

impl Booking {
    /// A freshly requested booking, not yet confirmed.
    pub fn pending(client_id: ClientId, service_id: ServiceId, slot: TimeSlot) -> Self {
        Self {
            id: BookingId::generate(),
            client_id,
            service_id,
            slot,
            status: BookingStatus::Pending,
            event_ref: None,
            created_at: Utc::now(),
            version: 1,
            reminded: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}
