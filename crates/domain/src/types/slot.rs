//! Time intervals: bookable slots and external busy ranges.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A concrete half-open interval `[start, end)` for one service instance,
/// buffers included. Value type; equality is by `(start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSlot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Slot starting at `start` with the given length.
    pub fn from_start(start: DateTime<Utc>, length: Duration) -> Self {
        Self { start, end: start + length }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Half-open overlap test: `[09:00, 09:30)` and `[09:30, 10:00)` do not
    /// overlap.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn overlaps_interval(&self, busy: &BusyInterval) -> bool {
        self.start < busy.end && busy.start < self.end
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// A time range unavailable for booking, read from the external calendar.
/// Not owned by the bot; ground truth regardless of who created the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// External event id, when the provider reports one.
    pub event_ref: Option<String>,
}

impl BusyInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end, event_ref: None }
    }

    pub fn with_event_ref(start: DateTime<Utc>, end: DateTime<Utc>, event_ref: String) -> Self {
        Self { start, end, event_ref: Some(event_ref) }
    }
}

impl From<TimeSlot> for BusyInterval {
    fn from(slot: TimeSlot) -> Self {
        Self::new(slot.start, slot.end)
    }
}
