//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::BookingStatus;

/// Main error type for Slotwise
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum SchedulingError {
    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("no availability in the requested window")]
    NoAvailability,

    #[error("requested slot is already taken")]
    SlotTaken,

    #[error("calendar temporarily unavailable: {0}")]
    CalendarUnavailable(String),

    #[error("calendar rejected the request: {0}")]
    CalendarRejected(String),

    #[error("version conflict: expected {expected}, stored {stored}")]
    VersionConflict { expected: i64, stored: i64 },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: BookingStatus, to: BookingStatus },

    #[error("database error: {0}")]
    Database(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(String),
}

impl SchedulingError {
    /// Transient errors are safe to retry without operator intervention.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::CalendarUnavailable(_) | Self::Network(_))
    }
}

/// Result type alias for Slotwise operations
pub type Result<T> = std::result::Result<T, SchedulingError>;
