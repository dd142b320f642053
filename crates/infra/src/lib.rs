//! # Slotwise Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - SQLite booking and client repositories (rusqlite + r2d2)
//! - The Google Calendar gateway (reqwest)
//! - Cron-based schedulers for the reconciliation and reminder passes
//! - The configuration loader
//!
//! ## Architecture
//! - Implements traits defined in `slotwise-core`
//! - Contains all "impure" code (I/O, external services)

pub mod calendar;
pub mod config;
pub mod database;
pub mod errors;
pub mod scheduling;

// Re-export commonly used items
pub use calendar::{GoogleCalendarApi, HttpCalendarGateway, StaticTokenProvider};
pub use database::{DbPool, SqliteBookingStore, SqliteClientRepository};
pub use errors::InfraError;
pub use scheduling::{
    PassSchedulerConfig, ReconcileScheduler, ReminderScheduler, SchedulerError,
};
