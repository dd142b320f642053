//! # Slotwise Core
//!
//! Business logic for appointment scheduling and reconciliation.
//!
//! This crate contains:
//! - The service catalog and availability computation
//! - Port traits implemented by `slotwise-infra` (calendar, storage)
//! - The scheduling engine (request / confirm / cancel)
//! - The reconciliation sweep and the reminder pass
//!
//! ## Architecture
//! - Depends only on `slotwise-domain` and `slotwise-common`
//! - No I/O of its own; everything impure sits behind the port traits

pub mod catalog;
pub mod scheduling;

pub use catalog::SlotCatalog;
pub use scheduling::engine::SchedulingEngine;
pub use scheduling::ports::{BookingStore, CalendarGateway, EventMetadata, ReminderNotifier};
pub use scheduling::reconcile::{ReconcileReport, ReconciliationService};
pub use scheduling::reminder::ReminderService;
