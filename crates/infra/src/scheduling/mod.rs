//! Cron-based execution of the background maintenance passes.

pub mod error;
pub mod reconcile_scheduler;
pub mod reminder_scheduler;
pub mod runner;

pub use error::{SchedulerError, SchedulerResult};
pub use reconcile_scheduler::ReconcileScheduler;
pub use reminder_scheduler::ReminderScheduler;
pub use runner::{MaintenancePass, PassScheduler, PassSchedulerConfig};
