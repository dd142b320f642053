//! Conversation-facing commands.
//!
//! The chat frontend calls these functions and renders what they return;
//! nothing above this layer touches the engine or the stores directly.

pub mod booking;
pub mod catalog;
pub mod clients;
pub mod notifier;
pub mod replies;

pub use booking::{
    cancel_booking, confirm_booking, list_bookings, request_booking, BookingView,
};
pub use catalog::{list_services, ServiceView};
pub use clients::{get_client, register_client, set_reminders, ClientView, RegisterClientRequest};
pub use notifier::{OptInReminderNotifier, TracingReminderNotifier};
pub use replies::reply_for_error;
