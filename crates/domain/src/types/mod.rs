//! Domain data types

pub mod booking;
pub mod client;
pub mod service;
pub mod slot;

pub use booking::{Booking, BookingId, BookingStatus, ClientId, EventRef};
pub use client::ClientProfile;
pub use service::{Service, ServiceId};
pub use slot::{BusyInterval, TimeSlot};
