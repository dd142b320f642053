//! Calendar provider integration.
//!
//! Layering mirrors the persistence side: `providers` speaks the vendor API,
//! `token` owns authentication, and `gateway` adapts both to the
//! `CalendarGateway` port with retry and timeout applied on top.

pub mod gateway;
pub mod providers;
pub mod token;

pub use gateway::HttpCalendarGateway;
pub use providers::{CalendarApi, GoogleCalendarApi};
pub use token::{AccessTokenProvider, RefreshTokenProvider, StaticTokenProvider};
