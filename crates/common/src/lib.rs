//! Common utilities shared across Slotwise crates.
//!
//! Nothing in here knows about bookings or calendars: resilience primitives
//! and time arithmetic only.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod resilience;
pub mod time;

pub use resilience::retry::{
    retry_with_policy, BackoffStrategy, RetryConfig, RetryDecision, RetryError, RetryPolicy,
};
