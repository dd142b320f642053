//! Scheduling engine, port interfaces, and the periodic passes.

pub mod engine;
pub mod ports;
pub mod reconcile;
pub mod reminder;

#[cfg(any(test, feature = "test-utils"))]
pub mod testkit;
