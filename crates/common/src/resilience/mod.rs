//! Resilience primitives for calls that may fail transiently.

pub mod retry;
