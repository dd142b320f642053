//! # Slotwise App
//!
//! Composition root and conversation-facing command layer.
//!
//! This crate contains:
//! - [`context::AppContext`], which wires configuration, storage, the
//!   calendar gateway, and the background passes together
//! - The command functions a chat frontend calls, with serializable views
//!   and user-facing reply texts

pub mod commands;
pub mod context;

pub use context::AppContext;
