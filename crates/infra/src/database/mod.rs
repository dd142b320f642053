//! SQLite persistence layer.

pub mod booking_repository;
pub mod client_repository;
pub mod pool;

pub use booking_repository::SqliteBookingStore;
pub use client_repository::SqliteClientRepository;
pub use pool::DbPool;
