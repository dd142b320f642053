//! SQLite connection pool and schema initialisation.

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use slotwise_domain::{DatabaseConfig, Result, SchedulingError};
use tracing::info;

use crate::errors::InfraError;

/// Shared connection pool handle.
#[derive(Clone)]
pub struct DbPool {
    pool: Pool<SqliteConnectionManager>,
}

impl DbPool {
    /// Open (creating if needed) the database at `config.path` and apply the
    /// schema.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        Self::open_at(Path::new(&config.path), config.pool_size)
    }

    pub fn open_at(path: &Path, pool_size: u32) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )
        });
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .build(manager)
            .map_err(InfraError::from)?;

        let db = Self { pool };
        db.apply_schema()?;
        info!(path = %path.display(), pool_size, "database pool ready");
        Ok(db)
    }

    pub fn get(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| InfraError::from(e).into())
    }

    fn apply_schema(&self) -> Result<()> {
        let conn = self.get()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS bookings (
                id TEXT PRIMARY KEY,
                client_id INTEGER NOT NULL,
                service_id TEXT NOT NULL,
                start_ts INTEGER NOT NULL,
                end_ts INTEGER NOT NULL,
                status TEXT NOT NULL,
                event_ref TEXT,
                created_at INTEGER NOT NULL,
                version INTEGER NOT NULL,
                reminded INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_bookings_status_start
                ON bookings(status, start_ts);
            CREATE INDEX IF NOT EXISTS idx_bookings_client
                ON bookings(client_id, created_at);

            CREATE TABLE IF NOT EXISTS clients (
                id INTEGER PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                phone TEXT NOT NULL,
                reminders_enabled INTEGER NOT NULL DEFAULT 1,
                registered_at INTEGER NOT NULL
            );",
        )
        .map_err(InfraError::from)?;
        Ok(())
    }
}

impl std::fmt::Debug for DbPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbPool").field("connections", &self.pool.state()).finish()
    }
}

/// Convert a unix timestamp column back into an instant.
pub(crate) fn ts_to_datetime(ts: i64) -> Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::from_timestamp(ts, 0)
        .ok_or_else(|| SchedulingError::Database(format!("timestamp out of range: {ts}")))
}
