//! SQLite-backed implementation of the BookingStore port.
//!
//! `create` runs its overlap check and insert inside one IMMEDIATE
//! transaction; with SQLite's writer lock this is the serialization point
//! that makes double-booking impossible. Everything else relies on the
//! version column for optimistic concurrency.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row, TransactionBehavior};
use slotwise_core::BookingStore;
use slotwise_domain::{
    Booking, BookingId, BookingStatus, ClientId, EventRef, Result, SchedulingError, ServiceId,
    TimeSlot,
};
use tracing::{debug, instrument};

use super::pool::{ts_to_datetime, DbPool};
use crate::errors::InfraError;

/// SQLite implementation of the BookingStore port.
pub struct SqliteBookingStore {
    pool: DbPool,
}

impl SqliteBookingStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const BOOKING_COLUMNS: &str =
    "id, client_id, service_id, start_ts, end_ts, status, event_ref, created_at, version, reminded";

fn map_booking_row(row: &Row<'_>) -> rusqlite::Result<(String, i64, String, i64, i64, String, Option<String>, i64, i64, bool)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
    ))
}

fn into_booking(
    (id, client_id, service_id, start_ts, end_ts, status, event_ref, created_at, version, reminded): (
        String,
        i64,
        String,
        i64,
        i64,
        String,
        Option<String>,
        i64,
        i64,
        bool,
    ),
) -> Result<Booking> {
    Ok(Booking {
        id: BookingId::parse(&id)
            .ok_or_else(|| SchedulingError::Database(format!("malformed booking id: {id}")))?,
        client_id: ClientId(client_id),
        service_id: ServiceId::new(service_id),
        slot: TimeSlot::new(ts_to_datetime(start_ts)?, ts_to_datetime(end_ts)?),
        status: BookingStatus::parse(&status)
            .ok_or_else(|| SchedulingError::Database(format!("malformed status: {status}")))?,
        event_ref: event_ref.map(EventRef::new),
        created_at: ts_to_datetime(created_at)?,
        version,
        reminded,
    })
}

impl SqliteBookingStore {
    fn query_bookings(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Booking>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(sql).map_err(InfraError::from)?;
        let rows = stmt
            .query_map(params, map_booking_row)
            .map_err(InfraError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(InfraError::from)?;
        rows.into_iter().map(into_booking).collect()
    }
}

#[async_trait]
impl BookingStore for SqliteBookingStore {
    #[instrument(skip(self, booking), fields(booking = %booking.id))]
    async fn create(&self, booking: Booking) -> Result<Booking> {
        let mut conn = self.pool.get()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(InfraError::from)?;

        let overlapping: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM bookings
                 WHERE status IN ('pending', 'confirmed')
                   AND start_ts < ?1 AND ?2 < end_ts",
                params![booking.slot.end.timestamp(), booking.slot.start.timestamp()],
                |row| row.get(0),
            )
            .map_err(InfraError::from)?;
        if overlapping > 0 {
            return Err(SchedulingError::SlotTaken);
        }

        tx.execute(
            "INSERT INTO bookings
                 (id, client_id, service_id, start_ts, end_ts, status, event_ref,
                  created_at, version, reminded)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                booking.id.to_string(),
                booking.client_id.0,
                booking.service_id.as_str(),
                booking.slot.start.timestamp(),
                booking.slot.end.timestamp(),
                booking.status.as_str(),
                booking.event_ref.as_ref().map(|r| r.as_str()),
                booking.created_at.timestamp(),
                booking.version,
                booking.reminded,
            ],
        )
        .map_err(InfraError::from)?;

        tx.commit().map_err(InfraError::from)?;
        debug!(slot = %booking.slot, "booking inserted");
        Ok(booking)
    }

    #[instrument(skip(self), fields(booking = %id))]
    async fn transition(
        &self,
        id: BookingId,
        expected_version: i64,
        new_status: BookingStatus,
        event_ref: Option<EventRef>,
    ) -> Result<Booking> {
        let mut conn = self.pool.get()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(InfraError::from)?;

        let current = tx
            .query_row(
                &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
                params![id.to_string()],
                map_booking_row,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => SchedulingError::NotFound(id.to_string()),
                other => InfraError::from(other).into(),
            })
            .and_then(into_booking)?;

        if current.version != expected_version {
            return Err(SchedulingError::VersionConflict {
                expected: expected_version,
                stored: current.version,
            });
        }
        if !current.status.can_transition_to(new_status) {
            return Err(SchedulingError::InvalidTransition {
                from: current.status,
                to: new_status,
            });
        }

        let new_ref = event_ref
            .as_ref()
            .map(|r| r.as_str().to_string())
            .or_else(|| current.event_ref.as_ref().map(|r| r.as_str().to_string()));

        let updated = tx
            .execute(
                "UPDATE bookings
                 SET status = ?1, event_ref = ?2, version = version + 1
                 WHERE id = ?3 AND version = ?4",
                params![new_status.as_str(), new_ref, id.to_string(), expected_version],
            )
            .map_err(InfraError::from)?;
        if updated == 0 {
            // Lost a race inside the same instant; report as a conflict.
            return Err(SchedulingError::VersionConflict {
                expected: expected_version,
                stored: current.version,
            });
        }

        tx.commit().map_err(InfraError::from)?;
        debug!(from = %current.status, to = %new_status, "booking transitioned");

        Ok(Booking {
            status: new_status,
            event_ref: new_ref.map(EventRef::new),
            version: expected_version + 1,
            ..current
        })
    }

    async fn get(&self, id: BookingId) -> Result<Booking> {
        let conn = self.pool.get()?;
        conn.query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id.to_string()],
            map_booking_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => SchedulingError::NotFound(id.to_string()),
            other => InfraError::from(other).into(),
        })
        .and_then(into_booking)
    }

    async fn list_active(&self, window: TimeSlot) -> Result<Vec<Booking>> {
        self.query_bookings(
            &format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE status IN ('pending', 'confirmed')
                   AND start_ts < ?1 AND ?2 < end_ts
                 ORDER BY start_ts ASC"
            ),
            params![window.end.timestamp(), window.start.timestamp()],
        )
    }

    async fn list_pending_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>> {
        self.query_bookings(
            &format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE status = 'pending' AND created_at < ?1
                 ORDER BY created_at ASC"
            ),
            params![cutoff.timestamp()],
        )
    }

    async fn list_confirmed(&self, window: TimeSlot) -> Result<Vec<Booking>> {
        self.query_bookings(
            &format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE status = 'confirmed'
                   AND start_ts < ?1 AND ?2 < end_ts
                 ORDER BY start_ts ASC"
            ),
            params![window.end.timestamp(), window.start.timestamp()],
        )
    }

    async fn list_unreminded_confirmed_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Booking>> {
        self.query_bookings(
            &format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE status = 'confirmed' AND reminded = 0
                   AND start_ts >= ?1 AND start_ts < ?2
                 ORDER BY start_ts ASC"
            ),
            params![from.timestamp(), until.timestamp()],
        )
    }

    async fn mark_reminded(&self, id: BookingId) -> Result<()> {
        let conn = self.pool.get()?;
        // The reminded flag sits outside the versioned state machine: bumping
        // the version here would fail a cancel that raced the reminder pass.
        let updated = conn
            .execute("UPDATE bookings SET reminded = 1 WHERE id = ?1", params![id.to_string()])
            .map_err(InfraError::from)?;
        if updated == 0 {
            return Err(SchedulingError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list_for_client(&self, client_id: ClientId) -> Result<Vec<Booking>> {
        self.query_bookings(
            &format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings
                 WHERE client_id = ?1
                 ORDER BY created_at DESC, id DESC"
            ),
            params![client_id.0],
        )
    }
}
