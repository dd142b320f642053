//! Client profile persistence.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use slotwise_domain::{ClientId, ClientProfile, Result};

use super::pool::{ts_to_datetime, DbPool};
use crate::errors::InfraError;

/// SQLite store for registered client profiles.
pub struct SqliteClientRepository {
    pool: DbPool,
}

impl SqliteClientRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert or update a profile. Registration is idempotent; re-registering
    /// refreshes the contact details but keeps the original timestamp.
    pub fn upsert(&self, profile: &ClientProfile) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO clients (id, first_name, last_name, phone, reminders_enabled, registered_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                 first_name = excluded.first_name,
                 last_name = excluded.last_name,
                 phone = excluded.phone,
                 reminders_enabled = excluded.reminders_enabled",
            params![
                profile.id.0,
                profile.first_name,
                profile.last_name,
                profile.phone,
                profile.reminders_enabled,
                profile.registered_at.timestamp(),
            ],
        )
        .map_err(InfraError::from)?;
        Ok(())
    }

    pub fn get(&self, id: ClientId) -> Result<Option<ClientProfile>> {
        let conn = self.pool.get()?;
        let row = conn
            .query_row(
                "SELECT id, first_name, last_name, phone, reminders_enabled, registered_at
                 FROM clients WHERE id = ?1",
                params![id.0],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, bool>(4)?,
                        row.get::<_, i64>(5)?,
                    ))
                },
            )
            .optional()
            .map_err(InfraError::from)?;

        row.map(|(id, first_name, last_name, phone, reminders_enabled, registered_at)| {
            Ok(ClientProfile {
                id: ClientId(id),
                first_name,
                last_name,
                phone,
                reminders_enabled,
                registered_at: ts_to_datetime(registered_at)?,
            })
        })
        .transpose()
    }

    pub fn set_reminders_enabled(&self, id: ClientId, enabled: bool) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE clients SET reminders_enabled = ?1 WHERE id = ?2",
            params![enabled, id.0],
        )
        .map_err(InfraError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn setup() -> (SqliteClientRepository, TempDir) {
        let temp = TempDir::new().unwrap();
        let pool = DbPool::open_at(&temp.path().join("test.db"), 2).unwrap();
        (SqliteClientRepository::new(pool), temp)
    }

    fn profile() -> ClientProfile {
        ClientProfile {
            id: ClientId(42),
            first_name: "Anna".into(),
            last_name: "Petrova".into(),
            phone: "+7 900 000-00-00".into(),
            reminders_enabled: true,
            registered_at: Utc::now(),
        }
    }

    #[test]
    fn upsert_then_get_round_trips() {
        let (repo, _tmp) = setup();
        let p = profile();
        repo.upsert(&p).unwrap();

        let loaded = repo.get(p.id).unwrap().unwrap();
        assert_eq!(loaded.display_name(), "Anna Petrova");
        assert_eq!(loaded.registered_at.timestamp(), p.registered_at.timestamp());
    }

    #[test]
    fn reregistration_updates_contact_details() {
        let (repo, _tmp) = setup();
        let mut p = profile();
        repo.upsert(&p).unwrap();

        p.phone = "+7 911 111-11-11".into();
        repo.upsert(&p).unwrap();

        let loaded = repo.get(p.id).unwrap().unwrap();
        assert_eq!(loaded.phone, "+7 911 111-11-11");
    }

    #[test]
    fn unknown_client_is_none() {
        let (repo, _tmp) = setup();
        assert!(repo.get(ClientId(7)).unwrap().is_none());
    }

    #[test]
    fn reminder_opt_out_sticks() {
        let (repo, _tmp) = setup();
        let p = profile();
        repo.upsert(&p).unwrap();
        repo.set_reminders_enabled(p.id, false).unwrap();
        assert!(!repo.get(p.id).unwrap().unwrap().reminders_enabled);
    }
}
