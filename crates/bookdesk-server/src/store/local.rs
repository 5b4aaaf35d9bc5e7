//! Durable per-client key/value storage: what a browser tab keeps across reloads.

use super::StoreError;
use crate::db::{self, DbPool};

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Storage scoped to one client id, backed by the `client_storage` table.
#[derive(Clone)]
pub struct ClientStorage {
    pool: DbPool,
    client_id: String,
}

impl ClientStorage {
    pub fn new(pool: DbPool, client_id: impl Into<String>) -> Self {
        Self {
            pool,
            client_id: client_id.into(),
        }
    }
}

impl KeyValueStore for ClientStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.pool.get()?;
        let result = conn.query_row(
            "SELECT value FROM client_storage WHERE client_id = ?1 AND key = ?2",
            rusqlite::params![self.client_id, key],
            |row| row.get(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO client_storage (client_id, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (client_id, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![self.client_id, key, value, db::now()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        conn.execute(
            "DELETE FROM client_storage WHERE client_id = ?1 AND key = ?2",
            rusqlite::params![self.client_id, key],
        )?;
        Ok(())
    }
}
