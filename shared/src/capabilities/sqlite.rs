//! SQLite-backed document store for profiles and paired sensors.
//!
//! Profiles are kept as JSON documents keyed by user id so fields this crate does not
//! know about survive partial updates untouched. Field queries go through
//! `json_extract`.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, instrument};

use super::store::{PartialUpdate, ProfileStore, Sensor, SensorStore, StoreError};
use crate::model::{ProfileDocument, ProfileField, SensorId, StoredProfile, UserId};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS profiles (
        id TEXT PRIMARY KEY,
        document TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS sensors (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL
    );
"#;

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Storage(e.to_string())
    }
}

pub struct SqliteProfileStore {
    conn: Mutex<Connection>,
}

impl SqliteProfileStore {
    #[instrument(skip(path))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self::bootstrap(conn)?;
        info!("Opened profile store");
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::LockFailed)?;
        f(&mut conn)
    }

    /// Seeds or replaces a whole document. Account creation lives outside this crate;
    /// this is how shells and tests put a profile in place.
    pub fn insert(&self, id: &UserId, document: &ProfileDocument) -> Result<(), StoreError> {
        let json = serde_json::to_string(document)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO profiles (id, document) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET document = excluded.document",
                params![id.as_str(), json],
            )?;
            Ok(())
        })
    }

    pub fn insert_sensor(&self, sensor: &Sensor) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sensors (id, name) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name",
                params![sensor.id.as_str(), sensor.name],
            )?;
            Ok(())
        })
    }
}

fn json_path(field: ProfileField) -> String {
    format!("$.{}", field.document_key())
}

#[async_trait]
impl ProfileStore for SqliteProfileStore {
    async fn get(&self, id: &UserId) -> Result<ProfileDocument, StoreError> {
        let raw: Option<String> = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT document FROM profiles WHERE id = ?1",
                    params![id.as_str()],
                    |row| row.get(0),
                )
                .optional()?)
        })?;

        match raw {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn update_partial(&self, id: &UserId, update: &PartialUpdate) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;

            let raw: Option<String> = tx
                .query_row(
                    "SELECT document FROM profiles WHERE id = ?1",
                    params![id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            let raw = raw.ok_or_else(|| StoreError::NotFound(id.to_string()))?;

            let mut document: Map<String, Value> = serde_json::from_str(&raw)?;
            for (field, value) in update.iter() {
                let value = value.map_or(Value::Null, |v| Value::String(v.to_string()));
                document.insert(field.document_key().to_string(), value);
            }

            tx.execute(
                "UPDATE profiles SET document = ?2 WHERE id = ?1",
                params![id.as_str(), serde_json::to_string(&document)?],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    async fn query_by_field(
        &self,
        field: ProfileField,
        value: &str,
    ) -> Result<Vec<StoredProfile>, StoreError> {
        let rows: Vec<(String, String)> = self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, document FROM profiles
                 WHERE json_extract(document, ?1) = ?2
                 ORDER BY id",
            )?;
            let rows = stmt
                .query_map(params![json_path(field), value], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        rows.into_iter()
            .map(|(id, json)| {
                Ok(StoredProfile {
                    id: UserId::new(id),
                    document: serde_json::from_str(&json)?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl SensorStore for SqliteProfileStore {
    async fn list(&self) -> Result<Vec<Sensor>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM sensors ORDER BY id")?;
            let sensors = stmt
                .query_map([], |row| {
                    Ok(Sensor {
                        id: SensorId::new(row.get::<_, String>(0)?),
                        name: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(sensors)
        })
    }

    async fn remove(&self, id: &SensorId) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM sensors WHERE id = ?1", params![id.as_str()])?;
            if removed == 0 {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Ok(())
        })
    }
}
