use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::model::{ProfileDocument, ProfileField, SensorId, StoredProfile, UserId};

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("write rejected: {0}")]
    Rejected(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("lock acquisition failed")]
    LockFailed,
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// A set of field writes applied to one document. `None` clears the field.
///
/// The identifier can never be part of an update.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialUpdate {
    fields: BTreeMap<ProfileField, Option<String>>,
}

impl PartialUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: ProfileField, value: Option<String>) -> Result<(), StoreError> {
        if !field.is_mutable() {
            return Err(StoreError::Rejected(format!(
                "field `{field}` is immutable"
            )));
        }
        self.fields.insert(field, value);
        Ok(())
    }

    pub fn get(&self, field: ProfileField) -> Option<Option<&str>> {
        self.fields.get(&field).map(Option::as_deref)
    }

    pub fn contains(&self, field: ProfileField) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn fields(&self) -> impl Iterator<Item = ProfileField> + '_ {
        self.fields.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProfileField, Option<&str>)> + '_ {
        self.fields.iter().map(|(k, v)| (*k, v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn apply_to(&self, doc: &mut ProfileDocument) {
        for (field, value) in &self.fields {
            doc.set_field(*field, value.clone());
        }
    }
}

// Field names only; values are personal data.
impl fmt::Debug for PartialUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.fields.keys()).finish()
    }
}

/// Keyed-document store holding one profile per user.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, id: &UserId) -> Result<ProfileDocument, StoreError>;

    /// Writes only the listed fields. Fails with `NotFound` if the document is missing.
    async fn update_partial(&self, id: &UserId, update: &PartialUpdate) -> Result<(), StoreError>;

    /// Equality query on one field.
    async fn query_by_field(
        &self,
        field: ProfileField,
        value: &str,
    ) -> Result<Vec<StoredProfile>, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: SensorId,
    pub name: String,
}

/// The paired-sensor collection.
#[async_trait]
pub trait SensorStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Sensor>, StoreError>;
    async fn remove(&self, id: &SensorId) -> Result<(), StoreError>;
}

/// Process-local store. Used by shells without a backend and by tests.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    documents: RwLock<HashMap<UserId, ProfileDocument>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, id: UserId, document: ProfileDocument) {
        self.documents.write().await.insert(id, document);
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, id: &UserId) -> Result<ProfileDocument, StoreError> {
        self.documents
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn update_partial(&self, id: &UserId, update: &PartialUpdate) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;
        let doc = documents
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        update.apply_to(doc);
        Ok(())
    }

    async fn query_by_field(
        &self,
        field: ProfileField,
        value: &str,
    ) -> Result<Vec<StoredProfile>, StoreError> {
        let documents = self.documents.read().await;
        let mut matches: Vec<StoredProfile> = documents
            .iter()
            .filter(|(_, doc)| doc.field(field) == Some(value))
            .map(|(id, doc)| StoredProfile {
                id: id.clone(),
                document: doc.clone(),
            })
            .collect();
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matches)
    }
}

#[derive(Debug, Default)]
pub struct InMemorySensorStore {
    sensors: RwLock<Vec<Sensor>>,
}

impl InMemorySensorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, sensor: Sensor) {
        let mut sensors = self.sensors.write().await;
        sensors.retain(|s| s.id != sensor.id);
        sensors.push(sensor);
    }
}

#[async_trait]
impl SensorStore for InMemorySensorStore {
    async fn list(&self) -> Result<Vec<Sensor>, StoreError> {
        Ok(self.sensors.read().await.clone())
    }

    async fn remove(&self, id: &SensorId) -> Result<(), StoreError> {
        let mut sensors = self.sensors.write().await;
        let before = sensors.len();
        sensors.retain(|s| &s.id != id);
        if sensors.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
