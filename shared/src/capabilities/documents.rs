//! Document store capability. The core asks the shell for profile documents and the
//! sensor collection; the shell answers with a [`StoreResponse`].

use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

use super::store::{PartialUpdate, ProfileStore, Sensor, SensorStore, StoreError};
use crate::model::{ProfileDocument, ProfileField, SensorId, StoredProfile, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreOperation {
    Get { id: UserId },
    UpdatePartial { id: UserId, update: PartialUpdate },
    QueryByField { field: ProfileField, value: String },
    ListSensors,
    RemoveSensor { id: SensorId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreResponse {
    Document(ProfileDocument),
    Matches(Vec<StoredProfile>),
    Sensors(Vec<Sensor>),
    Done,
    Failed(StoreError),
}

impl Operation for StoreOperation {
    type Output = StoreResponse;
}

impl StoreOperation {
    /// Answers the operation from in-process adapters. Shells written in Rust (and the
    /// tests) resolve store requests this way.
    pub async fn run(self, profiles: &dyn ProfileStore, sensors: &dyn SensorStore) -> StoreResponse {
        let result = match self {
            Self::Get { id } => profiles.get(&id).await.map(StoreResponse::Document),
            Self::UpdatePartial { id, update } => profiles
                .update_partial(&id, &update)
                .await
                .map(|()| StoreResponse::Done),
            Self::QueryByField { field, value } => profiles
                .query_by_field(field, &value)
                .await
                .map(StoreResponse::Matches),
            Self::ListSensors => sensors.list().await.map(StoreResponse::Sensors),
            Self::RemoveSensor { id } => sensors.remove(&id).await.map(|()| StoreResponse::Done),
        };
        result.unwrap_or_else(StoreResponse::Failed)
    }
}

impl StoreResponse {
    fn unexpected(self) -> StoreError {
        match self {
            Self::Failed(e) => e,
            other => StoreError::Storage(format!("unexpected response: {other:?}")),
        }
    }

    fn document(self) -> Result<ProfileDocument, StoreError> {
        match self {
            Self::Document(doc) => Ok(doc),
            other => Err(other.unexpected()),
        }
    }

    fn matches(self) -> Result<Vec<StoredProfile>, StoreError> {
        match self {
            Self::Matches(found) => Ok(found),
            other => Err(other.unexpected()),
        }
    }

    fn sensors(self) -> Result<Vec<Sensor>, StoreError> {
        match self {
            Self::Sensors(sensors) => Ok(sensors),
            other => Err(other.unexpected()),
        }
    }

    fn done(self) -> Result<(), StoreError> {
        match self {
            Self::Done => Ok(()),
            other => Err(other.unexpected()),
        }
    }
}

pub struct Documents<Ev> {
    context: CapabilityContext<StoreOperation, Ev>,
}

impl<Ev> Capability<Ev> for Documents<Ev> {
    type Operation = StoreOperation;
    type MappedSelf<MappedEv> = Documents<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Documents::new(self.context.map_event(f))
    }
}

impl<Ev> Documents<Ev>
where
    Ev: Send + 'static,
{
    pub fn new(context: CapabilityContext<StoreOperation, Ev>) -> Self {
        Self { context }
    }

    fn request<T, F>(
        &self,
        operation: StoreOperation,
        extract: fn(StoreResponse) -> Result<T, StoreError>,
        callback: F,
    ) where
        T: Send + 'static,
        F: FnOnce(Result<T, StoreError>) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let response = ctx.request_from_shell(operation).await;
            ctx.update_app(callback(extract(response)));
        });
    }

    pub fn get<F>(&self, id: UserId, callback: F)
    where
        F: FnOnce(Result<ProfileDocument, StoreError>) -> Ev + Send + 'static,
    {
        self.request(StoreOperation::Get { id }, StoreResponse::document, callback);
    }

    pub fn update_partial<F>(&self, id: UserId, update: PartialUpdate, callback: F)
    where
        F: FnOnce(Result<(), StoreError>) -> Ev + Send + 'static,
    {
        self.request(
            StoreOperation::UpdatePartial { id, update },
            StoreResponse::done,
            callback,
        );
    }

    pub fn query_by_field<F>(&self, field: ProfileField, value: String, callback: F)
    where
        F: FnOnce(Result<Vec<StoredProfile>, StoreError>) -> Ev + Send + 'static,
    {
        self.request(
            StoreOperation::QueryByField { field, value },
            StoreResponse::matches,
            callback,
        );
    }

    pub fn list_sensors<F>(&self, callback: F)
    where
        F: FnOnce(Result<Vec<Sensor>, StoreError>) -> Ev + Send + 'static,
    {
        self.request(StoreOperation::ListSensors, StoreResponse::sensors, callback);
    }

    pub fn remove_sensor<F>(&self, id: SensorId, callback: F)
    where
        F: FnOnce(Result<(), StoreError>) -> Ev + Send + 'static,
    {
        self.request(StoreOperation::RemoveSensor { id }, StoreResponse::done, callback);
    }
}
