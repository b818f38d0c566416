use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

use super::location::{GeocodedAddress, LocationError, LocationService, PermissionStatus, Position};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LocationOperation {
    RequestPermission,
    CurrentPosition,
    ReverseGeocode { position: Position },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LocationResponse {
    Permission(PermissionStatus),
    Position(Position),
    Addresses(Vec<GeocodedAddress>),
    Failed(LocationError),
}

impl Operation for LocationOperation {
    type Output = LocationResponse;
}

impl LocationOperation {
    pub async fn run(self, service: &dyn LocationService) -> LocationResponse {
        let result = match self {
            Self::RequestPermission => service
                .request_foreground_permission()
                .await
                .map(LocationResponse::Permission),
            Self::CurrentPosition => service.current_position().await.map(LocationResponse::Position),
            Self::ReverseGeocode { position } => service
                .reverse_geocode(position)
                .await
                .map(LocationResponse::Addresses),
        };
        result.unwrap_or_else(LocationResponse::Failed)
    }
}

impl LocationResponse {
    fn unexpected(self, wanted: &str) -> LocationError {
        match self {
            Self::Failed(e) => e,
            _ => LocationError::Unexpected(wanted.to_string()),
        }
    }

    fn permission(self) -> Result<PermissionStatus, LocationError> {
        match self {
            Self::Permission(status) => Ok(status),
            other => Err(other.unexpected("permission")),
        }
    }

    fn position(self) -> Result<Position, LocationError> {
        match self {
            Self::Position(position) => Ok(position),
            other => Err(other.unexpected("position")),
        }
    }

    fn addresses(self) -> Result<Vec<GeocodedAddress>, LocationError> {
        match self {
            Self::Addresses(found) => Ok(found),
            other => Err(other.unexpected("addresses")),
        }
    }
}

/// Foreground location permission, the current fix and reverse geocoding.
pub struct Geolocation<Ev> {
    context: CapabilityContext<LocationOperation, Ev>,
}

impl<Ev> Capability<Ev> for Geolocation<Ev> {
    type Operation = LocationOperation;
    type MappedSelf<MappedEv> = Geolocation<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Geolocation::new(self.context.map_event(f))
    }
}

impl<Ev> Geolocation<Ev>
where
    Ev: Send + 'static,
{
    pub fn new(context: CapabilityContext<LocationOperation, Ev>) -> Self {
        Self { context }
    }

    fn request<T, F>(
        &self,
        operation: LocationOperation,
        extract: fn(LocationResponse) -> Result<T, LocationError>,
        callback: F,
    ) where
        T: Send + 'static,
        F: FnOnce(Result<T, LocationError>) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let response = ctx.request_from_shell(operation).await;
            ctx.update_app(callback(extract(response)));
        });
    }

    pub fn request_permission<F>(&self, callback: F)
    where
        F: FnOnce(Result<PermissionStatus, LocationError>) -> Ev + Send + 'static,
    {
        self.request(
            LocationOperation::RequestPermission,
            LocationResponse::permission,
            callback,
        );
    }

    pub fn current_position<F>(&self, callback: F)
    where
        F: FnOnce(Result<Position, LocationError>) -> Ev + Send + 'static,
    {
        self.request(
            LocationOperation::CurrentPosition,
            LocationResponse::position,
            callback,
        );
    }

    pub fn reverse_geocode<F>(&self, position: Position, callback: F)
    where
        F: FnOnce(Result<Vec<GeocodedAddress>, LocationError>) -> Ev + Send + 'static,
    {
        self.request(
            LocationOperation::ReverseGeocode { position },
            LocationResponse::addresses,
            callback,
        );
    }
}
