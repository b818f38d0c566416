use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
pub enum LocationError {
    #[error("invalid coordinate: lat={0}, lng={1}")]
    InvalidCoordinate(f64, f64),

    #[error("position unavailable: {0}")]
    PositionUnavailable(String),

    #[error("geocoding failed: {0}")]
    Geocoding(String),

    #[error("permission request failed: {0}")]
    Permission(String),

    #[error("shell answered without a {0}")]
    Unexpected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
}

impl PermissionStatus {
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Validated device position. Deserialization goes through [`Position::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPosition")]
pub struct Position {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawPosition {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawPosition> for Position {
    type Error = LocationError;

    fn try_from(raw: RawPosition) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, LocationError> {
        if !latitude.is_finite()
            || !longitude.is_finite()
            || !(-90.0..=90.0).contains(&latitude)
            || !(-180.0..=180.0).contains(&longitude)
        {
            return Err(LocationError::InvalidCoordinate(latitude, longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// One reverse-geocoding candidate. Platforms leave components out freely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeocodedAddress {
    pub street: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
}

impl GeocodedAddress {
    /// `"{street}, {city}, {region}, {country}"`, skipping blank components.
    /// `None` when nothing usable is left.
    #[must_use]
    pub fn format(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.street, &self.city, &self.region, &self.country]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// Device geolocation and reverse geocoding, provided by the shell.
#[async_trait]
pub trait LocationService: Send + Sync {
    async fn request_foreground_permission(&self) -> Result<PermissionStatus, LocationError>;
    async fn current_position(&self) -> Result<Position, LocationError>;
    async fn reverse_geocode(
        &self,
        position: Position,
    ) -> Result<Vec<GeocodedAddress>, LocationError>;
}
