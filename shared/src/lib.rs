#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod address;
pub mod app;
pub mod capabilities;
pub mod config;
pub mod event;
pub mod model;
pub mod sensors;
pub mod session;
pub mod uniqueness;
pub mod units;
pub mod validation;
pub mod view;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::capabilities::StoreError;
use crate::model::ProfileField;

pub use address::ResolverPhase;
pub use app::{App, Model};
pub use capabilities::{Capabilities, Effect};
pub use config::{ConfigError, ProfileConfig, ProfileKind};
pub use event::Event;
pub use model::{ProfileDocument, ProfileRecord, SensorId, SessionId, UserId};
pub use sensors::{PairingStep, SensorRegistry};
pub use session::{EditSession, EditState, FieldErrors, Notice, NoticeKind};
pub use units::UnitSystem;
pub use view::{ErrorView, FieldView, ProfileView, SensorsView, ViewModel};

/// Byte-level entry points for the platform shells. Events, effect requests,
/// responses and the view model cross as serialized bytes.
pub mod ffi {
    use crux_core::bridge::Bridge;
    use crux_core::Core;
    use once_cell::sync::Lazy;

    use crate::{App, Effect};

    static CORE: Lazy<Bridge<Effect, App>> = Lazy::new(|| Bridge::new(Core::new::<crate::Capabilities>()));

    pub fn process_event(data: &[u8]) -> Vec<u8> {
        CORE.process_event(data)
    }

    pub fn handle_response(uuid: &[u8], data: &[u8]) -> Vec<u8> {
        CORE.handle_response(uuid, data)
    }

    pub fn view() -> Vec<u8> {
        CORE.view()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    Conflict,
    LocationPermissionDenied,
    Remote,
    NotFound,
    InvalidState,
    Discarded,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::Conflict => "CONFLICT",
            Self::LocationPermissionDenied => "LOCATION_PERMISSION_DENIED",
            Self::Remote => "REMOTE_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::InvalidState => "INVALID_STATE",
            Self::Discarded => "SESSION_DISCARDED",
        }
    }

    /// Shown under an input rather than as an alert.
    #[must_use]
    pub const fn is_field_scoped(self) -> bool {
        matches!(self, Self::Validation | Self::Conflict)
    }
}

/// Collaborator call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteOperation {
    Fetch,
    Update,
    Query,
    ListSensors,
    ForgetSensor,
    RequestPermission,
    Locate,
    Geocode,
}

impl RemoteOperation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Update => "update",
            Self::Query => "query",
            Self::ListSensors => "list_sensors",
            Self::ForgetSensor => "forget_sensor",
            Self::RequestPermission => "request_permission",
            Self::Locate => "locate",
            Self::Geocode => "geocode",
        }
    }

    #[must_use]
    pub const fn is_location(self) -> bool {
        matches!(self, Self::RequestPermission | Self::Locate | Self::Geocode)
    }

    #[must_use]
    pub const fn failure_message(self) -> &'static str {
        match self {
            Self::Fetch => "Failed to fetch user data",
            Self::Update => "Failed to save user data",
            Self::Query => "Failed to check whether the email is available",
            Self::ListSensors => "Failed to load sensors",
            Self::ForgetSensor => "Failed to forget the sensor",
            Self::RequestPermission => "Unable to request location permission.",
            Self::Locate => "Unable to determine your location.",
            Self::Geocode => "Unable to look up an address for your location.",
        }
    }
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProfileError {
    #[error("invalid {field}: {reason}")]
    Validation { field: ProfileField, reason: String },

    #[error("{field} is already in use")]
    UniquenessConflict { field: ProfileField },

    #[error("location permission denied")]
    PermissionDenied,

    #[error("{operation} failed: {message}")]
    RemoteFailure {
        operation: RemoteOperation,
        message: String,
    },

    #[error("profile not found: {0}")]
    NotFound(String),

    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },

    #[error("edit session was discarded")]
    SessionDiscarded,
}

impl ProfileError {
    pub fn remote(operation: RemoteOperation, error: impl fmt::Display) -> Self {
        Self::RemoteFailure {
            operation,
            message: error.to_string(),
        }
    }

    /// Like [`Self::remote`], but a missing document keeps its own variant.
    pub fn from_store(operation: RemoteOperation, error: StoreError) -> Self {
        match error {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::remote(operation, other),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::UniquenessConflict { .. } => ErrorKind::Conflict,
            Self::PermissionDenied => ErrorKind::LocationPermissionDenied,
            Self::RemoteFailure { .. } => ErrorKind::Remote,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::SessionDiscarded => ErrorKind::Discarded,
        }
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// Field an inline error belongs to.
    #[must_use]
    pub const fn field(&self) -> Option<ProfileField> {
        match self {
            Self::Validation { field, .. } | Self::UniquenessConflict { field } => Some(*field),
            _ => None,
        }
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self {
            Self::Validation { reason, .. } => reason.clone(),
            Self::UniquenessConflict { .. } => session::EMAIL_IN_USE_MESSAGE.into(),
            Self::PermissionDenied => {
                "Location permission is required to get the address.".into()
            }
            Self::RemoteFailure { operation, .. } => operation.failure_message().into(),
            Self::NotFound(_) => "Failed to fetch user data".into(),
            Self::InvalidState { .. } => "This action is not available right now.".into(),
            Self::SessionDiscarded => "The profile screen was closed.".into(),
        }
    }
}

pub type ProfileResult<T> = Result<T, ProfileError>;
