use serde::{Deserialize, Serialize};

use crate::capabilities::{
    GeocodedAddress, LocationError, PartialUpdate, PermissionStatus, Position, Sensor, StoreError,
};
use crate::config::ProfileConfig;
use crate::model::{ProfileDocument, ProfileField, SensorId, SessionId, StoredProfile, UserId};

/// Everything the profile screen can ask the core to do, plus the capability answers
/// the core feeds back to itself. Answers are never sent by the shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Configure { config: ProfileConfig },
    Mount { user_id: UserId },
    Unmount,
    ToggleEdit,
    FieldChanged { field: ProfileField, value: String },
    ToggleUnits,
    DiscardEdits,
    Save,
    AddressFocused,
    SuggestionSelected { index: usize },
    DismissNotice,
    RefreshSensors,
    ForgetSensor { id: SensorId },
    BeginPairing,

    // --- capability answers ---
    #[serde(skip)]
    ProfileFetched {
        generation: u64,
        user_id: UserId,
        result: Result<ProfileDocument, StoreError>,
    },
    #[serde(skip)]
    EmailChecked {
        session: SessionId,
        result: Result<Vec<StoredProfile>, StoreError>,
    },
    #[serde(skip)]
    ProfileWritten {
        session: SessionId,
        update: PartialUpdate,
        result: Result<(), StoreError>,
    },
    #[serde(skip)]
    ProfileRefetched {
        session: SessionId,
        update: PartialUpdate,
        result: Result<ProfileDocument, StoreError>,
    },
    #[serde(skip)]
    PermissionAnswered {
        session: SessionId,
        result: Result<PermissionStatus, LocationError>,
    },
    #[serde(skip)]
    PositionFetched {
        session: SessionId,
        result: Result<Position, LocationError>,
    },
    #[serde(skip)]
    AddressesFound {
        session: SessionId,
        result: Result<Vec<GeocodedAddress>, LocationError>,
    },
    #[serde(skip)]
    SensorsLoaded {
        result: Result<Vec<Sensor>, StoreError>,
    },
    #[serde(skip)]
    SensorRemoved {
        id: SensorId,
        result: Result<(), StoreError>,
    },
    #[serde(skip)]
    PairingPermission {
        result: Result<PermissionStatus, LocationError>,
    },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Configure { .. } => "configure",
            Self::Mount { .. } => "mount",
            Self::Unmount => "unmount",
            Self::ToggleEdit => "toggle_edit",
            Self::FieldChanged { .. } => "field_changed",
            Self::ToggleUnits => "toggle_units",
            Self::DiscardEdits => "discard_edits",
            Self::Save => "save",
            Self::AddressFocused => "address_focused",
            Self::SuggestionSelected { .. } => "suggestion_selected",
            Self::DismissNotice => "dismiss_notice",
            Self::RefreshSensors => "refresh_sensors",
            Self::ForgetSensor { .. } => "forget_sensor",
            Self::BeginPairing => "begin_pairing",
            Self::ProfileFetched { .. } => "profile_fetched",
            Self::EmailChecked { .. } => "email_checked",
            Self::ProfileWritten { .. } => "profile_written",
            Self::ProfileRefetched { .. } => "profile_refetched",
            Self::PermissionAnswered { .. } => "permission_answered",
            Self::PositionFetched { .. } => "position_fetched",
            Self::AddressesFound { .. } => "addresses_found",
            Self::SensorsLoaded { .. } => "sensors_loaded",
            Self::SensorRemoved { .. } => "sensor_removed",
            Self::PairingPermission { .. } => "pairing_permission",
        }
    }

    /// Sent by the user through the shell, as opposed to a capability answer.
    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        !matches!(
            self,
            Self::ProfileFetched { .. }
                | Self::EmailChecked { .. }
                | Self::ProfileWritten { .. }
                | Self::ProfileRefetched { .. }
                | Self::PermissionAnswered { .. }
                | Self::PositionFetched { .. }
                | Self::AddressesFound { .. }
                | Self::SensorsLoaded { .. }
                | Self::SensorRemoved { .. }
                | Self::PairingPermission { .. }
        )
    }
}
