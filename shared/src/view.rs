use serde::{Deserialize, Serialize};

use crate::capabilities::Sensor;
use crate::model::ProfileField;
use crate::sensors::{PairingStep, SensorRegistry};
use crate::session::{EditSession, Notice};
use crate::units::UnitSystem;
use crate::ProfileError;

/// Everything the shell renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewModel {
    /// `None` while no profile is mounted.
    pub profile: Option<ProfileView>,
    pub sensors: SensorsView,
    /// Outcome of the last failed operation.
    pub error: Option<ErrorView>,
}

impl ViewModel {
    #[must_use]
    pub fn new(
        session: Option<&EditSession>,
        sensors: &SensorRegistry,
        error: Option<&ProfileError>,
    ) -> Self {
        Self {
            profile: session.map(ProfileView::from_session),
            sensors: SensorsView::from_registry(sensors),
            error: error.map(ErrorView::from_error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorView {
    pub code: String,
    pub message: String,
    pub field: Option<ProfileField>,
}

impl ErrorView {
    #[must_use]
    pub fn from_error(error: &ProfileError) -> Self {
        Self {
            code: error.code().to_string(),
            message: error.user_facing_message(),
            field: error.field(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorsView {
    pub sensors: Vec<Sensor>,
    pub empty_prompt: Option<String>,
    pub pairing: Option<PairingStep>,
}

impl SensorsView {
    #[must_use]
    pub fn from_registry(registry: &SensorRegistry) -> Self {
        Self {
            sensors: registry.sensors().to_vec(),
            empty_prompt: registry.empty_prompt().map(str::to_string),
            pairing: registry.pairing(),
        }
    }
}

/// One input row on the profile screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldView {
    pub field: ProfileField,
    pub label: String,
    pub value: String,
    pub editable: bool,
    pub error: Option<String>,
    /// Unit suffix for measurements.
    pub unit: Option<String>,
}

/// Render-ready snapshot of an edit session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileView {
    pub state: String,
    pub is_editing: bool,
    pub is_busy: bool,
    pub display_name: String,
    pub identifier_label: String,
    pub identifier_value: String,
    pub fields: Vec<FieldView>,
    pub units: Option<UnitSystem>,
    pub suggestions: Vec<String>,
    pub notice: Option<Notice>,
    pub has_unsaved_changes: bool,
}

impl ProfileView {
    #[must_use]
    pub fn from_session(session: &EditSession) -> Self {
        let state = session.state();
        let editing = state.is_editing();
        let kind = session.kind();
        let units = session.units();
        let errors = state.errors();

        let fields = kind
            .mutable_fields()
            .into_iter()
            .map(|field| FieldView {
                field,
                label: field_label(field).to_string(),
                value: session.working().value(field).to_string(),
                editable: editing && kind.is_editable(field),
                error: errors.and_then(|e| e.get(field)).map(str::to_string),
                unit: unit_label(field, units).map(str::to_string),
            })
            .collect();

        Self {
            state: state.name().to_string(),
            is_editing: editing,
            is_busy: !state.is_settled() || session.resolver().is_busy(),
            display_name: session.working().display_name().to_string(),
            identifier_label: kind.identifier_label().to_string(),
            identifier_value: session.working().external_id.clone(),
            fields,
            units: kind.tracks_measurements().then_some(units),
            suggestions: session.suggestions().to_vec(),
            notice: session.notice().cloned(),
            has_unsaved_changes: session.has_unsaved_changes(),
        }
    }

    pub fn field(&self, field: ProfileField) -> Option<&FieldView> {
        self.fields.iter().find(|f| f.field == field)
    }
}

#[must_use]
pub const fn field_label(field: ProfileField) -> &'static str {
    match field {
        ProfileField::ExternalId => "ID",
        ProfileField::Name => "Name",
        ProfileField::Email => "Email",
        ProfileField::PhoneNumber => "Phone Number",
        ProfileField::Address => "Address",
        ProfileField::Weight => "Weight",
        ProfileField::Height => "Height",
    }
}

fn unit_label(field: ProfileField, units: UnitSystem) -> Option<&'static str> {
    match field {
        ProfileField::Weight => Some(units.weight_label()),
        ProfileField::Height => Some(units.height_label()),
        _ => None,
    }
}
