use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ProfileField;
use crate::units::UnitSystem;
use crate::validation::AddressRule;

/// Which kind of account a profile screen edits. Decides the editable field set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    #[default]
    Patient,
    Practitioner,
}

impl ProfileKind {
    #[must_use]
    pub const fn tracks_measurements(self) -> bool {
        matches!(self, Self::Patient)
    }

    /// Label shown next to the immutable identifier.
    #[must_use]
    pub const fn identifier_label(self) -> &'static str {
        match self {
            Self::Patient => "Patient ID",
            Self::Practitioner => "Medical License Number",
        }
    }

    /// Fields a save validates, in order. The first failure stops the save.
    #[must_use]
    pub fn validation_order(self) -> Vec<ProfileField> {
        let mut fields = vec![ProfileField::Email, ProfileField::PhoneNumber];
        if self.tracks_measurements() {
            fields.extend([ProfileField::Weight, ProfileField::Height]);
        }
        fields.push(ProfileField::Address);
        fields
    }

    /// Fields written by a save. Never includes the identifier.
    #[must_use]
    pub fn mutable_fields(self) -> Vec<ProfileField> {
        let mut fields = vec![
            ProfileField::Name,
            ProfileField::Email,
            ProfileField::PhoneNumber,
            ProfileField::Address,
        ];
        if self.tracks_measurements() {
            fields.extend([ProfileField::Weight, ProfileField::Height]);
        }
        fields
    }

    #[must_use]
    pub fn is_editable(self, field: ProfileField) -> bool {
        field.is_mutable() && (!field.is_measurement() || self.tracks_measurements())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub kind: ProfileKind,
    /// Unit system a freshly mounted session displays.
    pub initial_units: UnitSystem,
    pub address_rule: AddressRule,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            kind: ProfileKind::Patient,
            initial_units: UnitSystem::Metric,
            address_rule: AddressRule::LengthAndAlphanumeric,
        }
    }
}

impl ProfileConfig {
    #[must_use]
    pub fn patient() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn practitioner() -> Self {
        Self {
            kind: ProfileKind::Practitioner,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_units.is_imperial() && !self.kind.tracks_measurements() {
            return Err(ConfigError::Invalid(
                "initial_units only applies to profiles with measurements".into(),
            ));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
