use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(UserId);
typed_id!(SensorId);

/// Identity of one mounted edit session. A fresh id is minted on every mount so
/// results of operations started by a previous session can be told apart.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Fields of the persisted profile document.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    ExternalId,
    Name,
    Email,
    PhoneNumber,
    Address,
    Weight,
    Height,
}

impl ProfileField {
    /// Key under which the field is stored in the document.
    #[must_use]
    pub const fn document_key(self) -> &'static str {
        match self {
            Self::ExternalId => "patientID",
            Self::Name => "name",
            Self::Email => "email",
            Self::PhoneNumber => "phoneNumber",
            Self::Address => "address",
            Self::Weight => "weight",
            Self::Height => "height",
        }
    }

    #[must_use]
    pub const fn is_mutable(self) -> bool {
        !matches!(self, Self::ExternalId)
    }

    #[must_use]
    pub const fn is_measurement(self) -> bool {
        matches!(self, Self::Weight | Self::Height)
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.document_key())
    }
}

/// Document shape as held by the remote store. Everything except the identifier is
/// optional; older accounts routinely lack most fields.
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDocument {
    #[serde(rename = "patientID", default)]
    pub patient_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
}

impl ProfileDocument {
    #[must_use]
    pub fn field(&self, field: ProfileField) -> Option<&str> {
        match field {
            ProfileField::ExternalId => Some(self.patient_id.as_str()),
            ProfileField::Name => self.name.as_deref(),
            ProfileField::Email => self.email.as_deref(),
            ProfileField::PhoneNumber => self.phone_number.as_deref(),
            ProfileField::Address => self.address.as_deref(),
            ProfileField::Weight => self.weight.as_deref(),
            ProfileField::Height => self.height.as_deref(),
        }
    }

    /// Overwrites one mutable field. `None` clears it. The identifier is never touched.
    pub fn set_field(&mut self, field: ProfileField, value: Option<String>) {
        match field {
            ProfileField::ExternalId => {}
            ProfileField::Name => self.name = value,
            ProfileField::Email => self.email = value,
            ProfileField::PhoneNumber => self.phone_number = value,
            ProfileField::Address => self.address = value,
            ProfileField::Weight => self.weight = value,
            ProfileField::Height => self.height = value,
        }
    }
}

// Contact details and metrics are health data; keep them out of logs.
impl fmt::Debug for ProfileDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileDocument")
            .field("patient_id", &self.patient_id)
            .field("name_present", &self.name.is_some())
            .field("email_present", &self.email.is_some())
            .field("phone_number_present", &self.phone_number.is_some())
            .field("address_present", &self.address.is_some())
            .field("weight_present", &self.weight.is_some())
            .field("height_present", &self.height.is_some())
            .finish()
    }
}

/// A document together with the key it is stored under.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StoredProfile {
    pub id: UserId,
    pub document: ProfileDocument,
}

/// The profile as the edit workflow sees it: text fields are always present (empty
/// when the document lacks them), metrics stay optional.
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ProfileRecord {
    pub external_id: String,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub address: String,
    /// Kilograms when persisted.
    pub weight: Option<String>,
    /// Centimetres when persisted.
    pub height: Option<String>,
}

impl ProfileRecord {
    #[must_use]
    pub fn from_document(doc: &ProfileDocument) -> Self {
        Self {
            external_id: doc.patient_id.clone(),
            name: doc.name.clone().unwrap_or_default(),
            email: doc.email.clone().unwrap_or_default(),
            phone_number: doc.phone_number.clone().unwrap_or_default(),
            address: doc.address.clone().unwrap_or_default(),
            weight: doc.weight.clone(),
            height: doc.height.clone(),
        }
    }

    /// Inverse of [`Self::from_document`]; blank fields become absent.
    #[must_use]
    pub fn to_document(&self) -> ProfileDocument {
        fn present(s: &str) -> Option<String> {
            (!s.trim().is_empty()).then(|| s.to_string())
        }
        ProfileDocument {
            patient_id: self.external_id.clone(),
            name: present(&self.name),
            email: present(&self.email),
            phone_number: present(&self.phone_number),
            address: present(&self.address),
            weight: self.weight.as_deref().and_then(present),
            height: self.height.as_deref().and_then(present),
        }
    }

    /// Current text of a field as an input box would show it.
    #[must_use]
    pub fn value(&self, field: ProfileField) -> &str {
        match field {
            ProfileField::ExternalId => &self.external_id,
            ProfileField::Name => &self.name,
            ProfileField::Email => &self.email,
            ProfileField::PhoneNumber => &self.phone_number,
            ProfileField::Address => &self.address,
            ProfileField::Weight => self.weight.as_deref().unwrap_or(""),
            ProfileField::Height => self.height.as_deref().unwrap_or(""),
        }
    }

    /// Writes user input into a mutable field. Returns `false` for the identifier,
    /// which is left unchanged.
    pub fn set_value(&mut self, field: ProfileField, value: impl Into<String>) -> bool {
        let value = value.into();
        match field {
            ProfileField::ExternalId => return false,
            ProfileField::Name => self.name = value,
            ProfileField::Email => self.email = value,
            ProfileField::PhoneNumber => self.phone_number = value,
            ProfileField::Address => self.address = value,
            ProfileField::Weight => self.weight = Some(value),
            ProfileField::Height => self.height = Some(value),
        }
        true
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            "User Name"
        } else {
            &self.name
        }
    }
}

impl fmt::Debug for ProfileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileRecord")
            .field("external_id", &self.external_id)
            .field("name_present", &!self.name.is_empty())
            .field("email_present", &!self.email.is_empty())
            .field("phone_number_present", &!self.phone_number.is_empty())
            .field("address_present", &!self.address.is_empty())
            .field("weight_present", &self.weight.is_some())
            .field("height_present", &self.height.is_some())
            .finish()
    }
}
