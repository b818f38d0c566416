//! Edit session state machine.
//!
//! One `EditSession` exists per mounted profile screen. It owns the working copy, the
//! last server copy and the edit state:
//!
//! ```text
//! Viewing <-> Editing -> Validating -> Persisting -> Viewing
//!                ^            |             |
//!                +------------+-------------+   (any failure)
//! ```
//!
//! Everything here is synchronous. The app requests the remote calls through its
//! capabilities and feeds their answers back through the transition methods.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::address::ResolverPhase;
use crate::capabilities::{PartialUpdate, Position};
use crate::config::{ProfileKind, ProfileConfig};
use crate::model::{ProfileField, ProfileRecord, SessionId, UserId};
use crate::units::{self, Measure, UnitSystem};
use crate::validation::{validate_field, AddressRule};
use crate::ProfileError;

pub const EMAIL_IN_USE_MESSAGE: &str = "This email is already in use.";

/// Inline error per field. Only meaningful while editing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors(BTreeMap<ProfileField, String>);

impl FieldErrors {
    pub fn get(&self, field: ProfileField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn set(&mut self, field: ProfileField, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn clear(&mut self, field: ProfileField) {
        self.0.remove(&field);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProfileField, &str)> + '_ {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EditState {
    Viewing,
    Editing { errors: FieldErrors },
    Validating,
    Persisting,
}

impl EditState {
    fn editing() -> Self {
        Self::Editing {
            errors: FieldErrors::default(),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Viewing => "viewing",
            Self::Editing { .. } => "editing",
            Self::Validating => "validating",
            Self::Persisting => "persisting",
        }
    }

    #[must_use]
    pub const fn is_editing(&self) -> bool {
        matches!(self, Self::Editing { .. })
    }

    /// No save is in flight.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Viewing | Self::Editing { .. })
    }

    #[must_use]
    pub fn errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Editing { errors } => Some(errors),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Success,
    Warning,
    Error,
}

/// One-shot alert for the shell to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(kind: NoticeKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn for_error(error: &ProfileError) -> Self {
        let (kind, title) = match error {
            ProfileError::PermissionDenied => (NoticeKind::Warning, "Permission denied"),
            ProfileError::RemoteFailure { operation, .. } if operation.is_location() => {
                (NoticeKind::Warning, "Location unavailable")
            }
            _ => (NoticeKind::Error, "Error"),
        };
        Self::new(kind, title, error.user_facing_message())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditSession {
    id: SessionId,
    user_id: UserId,
    kind: ProfileKind,
    address_rule: AddressRule,
    server: ProfileRecord,
    working: ProfileRecord,
    state: EditState,
    units: UnitSystem,
    resolver: ResolverPhase,
    suggestions: Vec<String>,
    notice: Option<Notice>,
}

impl EditSession {
    /// Seeds a session from a freshly fetched record.
    pub fn new(user_id: UserId, record: ProfileRecord, config: &ProfileConfig) -> Self {
        let mut session = Self {
            id: SessionId::generate(),
            user_id,
            kind: config.kind,
            address_rule: config.address_rule,
            working: record.clone(),
            server: record,
            state: EditState::Viewing,
            units: UnitSystem::Metric,
            resolver: ResolverPhase::Idle,
            suggestions: Vec::new(),
            notice: None,
        };
        if config.initial_units.is_imperial() && session.kind.tracks_measurements() {
            session.convert_measurements();
        }
        session
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn kind(&self) -> ProfileKind {
        self.kind
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn working(&self) -> &ProfileRecord {
        &self.working
    }

    /// Last copy confirmed by the store, always metric.
    pub fn server(&self) -> &ProfileRecord {
        &self.server
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }

    pub fn resolver(&self) -> &ResolverPhase {
        &self.resolver
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Measurements compare by value, so `"70"` and `"70.00"` are the same weight.
    pub fn has_unsaved_changes(&self) -> bool {
        let shown = self.server_in_display_units();
        self.kind.mutable_fields().into_iter().any(|field| {
            let (now, then) = (self.working.value(field), shown.value(field));
            if field.is_measurement() {
                !same_measure(now, then)
            } else {
                now != then
            }
        })
    }

    fn invalid(&self, action: &'static str) -> ProfileError {
        ProfileError::InvalidState {
            action,
            state: self.state.name(),
        }
    }

    fn clear_error(&mut self, field: ProfileField) {
        if let EditState::Editing { errors } = &mut self.state {
            errors.clear(field);
        }
    }

    fn reset_lookup(&mut self) {
        self.resolver = ResolverPhase::Idle;
        self.suggestions.clear();
    }

    // --- edit mode ---

    /// Flips between viewing and editing. Leaving edit mode keeps uncommitted edits
    /// and drops inline errors. Returns whether the session is now editing.
    pub fn toggle_edit(&mut self) -> Result<bool, ProfileError> {
        match self.state {
            EditState::Viewing => {
                self.state = EditState::editing();
                Ok(true)
            }
            EditState::Editing { .. } => {
                self.state = EditState::Viewing;
                self.reset_lookup();
                Ok(false)
            }
            EditState::Validating | EditState::Persisting => Err(self.invalid("toggle edit mode")),
        }
    }

    pub fn set_field(
        &mut self,
        field: ProfileField,
        value: impl Into<String>,
    ) -> Result<(), ProfileError> {
        if !self.state.is_editing() {
            return Err(self.invalid("edit a field"));
        }
        if !self.kind.is_editable(field) {
            return Err(ProfileError::Validation {
                field,
                reason: "This field cannot be edited.".into(),
            });
        }
        self.clear_error(field);
        self.working.set_value(field, value);
        if field == ProfileField::Address {
            self.reset_lookup();
        }
        Ok(())
    }

    /// Reverts the working copy to the last server copy, keeping the display unit.
    pub fn discard_edits(&mut self) -> Result<(), ProfileError> {
        if !self.state.is_settled() {
            return Err(self.invalid("discard edits"));
        }
        self.working = self.server_in_display_units();
        if let EditState::Editing { errors } = &mut self.state {
            *errors = FieldErrors::default();
        }
        self.reset_lookup();
        Ok(())
    }

    // --- units ---

    /// Switches the displayed weight/height between metric and imperial.
    pub fn toggle_units(&mut self) -> Result<UnitSystem, ProfileError> {
        if !self.kind.tracks_measurements() {
            return Err(ProfileError::InvalidState {
                action: "convert units",
                state: "without measurements",
            });
        }
        if !self.state.is_settled() {
            return Err(self.invalid("convert units"));
        }
        self.convert_measurements();
        Ok(self.units)
    }

    /// Untouched measurements are re-derived from the server copy instead of the
    /// rounded display text, so toggling back and forth is lossless.
    fn convert_measurements(&mut self) {
        let current = self.units;
        let before = self.server_in_display_units();
        self.units = current.toggle();
        let after = self.server_in_display_units();

        self.working.weight = convert_measure(
            self.working.weight.take(),
            before.weight.as_deref(),
            after.weight,
            Measure::Weight,
            current,
        );
        self.working.height = convert_measure(
            self.working.height.take(),
            before.height.as_deref(),
            after.height,
            Measure::Height,
            current,
        );
    }

    fn server_in_display_units(&self) -> ProfileRecord {
        let mut record = self.server.clone();
        if self.units.is_imperial() {
            if let Some(weight) = record.weight.as_mut() {
                *weight = units::convert_text(weight, Measure::Weight, UnitSystem::Metric);
            }
            if let Some(height) = record.height.as_mut() {
                *height = units::convert_text(height, Measure::Height, UnitSystem::Metric);
            }
        }
        record
    }

    // --- save ---

    /// Runs the field validators in order and stops at the first failure, which is
    /// recorded inline. On success the session moves to `Validating`.
    pub fn begin_save(&mut self) -> Result<(), ProfileError> {
        if !self.state.is_editing() {
            return Err(self.invalid("save"));
        }

        for field in self.kind.validation_order() {
            let value = self.working.value(field);
            if is_optional(field) && value.trim().is_empty() {
                continue;
            }
            if let Err(violation) = validate_field(field, value, self.address_rule) {
                self.reject(violation.field, violation.message.clone());
                return Err(ProfileError::Validation {
                    field: violation.field,
                    reason: violation.message,
                });
            }
        }

        self.state = EditState::Validating;
        Ok(())
    }

    /// Sends the session back to editing with one inline error.
    pub fn reject(&mut self, field: ProfileField, message: impl Into<String>) {
        let mut errors = FieldErrors::default();
        errors.set(field, message);
        self.state = EditState::Editing { errors };
    }

    /// Builds the write for the current working copy and moves to `Persisting`.
    pub fn begin_persist(&mut self) -> Result<PartialUpdate, ProfileError> {
        if self.state != EditState::Validating {
            return Err(self.invalid("persist"));
        }
        let update = self.build_update()?;
        self.state = EditState::Persisting;
        Ok(update)
    }

    /// Mutable fields only; measurements converted back to metric.
    pub fn build_update(&self) -> Result<PartialUpdate, ProfileError> {
        let mut update = PartialUpdate::new();
        for field in self.kind.mutable_fields() {
            let value = self.working.value(field);
            let stored = match field {
                ProfileField::Weight | ProfileField::Height => self.metric_text(field, value),
                ProfileField::Address if value.trim().is_empty() => None,
                _ => Some(value.to_string()),
            };
            update
                .set(field, stored)
                .map_err(|e| ProfileError::Validation {
                    field,
                    reason: e.to_string(),
                })?;
        }
        Ok(update)
    }

    /// Metric text to store. An imperial value the user never touched writes the
    /// server's own metric text back unchanged.
    fn metric_text(&self, field: ProfileField, value: &str) -> Option<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }
        if !self.units.is_imperial() {
            return Some(trimmed.to_string());
        }
        if self.server_in_display_units().value(field) == value {
            return Some(self.server.value(field).to_string());
        }
        let Some(parsed) = units::parse_measure(trimmed) else {
            return Some(trimmed.to_string());
        };
        let (weight, height) = if field == ProfileField::Weight {
            units::to_metric(Some(parsed), None, self.units)
        } else {
            units::to_metric(None, Some(parsed), self.units)
        };
        weight.or(height).map(units::format_measure)
    }

    /// The write failed: back to editing with every edit intact.
    pub fn persist_failed(&mut self, error: &ProfileError) {
        self.state = EditState::editing();
        self.notice = Some(Notice::for_error(error));
    }

    /// Replaces local state with the copy the store returned after a write.
    pub fn reconcile(&mut self, record: ProfileRecord) {
        self.server = record.clone();
        self.working = record;
        self.units = UnitSystem::Metric;
        self.state = EditState::Viewing;
        self.reset_lookup();
        self.notice = Some(Notice::new(
            NoticeKind::Success,
            "Success",
            "Data updated successfully!",
        ));
    }

    /// The write went through but the re-read did not; treat what was written as the
    /// server copy.
    pub fn reconcile_locally(&mut self, update: &PartialUpdate, refetch_error: &ProfileError) {
        let mut document = self.server.to_document();
        update.apply_to(&mut document);
        let record = ProfileRecord::from_document(&document);
        self.reconcile(record);
        self.notice = Some(Notice::new(
            NoticeKind::Warning,
            "Saved",
            format!(
                "Data updated, but refreshing failed: {}",
                refetch_error.user_facing_message()
            ),
        ));
    }

    // --- address lookup ---

    pub fn start_address_lookup(&mut self) -> Result<(), ProfileError> {
        if !self.state.is_editing() {
            return Err(self.invalid("look up an address"));
        }
        if self.resolver.is_busy() {
            return Err(ProfileError::InvalidState {
                action: "look up an address",
                state: self.resolver.name(),
            });
        }
        self.suggestions.clear();
        self.resolver = ResolverPhase::PermissionRequested;
        Ok(())
    }

    pub fn location_fetched(&mut self, position: Position) -> Result<(), ProfileError> {
        if self.resolver != ResolverPhase::PermissionRequested {
            return Err(ProfileError::InvalidState {
                action: "record a position",
                state: self.resolver.name(),
            });
        }
        self.resolver = ResolverPhase::LocationFetched { position };
        Ok(())
    }

    pub fn suggestions_resolved(&mut self, suggestions: Vec<String>) -> Result<(), ProfileError> {
        if !matches!(self.resolver, ResolverPhase::LocationFetched { .. }) {
            return Err(ProfileError::InvalidState {
                action: "publish suggestions",
                state: self.resolver.name(),
            });
        }
        self.suggestions = suggestions;
        self.resolver = ResolverPhase::Reconciled;
        Ok(())
    }

    /// Permission denied or the lookup failed. The address field is left alone.
    pub fn lookup_failed(&mut self, error: &ProfileError) {
        if self.resolver.is_busy() {
            self.reset_lookup();
            self.notice = Some(Notice::for_error(error));
        }
    }

    pub fn select_suggestion(&mut self, index: usize) -> Result<String, ProfileError> {
        if !self.state.is_editing() {
            return Err(self.invalid("select a suggestion"));
        }
        let Some(address) = self.suggestions.get(index).cloned() else {
            return Err(ProfileError::InvalidState {
                action: "select a suggestion",
                state: "without suggestions",
            });
        };
        self.clear_error(ProfileField::Address);
        self.working.address = address.clone();
        self.reset_lookup();
        Ok(address)
    }

    // --- notices ---

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }
}

fn convert_measure(
    text: Option<String>,
    shown: Option<&str>,
    restored: Option<String>,
    measure: Measure,
    from: UnitSystem,
) -> Option<String> {
    let text = text?;
    if Some(text.as_str()) == shown {
        return restored;
    }
    Some(units::convert_text(&text, measure, from))
}

fn same_measure(a: &str, b: &str) -> bool {
    match (units::parse_measure(a), units::parse_measure(b)) {
        (Some(x), Some(y)) => (x - y).abs() < 0.005,
        _ => a.trim() == b.trim(),
    }
}

/// Blank values of these fields mean "not provided" and skip validation.
const fn is_optional(field: ProfileField) -> bool {
    matches!(
        field,
        ProfileField::Address | ProfileField::Weight | ProfileField::Height
    )
}
