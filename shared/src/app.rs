//! The profile screen as a Crux app.
//!
//! `update` applies [`EditSession`] transitions and asks the capabilities for remote
//! work. Every answer carries the id of the session (or the mount generation) that
//! asked for it and is dropped if that session is gone by the time it arrives.

use tracing::{debug, error, info, instrument, warn};

use crate::address::suggestions_from;
use crate::capabilities::{Capabilities, PermissionStatus, StoreError};
use crate::config::{ConfigError, ProfileConfig};
use crate::event::Event;
use crate::model::{ProfileField, ProfileRecord, SessionId, StoredProfile, UserId};
use crate::sensors::SensorRegistry;
use crate::session::{EditSession, EMAIL_IN_USE_MESSAGE};
use crate::uniqueness::is_email_taken;
use crate::view::ViewModel;
use crate::{ProfileError, ProfileResult, RemoteOperation};

#[derive(Debug, Default)]
pub struct Model {
    pub config: ProfileConfig,
    /// Bumped by every mount and unmount.
    pub generation: u64,
    pub session: Option<EditSession>,
    pub sensors: SensorRegistry,
    /// Set by the last event that failed, cleared by the next user event.
    pub last_error: Option<ProfileError>,
}

impl Model {
    pub fn with_config(config: ProfileConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    fn active(&mut self, action: &'static str) -> ProfileResult<&mut EditSession> {
        self.session.as_mut().ok_or(ProfileError::InvalidState {
            action,
            state: "unmounted",
        })
    }

    /// Re-enters the session an answer was requested for.
    fn resume(&mut self, id: SessionId) -> Option<&mut EditSession> {
        if self.session.as_ref().map(EditSession::id) != Some(id) {
            debug!(session = %id, "Dropping answer for discarded session");
            self.last_error = Some(ProfileError::SessionDiscarded);
            return None;
        }
        self.session.as_mut()
    }

    fn fail(&mut self, error: ProfileError) {
        self.last_error = Some(error);
    }
}

#[derive(Default)]
pub struct App;

impl App {
    fn local<T>(
        model: &mut Model,
        action: &'static str,
        f: impl FnOnce(&mut EditSession) -> ProfileResult<T>,
    ) {
        if let Err(e) = model.active(action).and_then(f) {
            debug!(error = %e, action, "Transition refused");
            model.fail(e);
        }
    }

    fn mount(model: &mut Model, user_id: UserId, caps: &Capabilities) {
        model.generation += 1;
        model.session = None;
        let generation = model.generation;
        caps.store.get(user_id.clone(), move |result| Event::ProfileFetched {
            generation,
            user_id,
            result,
        });
    }

    fn save(model: &mut Model, caps: &Capabilities) {
        let session = match model.active("save") {
            Ok(session) => session,
            Err(e) => return model.fail(e),
        };
        if let Err(e) = session.begin_save() {
            debug!(error = %e, "Save stopped by validation");
            return model.fail(e);
        }
        let id = session.id();
        let email = session.working().email.clone();
        caps.store
            .query_by_field(ProfileField::Email, email, move |result| Event::EmailChecked {
                session: id,
                result,
            });
    }

    fn focus_address(model: &mut Model, caps: &Capabilities) {
        let session = match model.active("look up an address") {
            Ok(session) => session,
            Err(e) => return model.fail(e),
        };
        if let Err(e) = session.start_address_lookup() {
            return model.fail(e);
        }
        let id = session.id();
        caps.location
            .request_permission(move |result| Event::PermissionAnswered { session: id, result });
    }

    #[instrument(skip_all, fields(session = %id))]
    fn email_checked(
        model: &mut Model,
        id: SessionId,
        result: Result<Vec<StoredProfile>, StoreError>,
        caps: &Capabilities,
    ) {
        let Some(session) = model.resume(id) else {
            return;
        };
        let matches = match result {
            Ok(matches) => matches,
            Err(e) => {
                let e = ProfileError::remote(RemoteOperation::Query, e);
                error!(error = %e, "Email uniqueness check failed");
                session.persist_failed(&e);
                return model.fail(e);
            }
        };
        if is_email_taken(&matches, session.user_id()) {
            warn!("Save stopped: email already in use");
            session.reject(ProfileField::Email, EMAIL_IN_USE_MESSAGE);
            return model.fail(ProfileError::UniquenessConflict {
                field: ProfileField::Email,
            });
        }
        match session.begin_persist() {
            Ok(update) => {
                let user_id = session.user_id().clone();
                let written = update.clone();
                caps.store.update_partial(user_id, update, move |result| {
                    Event::ProfileWritten {
                        session: id,
                        update: written,
                        result,
                    }
                });
            }
            Err(e) => model.fail(e),
        }
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    #[instrument(skip_all, fields(event = event.name()))]
    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        if event.is_user_initiated() {
            model.last_error = None;
        }

        match event {
            Event::Configure { config } => match config.validate() {
                Ok(()) => {
                    info!(kind = ?config.kind, "Configured");
                    model.config = config;
                }
                Err(e) => {
                    error!(error = %e, "Rejected configuration");
                    model.fail(ProfileError::InvalidState {
                        action: "configure",
                        state: "given an invalid configuration",
                    });
                }
            },

            Event::Mount { user_id } => Self::mount(model, user_id, caps),

            Event::Unmount => {
                model.generation += 1;
                if let Some(session) = model.session.take() {
                    info!(session = %session.id(), "Profile unmounted");
                }
            }

            Event::ToggleEdit => Self::local(model, "toggle edit mode", EditSession::toggle_edit),
            Event::FieldChanged { field, value } => {
                Self::local(model, "edit a field", |s| s.set_field(field, value));
            }
            Event::ToggleUnits => Self::local(model, "convert units", EditSession::toggle_units),
            Event::DiscardEdits => {
                Self::local(model, "discard edits", EditSession::discard_edits);
            }
            Event::SuggestionSelected { index } => {
                Self::local(model, "select a suggestion", |s| s.select_suggestion(index));
            }
            Event::DismissNotice => Self::local(model, "dismiss a notice", |s| {
                s.dismiss_notice();
                Ok(())
            }),

            Event::Save => Self::save(model, caps),
            Event::AddressFocused => Self::focus_address(model, caps),

            Event::RefreshSensors => caps
                .store
                .list_sensors(|result| Event::SensorsLoaded { result }),
            Event::ForgetSensor { id } => {
                let removed = id.clone();
                caps.store.remove_sensor(id, move |result| Event::SensorRemoved {
                    id: removed,
                    result,
                });
            }
            Event::BeginPairing => caps
                .location
                .request_permission(|result| Event::PairingPermission { result }),

            // --- capability answers ---
            Event::ProfileFetched {
                generation,
                user_id,
                result,
            } => {
                if generation != model.generation {
                    debug!(user = %user_id, "Mount superseded before the profile arrived");
                    model.fail(ProfileError::SessionDiscarded);
                } else {
                    match result {
                        Ok(document) => {
                            let record = ProfileRecord::from_document(&document);
                            let session = EditSession::new(user_id, record, &model.config);
                            info!(session = %session.id(), kind = ?model.config.kind, "Profile mounted");
                            model.session = Some(session);
                        }
                        Err(e) => {
                            let e = ProfileError::from_store(RemoteOperation::Fetch, e);
                            error!(error = %e, "Failed to fetch profile");
                            model.fail(e);
                        }
                    }
                }
            }

            Event::EmailChecked { session, result } => {
                Self::email_checked(model, session, result, caps);
            }

            Event::ProfileWritten {
                session: id,
                update,
                result,
            } => {
                if let Some(session) = model.resume(id) {
                    match result {
                        Ok(()) => {
                            info!(fields = ?update, "Profile updated");
                            let user_id = session.user_id().clone();
                            caps.store.get(user_id, move |result| Event::ProfileRefetched {
                                session: id,
                                update,
                                result,
                            });
                        }
                        Err(e) => {
                            let e = ProfileError::from_store(RemoteOperation::Update, e);
                            error!(error = %e, "Failed to save profile");
                            session.persist_failed(&e);
                            model.fail(e);
                        }
                    }
                }
            }

            Event::ProfileRefetched {
                session: id,
                update,
                result,
            } => {
                if let Some(session) = model.resume(id) {
                    match result {
                        Ok(document) => session.reconcile(ProfileRecord::from_document(&document)),
                        Err(e) => {
                            let e = ProfileError::from_store(RemoteOperation::Fetch, e);
                            warn!(error = %e, "Refetch after save failed, keeping written values");
                            session.reconcile_locally(&update, &e);
                        }
                    }
                }
            }

            Event::PermissionAnswered { session: id, result } => {
                if let Some(session) = model.resume(id) {
                    match result {
                        Ok(PermissionStatus::Granted) => caps
                            .location
                            .current_position(move |result| Event::PositionFetched {
                                session: id,
                                result,
                            }),
                        Ok(PermissionStatus::Denied) => {
                            warn!("Foreground location permission denied");
                            session.lookup_failed(&ProfileError::PermissionDenied);
                            model.fail(ProfileError::PermissionDenied);
                        }
                        Err(e) => {
                            let e = ProfileError::remote(RemoteOperation::RequestPermission, e);
                            warn!(error = %e, "Permission request failed");
                            session.lookup_failed(&e);
                        }
                    }
                }
            }

            Event::PositionFetched { session: id, result } => {
                if let Some(session) = model.resume(id) {
                    match result {
                        Ok(position) => {
                            if let Err(e) = session.location_fetched(position) {
                                debug!(error = %e, "Address lookup superseded");
                            } else {
                                caps.location.reverse_geocode(position, move |result| {
                                    Event::AddressesFound {
                                        session: id,
                                        result,
                                    }
                                });
                            }
                        }
                        Err(e) => {
                            let e = ProfileError::remote(RemoteOperation::Locate, e);
                            warn!(error = %e, "Current position unavailable");
                            session.lookup_failed(&e);
                        }
                    }
                }
            }

            Event::AddressesFound { session: id, result } => {
                if let Some(session) = model.resume(id) {
                    match result {
                        Ok(results) => {
                            let suggestions = suggestions_from(&results);
                            let count = suggestions.len();
                            match session.suggestions_resolved(suggestions) {
                                Ok(()) => info!(suggestions = count, "Address suggestions ready"),
                                Err(e) => debug!(error = %e, "Address lookup superseded"),
                            }
                        }
                        Err(e) => {
                            let e = ProfileError::remote(RemoteOperation::Geocode, e);
                            warn!(error = %e, "Reverse geocoding failed");
                            session.lookup_failed(&e);
                        }
                    }
                }
            }

            Event::SensorsLoaded { result } => match result {
                Ok(sensors) => {
                    info!(count = sensors.len(), "Sensors loaded");
                    model.sensors.replace(sensors);
                }
                Err(e) => {
                    let e = ProfileError::remote(RemoteOperation::ListSensors, e);
                    error!(error = %e, "Failed to load sensors");
                    model.fail(e);
                }
            },

            Event::SensorRemoved { id, result } => match result {
                Ok(()) => {
                    info!(sensor = %id, "Sensor forgotten");
                    model.sensors.forget(&id);
                }
                Err(e) => {
                    let e = ProfileError::from_store(RemoteOperation::ForgetSensor, e);
                    warn!(error = %e, sensor = %id, "Failed to forget sensor");
                    model.fail(e);
                }
            },

            Event::PairingPermission { result } => match result {
                Ok(PermissionStatus::Granted) => model.sensors.begin_pairing(),
                Ok(PermissionStatus::Denied) => {
                    warn!("Pairing refused without location permission");
                    model.fail(ProfileError::PermissionDenied);
                }
                Err(e) => model.fail(ProfileError::remote(RemoteOperation::RequestPermission, e)),
            },
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel::new(
            model.session.as_ref(),
            &model.sensors,
            model.last_error.as_ref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{
        Effect, LocationOperation, LocationResponse, Sensor, StoreOperation, StoreResponse,
    };
    use crate::model::{ProfileDocument, SensorId};
    use crate::sensors::PairingStep;
    use crate::session::EditState;
    use crux_core::testing::AppTester;
    use crux_core::Request;

    fn ada() -> ProfileDocument {
        ProfileDocument {
            patient_id: "P-1".into(),
            name: Some("Ada".into()),
            email: Some("ada@example.com".into()),
            phone_number: Some("555-123-4567".into()),
            ..Default::default()
        }
    }

    fn store_request(effects: Vec<Effect>) -> Request<StoreOperation> {
        effects
            .into_iter()
            .find_map(|e| match e {
                Effect::Documents(request) => Some(request),
                _ => None,
            })
            .expect("a store request")
    }

    fn location_request(effects: Vec<Effect>) -> Request<LocationOperation> {
        effects
            .into_iter()
            .find_map(|e| match e {
                Effect::Geolocation(request) => Some(request),
                _ => None,
            })
            .expect("a location request")
    }

    /// Resolves the request and feeds every resulting event back into the app.
    fn answer<Op: crux_core::capability::Operation>(
        app: &AppTester<App, Effect>,
        model: &mut Model,
        request: &mut Request<Op>,
        output: Op::Output,
    ) -> Vec<Effect> {
        let update = app.resolve(request, output).expect("request resolves");
        let mut effects = update.effects;
        for event in update.events {
            effects.extend(app.update(event, model).effects);
        }
        effects
    }

    fn mounted(app: &AppTester<App, Effect>) -> Model {
        let mut model = Model::default();
        let update = app.update(Event::Mount { user_id: UserId::new("u1") }, &mut model);
        let mut request = store_request(update.effects);
        assert_eq!(
            request.operation,
            StoreOperation::Get { id: UserId::new("u1") }
        );
        answer(app, &mut model, &mut request, StoreResponse::Document(ada()));
        model
    }

    #[test]
    fn mount_fetches_then_views() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();

        let update = app.update(Event::Mount { user_id: UserId::new("u1") }, &mut model);
        assert!(update.effects.iter().any(|e| matches!(e, Effect::Render(_))));
        assert!(app.view(&model).profile.is_none());

        let mut request = store_request(update.effects);
        answer(&app, &mut model, &mut request, StoreResponse::Document(ada()));

        let view = app.view(&model).profile.unwrap();
        assert_eq!(view.state, "viewing");
        assert_eq!(view.display_name, "Ada");
        assert_eq!(view.identifier_value, "P-1");
    }

    #[test]
    fn mount_of_missing_profile_fails() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();
        let update = app.update(Event::Mount { user_id: UserId::new("ghost") }, &mut model);
        let mut request = store_request(update.effects);
        answer(
            &app,
            &mut model,
            &mut request,
            StoreResponse::Failed(StoreError::NotFound("ghost".into())),
        );

        assert_eq!(model.last_error, Some(ProfileError::NotFound("ghost".into())));
        let view = app.view(&model);
        assert!(view.profile.is_none());
        let error = view.error.unwrap();
        assert_eq!(error.code, "NOT_FOUND");
        assert_eq!(error.message, "Failed to fetch user data");
    }

    #[test]
    fn operations_need_a_mounted_session() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();

        let update = app.update(Event::ToggleEdit, &mut model);
        assert!(matches!(
            model.last_error,
            Some(ProfileError::InvalidState { state: "unmounted", .. })
        ));
        assert!(!update.effects.iter().any(|e| matches!(e, Effect::Documents(_))));

        let update = app.update(Event::Save, &mut model);
        assert!(model.last_error.is_some());
        assert!(!update.effects.iter().any(|e| matches!(e, Effect::Documents(_))));
    }

    #[test]
    fn next_user_event_clears_the_error() {
        let app = AppTester::<App, Effect>::default();
        let mut model = mounted(&app);
        app.update(Event::Save, &mut model);
        assert!(model.last_error.is_some());

        app.update(Event::ToggleEdit, &mut model);
        assert!(model.last_error.is_none());
    }

    #[test]
    fn invalid_configuration_is_refused() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();
        let config = ProfileConfig {
            initial_units: crate::units::UnitSystem::Imperial,
            ..ProfileConfig::practitioner()
        };
        assert!(Model::with_config(config.clone()).is_err());

        app.update(Event::Configure { config }, &mut model);
        assert_eq!(model.config, ProfileConfig::patient());
        assert!(model.last_error.is_some());

        app.update(
            Event::Configure {
                config: ProfileConfig::practitioner(),
            },
            &mut model,
        );
        assert_eq!(model.config, ProfileConfig::practitioner());
        assert!(model.last_error.is_none());
    }

    #[test]
    fn remount_replaces_session() {
        let app = AppTester::<App, Effect>::default();
        let mut model = mounted(&app);
        let first = model.session.as_ref().map(EditSession::id).unwrap();

        let update = app.update(Event::Mount { user_id: UserId::new("u1") }, &mut model);
        assert!(model.session.is_none());
        let mut request = store_request(update.effects);
        answer(&app, &mut model, &mut request, StoreResponse::Document(ada()));
        assert_ne!(model.session.as_ref().map(EditSession::id).unwrap(), first);
    }

    #[test]
    fn denied_permission_is_reported() {
        let app = AppTester::<App, Effect>::default();
        let mut model = mounted(&app);
        app.update(Event::ToggleEdit, &mut model);

        let update = app.update(Event::AddressFocused, &mut model);
        assert!(app.view(&model).profile.unwrap().is_busy);
        let mut request = location_request(update.effects);
        assert_eq!(request.operation, LocationOperation::RequestPermission);
        let effects = answer(
            &app,
            &mut model,
            &mut request,
            LocationResponse::Permission(PermissionStatus::Denied),
        );

        assert!(!effects.iter().any(|e| matches!(e, Effect::Geolocation(_))));
        assert_eq!(model.last_error, Some(ProfileError::PermissionDenied));
        let session = model.session.as_ref().unwrap();
        assert!(matches!(session.state(), EditState::Editing { .. }));
        assert!(session.suggestions().is_empty());
    }

    #[test]
    fn sensors_load_forget_and_pair() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();
        assert_eq!(
            app.view(&model).sensors.empty_prompt.as_deref(),
            Some("Please pair a sensor to continue..")
        );

        let update = app.update(Event::RefreshSensors, &mut model);
        let mut request = store_request(update.effects);
        assert_eq!(request.operation, StoreOperation::ListSensors);
        let sensors = vec![
            Sensor {
                id: SensorId::new("s1"),
                name: "Glucose Monitor".into(),
            },
            Sensor {
                id: SensorId::new("s2"),
                name: "Pulse Oximeter".into(),
            },
        ];
        answer(&app, &mut model, &mut request, StoreResponse::Sensors(sensors));
        assert_eq!(app.view(&model).sensors.sensors.len(), 2);

        let update = app.update(Event::ForgetSensor { id: SensorId::new("s1") }, &mut model);
        let mut request = store_request(update.effects);
        answer(&app, &mut model, &mut request, StoreResponse::Done);
        let view = app.view(&model).sensors;
        assert_eq!(view.sensors.len(), 1);
        assert_eq!(view.sensors[0].name, "Pulse Oximeter");
        assert_eq!(view.empty_prompt, None);

        let update = app.update(Event::BeginPairing, &mut model);
        let mut request = location_request(update.effects);
        answer(
            &app,
            &mut model,
            &mut request,
            LocationResponse::Permission(PermissionStatus::Granted),
        );
        assert_eq!(
            app.view(&model).sensors.pairing,
            Some(PairingStep::OpenSystemSettings)
        );
    }

    #[test]
    fn failed_forget_keeps_the_sensor() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();
        model.sensors.replace(vec![Sensor {
            id: SensorId::new("s1"),
            name: "Glucose Monitor".into(),
        }]);

        let update = app.update(Event::ForgetSensor { id: SensorId::new("s1") }, &mut model);
        let mut request = store_request(update.effects);
        answer(
            &app,
            &mut model,
            &mut request,
            StoreResponse::Failed(StoreError::Unavailable("offline".into())),
        );
        assert_eq!(model.sensors.sensors().len(), 1);
        assert_eq!(
            model.last_error.unwrap().user_facing_message(),
            "Failed to forget the sensor"
        );
    }

    #[test]
    fn pairing_without_permission_is_refused() {
        let app = AppTester::<App, Effect>::default();
        let mut model = Model::default();
        let update = app.update(Event::BeginPairing, &mut model);
        let mut request = location_request(update.effects);
        answer(
            &app,
            &mut model,
            &mut request,
            LocationResponse::Permission(PermissionStatus::Denied),
        );
        assert_eq!(model.last_error, Some(ProfileError::PermissionDenied));
        assert_eq!(model.sensors.pairing(), None);
    }
}
