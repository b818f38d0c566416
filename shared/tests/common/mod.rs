#![allow(dead_code)]

use async_trait::async_trait;
use crux_core::testing::AppTester;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use care_profile_shared::capabilities::{
    GeocodedAddress, InMemoryProfileStore, InMemorySensorStore, LocationError, LocationOperation,
    LocationService, PartialUpdate, PermissionStatus, Position, ProfileStore, SensorStore,
    StoreError, StoreOperation,
};
use care_profile_shared::model::{ProfileDocument, ProfileField, StoredProfile, UserId};
use care_profile_shared::{
    App, Effect, Event, Model, ProfileError, ProfileView, ProfileConfig, ViewModel,
};

/// In-memory store that counts calls, remembers writes and fails on demand.
pub struct RecordingStore {
    inner: InMemoryProfileStore,
    gets: AtomicUsize,
    updates: AtomicUsize,
    queries: AtomicUsize,
    last_update: Mutex<Option<PartialUpdate>>,
    fail_gets_after: Mutex<Option<usize>>,
    fail_updates: AtomicBool,
    fail_queries: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryProfileStore::new(),
            gets: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            queries: AtomicUsize::new(0),
            last_update: Mutex::new(None),
            fail_gets_after: Mutex::new(None),
            fail_updates: AtomicBool::new(false),
            fail_queries: AtomicBool::new(false),
        }
    }

    pub async fn insert(&self, id: &str, document: ProfileDocument) {
        self.inner.insert(UserId::new(id), document).await;
    }

    pub async fn document(&self, id: &str) -> ProfileDocument {
        self.inner.get(&UserId::new(id)).await.unwrap()
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn last_update(&self) -> Option<PartialUpdate> {
        self.last_update.lock().unwrap().clone()
    }

    /// Every `get` after the first `n` fails.
    pub fn fail_gets_after(&self, n: usize) {
        *self.fail_gets_after.lock().unwrap() = Some(n);
    }

    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProfileStore for RecordingStore {
    async fn get(&self, id: &UserId) -> Result<ProfileDocument, StoreError> {
        let seen = self.gets.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = *self.fail_gets_after.lock().unwrap() {
            if seen >= limit {
                return Err(StoreError::Unavailable("Injected failure".into()));
            }
        }
        self.inner.get(id).await
    }

    async fn update_partial(&self, id: &UserId, update: &PartialUpdate) -> Result<(), StoreError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        *self.last_update.lock().unwrap() = Some(update.clone());
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("Injected failure".into()));
        }
        self.inner.update_partial(id, update).await
    }

    async fn query_by_field(
        &self,
        field: ProfileField,
        value: &str,
    ) -> Result<Vec<StoredProfile>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("Injected failure".into()));
        }
        self.inner.query_by_field(field, value).await
    }
}

/// Location service with fixed answers.
pub struct ScriptedLocation {
    pub permission: PermissionStatus,
    pub position: Result<(f64, f64), LocationError>,
    pub results: Vec<GeocodedAddress>,
    pub permission_requests: AtomicUsize,
}

impl ScriptedLocation {
    pub fn granted(results: Vec<GeocodedAddress>) -> Self {
        Self {
            permission: PermissionStatus::Granted,
            position: Ok((39.7817, -89.6501)),
            results,
            permission_requests: AtomicUsize::new(0),
        }
    }

    pub fn denied() -> Self {
        Self {
            permission: PermissionStatus::Denied,
            ..Self::granted(vec![springfield()])
        }
    }

    pub fn without_fix() -> Self {
        Self {
            position: Err(LocationError::PositionUnavailable("no fix".into())),
            ..Self::granted(vec![springfield()])
        }
    }
}

#[async_trait]
impl LocationService for ScriptedLocation {
    async fn request_foreground_permission(&self) -> Result<PermissionStatus, LocationError> {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.permission)
    }

    async fn current_position(&self) -> Result<Position, LocationError> {
        let (lat, lon) = self.position.clone()?;
        Position::new(lat, lon)
    }

    async fn reverse_geocode(
        &self,
        _position: Position,
    ) -> Result<Vec<GeocodedAddress>, LocationError> {
        Ok(self.results.clone())
    }
}

pub fn springfield() -> GeocodedAddress {
    GeocodedAddress {
        street: Some("1 Elm St".into()),
        city: Some("Springfield".into()),
        region: Some("IL".into()),
        country: Some("USA".into()),
    }
}

pub fn jane() -> ProfileDocument {
    ProfileDocument {
        patient_id: "MD-4821".into(),
        name: Some("Jane Doe".into()),
        email: Some("jane@example.com".into()),
        phone_number: Some("(555) 123-4567".into()),
        address: Some("123 Main St, Springfield".into()),
        weight: None,
        height: None,
    }
}

pub fn patient() -> ProfileDocument {
    ProfileDocument {
        patient_id: "P-100".into(),
        name: Some("Sam Lee".into()),
        email: Some("sam@example.com".into()),
        phone_number: Some("555-987-6543".into()),
        address: Some("42 Oak Ave, Portland".into()),
        weight: Some("70".into()),
        height: Some("180".into()),
    }
}

pub fn other() -> ProfileDocument {
    ProfileDocument {
        patient_id: "P-200".into(),
        name: Some("Bob".into()),
        email: Some("bob@example.com".into()),
        ..Default::default()
    }
}

/// Rust-side shell: resolves every effect the core asks for against in-process
/// adapters and feeds the answers back. Requests matching a hold switch are parked
/// until [`Shell::release`].
pub struct Shell {
    pub app: AppTester<App, Effect>,
    pub model: Model,
    profiles: Arc<dyn ProfileStore>,
    sensors: Arc<dyn SensorStore>,
    location: Arc<dyn LocationService>,
    pub hold_gets: bool,
    pub hold_updates: bool,
    pub hold_geocoding: bool,
    parked: Vec<Effect>,
}

impl Shell {
    pub fn new(
        config: ProfileConfig,
        profiles: Arc<dyn ProfileStore>,
        sensors: Arc<dyn SensorStore>,
        location: Arc<dyn LocationService>,
    ) -> Self {
        Self {
            app: AppTester::default(),
            model: Model::with_config(config).unwrap(),
            profiles,
            sensors,
            location,
            hold_gets: false,
            hold_updates: false,
            hold_geocoding: false,
            parked: Vec::new(),
        }
    }

    /// Sends one event and runs every follow-up request that is not held.
    pub async fn send(&mut self, event: Event) -> Result<(), ProfileError> {
        let update = self.app.update(event, &mut self.model);
        self.settle(update.events, update.effects).await;
        match &self.model.last_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    /// Lifts every hold and answers the parked requests.
    pub async fn release(&mut self) -> Result<(), ProfileError> {
        self.hold_gets = false;
        self.hold_updates = false;
        self.hold_geocoding = false;
        let parked = std::mem::take(&mut self.parked);
        self.settle(Vec::new(), parked).await;
        match &self.model.last_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    pub fn parked(&self) -> usize {
        self.parked.len()
    }

    pub fn view(&self) -> ViewModel {
        self.app.view(&self.model)
    }

    pub fn profile(&self) -> Option<ProfileView> {
        self.view().profile
    }

    fn held(&self, effect: &Effect) -> bool {
        match effect {
            Effect::Documents(request) => match request.operation {
                StoreOperation::Get { .. } => self.hold_gets,
                StoreOperation::UpdatePartial { .. } => self.hold_updates,
                _ => false,
            },
            Effect::Geolocation(request) => {
                self.hold_geocoding
                    && matches!(request.operation, LocationOperation::ReverseGeocode { .. })
            }
            Effect::Render(_) => false,
        }
    }

    async fn settle(&mut self, events: Vec<Event>, effects: Vec<Effect>) {
        let mut events: VecDeque<Event> = events.into();
        let mut effects: VecDeque<Effect> = effects.into();
        loop {
            if let Some(event) = events.pop_front() {
                let update = self.app.update(event, &mut self.model);
                events.extend(update.events);
                effects.extend(update.effects);
                continue;
            }
            let Some(effect) = effects.pop_front() else {
                break;
            };
            if self.held(&effect) {
                self.parked.push(effect);
                continue;
            }
            let update = match effect {
                Effect::Render(_) => continue,
                Effect::Documents(mut request) => {
                    let response = request
                        .operation
                        .clone()
                        .run(self.profiles.as_ref(), self.sensors.as_ref())
                        .await;
                    self.app.resolve(&mut request, response).unwrap()
                }
                Effect::Geolocation(mut request) => {
                    let response = request.operation.clone().run(self.location.as_ref()).await;
                    self.app.resolve(&mut request, response).unwrap()
                }
            };
            events.extend(update.events);
            effects.extend(update.effects);
        }
    }
}

pub struct Harness {
    pub store: Arc<RecordingStore>,
    pub sensors: Arc<InMemorySensorStore>,
    pub location: Arc<ScriptedLocation>,
    pub shell: Shell,
}

pub async fn harness(config: ProfileConfig, location: ScriptedLocation) -> Harness {
    let store = Arc::new(RecordingStore::new());
    store.insert("doc-1", jane()).await;
    store.insert("pat-1", patient()).await;
    store.insert("bob", other()).await;
    let sensors = Arc::new(InMemorySensorStore::new());
    let location = Arc::new(location);
    let shell = Shell::new(config, store.clone(), sensors.clone(), location.clone());
    Harness {
        store,
        sensors,
        location,
        shell,
    }
}

/// Mounts `user` and switches to edit mode.
pub async fn editing(h: &mut Harness, user: &str) {
    h.shell
        .send(Event::Mount {
            user_id: UserId::new(user),
        })
        .await
        .unwrap();
    h.shell.send(Event::ToggleEdit).await.unwrap();
}

pub fn field(field: ProfileField, value: &str) -> Event {
    Event::FieldChanged {
        field,
        value: value.into(),
    }
}
