//! Capabilities the core hands to the shell: rendering, the profile document store and
//! device location. The in-process ports and adapters answer the same operations for
//! shells written in Rust.

mod documents;
mod geolocation;
mod location;
mod store;

#[cfg(not(target_arch = "wasm32"))]
mod sqlite;

pub use self::documents::{Documents, StoreOperation, StoreResponse};
pub use self::geolocation::{Geolocation, LocationOperation, LocationResponse};
pub use self::location::{GeocodedAddress, LocationError, LocationService, PermissionStatus, Position};
pub use self::store::{
    InMemoryProfileStore, InMemorySensorStore, PartialUpdate, ProfileStore, Sensor, SensorStore,
    StoreError,
};

#[cfg(not(target_arch = "wasm32"))]
pub use self::sqlite::SqliteProfileStore;

pub use crux_core::render::Render;

use crate::event::Event;

#[derive(crux_core::macros::Effect)]
#[effect(app = "crate::App")]
pub struct Capabilities {
    pub render: Render<Event>,
    pub store: Documents<Event>,
    pub location: Geolocation<Event>,
}
