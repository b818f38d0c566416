//! Location-assisted address suggestions.
//!
//! Focusing the address input while editing walks
//! `Idle -> PermissionRequested -> LocationFetched -> Reconciled`. Picking a suggestion
//! (or a denied permission) drops back to `Idle`. Only the device position feeds the
//! list; there is no free-text search.

use serde::{Deserialize, Serialize};

use crate::capabilities::{GeocodedAddress, Position};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ResolverPhase {
    #[default]
    Idle,
    PermissionRequested,
    LocationFetched { position: Position },
    Reconciled,
}

impl ResolverPhase {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::PermissionRequested => "permission_requested",
            Self::LocationFetched { .. } => "location_fetched",
            Self::Reconciled => "reconciled",
        }
    }

    /// A lookup is running between the permission request and reconciliation.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::PermissionRequested | Self::LocationFetched { .. })
    }
}

/// The first usable geocoding result becomes the only suggestion.
#[must_use]
pub fn suggestions_from(results: &[GeocodedAddress]) -> Vec<String> {
    results
        .iter()
        .find_map(GeocodedAddress::format)
        .into_iter()
        .collect()
}
