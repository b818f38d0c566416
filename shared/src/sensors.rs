//! Paired sensor list.

use serde::{Deserialize, Serialize};

use crate::capabilities::Sensor;
use crate::model::SensorId;

pub const PAIR_SENSOR_PROMPT: &str = "Please pair a sensor to continue..";

/// What the shell should do next when the user starts pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingStep {
    /// Bluetooth pairing happens in the platform settings app.
    OpenSystemSettings,
}

/// Last sensor list the store returned, plus any pairing hand-off in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorRegistry {
    sensors: Vec<Sensor>,
    pairing: Option<PairingStep>,
}

impl SensorRegistry {
    /// A fresh list also ends any pairing hand-off.
    pub fn replace(&mut self, sensors: Vec<Sensor>) {
        self.sensors = sensors;
        self.pairing = None;
    }

    /// Drops a sensor the store has already deleted.
    pub fn forget(&mut self, id: &SensorId) {
        self.sensors.retain(|s| &s.id != id);
    }

    pub fn begin_pairing(&mut self) {
        self.pairing = Some(PairingStep::OpenSystemSettings);
    }

    pub fn pairing(&self) -> Option<PairingStep> {
        self.pairing
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Prompt for the empty list, `None` once something is paired.
    pub fn empty_prompt(&self) -> Option<&'static str> {
        self.is_empty().then_some(PAIR_SENSOR_PROMPT)
    }
}
