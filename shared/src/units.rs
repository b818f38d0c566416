//! Weight/height display units.
//!
//! The store always holds kilograms and centimetres. Imperial values only ever exist
//! on screen, so every conversion here is display-only and rounds to two decimals.
//! Toggling back and forth without re-fetching drifts by rounding; that loss is
//! accepted.

use serde::{Deserialize, Serialize};

pub const LBS_PER_KG: f64 = 2.20462;
pub const CM_PER_INCH: f64 = 2.54;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    #[must_use]
    pub const fn toggle(self) -> Self {
        match self {
            Self::Metric => Self::Imperial,
            Self::Imperial => Self::Metric,
        }
    }

    #[must_use]
    pub const fn is_imperial(self) -> bool {
        matches!(self, Self::Imperial)
    }

    #[must_use]
    pub const fn weight_label(self) -> &'static str {
        match self {
            Self::Metric => "KG",
            Self::Imperial => "Lbs",
        }
    }

    #[must_use]
    pub const fn height_label(self) -> &'static str {
        match self {
            Self::Metric => "CM",
            Self::Imperial => "Inches",
        }
    }
}

#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[must_use]
pub fn kg_to_lbs(kg: f64) -> f64 {
    round2(kg * LBS_PER_KG)
}

#[must_use]
pub fn lbs_to_kg(lbs: f64) -> f64 {
    round2(lbs / LBS_PER_KG)
}

#[must_use]
pub fn cm_to_inches(cm: f64) -> f64 {
    round2(cm / CM_PER_INCH)
}

#[must_use]
pub fn inches_to_cm(inches: f64) -> f64 {
    round2(inches * CM_PER_INCH)
}

/// Converts a weight/height pair into the other unit system.
///
/// Missing values stay missing. Returns the converted pair and the new system.
#[must_use]
pub fn toggle_units(
    weight: Option<f64>,
    height: Option<f64>,
    current: UnitSystem,
) -> (Option<f64>, Option<f64>, UnitSystem) {
    match current {
        UnitSystem::Metric => (
            weight.map(kg_to_lbs),
            height.map(cm_to_inches),
            UnitSystem::Imperial,
        ),
        UnitSystem::Imperial => (
            weight.map(lbs_to_kg),
            height.map(inches_to_cm),
            UnitSystem::Metric,
        ),
    }
}

/// Brings displayed values back to the canonical metric units.
#[must_use]
pub fn to_metric(
    weight: Option<f64>,
    height: Option<f64>,
    current: UnitSystem,
) -> (Option<f64>, Option<f64>) {
    match current {
        UnitSystem::Metric => (weight, height),
        UnitSystem::Imperial => (weight.map(lbs_to_kg), height.map(inches_to_cm)),
    }
}

/// Parses the text of a measurement input. Blank or non-numeric text yields `None`.
#[must_use]
pub fn parse_measure(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[must_use]
pub fn format_measure(value: f64) -> String {
    format!("{value:.2}")
}

/// Toggles the text of a measurement input. Text that does not parse is returned as-is.
#[must_use]
pub fn convert_text(text: &str, kind: Measure, current: UnitSystem) -> String {
    let Some(value) = parse_measure(text) else {
        return text.to_string();
    };
    let converted = match kind {
        Measure::Weight => toggle_units(Some(value), None, current).0,
        Measure::Height => toggle_units(None, Some(value), current).1,
    };
    converted.map_or_else(|| text.to_string(), format_measure)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Weight,
    Height,
}
