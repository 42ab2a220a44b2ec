//! Watering staleness and schedule alerts, derived on read from timestamps.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::models::{Plant, PlantStatusThresholds};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum WateringStatus {
    Normal,
    Warning,
    Danger,
}

impl fmt::Display for WateringStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WateringStatus::Normal => "normal",
            WateringStatus::Warning => "warning",
            WateringStatus::Danger => "danger",
        })
    }
}

/// Whole days since the latest `watered` entry, `None` when the plant was
/// never watered. A watering stamped in the future counts as today.
pub fn days_since_last_watered(plant: &Plant, now: DateTime<Utc>) -> Option<i64> {
    plant
        .last_watered()
        .map(|last| (now - last).num_days().max(0))
}

pub fn watering_status(days: Option<i64>, thresholds: &PlantStatusThresholds) -> WateringStatus {
    match days {
        None => WateringStatus::Normal,
        Some(days) if days >= i64::from(thresholds.danger_days) => WateringStatus::Danger,
        Some(days) if days >= i64::from(thresholds.warning_days) => WateringStatus::Warning,
        Some(_) => WateringStatus::Normal,
    }
}

pub fn plant_status(
    plant: &Plant,
    thresholds: &PlantStatusThresholds,
    now: DateTime<Utc>,
) -> WateringStatus {
    watering_status(days_since_last_watered(plant, now), thresholds)
}

/// True when an enabled schedule is due. Independent of watering status.
pub fn needs_care(plant: &Plant, now: DateTime<Utc>) -> bool {
    plant
        .schedules
        .iter()
        .any(|schedule| schedule.enabled && schedule.next_due <= now)
}
