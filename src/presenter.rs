//! Ordering and grouping of plants for the main list.

use chrono::{DateTime, Utc};

use crate::models::{Plant, PlantStatusThresholds};
use crate::status::{plant_status, WateringStatus};

pub const UNASSIGNED: &str = "Unassigned";

#[derive(Debug, Clone, PartialEq)]
pub struct PlantGroup<'a> {
    pub location: String,
    pub plants: Vec<&'a Plant>,
    /// Every member is `Normal`, so the group can start collapsed.
    pub all_normal: bool,
}

/// Never-watered plants first, then oldest watering first. Ties keep their
/// insertion order.
pub fn sort_by_last_watered<'a>(plants: impl IntoIterator<Item = &'a Plant>) -> Vec<&'a Plant> {
    let mut sorted: Vec<&Plant> = plants.into_iter().collect();
    // `None` orders before any `Some`.
    sorted.sort_by_key(|plant| plant.last_watered());
    sorted
}

/// The main list: archived plants hidden, most overdue first.
pub fn main_list(plants: &[Plant]) -> Vec<&Plant> {
    sort_by_last_watered(plants.iter().filter(|p| !p.archived))
}

/// Case-insensitive substring match over name, scientific name and location.
pub fn matches_search(plant: &Plant, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    [
        Some(plant.name.as_str()),
        plant.scientific_name.as_deref(),
        plant.location.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(&query))
}

/// Buckets already-sorted plants by location, keeping their order inside
/// each bucket. Groups appear in the order their first member does.
pub fn group_by_location<'a>(
    sorted: &[&'a Plant],
    thresholds: &PlantStatusThresholds,
    now: DateTime<Utc>,
) -> Vec<PlantGroup<'a>> {
    let mut groups: Vec<PlantGroup<'a>> = Vec::new();
    for &plant in sorted {
        let location = plant.location_label().unwrap_or(UNASSIGNED);
        let normal = plant_status(plant, thresholds, now) == WateringStatus::Normal;
        match groups.iter_mut().find(|g| g.location == location) {
            Some(group) => {
                group.plants.push(plant);
                group.all_normal &= normal;
            }
            None => groups.push(PlantGroup {
                location: location.to_string(),
                plants: vec![plant],
                all_normal: normal,
            }),
        }
    }
    groups
}
