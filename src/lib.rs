//! Personal plant-care tracker: plants, their care log and photos, recurring
//! care schedules and watering alerts derived from how long ago each plant
//! was watered.

pub mod backup;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod photos;
pub mod presenter;
pub mod status;
pub mod storage;

pub use db::PlantStore;
pub use models::{ActivityType, Plant, PlantStatusThresholds, ScheduleType};
pub use status::WateringStatus;
