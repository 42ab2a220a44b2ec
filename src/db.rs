use chrono::{DateTime, Utc};
use serde_json::Value;
use ulid::Ulid;

use crate::backup;
use crate::clock::{Clock, SystemClock};
use crate::error::BackupError;
use crate::models::{
    non_blank, ActivityType, CareActivity, NewPlant, Plant, PlantPatch, PlantStatusThresholds,
    Schedule, ScheduleType, MAX_FREQUENCY_DAYS,
};
use crate::storage::KeyValueStore;

pub const PLANTS_KEY: &str = "plants";
pub const THRESHOLDS_KEY: &str = "plantStatusThresholds";

/// Owner of every plant and of the alert thresholds. Each mutation writes a
/// full snapshot back to the key-value store; storage failures are logged
/// and never reach the caller.
pub struct PlantStore<S: KeyValueStore> {
    storage: S,
    clock: Box<dyn Clock>,
    plants: Vec<Plant>,
    thresholds: PlantStatusThresholds,
}

impl<S: KeyValueStore> PlantStore<S> {
    pub fn open(storage: S) -> Self {
        Self::with_clock(storage, SystemClock)
    }

    pub fn with_clock(storage: S, clock: impl Clock + 'static) -> Self {
        let mut store = Self {
            storage,
            clock: Box::new(clock),
            plants: Vec::new(),
            thresholds: PlantStatusThresholds::default(),
        };
        store.reload();
        store
    }

    /// Throws away in-memory state and reads everything back from storage.
    pub fn reload(&mut self) {
        self.plants = self.load_plants();
        self.thresholds = self.load_thresholds();
    }

    fn load_plants(&mut self) -> Vec<Plant> {
        let saved = match self.storage.get(PLANTS_KEY) {
            Ok(saved) => saved,
            Err(e) => {
                tracing::error!("Failed to read plants from storage: {}", e);
                return Vec::new();
            }
        };

        match saved {
            Some(raw) => match serde_json::from_str::<Vec<Plant>>(&raw) {
                Ok(plants) => plants,
                Err(e) => {
                    // The raw value stays in storage so it can still be exported.
                    tracing::error!("Failed to parse plants from storage: {}", e);
                    Vec::new()
                }
            },
            None => {
                tracing::info!("No saved plants found, adding a sample plant");
                let plants = vec![sample_plant()];
                self.write_json(PLANTS_KEY, &plants);
                plants
            }
        }
    }

    fn load_thresholds(&mut self) -> PlantStatusThresholds {
        let saved = match self.storage.get(THRESHOLDS_KEY) {
            Ok(saved) => saved,
            Err(e) => {
                tracing::error!("Failed to read thresholds from storage: {}", e);
                return PlantStatusThresholds::default();
            }
        };

        let parsed = match saved {
            Some(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(value) => {
                    let thresholds = parse_thresholds(&value);
                    if thresholds.is_none() {
                        tracing::warn!("Saved thresholds are malformed, resetting to defaults");
                    }
                    thresholds
                }
                Err(e) => {
                    tracing::error!("Failed to parse thresholds from storage: {}", e);
                    None
                }
            },
            None => None,
        };

        match parsed {
            Some(thresholds) => thresholds,
            None => {
                let defaults = PlantStatusThresholds::default();
                self.write_json(THRESHOLDS_KEY, &defaults);
                defaults
            }
        }
    }

    fn write_json<T: serde::Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = self.storage.set(key, &json) {
            tracing::error!("Failed to save {}: {}", key, e);
        }
    }

    fn persist_plants(&mut self) {
        let plants = std::mem::take(&mut self.plants);
        self.write_json(PLANTS_KEY, &plants);
        self.plants = plants;
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn fresh_plant_id(&self) -> String {
        loop {
            let id = Ulid::new().to_string();
            if self.get_plant(&id).is_none() {
                return id;
            }
        }
    }

    fn plant_mut(&mut self, id: &str) -> Option<&mut Plant> {
        self.plants.iter_mut().find(|p| p.id == id)
    }

    /// Applies `change` to the plant with `id` and persists when it reports a
    /// change. Unknown ids are a silent no-op.
    fn modify<T>(&mut self, id: &str, change: impl FnOnce(&mut Plant) -> Option<T>) -> Option<T> {
        let result = change(self.plant_mut(id)?);
        if result.is_some() {
            self.persist_plants();
        }
        result
    }

    pub fn plants(&self) -> &[Plant] {
        &self.plants
    }

    pub fn thresholds(&self) -> PlantStatusThresholds {
        self.thresholds
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn get_plant(&self, id: &str) -> Option<&Plant> {
        self.plants.iter().find(|p| p.id == id)
    }

    pub fn add_plant(&mut self, data: NewPlant) -> Plant {
        let plant = Plant {
            id: self.fresh_plant_id(),
            name: data.name,
            scientific_name: non_blank(data.scientific_name),
            location: non_blank(data.location),
            notes: non_blank(data.notes),
            image_urls: Vec::new(),
            schedules: Vec::new(),
            care_log: Vec::new(),
            archived: false,
        };
        tracing::debug!(plant_id = %plant.id, "Adding plant");
        self.plants.push(plant.clone());
        self.persist_plants();
        plant
    }

    pub fn update_plant(&mut self, id: &str, patch: PlantPatch) -> bool {
        tracing::debug!(plant_id = id, "Updating plant");
        self.modify(id, |plant| {
            patch.apply_to(plant);
            Some(())
        })
        .is_some()
    }

    pub fn delete_plant(&mut self, id: &str) -> bool {
        let before = self.plants.len();
        self.plants.retain(|p| p.id != id);
        if self.plants.len() == before {
            return false;
        }
        tracing::debug!(plant_id = id, "Deleted plant");
        self.persist_plants();
        true
    }

    pub fn archive_plant(&mut self, id: &str) -> bool {
        tracing::debug!(plant_id = id, "Archiving plant");
        self.modify(id, |plant| {
            plant.archived = true;
            Some(())
        })
        .is_some()
    }

    /// Logs an activity at the current time, newest first, and pushes
    /// forward every schedule the activity satisfies.
    pub fn add_care_activity(
        &mut self,
        plant_id: &str,
        kind: ActivityType,
        notes: Option<String>,
    ) -> Option<CareActivity> {
        let now = self.now();
        let activity = CareActivity {
            id: Ulid::new().to_string(),
            kind,
            date: now,
            notes: non_blank(notes),
        };
        tracing::debug!(plant_id, activity = %kind, "Logging care activity");
        self.modify(plant_id, move |plant| {
            let satisfied = kind.schedule_type();
            for schedule in plant.schedules.iter_mut().filter(|s| s.kind == satisfied) {
                schedule.performed(now);
            }
            plant.care_log.insert(0, activity.clone());
            Some(activity)
        })
    }

    pub fn remove_care_activity(&mut self, plant_id: &str, activity_id: &str) -> bool {
        self.modify(plant_id, |plant| {
            let before = plant.care_log.len();
            plant.care_log.retain(|a| a.id != activity_id);
            (plant.care_log.len() != before).then_some(())
        })
        .is_some()
    }

    pub fn add_schedule(
        &mut self,
        plant_id: &str,
        kind: ScheduleType,
        frequency: u32,
    ) -> Option<Schedule> {
        let now = self.now();
        let frequency = frequency.min(MAX_FREQUENCY_DAYS);
        let schedule = Schedule {
            id: Ulid::new().to_string(),
            kind,
            frequency,
            last_performed: now,
            next_due: Schedule::due_after(now, frequency),
            enabled: true,
        };
        self.modify(plant_id, move |plant| {
            plant.schedules.push(schedule.clone());
            Some(schedule)
        })
    }

    pub fn set_schedule_enabled(&mut self, plant_id: &str, schedule_id: &str, enabled: bool) -> bool {
        self.modify(plant_id, |plant| {
            let schedule = plant.schedules.iter_mut().find(|s| s.id == schedule_id)?;
            schedule.enabled = enabled;
            Some(())
        })
        .is_some()
    }

    pub fn add_photo(&mut self, plant_id: &str, url: &str) -> bool {
        self.modify(plant_id, |plant| {
            plant.image_urls.push(url.to_string());
            Some(())
        })
        .is_some()
    }

    /// Drops every copy of `url` from the plant's photos.
    pub fn remove_photo(&mut self, plant_id: &str, url: &str) -> bool {
        self.modify(plant_id, |plant| {
            let before = plant.image_urls.len();
            plant.image_urls.retain(|u| u != url);
            (plant.image_urls.len() != before).then_some(())
        })
        .is_some()
    }

    pub fn update_thresholds(&mut self, thresholds: PlantStatusThresholds) {
        tracing::debug!(
            warning_days = thresholds.warning_days,
            danger_days = thresholds.danger_days,
            "Updating thresholds"
        );
        self.thresholds = thresholds;
        self.write_json(THRESHOLDS_KEY, &thresholds);
    }

    pub fn export_backup(&self) -> Result<Value, BackupError> {
        backup::export_storage(&self.storage)
    }

    /// Writes every key of a backup document into storage, then reloads the
    /// store from it. Returns the number of keys written.
    pub fn import_backup(&mut self, document: &str) -> Result<usize, BackupError> {
        let written = backup::import_storage(&mut self.storage, document)?;
        self.reload();
        tracing::info!("Imported {} keys from backup", written);
        Ok(written)
    }
}

fn sample_plant() -> Plant {
    Plant {
        id: "1".to_string(),
        name: "Pandu".to_string(),
        scientific_name: None,
        location: Some("Living Room".to_string()),
        notes: None,
        image_urls: Vec::new(),
        schedules: Vec::new(),
        care_log: Vec::new(),
        archived: false,
    }
}

/// Accepts any pair of JSON numbers. Whole day counts are compared with
/// `>=`, so a fraction rounds up; negatives clamp to zero.
fn parse_thresholds(value: &Value) -> Option<PlantStatusThresholds> {
    let day_count = |field: &str| -> Option<u32> {
        let days = value.get(field)?.as_f64()?;
        Some(days.max(0.0).ceil() as u32)
    };
    Some(PlantStatusThresholds {
        warning_days: day_count("warningDays")?,
        danger_days: day_count("dangerDays")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStorage;
    use chrono::{Duration, TimeZone};
    use std::rc::Rc;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap()
    }

    fn store() -> (PlantStore<MemoryStorage>, Rc<ManualClock>) {
        let clock = Rc::new(ManualClock::new(start()));
        let store = PlantStore::with_clock(MemoryStorage::new(), Rc::clone(&clock));
        (store, clock)
    }

    fn saved_plants(store: &PlantStore<MemoryStorage>) -> Vec<Plant> {
        let raw = store.storage().get(PLANTS_KEY).unwrap().unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    fn fern() -> NewPlant {
        NewPlant {
            name: "Fern".into(),
            location: Some("Bathroom".into()),
            ..Default::default()
        }
    }

    #[test]
    fn first_open_seeds_sample_and_default_thresholds() {
        let (store, _) = store();
        assert_eq!(store.plants().len(), 1);
        assert_eq!(store.plants()[0].id, "1");
        assert_eq!(store.plants()[0].name, "Pandu");
        assert_eq!(saved_plants(&store), store.plants());
        assert_eq!(store.thresholds(), PlantStatusThresholds::default());
        assert_eq!(
            store.storage().get(THRESHOLDS_KEY).unwrap().as_deref(),
            Some(r#"{"warningDays":14,"dangerDays":30}"#)
        );
    }

    #[test]
    fn empty_saved_list_is_not_reseeded() {
        let mut storage = MemoryStorage::new();
        storage.set(PLANTS_KEY, "[]").unwrap();
        let store = PlantStore::open(storage);
        assert!(store.plants().is_empty());
    }

    #[test]
    fn corrupt_plants_fall_back_to_empty_without_overwriting() {
        let mut storage = MemoryStorage::new();
        storage.set(PLANTS_KEY, "[{oops").unwrap();
        let store = PlantStore::open(storage);
        assert!(store.plants().is_empty());
        assert_eq!(
            store.storage().get(PLANTS_KEY).unwrap().as_deref(),
            Some("[{oops")
        );
    }

    #[test]
    fn malformed_thresholds_reset_to_defaults() {
        for raw in [
            r#"{"warningDays":"7","dangerDays":20}"#,
            r#"{"warningDays":7}"#,
            "not json",
        ] {
            let mut storage = MemoryStorage::new();
            storage.set(THRESHOLDS_KEY, raw).unwrap();
            let store = PlantStore::open(storage);
            assert_eq!(store.thresholds(), PlantStatusThresholds::default(), "{raw}");
            assert_eq!(
                store.storage().get(THRESHOLDS_KEY).unwrap().as_deref(),
                Some(r#"{"warningDays":14,"dangerDays":30}"#)
            );
        }
    }

    #[test]
    fn numeric_thresholds_are_accepted() {
        let mut storage = MemoryStorage::new();
        storage
            .set(THRESHOLDS_KEY, r#"{"warningDays":7.9,"dangerDays":-2}"#)
            .unwrap();
        let store = PlantStore::open(storage);
        assert_eq!(
            store.thresholds(),
            PlantStatusThresholds {
                warning_days: 8,
                danger_days: 0
            }
        );
        assert_eq!(
            crate::status::watering_status(Some(7), &store.thresholds()),
            crate::status::WateringStatus::Normal
        );
    }

    #[test]
    fn add_plant_starts_empty_and_persists() {
        let (mut store, _) = store();
        let plant = store.add_plant(NewPlant {
            scientific_name: Some("  ".into()),
            ..fern()
        });
        assert_ne!(plant.id, "1");
        assert!(plant.care_log.is_empty() && plant.schedules.is_empty());
        assert!(plant.image_urls.is_empty());
        assert!(!plant.archived);
        assert_eq!(plant.scientific_name, None);
        assert_eq!(store.plants().last(), Some(&plant));
        assert_eq!(saved_plants(&store).len(), 2);
    }

    #[test]
    fn update_merges_and_ignores_unknown_ids() {
        let (mut store, _) = store();
        let id = store.add_plant(fern()).id;
        assert!(store.update_plant(
            &id,
            PlantPatch {
                notes: Some("likes humidity".into()),
                ..Default::default()
            }
        ));
        let plant = store.get_plant(&id).unwrap();
        assert_eq!(plant.name, "Fern");
        assert_eq!(plant.notes.as_deref(), Some("likes humidity"));
        assert_eq!(saved_plants(&store)[1].notes.as_deref(), Some("likes humidity"));

        assert!(!store.update_plant("missing", PlantPatch::default()));
    }

    #[test]
    fn delete_removes_from_lookup_and_snapshot() {
        let (mut store, _) = store();
        let id = store.add_plant(fern()).id;
        assert!(store.delete_plant(&id));
        assert!(store.get_plant(&id).is_none());
        assert!(saved_plants(&store).iter().all(|p| p.id != id));
        assert!(!store.delete_plant(&id));
    }

    #[test]
    fn deleting_the_last_plant_persists_an_empty_list() {
        let (mut store, _) = store();
        assert!(store.delete_plant("1"));
        assert!(saved_plants(&store).is_empty());
    }

    #[test]
    fn archive_sets_flag() {
        let (mut store, _) = store();
        assert!(store.archive_plant("1"));
        assert!(store.get_plant("1").unwrap().archived);
        assert!(saved_plants(&store)[0].archived);
    }

    #[test]
    fn care_log_is_newest_first() {
        let (mut store, clock) = store();
        store.add_care_activity("1", ActivityType::Watered, None);
        clock.advance(Duration::hours(3));
        let misted = store
            .add_care_activity("1", ActivityType::Misted, Some("leaves dusty".into()))
            .unwrap();
        let log = &store.get_plant("1").unwrap().care_log;
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], misted);
        assert_eq!(log[0].date, start() + Duration::hours(3));
        assert_eq!(log[1].kind, ActivityType::Watered);
    }

    #[test]
    fn care_activity_on_unknown_plant_is_noop() {
        let (mut store, _) = store();
        assert!(store
            .add_care_activity("nope", ActivityType::Watered, None)
            .is_none());
        assert!(store.get_plant("1").unwrap().care_log.is_empty());
    }

    #[test]
    fn activity_pushes_matching_schedules_only() {
        let (mut store, clock) = store();
        let fertilizing = store.add_schedule("1", ScheduleType::Fertilization, 30).unwrap();
        let misting = store.add_schedule("1", ScheduleType::Misting, 2).unwrap();
        assert_eq!(fertilizing.last_performed, start());
        assert_eq!(fertilizing.next_due, start() + Duration::days(30));
        assert!(fertilizing.enabled);

        clock.advance(Duration::days(5));
        store.add_care_activity("1", ActivityType::Fertilized, None);

        let plant = store.get_plant("1").unwrap();
        let fert = plant.schedules.iter().find(|s| s.id == fertilizing.id).unwrap();
        assert_eq!(fert.last_performed, start() + Duration::days(5));
        assert_eq!(fert.next_due, start() + Duration::days(35));
        let mist = plant.schedules.iter().find(|s| s.id == misting.id).unwrap();
        assert_eq!(mist, &misting);
    }

    #[test]
    fn remove_care_activity_by_id() {
        let (mut store, _) = store();
        let a = store.add_care_activity("1", ActivityType::Pruned, None).unwrap();
        let b = store.add_care_activity("1", ActivityType::Moved, None).unwrap();
        assert!(store.remove_care_activity("1", &a.id));
        assert!(!store.remove_care_activity("1", &a.id));
        assert_eq!(store.get_plant("1").unwrap().care_log, vec![b]);
    }

    #[test]
    fn schedules_can_be_disabled() {
        let (mut store, _) = store();
        let schedule = store.add_schedule("1", ScheduleType::Watering, 7).unwrap();
        assert!(store.set_schedule_enabled("1", &schedule.id, false));
        assert!(!store.get_plant("1").unwrap().schedules[0].enabled);
        assert!(!store.set_schedule_enabled("1", "missing", true));
        assert!(store.add_schedule("missing", ScheduleType::Watering, 7).is_none());
    }

    #[test]
    fn oversized_frequency_is_capped_instead_of_overflowing() {
        let (mut store, clock) = store();
        let schedule = store
            .add_schedule("1", ScheduleType::Watering, 200_000_000)
            .unwrap();
        assert_eq!(schedule.frequency, MAX_FREQUENCY_DAYS);
        assert_eq!(
            schedule.next_due,
            start() + Duration::days(i64::from(MAX_FREQUENCY_DAYS))
        );

        clock.advance(Duration::days(1));
        store.add_care_activity("1", ActivityType::Watered, None);
        assert_eq!(
            store.get_plant("1").unwrap().schedules[0].next_due,
            start() + Duration::days(1 + i64::from(MAX_FREQUENCY_DAYS))
        );
    }

    #[test]
    fn photos_append_and_remove_every_copy() {
        let (mut store, _) = store();
        assert!(store.add_photo("1", "https://img/a.jpg"));
        assert!(store.add_photo("1", "https://img/b.jpg"));
        assert!(store.add_photo("1", "https://img/a.jpg"));
        assert!(store.remove_photo("1", "https://img/a.jpg"));
        assert_eq!(store.get_plant("1").unwrap().image_urls, vec!["https://img/b.jpg"]);
        assert!(!store.remove_photo("1", "https://img/a.jpg"));
        assert!(!store.add_photo("missing", "https://img/c.jpg"));
    }

    #[test]
    fn thresholds_update_persists() {
        let (mut store, _) = store();
        let t = PlantStatusThresholds {
            warning_days: 5,
            danger_days: 9,
        };
        store.update_thresholds(t);
        assert_eq!(store.thresholds(), t);
        assert_eq!(
            store.storage().get(THRESHOLDS_KEY).unwrap().as_deref(),
            Some(r#"{"warningDays":5,"dangerDays":9}"#)
        );
    }

    #[test]
    fn reopen_restores_state() {
        let (mut store, _) = store();
        let id = store.add_plant(fern()).id;
        store.add_care_activity(&id, ActivityType::Watered, None);
        let snapshot = store.plants().to_vec();

        let reopened = PlantStore::open(store.storage().clone());
        assert_eq!(reopened.plants(), snapshot.as_slice());
    }
}
