use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Something done to a plant. Serialized with the same names the browser
/// version used, so old backups still load.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Watered,
    Medicated,
    Fertilized,
    Misted,
    Wiped,
    Moved,
    Repotted,
    Pruned,
}

impl ActivityType {
    pub const ALL: [ActivityType; 8] = [
        ActivityType::Watered,
        ActivityType::Medicated,
        ActivityType::Fertilized,
        ActivityType::Misted,
        ActivityType::Wiped,
        ActivityType::Moved,
        ActivityType::Repotted,
        ActivityType::Pruned,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::Watered => "watered",
            ActivityType::Medicated => "medicated",
            ActivityType::Fertilized => "fertilized",
            ActivityType::Misted => "misted",
            ActivityType::Wiped => "wiped",
            ActivityType::Moved => "moved",
            ActivityType::Repotted => "repotted",
            ActivityType::Pruned => "pruned",
        }
    }

    /// The schedule kind that a logged activity of this type satisfies.
    pub fn schedule_type(self) -> ScheduleType {
        match self {
            ActivityType::Watered => ScheduleType::Watering,
            ActivityType::Medicated => ScheduleType::Medication,
            ActivityType::Fertilized => ScheduleType::Fertilization,
            ActivityType::Misted => ScheduleType::Misting,
            ActivityType::Wiped => ScheduleType::Wiping,
            ActivityType::Moved => ScheduleType::Moving,
            ActivityType::Repotted => ScheduleType::Repotting,
            ActivityType::Pruned => ScheduleType::Pruning,
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ActivityType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("unknown activity type '{s}'"))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleType {
    Watering,
    Medication,
    Fertilization,
    Misting,
    Wiping,
    Moving,
    Repotting,
    Pruning,
}

impl ScheduleType {
    pub const ALL: [ScheduleType; 8] = [
        ScheduleType::Watering,
        ScheduleType::Medication,
        ScheduleType::Fertilization,
        ScheduleType::Misting,
        ScheduleType::Wiping,
        ScheduleType::Moving,
        ScheduleType::Repotting,
        ScheduleType::Pruning,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScheduleType::Watering => "watering",
            ScheduleType::Medication => "medication",
            ScheduleType::Fertilization => "fertilization",
            ScheduleType::Misting => "misting",
            ScheduleType::Wiping => "wiping",
            ScheduleType::Moving => "moving",
            ScheduleType::Repotting => "repotting",
            ScheduleType::Pruning => "pruning",
        }
    }
}

impl fmt::Display for ScheduleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ScheduleType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("unknown schedule type '{s}'"))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CareActivity {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ScheduleType,
    /// Days between two performances.
    pub frequency: u32,
    pub last_performed: DateTime<Utc>,
    pub next_due: DateTime<Utc>,
    pub enabled: bool,
}

/// Longest repeat interval a schedule can have, in days.
pub const MAX_FREQUENCY_DAYS: u32 = 36_500;

impl Schedule {
    /// Due date `frequency` days after `at`. Frequencies beyond
    /// `MAX_FREQUENCY_DAYS` are capped, and a date past chrono's range stays
    /// at `at`.
    pub fn due_after(at: DateTime<Utc>, frequency: u32) -> DateTime<Utc> {
        let days = Duration::days(i64::from(frequency.min(MAX_FREQUENCY_DAYS)));
        at.checked_add_signed(days).unwrap_or(at)
    }

    /// Marks the schedule as performed at `at` and moves `next_due` forward.
    pub fn performed(&mut self, at: DateTime<Utc>) {
        self.last_performed = at;
        self.next_due = Self::due_after(at, self.frequency);
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Plant {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scientific_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub schedules: Vec<Schedule>,
    /// Newest entry first.
    #[serde(default)]
    pub care_log: Vec<CareActivity>,
    #[serde(default)]
    pub archived: bool,
}

impl Plant {
    /// Date of the most recent `watered` entry, wherever it sits in the log.
    pub fn last_watered(&self) -> Option<DateTime<Utc>> {
        self.care_log
            .iter()
            .filter(|a| a.kind == ActivityType::Watered)
            .map(|a| a.date)
            .max()
    }

    /// Location used for grouping; blank or missing locations have none.
    pub fn location_label(&self) -> Option<&str> {
        self.location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }
}

/// Fields a caller supplies when registering a plant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPlant {
    pub name: String,
    pub scientific_name: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

/// Blank text is stored as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Partial update merged into an existing plant. `None` leaves a field
/// alone; an empty string clears an optional one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlantPatch {
    pub name: Option<String>,
    pub scientific_name: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub image_urls: Option<Vec<String>>,
    pub archived: Option<bool>,
}

impl PlantPatch {
    pub fn is_empty(&self) -> bool {
        *self == PlantPatch::default()
    }

    pub fn apply_to(self, plant: &mut Plant) {
        if let Some(name) = self.name {
            plant.name = name;
        }
        if self.scientific_name.is_some() {
            plant.scientific_name = non_blank(self.scientific_name);
        }
        if self.location.is_some() {
            plant.location = non_blank(self.location);
        }
        if self.notes.is_some() {
            plant.notes = non_blank(self.notes);
        }
        if let Some(image_urls) = self.image_urls {
            plant.image_urls = image_urls;
        }
        if let Some(archived) = self.archived {
            plant.archived = archived;
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlantStatusThresholds {
    pub warning_days: u32,
    pub danger_days: u32,
}

impl Default for PlantStatusThresholds {
    fn default() -> Self {
        Self {
            warning_days: 14,
            danger_days: 30,
        }
    }
}
