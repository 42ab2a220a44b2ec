//! Whole-storage backups: every key with its value, JSON values embedded
//! parsed and anything else as a plain string.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::error::BackupError;
use crate::storage::KeyValueStore;

pub fn backup_file_name(date: NaiveDate) -> String {
    format!("planti-backup-{}.json", date.format("%Y%m%d"))
}

pub fn export_storage<S: KeyValueStore + ?Sized>(storage: &S) -> Result<Value, BackupError> {
    let mut data = Map::new();
    for key in storage.keys()? {
        let item = match storage.get(&key) {
            Ok(Some(item)) => item,
            Ok(None) => continue,
            Err(e) => {
                tracing::error!("Error exporting key {}: {}", key, e);
                continue;
            }
        };
        let value = serde_json::from_str(&item).unwrap_or(Value::String(item));
        data.insert(key, value);
    }
    Ok(Value::Object(data))
}

/// Writes each key of `document` back verbatim: strings as-is, other values
/// re-serialized. A key that fails to store is logged and skipped.
pub fn import_storage<S: KeyValueStore + ?Sized>(
    storage: &mut S,
    document: &str,
) -> Result<usize, BackupError> {
    let parsed: Value =
        serde_json::from_str(document).map_err(|e| BackupError::InvalidFormat(e.to_string()))?;
    let Value::Object(entries) = parsed else {
        return Err(BackupError::InvalidFormat(
            "expected a JSON object of keys".to_string(),
        ));
    };

    let mut written = 0;
    for (key, value) in entries {
        let raw = match value {
            Value::String(s) => s,
            other => other.to_string(),
        };
        match storage.set(&key, &raw) {
            Ok(()) => written += 1,
            Err(e) => tracing::error!("Error importing key {}: {}", key, e),
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn file_name_uses_compact_date() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 9).unwrap();
        assert_eq!(backup_file_name(date), "planti-backup-20250109.json");
    }

    #[test]
    fn export_parses_json_and_keeps_plain_strings() {
        let mut storage = MemoryStorage::new();
        storage.set("plants", r#"[{"id":"1","name":"Pandu"}]"#).unwrap();
        storage.set("theme", "dark").unwrap();
        storage.set("empty", "").unwrap();

        assert_eq!(
            export_storage(&storage).unwrap(),
            json!({
                "empty": "",
                "plants": [{"id": "1", "name": "Pandu"}],
                "theme": "dark",
            })
        );
    }

    #[test]
    fn import_writes_strings_verbatim_and_serializes_the_rest() {
        let mut storage = MemoryStorage::new();
        let written = import_storage(
            &mut storage,
            r#"{"theme":"dark","plantStatusThresholds":{"warningDays":3,"dangerDays":6},"count":4}"#,
        )
        .unwrap();
        assert_eq!(written, 3);
        assert_eq!(storage.get("theme").unwrap().as_deref(), Some("dark"));
        assert_eq!(storage.get("count").unwrap().as_deref(), Some("4"));
        assert_eq!(
            storage.get("plantStatusThresholds").unwrap().as_deref(),
            Some(r#"{"dangerDays":6,"warningDays":3}"#)
        );
    }

    #[test]
    fn import_rejects_non_objects() {
        let mut storage = MemoryStorage::new();
        for bad in ["not json", "[1,2]", "\"plants\""] {
            assert!(matches!(
                import_storage(&mut storage, bad),
                Err(BackupError::InvalidFormat(_))
            ));
        }
        assert!(storage.keys().unwrap().is_empty());
    }
}
