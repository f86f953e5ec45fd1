// File: viprestore/src/selection/mod.rs
//! Persisted service selections.
//!
//! A selection file maps a service id to the schedule and definition needed
//! to book that service again:
//!
//! ```json
//! {
//!   "svc-1": {
//!     "scheduleInfo": { "startTimestamp": 1700000000000, "type": "once" },
//!     "serviceDefinition": {
//!       "from": "dev-1", "to": "dev-2",
//!       "fromLabel": "CAM 1", "toLabel": "MON 4",
//!       "profileId": "p-hd", "profileName": "HD",
//!       "type": "connection"
//!     }
//!   }
//! }
//! ```
//!
//! Audit history and allocation state are not persisted. Keys this module does
//! not model are carried through untouched so files written by other tools
//! survive a load/save cycle.

use indexmap::IndexMap;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::constants::selection::{CONNECTION_CTYPE, SERVICE_TYPE_CONNECTION};
use crate::errors::{FormatError, IoError, RestoreError};
use crate::model::{RecurrenceType, Schedule, ServiceId, ServiceRecord};

const SCHEDULE_INFO_KEY: &str = "scheduleInfo";
const SERVICE_DEFINITION_KEY: &str = "serviceDefinition";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInfo {
    pub start_timestamp: i64,
    #[serde(rename = "type", default)]
    pub recurrence: RecurrenceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_timestamp: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ScheduleInfo {
    pub fn to_schedule(&self) -> Schedule {
        Schedule {
            start_timestamp: self.start_timestamp,
            end_timestamp: self.end_timestamp,
            recurrence: self.recurrence.clone(),
        }
    }
}

/// Every booking is persisted as a single `once` window. A recurrent
/// instance already carries its own start and end, and the controller has no
/// recurrence pattern to go with any other token.
impl From<&Schedule> for ScheduleInfo {
    fn from(schedule: &Schedule) -> Self {
        Self {
            start_timestamp: schedule.start_timestamp,
            recurrence: RecurrenceType::Once,
            end_timestamp: schedule.end_timestamp,
            extra: Map::new(),
        }
    }
}

fn default_service_type() -> String {
    SERVICE_TYPE_CONNECTION.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDefinition {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub from_label: String,
    #[serde(default)]
    pub to_label: String,
    pub profile_id: String,
    #[serde(default)]
    pub profile_name: String,
    #[serde(rename = "type", default = "default_service_type")]
    pub service_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ServiceDefinition {
    pub fn source_display(&self) -> &str {
        if self.from_label.is_empty() {
            &self.from
        } else {
            &self.from_label
        }
    }

    pub fn destination_display(&self) -> &str {
        if self.to_label.is_empty() {
            &self.to
        } else {
            &self.to_label
        }
    }

    pub fn profile_display(&self) -> &str {
        if self.profile_name.is_empty() {
            &self.profile_id
        } else {
            &self.profile_name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionEntry {
    pub schedule_info: ScheduleInfo,
    pub service_definition: ServiceDefinition,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SelectionEntry {
    /// Project a record onto the persisted shape.
    pub fn from_record(record: &ServiceRecord) -> Self {
        let mut definition_extra = Map::new();
        definition_extra.insert(
            "descriptor".to_string(),
            json!({ "label": record.descriptor.label, "desc": record.descriptor.desc }),
        );
        definition_extra.insert("tags".to_string(), json!(record.tags));
        definition_extra.insert("ctype".to_string(), json!(CONNECTION_CTYPE));

        let mut entry_extra = Map::new();
        entry_extra.insert("locked".to_string(), Value::Bool(false));

        Self {
            schedule_info: ScheduleInfo::from(&record.schedule),
            service_definition: ServiceDefinition {
                from: record.from.id.clone(),
                to: record.to.id.clone(),
                from_label: record.from.label.clone(),
                to_label: record.to.label.clone(),
                profile_id: record.profile.id.clone(),
                profile_name: record.profile.name.clone(),
                service_type: SERVICE_TYPE_CONNECTION.to_string(),
                extra: definition_extra,
            },
            extra: entry_extra,
        }
    }

    /// Validate and decode one entry of a selection file.
    fn from_value(service_id: &str, value: Value) -> Result<Self, FormatError> {
        let Value::Object(map) = &value else {
            return Err(FormatError::InvalidEntry {
                service_id: service_id.to_string(),
                reason: "entry is not an object".to_string(),
            });
        };

        let schedule = required_object(service_id, map, SCHEDULE_INFO_KEY)?;
        require_present(service_id, schedule, "startTimestamp", SCHEDULE_INFO_KEY)?;

        let definition = required_object(service_id, map, SERVICE_DEFINITION_KEY)?;
        for field in ["from", "to", "profileId"] {
            require_non_empty_string(service_id, definition, field)?;
        }

        serde_json::from_value(value).map_err(|e| FormatError::InvalidEntry {
            service_id: service_id.to_string(),
            reason: e.to_string(),
        })
    }
}

fn required_object<'a>(
    service_id: &str,
    map: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a Map<String, Value>, FormatError> {
    match map.get(key) {
        Some(Value::Object(inner)) => Ok(inner),
        Some(_) => Err(FormatError::InvalidEntry {
            service_id: service_id.to_string(),
            reason: format!("'{}' is not an object", key),
        }),
        None => Err(FormatError::MissingField {
            service_id: service_id.to_string(),
            field: key.to_string(),
        }),
    }
}

fn require_present(
    service_id: &str,
    map: &Map<String, Value>,
    field: &str,
    parent: &str,
) -> Result<(), FormatError> {
    match map.get(field) {
        Some(Value::Null) | None => Err(FormatError::MissingField {
            service_id: service_id.to_string(),
            field: format!("{}.{}", parent, field),
        }),
        Some(_) => Ok(()),
    }
}

fn require_non_empty_string(
    service_id: &str,
    map: &Map<String, Value>,
    field: &str,
) -> Result<(), FormatError> {
    match map.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(()),
        Some(Value::String(_)) | Some(Value::Null) | None => Err(FormatError::MissingField {
            service_id: service_id.to_string(),
            field: format!("{}.{}", SERVICE_DEFINITION_KEY, field),
        }),
        Some(_) => Err(FormatError::InvalidEntry {
            service_id: service_id.to_string(),
            reason: format!("'{}.{}' is not a string", SERVICE_DEFINITION_KEY, field),
        }),
    }
}

/// Ordered mapping from service id to persisted entry
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct SelectionFile {
    entries: IndexMap<ServiceId, SelectionEntry>,
}

impl SelectionFile {
    /// Project records, keeping the first record for a repeated id.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a ServiceRecord>,
    {
        let mut entries = IndexMap::new();
        for record in records {
            entries
                .entry(record.service_id.clone())
                .or_insert_with(|| SelectionEntry::from_record(record));
        }
        Self { entries }
    }

    pub fn from_entries(entries: IndexMap<ServiceId, SelectionEntry>) -> Self {
        Self { entries }
    }

    /// Parse and validate file content. Any problem is a `FormatError`.
    pub fn parse(content: &str) -> Result<Self, FormatError> {
        // Decoding straight into an IndexMap keeps the entries in file order.
        let map: IndexMap<ServiceId, Value> = match serde_json::from_str(content) {
            Ok(map) => map,
            Err(e) => {
                return Err(match serde_json::from_str::<IgnoredAny>(content) {
                    Ok(_) => FormatError::NotAMapping,
                    Err(_) => FormatError::InvalidJson {
                        reason: e.to_string(),
                    },
                })
            }
        };

        let mut entries = IndexMap::with_capacity(map.len());
        for (service_id, entry) in map {
            let entry = SelectionEntry::from_value(&service_id, entry)?;
            entries.insert(service_id, entry);
        }
        Ok(Self { entries })
    }

    pub fn to_json(&self) -> Result<String, FormatError> {
        serde_json::to_string_pretty(self).map_err(|e| FormatError::InvalidJson {
            reason: e.to_string(),
        })
    }

    pub async fn load(path: &Path) -> Result<Self, RestoreError> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| IoError::new(path.display().to_string(), "read", &e))?;

        let file = Self::parse(&content)?;
        info!("Loaded {} service(s) from {}", file.len(), path.display());
        Ok(file)
    }

    /// Write to `path` atomically: a sibling temp file is written first and
    /// renamed over the destination, so readers never see a partial file.
    pub async fn save(&self, path: &Path) -> Result<(), RestoreError> {
        let json = self.to_json()?;
        let shown = path.display().to_string();

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "selection.json".to_string());
        let temp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

        if let Err(e) = fs::write(&temp_path, json.as_bytes()).await {
            return Err(IoError::new(shown, "write", &e).into());
        }

        if let Err(e) = fs::rename(&temp_path, path).await {
            if let Err(cleanup) = fs::remove_file(&temp_path).await {
                warn!("Failed to remove temp file {}: {}", temp_path.display(), cleanup);
            }
            return Err(IoError::new(shown, "replace", &e).into());
        }

        debug!("Wrote {} bytes to {}", json.len(), shown);
        info!("Saved {} service(s) to {}", self.len(), shown);
        Ok(())
    }

    pub fn get(&self, service_id: &str) -> Option<&SelectionEntry> {
        self.entries.get(service_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ServiceId> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ServiceId, &SelectionEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_keys_survive_parse_and_serialize() {
        let content = r#"{
            "svc-1": {
                "locked": false,
                "scheduleInfo": { "startTimestamp": 10, "type": "once", "endTimestamp": 0 },
                "serviceDefinition": {
                    "from": "a", "to": "b", "profileId": "p",
                    "ctype": 2, "allocationState": 0
                }
            }
        }"#;

        let file = SelectionFile::parse(content).unwrap();
        let entry = file.get("svc-1").unwrap();
        assert_eq!(entry.extra.get("locked"), Some(&Value::Bool(false)));
        assert_eq!(entry.schedule_info.end_timestamp, Some(0));
        assert_eq!(entry.service_definition.service_type, "connection");
        assert_eq!(entry.service_definition.extra.get("ctype"), Some(&json!(2)));

        let reparsed = SelectionFile::parse(&file.to_json().unwrap()).unwrap();
        assert_eq!(reparsed, file);
    }

    #[test]
    fn test_wrong_type_is_invalid_entry() {
        let content = r#"{
            "svc-1": {
                "scheduleInfo": { "startTimestamp": "soon" },
                "serviceDefinition": { "from": "a", "to": "b", "profileId": "p" }
            }
        }"#;

        assert!(matches!(
            SelectionFile::parse(content),
            Err(FormatError::InvalidEntry { .. })
        ));
    }

    #[test]
    fn test_display_fallbacks() {
        let definition = ServiceDefinition {
            from: "dev-1".to_string(),
            to: "dev-2".to_string(),
            from_label: String::new(),
            to_label: "MON".to_string(),
            profile_id: "p".to_string(),
            profile_name: String::new(),
            service_type: default_service_type(),
            extra: Map::new(),
        };
        assert_eq!(definition.source_display(), "dev-1");
        assert_eq!(definition.destination_display(), "MON");
        assert_eq!(definition.profile_display(), "p");
    }
}
