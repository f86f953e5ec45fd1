// File: viprestore/src/model/snapshot.rs
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::{ServiceId, ServiceKind, ServiceRecord};
use crate::errors::RestoreError;

/// A distinct profile present in a record collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileOption {
    pub id: String,
    pub name: String,
}

/// All records returned by one controller listing, indexed by service id.
///
/// Later listings replace the snapshot wholesale; nothing here is patched in place.
#[derive(Debug, Clone, Default)]
pub struct ServiceSnapshot {
    records: Vec<ServiceRecord>,
    index: HashMap<ServiceId, usize>,
}

impl ServiceSnapshot {
    /// Build a snapshot. A repeated service id keeps its first occurrence.
    pub fn new(records: Vec<ServiceRecord>) -> Self {
        let mut kept = Vec::with_capacity(records.len());
        let mut index = HashMap::with_capacity(records.len());

        for record in records {
            if index.contains_key(&record.service_id) {
                debug!("Dropping duplicate service id {} from snapshot", record.service_id);
                continue;
            }
            index.insert(record.service_id.clone(), kept.len());
            kept.push(record);
        }

        Self {
            records: kept,
            index,
        }
    }

    pub fn records(&self) -> &[ServiceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, service_id: &str) -> Option<&ServiceRecord> {
        self.index.get(service_id).map(|&i| &self.records[i])
    }

    /// Records shown in the service listing: everything except group services.
    pub fn endpoint_services(&self) -> Vec<ServiceRecord> {
        self.records
            .iter()
            .filter(|r| r.kind == ServiceKind::EndpointBased)
            .cloned()
            .collect()
    }

    /// Records whose `group_parent_id` points at `group_id`.
    pub fn children_of(&self, group_id: &str) -> Vec<&ServiceRecord> {
        self.records
            .iter()
            .filter(|r| r.group_parent_id.as_deref() == Some(group_id))
            .collect()
    }

    /// Resolve a record's group parent.
    ///
    /// `Ok(None)` when the record has no parent. A parent id that is not in
    /// this snapshot is a `DanglingReference`; the record itself stays usable.
    pub fn resolve_group_parent(
        &self,
        record: &ServiceRecord,
    ) -> Result<Option<&ServiceRecord>, RestoreError> {
        let Some(parent_id) = record.group_parent_id.as_deref() else {
            return Ok(None);
        };

        self.get(parent_id)
            .map(Some)
            .ok_or_else(|| RestoreError::DanglingReference {
                service_id: record.service_id.clone(),
                parent_id: parent_id.to_string(),
            })
    }

    pub fn profile_options(&self) -> Vec<ProfileOption> {
        profile_options(&self.records)
    }
}

/// Distinct profiles of `records`, sorted by lowercase name then id.
///
/// Recompute whenever the base collection changes; the option list is never static.
pub fn profile_options(records: &[ServiceRecord]) -> Vec<ProfileOption> {
    let mut by_id: BTreeMap<&str, &str> = BTreeMap::new();
    for record in records {
        if record.profile.id.is_empty() {
            continue;
        }
        by_id
            .entry(record.profile.id.as_str())
            .or_insert(record.profile.name.as_str());
    }

    let mut options: Vec<ProfileOption> = by_id
        .into_iter()
        .map(|(id, name)| ProfileOption {
            id: id.to_string(),
            name: if name.is_empty() { id.to_string() } else { name.to_string() },
        })
        .collect();

    options.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EndpointRef, ProfileRef, Schedule};

    fn record(id: &str, profile: (&str, &str)) -> ServiceRecord {
        ServiceRecord::endpoint_based(
            id,
            EndpointRef::new("src", "Source"),
            EndpointRef::new("dst", "Destination"),
            ProfileRef::new(profile.0, profile.1),
            Schedule::once(0, None),
        )
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let mut second = record("svc-1", ("p2", "Other"));
        second.created_by = "second".to_string();
        let snapshot = ServiceSnapshot::new(vec![record("svc-1", ("p1", "HD")), second]);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get("svc-1").map(|r| r.profile.id.as_str()), Some("p1"));
    }

    #[test]
    fn test_resolve_group_parent() {
        let mut group = record("group-1", ("p1", "HD"));
        group.kind = ServiceKind::GroupBased;
        let mut child = record("svc-1", ("p1", "HD"));
        child.group_parent_id = Some("group-1".to_string());
        let mut orphan = record("svc-2", ("p1", "HD"));
        orphan.group_parent_id = Some("group-9".to_string());
        let plain = record("svc-3", ("p1", "HD"));

        let snapshot = ServiceSnapshot::new(vec![group, child.clone(), orphan.clone(), plain.clone()]);

        let parent = snapshot.resolve_group_parent(&child).unwrap();
        assert_eq!(parent.map(|p| p.service_id.as_str()), Some("group-1"));
        assert!(snapshot.resolve_group_parent(&plain).unwrap().is_none());
        assert!(matches!(
            snapshot.resolve_group_parent(&orphan),
            Err(RestoreError::DanglingReference { ref parent_id, .. }) if parent_id == "group-9"
        ));
        assert_eq!(snapshot.children_of("group-1").len(), 1);
        assert_eq!(snapshot.endpoint_services().len(), 3);
    }

    #[test]
    fn test_profile_options_sorted_and_distinct() {
        let records = vec![
            record("a", ("p2", "uhd")),
            record("b", ("p1", "HD")),
            record("c", ("p2", "uhd")),
            record("d", ("p3", "")),
        ];

        let options = profile_options(&records);
        let ids: Vec<&str> = options.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p3", "p2"]);
        assert_eq!(options[1].name, "p3");
    }
}
