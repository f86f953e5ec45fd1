// File: viprestore/src/remote/records.rs
//! Translation of controller REST payloads into [`ServiceRecord`]s.
//!
//! Controller payloads are loosely typed: timestamps and revisions arrive as
//! numbers or strings, and optional sections are simply absent. Everything
//! here degrades to empty values instead of failing; only a listing without
//! the services section at all is treated as an invalid response.

use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

use crate::errors::RemoteError;
use crate::model::{
    split_descriptor_label, AuditEntry, Descriptor, EndpointRef, ProfileRef, RecurrenceType,
    ResourceAllocation, Schedule, ServiceKind, ServiceRecord,
};

/// Lookup tables used to give records human-readable names
#[derive(Debug, Clone, Default)]
pub struct Directory {
    /// Profile id to profile name
    pub profiles: HashMap<String, String>,
    /// Endpoint (vertex) id to label
    pub endpoints: HashMap<String, String>,
}

impl Directory {
    pub fn endpoint_label(&self, id: &str) -> String {
        match self.endpoints.get(id) {
            Some(label) if !label.is_empty() => label.clone(),
            _ => id.to_string(),
        }
    }

    pub fn profile_name(&self, id: &str) -> String {
        match self.profiles.get(id) {
            Some(name) if !name.is_empty() => name.clone(),
            _ => id.to_string(),
        }
    }
}

/// Group services plus the reverse child index
#[derive(Debug, Clone, Default)]
pub struct GroupConnections {
    pub groups: Vec<ServiceRecord>,
    /// Child service id to group service id
    pub child_to_group: HashMap<String, String>,
}

fn lookup<'a>(body: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(body, |value, key| value.get(*key))
}

fn lookup_object<'a>(body: &'a Value, path: &[&str]) -> Option<&'a Map<String, Value>> {
    lookup(body, path).and_then(Value::as_object)
}

fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn timestamp(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The `currentModernServices` section of a listing response.
pub fn current_services(body: &Value) -> Result<&Map<String, Value>, RemoteError> {
    lookup_object(body, &["data", "status", "pathman", "currentModernServices"]).ok_or_else(|| {
        RemoteError::InvalidResponse {
            reason: "response has no data.status.pathman.currentModernServices".to_string(),
        }
    })
}

pub fn profile_names(body: &Value) -> HashMap<String, String> {
    let Some(profiles) = lookup_object(body, &["data", "config", "profiles"]) else {
        return HashMap::new();
    };

    profiles
        .iter()
        .map(|(id, info)| {
            let name = info.get("name").and_then(Value::as_str).unwrap_or(id);
            (id.clone(), name.to_string())
        })
        .collect()
}

/// Merge local graph elements and external endpoints into one label map.
/// Either payload may be missing; external labels win on id collisions.
pub fn endpoint_labels(local: Option<&Value>, external: Option<&Value>) -> HashMap<String, String> {
    let mut labels = HashMap::new();

    if let Some(elements) =
        local.and_then(|body| lookup_object(body, &["data", "config", "network", "nGraphElements"]))
    {
        for (id, element) in elements {
            let label = text(lookup(element, &["value", "descriptor", "label"]));
            labels.insert(id.clone(), if label.is_empty() { id.clone() } else { label });
        }
    }

    if let Some(endpoints) = external
        .and_then(|body| lookup_object(body, &["data", "status", "network", "externalEndpoints"]))
    {
        for (id, endpoint) in endpoints {
            let label = text(lookup(endpoint, &["descriptor", "label"]));
            labels.insert(id.clone(), if label.is_empty() { id.clone() } else { label });
        }
    }

    labels
}

fn descriptor_of(value: Option<&Value>) -> Descriptor {
    Descriptor {
        label: text(value.and_then(|d| d.get("label"))),
        desc: text(value.and_then(|d| d.get("desc"))),
    }
}

fn endpoints_for(
    from_id: String,
    to_id: String,
    descriptor: &Descriptor,
    directory: &Directory,
) -> (EndpointRef, EndpointRef) {
    let (from_label, to_label) = split_descriptor_label(&descriptor.label).unwrap_or_else(|| {
        (
            directory.endpoint_label(&from_id),
            directory.endpoint_label(&to_id),
        )
    });
    (
        EndpointRef::new(from_id, from_label),
        EndpointRef::new(to_id, to_label),
    )
}

fn audit_history(booking: &Value) -> Vec<AuditEntry> {
    booking
        .get("auditHistory")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .map(|entry| {
                    let revision = text(entry.get("rev"));
                    AuditEntry {
                        timestamp: text(entry.get("ts")),
                        actor: text(entry.get("user")),
                        action: text(entry.get("msg")),
                        revision: (!revision.is_empty()).then_some(revision),
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Build a record from one `currentModernServices` entry.
pub fn booking_to_record(service_id: &str, entry: &Value, directory: &Directory) -> ServiceRecord {
    let empty = Value::Null;
    let booking = entry.get("booking").unwrap_or(&empty);

    let descriptor = descriptor_of(booking.get("descriptor"));
    let (from, to) = endpoints_for(
        text(booking.get("from")),
        text(booking.get("to")),
        &descriptor,
        directory,
    );

    let profile_id = text(booking.get("profile"));
    let profile = ProfileRef::new(profile_id.clone(), directory.profile_name(&profile_id));

    // An end of 0 or a missing end means the booking never ends.
    let end = timestamp(booking.get("end")).filter(|end| *end > 0);
    let recurrence = if booking
        .get("isRecurrentInstance")
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        RecurrenceType::Recurring
    } else {
        RecurrenceType::Once
    };

    let revision = text(booking.get("rev"));
    let tags = booking
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| tags.iter().map(|t| text(Some(t))).collect())
        .unwrap_or_default();

    let id = text(booking.get("serviceId"));

    ServiceRecord {
        service_id: if id.is_empty() { service_id.to_string() } else { id },
        kind: ServiceKind::EndpointBased,
        allocation_state: text(booking.get("allocationState")),
        from,
        to,
        profile,
        schedule: Schedule {
            start_timestamp: timestamp(booking.get("start")).unwrap_or(0),
            end_timestamp: end,
            recurrence,
        },
        created_by: text(booking.get("createdBy")),
        group_parent_id: None,
        descriptor,
        tags,
        revision: (!revision.is_empty()).then_some(revision),
        resource_allocation: entry
            .get("res")
            .map(ResourceAllocation::from_value)
            .unwrap_or_default(),
        audit_history: audit_history(booking),
    }
}

/// Parse the group-connection listing.
pub fn group_connections(body: &Value, directory: &Directory) -> GroupConnections {
    let mut result = GroupConnections::default();
    let Some(services) = lookup_object(body, &["data", "status", "conman", "services"]) else {
        return result;
    };

    for (key, service) in services {
        let empty = Value::Null;
        let connection = service.get("connection").unwrap_or(&empty);
        let generic = connection.get("generic").unwrap_or(&empty);
        let specific = connection.get("specific").unwrap_or(&empty);

        let group_id = match text(connection.get("id")) {
            id if id.is_empty() => key.clone(),
            id => id,
        };

        if let Some(children) = specific.get("children").and_then(Value::as_object) {
            for child_id in children.keys() {
                result
                    .child_to_group
                    .insert(child_id.clone(), group_id.clone());
            }
        }

        let descriptor = descriptor_of(generic.get("descriptor"));
        let (from, to) = endpoints_for(
            text(connection.get("from")),
            text(connection.get("to")),
            &descriptor,
            directory,
        );
        let revision = text(connection.get("rev"));

        let mut record =
            ServiceRecord::endpoint_based(group_id, from, to, ProfileRef::default(), Schedule::default());
        record.kind = ServiceKind::GroupBased;
        record.allocation_state = text(generic.get("state"));
        record.descriptor = descriptor;
        record.revision = (!revision.is_empty()).then_some(revision);
        record.resource_allocation = ResourceAllocation::from_value(specific);
        result.groups.push(record);
    }

    debug!(
        "Parsed {} group services with {} children",
        result.groups.len(),
        result.child_to_group.len()
    );
    result
}

/// Combine endpoint-based and group services into one listing.
///
/// Children get their `group_parent_id` from the group index. A group id that
/// also appears as an endpoint-based service replaces it.
pub fn merge(
    services: &Map<String, Value>,
    groups: GroupConnections,
    directory: &Directory,
) -> Vec<ServiceRecord> {
    let group_ids: std::collections::HashSet<&str> =
        groups.groups.iter().map(|g| g.service_id.as_str()).collect();

    let mut records: Vec<ServiceRecord> = services
        .iter()
        .filter(|(id, _)| !group_ids.contains(id.as_str()))
        .map(|(id, entry)| {
            let mut record = booking_to_record(id, entry, directory);
            record.group_parent_id = groups.child_to_group.get(id).cloned();
            record
        })
        .collect();

    records.extend(groups.groups);
    records
}
