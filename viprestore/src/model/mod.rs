// File: viprestore/src/model/mod.rs
//! In-memory representation of controller services.
//!
//! A `ServiceRecord` is built once per controller listing and never mutated by
//! the engine. Group membership is a lookup key (`group_parent_id`) resolved
//! through a `ServiceSnapshot`, never an owning link.

pub mod allocation;
pub mod snapshot;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::constants::selection::SCHEDULE_TYPE_ONCE;

pub use allocation::{AllocationNode, PathRole, ResourceAllocation};
pub use snapshot::{ProfileOption, ServiceSnapshot};

/// Controller-assigned (or, for files, client-assigned) service identity
pub type ServiceId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceKind {
    EndpointBased,
    GroupBased,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EndpointRef {
    pub id: String,
    pub label: String,
}

impl EndpointRef {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileRef {
    pub id: String,
    pub name: String,
}

impl ProfileRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Schedule recurrence as the controller spells it.
///
/// Unknown tokens are kept verbatim so they survive a save/restore cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum RecurrenceType {
    #[default]
    Once,
    Recurring,
    Other(String),
}

impl RecurrenceType {
    pub fn from_token(token: &str) -> Self {
        match token {
            SCHEDULE_TYPE_ONCE => RecurrenceType::Once,
            "recurring" => RecurrenceType::Recurring,
            other => RecurrenceType::Other(other.to_string()),
        }
    }

    pub fn token(&self) -> &str {
        match self {
            RecurrenceType::Once => SCHEDULE_TYPE_ONCE,
            RecurrenceType::Recurring => "recurring",
            RecurrenceType::Other(token) => token,
        }
    }
}

impl fmt::Display for RecurrenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl Serialize for RecurrenceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.token())
    }
}

impl<'de> Deserialize<'de> for RecurrenceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        Ok(RecurrenceType::from_token(&token))
    }
}

/// Booking window in epoch milliseconds. `end_timestamp == None` is open-ended.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schedule {
    pub start_timestamp: i64,
    pub end_timestamp: Option<i64>,
    pub recurrence: RecurrenceType,
}

impl Schedule {
    pub fn once(start_timestamp: i64, end_timestamp: Option<i64>) -> Self {
        Self {
            start_timestamp,
            end_timestamp,
            recurrence: RecurrenceType::Once,
        }
    }

    pub fn is_open_ended(&self) -> bool {
        self.end_timestamp.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Descriptor {
    pub label: String,
    pub desc: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuditEntry {
    pub timestamp: String,
    pub actor: String,
    pub action: String,
    pub revision: Option<String>,
}

/// One provisioned or pending service as seen in a controller snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRecord {
    pub service_id: ServiceId,
    pub kind: ServiceKind,
    pub allocation_state: String,
    pub from: EndpointRef,
    pub to: EndpointRef,
    pub profile: ProfileRef,
    pub schedule: Schedule,
    pub created_by: String,
    pub group_parent_id: Option<ServiceId>,
    pub descriptor: Descriptor,
    pub tags: Vec<String>,
    /// Controller revision, needed to cancel the booking
    pub revision: Option<String>,
    pub resource_allocation: ResourceAllocation,
    pub audit_history: Vec<AuditEntry>,
}

impl ServiceRecord {
    /// Endpoint-based record with empty bookkeeping fields.
    pub fn endpoint_based(
        service_id: impl Into<ServiceId>,
        from: EndpointRef,
        to: EndpointRef,
        profile: ProfileRef,
        schedule: Schedule,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            kind: ServiceKind::EndpointBased,
            allocation_state: String::new(),
            from,
            to,
            profile,
            schedule,
            created_by: String::new(),
            group_parent_id: None,
            descriptor: Descriptor::default(),
            tags: Vec::new(),
            revision: None,
            resource_allocation: ResourceAllocation::empty(),
            audit_history: Vec::new(),
        }
    }

    pub fn is_group(&self) -> bool {
        self.kind == ServiceKind::GroupBased
    }
}

/// Split a descriptor label of the form `"Source -> Destination"`.
pub fn split_descriptor_label(label: &str) -> Option<(String, String)> {
    let (from, to) = label.split_once("->")?;
    let from = from.trim();
    let to = to.trim();
    if from.is_empty() || to.is_empty() {
        return None;
    }
    Some((from.to_string(), to.to_string()))
}
