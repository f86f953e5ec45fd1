//! Common test data and record builders

use serde_json::{json, Value};
use viprestore::model::{
    Descriptor, EndpointRef, ProfileRef, ResourceAllocation, Schedule, ServiceKind, ServiceRecord,
};

/// Common profile ids
pub mod profiles {
    pub const HD: &str = "p-hd";
    pub const UHD: &str = "p-uhd";
    pub const AUDIO: &str = "p-audio";
}

/// Common timestamps (epoch ms)
pub mod times {
    pub const T0: i64 = 1_700_000_000_000;
    pub const HOUR: i64 = 60 * 60 * 1000;
}

/// Endpoint-based record with the given endpoints and profile.
pub fn record(
    id: &str,
    from: (&str, &str),
    to: (&str, &str),
    profile: (&str, &str),
    schedule: Schedule,
) -> ServiceRecord {
    let mut record = ServiceRecord::endpoint_based(
        id,
        EndpointRef::new(from.0, from.1),
        EndpointRef::new(to.0, to.1),
        ProfileRef::new(profile.0, profile.1),
        schedule,
    );
    record.descriptor = Descriptor {
        label: format!("{} -> {}", from.1, to.1),
        desc: String::new(),
    };
    record.revision = Some("1".to_string());
    record
}

/// Record whose source and destination are derived from `n`.
pub fn numbered_record(n: usize) -> ServiceRecord {
    record(
        &format!("svc-{}", n),
        (&format!("src-{}", n), &format!("CAM {}", n)),
        (&format!("dst-{}", n), &format!("MON {}", n)),
        (profiles::HD, "HD"),
        Schedule::once(times::T0 + n as i64 * times::HOUR, None),
    )
}

pub fn numbered_records(count: usize) -> Vec<ServiceRecord> {
    (1..=count).map(numbered_record).collect()
}

/// A small, mixed collection used by the filter tests.
pub fn studio_records() -> Vec<ServiceRecord> {
    vec![
        record(
            "svc-1",
            ("dev-cam1", "CAM 1"),
            ("dev-mon1", "Gallery MON 1"),
            (profiles::HD, "HD"),
            Schedule::once(times::T0, Some(times::T0 + times::HOUR)),
        ),
        record(
            "svc-2",
            ("dev-cam2", "CAM 2"),
            ("dev-mon2", "Studio MON 2"),
            (profiles::UHD, "UHD"),
            Schedule::once(times::T0 + 2 * times::HOUR, Some(times::T0 + 3 * times::HOUR)),
        ),
        record(
            "svc-3",
            ("dev-mic1", "MIC 1"),
            ("dev-desk", "Audio Desk"),
            (profiles::AUDIO, "Audio"),
            Schedule::once(times::T0 + 5 * times::HOUR, None),
        ),
        record(
            "svc-4",
            ("dev-cam3", "Studio CAM 3"),
            ("dev-mon1", "Gallery MON 1"),
            (profiles::HD, "HD"),
            Schedule::once(times::T0 - 10 * times::HOUR, Some(times::T0 - 9 * times::HOUR)),
        ),
    ]
}

pub fn group_record(id: &str) -> ServiceRecord {
    let mut group = record(
        id,
        ("dev-cam1", "CAM 1"),
        ("dev-mon1", "Gallery MON 1"),
        ("", ""),
        Schedule::default(),
    );
    group.kind = ServiceKind::GroupBased;
    group
}

fn edges(hops: &[(&str, &str)], prefix: &str) -> Vec<Value> {
    hops.iter()
        .enumerate()
        .map(|(i, (from, to))| json!({ "fromNode": from, "toNode": to, "id": format!("{}-{}", prefix, i) }))
        .collect()
}

/// Allocation payload with a main path only
pub fn main_only_allocation() -> Value {
    json!({
        "paths": [{
            "path": {
                "main": { "edges": edges(&[("cam", "sw-1"), ("sw-1", "sw-2"), ("sw-2", "mon")], "m") }
            }
        }]
    })
}

/// Allocation payload with disjoint main and spare paths
pub fn protected_allocation() -> Value {
    json!({
        "paths": [{
            "path": {
                "main": { "edges": edges(&[("cam", "sw-1"), ("sw-1", "mon")], "m") },
                "spare": { "edges": edges(&[("cam", "sw-9"), ("sw-9", "mon")], "s") }
            }
        }]
    })
}

pub fn allocation(value: &Value) -> ResourceAllocation {
    ResourceAllocation::from_value(value)
}
