// File: viprestore/src/model/allocation.rs
//! Resource-allocation payload as a tagged tree.
//!
//! The controller returns routing data as loosely-typed nested JSON. It is
//! converted once into `AllocationNode`s so the path graph builder can match
//! on roles and hops instead of probing maps. Conversion never fails: shapes
//! it does not recognise become `Leaf` nodes that later stages ignore.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

const FROM_NODE_KEY: &str = "fromNode";
const TO_NODE_KEY: &str = "toNode";
const HOP_ID_KEY: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathRole {
    Main,
    Spare,
}

impl PathRole {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "main" => Some(PathRole::Main),
            "spare" => Some(PathRole::Spare),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PathRole::Main => "main",
            PathRole::Spare => "spare",
        }
    }
}

impl fmt::Display for PathRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AllocationNode {
    /// Any container the controller nests routing data in
    Segment {
        key: Option<String>,
        children: Vec<AllocationNode>,
    },
    /// Everything below belongs to this path role
    Role {
        role: PathRole,
        children: Vec<AllocationNode>,
    },
    /// One traversal hop between two graph vertices
    Hop {
        id: Option<String>,
        from_node: String,
        to_node: String,
        attributes: BTreeMap<String, String>,
    },
    /// Unrecognised value, kept for inspection only
    Leaf(Value),
}

impl AllocationNode {
    fn from_value(key: Option<&str>, value: &Value) -> Self {
        match value {
            Value::Object(map) if map.contains_key(FROM_NODE_KEY) || map.contains_key(TO_NODE_KEY) => {
                Self::hop_from_map(map).unwrap_or_else(|| AllocationNode::Leaf(value.clone()))
            }
            Value::Object(map) => {
                let children = map
                    .iter()
                    .map(|(k, v)| AllocationNode::from_value(Some(k), v))
                    .collect();
                Self::container(key, children)
            }
            Value::Array(items) => {
                let children = items
                    .iter()
                    .map(|v| AllocationNode::from_value(None, v))
                    .collect();
                Self::container(key, children)
            }
            scalar => AllocationNode::Leaf(scalar.clone()),
        }
    }

    fn container(key: Option<&str>, children: Vec<AllocationNode>) -> Self {
        match key.and_then(PathRole::from_key) {
            Some(role) => AllocationNode::Role { role, children },
            None => AllocationNode::Segment {
                key: key.map(str::to_string),
                children,
            },
        }
    }

    fn hop_from_map(map: &serde_json::Map<String, Value>) -> Option<Self> {
        let from_node = non_empty_str(map.get(FROM_NODE_KEY))?;
        let to_node = non_empty_str(map.get(TO_NODE_KEY))?;
        let id = non_empty_str(map.get(HOP_ID_KEY));

        let attributes = map
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), FROM_NODE_KEY | TO_NODE_KEY | HOP_ID_KEY))
            .filter_map(|(k, v)| scalar_to_string(v).map(|s| (k.clone(), s)))
            .collect();

        Some(AllocationNode::Hop {
            id,
            from_node,
            to_node,
            attributes,
        })
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parsed resource allocation of one service.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceAllocation {
    root: AllocationNode,
}

impl ResourceAllocation {
    pub fn empty() -> Self {
        Self {
            root: AllocationNode::Segment {
                key: None,
                children: Vec::new(),
            },
        }
    }

    pub fn from_value(value: &Value) -> Self {
        Self {
            root: AllocationNode::from_value(None, value),
        }
    }

    pub fn from_root(root: AllocationNode) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &AllocationNode {
        &self.root
    }

    pub fn is_empty(&self) -> bool {
        match &self.root {
            AllocationNode::Segment { children, .. } => children.is_empty(),
            AllocationNode::Leaf(Value::Null) => true,
            _ => false,
        }
    }
}

impl Default for ResourceAllocation {
    fn default() -> Self {
        Self::empty()
    }
}
