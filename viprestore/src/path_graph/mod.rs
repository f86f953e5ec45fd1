// File: viprestore/src/path_graph/mod.rs
//! Path graph construction for one service's resource allocation.
//!
//! Every hop below a `main` role becomes a main-path edge and every hop below
//! a `spare` role a spare-path edge, in traversal order. Hop endpoints become
//! nodes keyed by their vertex id, so repeated builds of the same payload
//! yield identical node ids. The builder keeps no cache; callers rebuild from
//! the current payload because allocations change between refreshes.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use crate::model::{AllocationNode, PathRole, ResourceAllocation};

/// Metadata key listing the roles a node takes part in
pub const META_ROLES: &str = "roles";
/// Metadata key for the node's position on its first path (`sender`, `receiver`, `hop`)
pub const META_POSITION: &str = "position";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub from_node_id: String,
    pub to_node_id: String,
    pub edge_id: Option<String>,
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PathGraph {
    /// Nodes in order of first appearance
    pub nodes: Vec<Node>,
    pub main_path: Vec<Edge>,
    pub spare_path: Vec<Edge>,
}

impl PathGraph {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edges(&self, role: PathRole) -> &[Edge] {
        match role {
            PathRole::Main => &self.main_path,
            PathRole::Spare => &self.spare_path,
        }
    }

    pub fn is_protected(&self) -> bool {
        !self.spare_path.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Build a graph with node labels equal to their ids.
pub fn build(allocation: &ResourceAllocation) -> PathGraph {
    build_with_labels(allocation, &HashMap::new())
}

/// Build a graph, resolving node labels through `labels` (vertex id to label).
pub fn build_with_labels(
    allocation: &ResourceAllocation,
    labels: &HashMap<String, String>,
) -> PathGraph {
    let mut collector = HopCollector::default();
    collector.walk(allocation.root(), None);

    let mut nodes: IndexMap<String, NodeDraft> = IndexMap::new();
    let mut graph = PathGraph::default();

    for role in [PathRole::Main, PathRole::Spare] {
        let hops = collector.hops.remove(&role).unwrap_or_default();
        let last = hops.len().saturating_sub(1);

        for (i, hop) in hops.iter().enumerate() {
            let from_position = if i == 0 { "sender" } else { "hop" };
            let to_position = if i == last { "receiver" } else { "hop" };

            nodes
                .entry(hop.from_node.clone())
                .or_insert_with(|| NodeDraft::new(from_position))
                .roles
                .insert(role);
            nodes
                .entry(hop.to_node.clone())
                .or_insert_with(|| NodeDraft::new(to_position))
                .roles
                .insert(role);
        }

        let edges = hops
            .into_iter()
            .map(|hop| Edge {
                from_node_id: hop.from_node,
                to_node_id: hop.to_node,
                edge_id: hop.id,
                attributes: hop.attributes,
            })
            .collect();

        match role {
            PathRole::Main => graph.main_path = edges,
            PathRole::Spare => graph.spare_path = edges,
        }
    }

    graph.nodes = nodes
        .into_iter()
        .map(|(id, draft)| {
            let label = labels.get(&id).cloned().unwrap_or_else(|| id.clone());
            Node {
                metadata: draft.into_metadata(),
                id,
                label,
            }
        })
        .collect();

    debug!(
        "Built path graph: {} nodes, {} main edges, {} spare edges, {} skipped branches",
        graph.nodes.len(),
        graph.main_path.len(),
        graph.spare_path.len(),
        collector.skipped
    );

    graph
}

struct Hop {
    id: Option<String>,
    from_node: String,
    to_node: String,
    attributes: BTreeMap<String, String>,
}

#[derive(Default)]
struct HopCollector {
    hops: HashMap<PathRole, Vec<Hop>>,
    skipped: usize,
}

impl HopCollector {
    fn walk(&mut self, node: &AllocationNode, role: Option<PathRole>) {
        match node {
            AllocationNode::Segment { children, .. } => {
                for child in children {
                    self.walk(child, role);
                }
            }
            AllocationNode::Role { role, children } => {
                for child in children {
                    self.walk(child, Some(*role));
                }
            }
            AllocationNode::Hop {
                id,
                from_node,
                to_node,
                attributes,
            } => match role {
                Some(role) => self.hops.entry(role).or_default().push(Hop {
                    id: id.clone(),
                    from_node: from_node.clone(),
                    to_node: to_node.clone(),
                    attributes: attributes.clone(),
                }),
                None => self.skipped += 1,
            },
            AllocationNode::Leaf(value) => {
                if value.is_object() {
                    self.skipped += 1;
                }
            }
        }
    }
}

struct NodeDraft {
    position: &'static str,
    roles: BTreeSet<PathRole>,
}

impl NodeDraft {
    fn new(position: &'static str) -> Self {
        Self {
            position,
            roles: BTreeSet::new(),
        }
    }

    fn into_metadata(self) -> BTreeMap<String, String> {
        let roles = self
            .roles
            .iter()
            .map(PathRole::as_str)
            .collect::<Vec<_>>()
            .join(",");

        BTreeMap::from([
            (META_POSITION.to_string(), self.position.to_string()),
            (META_ROLES.to_string(), roles),
        ])
    }
}
