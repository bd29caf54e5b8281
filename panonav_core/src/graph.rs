// Panorama graph model.
//
// A `PanoGraph` is an arena of `PanoNode`s keyed by `NodeId`, plus the
// designated `source` node (the crawl seed) and, once a navigation task has
// been constructed, a `target`. Each node owns its outgoing `Link`s, keyed by
// the neighbor's `NodeId`. Nodes are added during a crawl and only ever gain
// links afterwards; nothing is deleted.
//
// The serialized form is the persisted graph file:
//
//     { "source": "<id>", "target": "<id>", "graph": { "<id>": PanoNode, ... } }
//
// `NavigationTask` wraps a graph whose target is set and whose endpoints are
// both present; deserializing one validates it, so a corrupt task file fails
// at load time rather than mid-run.
//
// See also: `builder.rs` which fills the graph, `pathfinding.rs` and
// `navigate.rs` which consume it, `artifact.rs` for save/load.
//
// **Critical constraint: closure.** After a crawl every link's neighbor is a
// key in the graph. The builder only adds a link once its neighbor has been
// admitted, and `validate()` reports any dangling link it finds.

use crate::error::GraphError;
use crate::geo::haversine_m;
use crate::types::{Coordinate, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Directed edge from a node towards one neighbor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub neighbor: NodeId,
    /// Compass heading from the owning node towards `neighbor`, in [0, 360).
    pub heading: f64,
    #[serde(default)]
    pub text: String,
    /// Informational only.
    #[serde(default)]
    pub elevation: Option<f64>,
    /// Provider-assigned id of the neighbor panorama at crawl time.
    #[serde(default)]
    pub provider_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PanoNode {
    pub id: NodeId,
    #[serde(flatten)]
    pub coordinate: Coordinate,
    #[serde(default)]
    pub provider_id: String,
    #[serde(default)]
    pub links: BTreeMap<NodeId, Link>,
}

impl PanoNode {
    /// A link-less node at `coordinate`.
    pub fn new(coordinate: Coordinate, provider_id: impl Into<String>) -> Self {
        Self {
            id: NodeId::from_coordinate(coordinate),
            coordinate,
            provider_id: provider_id.into(),
            links: BTreeMap::new(),
        }
    }

    pub fn degree(&self) -> usize {
        self.links.len()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PanoGraph {
    source: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<NodeId>,
    #[serde(rename = "graph")]
    nodes: BTreeMap<NodeId, PanoNode>,
}

impl PanoGraph {
    /// A one-node graph whose source is `source`.
    pub fn new(source: PanoNode) -> Self {
        let id = source.id.clone();
        let mut nodes = BTreeMap::new();
        nodes.insert(id.clone(), source);
        Self {
            source: id,
            target: None,
            nodes,
        }
    }

    pub fn source(&self) -> &NodeId {
        &self.source
    }

    pub fn target(&self) -> Option<&NodeId> {
        self.target.as_ref()
    }

    pub fn set_source(&mut self, id: NodeId) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&id) {
            return Err(GraphError::UnknownNode(id));
        }
        self.source = id;
        Ok(())
    }

    pub fn set_target(&mut self, id: NodeId) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&id) {
            return Err(GraphError::UnknownNode(id));
        }
        self.target = Some(id);
        Ok(())
    }

    pub fn node(&self, id: &NodeId) -> Option<&PanoNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes in `NodeId` order.
    pub fn nodes(&self) -> impl Iterator<Item = &PanoNode> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    /// Insert `node` unless a node with the same id exists. Returns whether
    /// it was inserted.
    pub fn insert_node(&mut self, node: PanoNode) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        self.nodes.insert(node.id.clone(), node);
        true
    }

    /// Add `link` to `from` unless `from` already links to that neighbor.
    /// Returns whether the link was added.
    pub fn add_link(&mut self, from: &NodeId, link: Link) -> Result<bool, GraphError> {
        let node = self
            .nodes
            .get_mut(from)
            .ok_or_else(|| GraphError::UnknownNode(from.clone()))?;
        if node.links.contains_key(&link.neighbor) {
            return Ok(false);
        }
        node.links.insert(link.neighbor.clone(), link);
        Ok(true)
    }

    /// The link `from -> to`, if both exist.
    pub fn link(&self, from: &NodeId, to: &NodeId) -> Option<&Link> {
        self.nodes.get(from)?.links.get(to)
    }

    pub fn max_degree(&self) -> usize {
        self.nodes.values().map(PanoNode::degree).max().unwrap_or(0)
    }

    /// Great-circle distance between two nodes of the graph.
    pub fn distance_m(&self, a: &NodeId, b: &NodeId) -> Option<f64> {
        Some(haversine_m(
            self.nodes.get(a)?.coordinate,
            self.nodes.get(b)?.coordinate,
        ))
    }

    /// Node closest to `coord`. Ties go to the smaller `NodeId`.
    pub fn nearest_node(&self, coord: Coordinate) -> Option<&NodeId> {
        let mut best: Option<(&NodeId, f64)> = None;
        for node in self.nodes.values() {
            let d = haversine_m(coord, node.coordinate);
            if best.is_none_or(|(_, best_d)| d < best_d) {
                best = Some((&node.id, d));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Links whose neighbor is not a node of this graph, as `(from, to)`.
    pub fn dangling_links(&self) -> Vec<(NodeId, NodeId)> {
        let mut out = Vec::new();
        for node in self.nodes.values() {
            for to in node.links.keys() {
                if !self.nodes.contains_key(to) {
                    out.push((node.id.clone(), to.clone()));
                }
            }
        }
        out
    }

    /// Check that the endpoints exist, every node is keyed by the id of its
    /// own coordinate, and every link heading is a compass heading.
    /// Dangling links are tolerated (traversal skips them) but logged.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.nodes.is_empty() {
            return Err(GraphError::EmptyGraph);
        }
        if !self.nodes.contains_key(&self.source) {
            return Err(GraphError::UnknownNode(self.source.clone()));
        }
        if let Some(target) = &self.target {
            if !self.nodes.contains_key(target) {
                return Err(GraphError::UnknownNode(target.clone()));
            }
        }
        for (key, node) in &self.nodes {
            if *key != node.id || *key != NodeId::from_coordinate(node.coordinate) {
                return Err(GraphError::IdMismatch { key: key.clone() });
            }
            for (to, link) in &node.links {
                if !(link.heading.is_finite() && (0.0..360.0).contains(&link.heading)) {
                    return Err(GraphError::InvalidHeading {
                        from: key.clone(),
                        to: to.clone(),
                        heading: link.heading,
                    });
                }
            }
        }
        let dangling = self.dangling_links();
        if !dangling.is_empty() {
            tracing::warn!(
                count = dangling.len(),
                first_from = %dangling[0].0,
                first_to = %dangling[0].1,
                "graph has links to nodes outside the graph"
            );
        }
        Ok(())
    }

    /// Coordinates of a node path, skipping ids that are not in the graph.
    pub fn coordinates_of(&self, path: &[NodeId]) -> Vec<Coordinate> {
        path.iter()
            .filter_map(|id| self.nodes.get(id).map(|n| n.coordinate))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// NavigationTask
// ---------------------------------------------------------------------------

/// A validated graph with both a source and a target.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PanoGraph", into = "PanoGraph")]
pub struct NavigationTask {
    graph: PanoGraph,
}

impl NavigationTask {
    pub fn new(graph: PanoGraph) -> Result<Self, GraphError> {
        if graph.target.is_none() {
            return Err(GraphError::MissingTarget);
        }
        graph.validate()?;
        Ok(Self { graph })
    }

    pub fn source(&self) -> &NodeId {
        &self.graph.source
    }

    pub fn target(&self) -> &NodeId {
        // `new` guarantees the target is set.
        self.graph.target.as_ref().unwrap_or(&self.graph.source)
    }

    pub fn graph(&self) -> &PanoGraph {
        &self.graph
    }

    pub fn into_graph(self) -> PanoGraph {
        self.graph
    }

    /// Straight-line distance between the endpoints.
    pub fn endpoint_distance_m(&self) -> f64 {
        self.graph
            .distance_m(self.source(), self.target())
            .unwrap_or(0.0)
    }
}

impl TryFrom<PanoGraph> for NavigationTask {
    type Error = GraphError;

    fn try_from(graph: PanoGraph) -> Result<Self, Self::Error> {
        NavigationTask::new(graph)
    }
}

impl From<NavigationTask> for PanoGraph {
    fn from(task: NavigationTask) -> Self {
        task.graph
    }
}
