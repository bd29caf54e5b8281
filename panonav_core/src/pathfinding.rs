// Shortest paths over the panorama graph.
//
// Dijkstra with a `BinaryHeap` min-heap (reversed `Ord` on `OpenEntry`).
// Edge weights are the great-circle distance between the two node
// coordinates, not anything the provider reported, so planning depends only
// on node positions and link topology. Links whose neighbor is not a node
// of the graph are skipped.
//
// Also hosts `random_node_beyond`, the start-point sampler for task
// synthesis: uniform among nodes farther than a threshold from a source,
// falling back to the single farthest node.
//
// See also: `graph.rs` for the `PanoGraph` being searched, `task.rs` which
// turns a planned path into a reference trajectory.
//
// **Critical constraint: determinism.** Distances and predecessors live in
// `BTreeMap`s and heap ties break on `NodeId`, so equal-cost paths always
// resolve the same way.

use crate::error::PlanError;
use crate::geo::haversine_m;
use crate::graph::PanoGraph;
use crate::prng::TaskRng;
use crate::types::NodeId;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

/// A planned route.
#[derive(Clone, Debug, PartialEq)]
pub struct PathResult {
    /// Node ids from start to target (inclusive).
    pub nodes: Vec<NodeId>,
    /// Sum of haversine edge lengths in metres.
    pub total_distance_m: f64,
}

/// Entry in the open set (min-heap via reversed ordering).
struct OpenEntry {
    node: NodeId,
    distance: f64,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.distance.total_cmp(&other.distance) == Ordering::Equal && self.node == other.node
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap: smallest distance is "greatest".
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Shortest path from `start` to `target`.
///
/// A `target` that is not in the graph, or not connected to `start`, is
/// `NotReachable`. An unknown `start` is `UnknownNode`.
pub fn shortest_path(
    graph: &PanoGraph,
    start: &NodeId,
    target: &NodeId,
) -> Result<PathResult, PlanError> {
    let not_reachable = || PlanError::NotReachable {
        start: start.clone(),
        target: target.clone(),
    };
    let start_node = graph
        .node(start)
        .ok_or_else(|| PlanError::UnknownNode(start.clone()))?;
    if !graph.contains(target) {
        return Err(not_reachable());
    }
    if start == target {
        return Ok(PathResult {
            nodes: vec![start.clone()],
            total_distance_m: 0.0,
        });
    }

    let mut dist: BTreeMap<NodeId, f64> = BTreeMap::new();
    let mut came_from: BTreeMap<NodeId, NodeId> = BTreeMap::new();
    let mut closed: BTreeSet<NodeId> = BTreeSet::new();

    dist.insert(start_node.id.clone(), 0.0);
    let mut open = BinaryHeap::new();
    open.push(OpenEntry {
        node: start.clone(),
        distance: 0.0,
    });

    while let Some(current) = open.pop() {
        if current.node == *target {
            return Ok(reconstruct_path(&came_from, start, target, current.distance));
        }
        if !closed.insert(current.node.clone()) {
            continue;
        }
        let Some(node) = graph.node(&current.node) else {
            continue;
        };

        for neighbor_id in node.links.keys() {
            if closed.contains(neighbor_id) {
                continue;
            }
            let Some(neighbor) = graph.node(neighbor_id) else {
                continue;
            };
            let tentative = current.distance + haversine_m(node.coordinate, neighbor.coordinate);
            let known = dist.get(neighbor_id).copied().unwrap_or(f64::INFINITY);
            if tentative < known {
                dist.insert(neighbor_id.clone(), tentative);
                came_from.insert(neighbor_id.clone(), current.node.clone());
                open.push(OpenEntry {
                    node: neighbor_id.clone(),
                    distance: tentative,
                });
            }
        }
    }

    Err(not_reachable())
}

fn reconstruct_path(
    came_from: &BTreeMap<NodeId, NodeId>,
    start: &NodeId,
    target: &NodeId,
    total_distance_m: f64,
) -> PathResult {
    let mut nodes = vec![target.clone()];
    let mut current = target;
    while current != start {
        match came_from.get(current) {
            Some(prev) => {
                nodes.push(prev.clone());
                current = prev;
            }
            None => break,
        }
    }
    nodes.reverse();
    PathResult {
        nodes,
        total_distance_m,
    }
}

/// Pick a node whose straight-line distance from `source` exceeds
/// `threshold_m`, uniformly at random. When no node qualifies, returns the
/// farthest node. `None` only when the graph has no node besides `source`.
pub fn random_node_beyond(
    graph: &PanoGraph,
    source: &NodeId,
    threshold_m: f64,
    rng: &mut TaskRng,
) -> Option<NodeId> {
    let origin = graph.node(source)?.coordinate;
    let mut beyond: Vec<&NodeId> = Vec::new();
    let mut farthest: Option<(&NodeId, f64)> = None;

    for node in graph.nodes() {
        if node.id == *source {
            continue;
        }
        let d = haversine_m(origin, node.coordinate);
        if d > threshold_m {
            beyond.push(&node.id);
        }
        if farthest.is_none_or(|(_, best)| d > best) {
            farthest = Some((&node.id, d));
        }
    }

    if let Some(picked) = rng.choose(&beyond) {
        return Some((*picked).clone());
    }
    farthest.map(|(id, _)| id.clone())
}
