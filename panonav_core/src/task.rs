// Navigation task synthesis.
//
// Dataset generation turns a (source, target) coordinate pair into a
// `NavigationTask` and a reference trajectory:
//
// - `construct_task` crawls a graph around the source with a radius of
//   `haversine(source, target) * coefficient` and snaps both endpoints onto
//   their nearest crawled nodes.
// - `generate_reference` picks a far start node with `random_node_beyond`,
//   swaps roles (the picked node becomes the source, the old source becomes
//   the target), and plans the shortest path between them. The returned
//   task and trajectory describe that new route.
// - `initial_heading` is the bearing from the first trajectory point to the
//   second, the facing a run should start with.
//
// See also: `builder.rs`, `pathfinding.rs`, `artifact.rs` for the files
// these produce.

use crate::builder::build_graph;
use crate::config::{CrawlConfig, TaskConfig};
use crate::error::GraphError;
use crate::geo::{haversine_m, initial_bearing};
use crate::graph::NavigationTask;
use crate::pathfinding::{random_node_beyond, shortest_path};
use crate::prng::TaskRng;
use crate::provider::MetadataProvider;
use crate::types::{CancelFlag, Coordinate};

/// Crawl around `source` and pin both endpoints to graph nodes.
///
/// `crawl.distance_threshold_m` is replaced by the source-target distance
/// scaled by `coefficient`; the node budget is kept.
pub fn construct_task<P: MetadataProvider + ?Sized>(
    provider: &mut P,
    source: Coordinate,
    target: Coordinate,
    coefficient: f64,
    crawl: &CrawlConfig,
    cancel: Option<&CancelFlag>,
) -> Result<NavigationTask, GraphError> {
    let config = CrawlConfig {
        distance_threshold_m: haversine_m(source, target) * coefficient,
        ..crawl.clone()
    };
    let mut graph = build_graph(provider, source, &config, cancel)?;

    let start = graph.nearest_node(source).ok_or(GraphError::EmptyGraph)?.clone();
    let goal = graph.nearest_node(target).ok_or(GraphError::EmptyGraph)?.clone();
    graph.set_source(start)?;
    graph.set_target(goal)?;
    tracing::info!(
        source = %graph.source(),
        target = ?graph.target(),
        nodes = graph.node_count(),
        "constructed navigation task"
    );
    NavigationTask::new(graph)
}

/// A reference route through a task graph.
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceRoute {
    /// The task with its endpoints swapped to the synthesized start.
    pub task: NavigationTask,
    pub trajectory: Vec<Coordinate>,
    pub distance_m: f64,
}

/// Synthesize a start node far from the task's source and plan the route
/// from it back to that source.
pub fn generate_reference(
    task: &NavigationTask,
    config: &TaskConfig,
    rng: &mut TaskRng,
) -> Result<ReferenceRoute, GraphError> {
    let old_source = task.source().clone();
    let mut graph = task.graph().clone();
    // A one-node graph has no route of two or more points.
    let start = random_node_beyond(&graph, &old_source, config.min_start_distance_m, rng)
        .ok_or(GraphError::TrajectoryTooShort { len: 1 })?;

    let path = shortest_path(&graph, &start, &old_source)?;
    graph.set_source(start)?;
    graph.set_target(old_source)?;
    let trajectory = graph.coordinates_of(&path.nodes);
    tracing::debug!(
        source = %graph.source(),
        hops = path.nodes.len().saturating_sub(1),
        distance_m = path.total_distance_m,
        "generated reference route"
    );

    Ok(ReferenceRoute {
        task: NavigationTask::new(graph)?,
        trajectory,
        distance_m: path.total_distance_m,
    })
}

/// Bearing from the first trajectory point to the second.
pub fn initial_heading(trajectory: &[Coordinate]) -> Result<f64, GraphError> {
    match trajectory {
        [first, second, ..] => Ok(initial_bearing(*first, *second)),
        _ => Err(GraphError::TrajectoryTooShort {
            len: trajectory.len(),
        }),
    }
}
