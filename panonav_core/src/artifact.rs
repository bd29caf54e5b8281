// Persisted artifacts: task files, trajectory files, result records.
//
// All artifacts are plain pretty-printed JSON:
//
// - task file:       `{ "source", "target", "graph": { "<id>": PanoNode } }`
//                    (the serde form of `NavigationTask`; loading validates)
// - trajectory file: `{ "coordinates": [ { "lat", "lng" }, ... ] }`
// - result record:   `{ "reached", "termination", "final_node",
//                      "final_distance_to_target", "visited", "steps" }`
//
// Saving creates missing parent directories. A file that does not parse,
// or a task whose endpoints are not in its graph, is a `GraphError`.

use crate::error::GraphError;
use crate::graph::NavigationTask;
use crate::navigate::{NavigationOutcome, Termination};
use crate::types::{Coordinate, NodeId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryFile {
    pub coordinates: Vec<Coordinate>,
}

impl TrajectoryFile {
    pub fn new(coordinates: Vec<Coordinate>) -> Self {
        Self { coordinates }
    }

    pub fn save(&self, path: &Path) -> Result<(), GraphError> {
        write_json(path, self)
    }

    pub fn load(path: &Path) -> Result<Self, GraphError> {
        read_json(path)
    }
}

/// The serializable summary of one navigation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NavigationRecord {
    pub reached: bool,
    pub termination: Termination,
    pub final_node: NodeId,
    pub final_distance_to_target: f64,
    pub visited: Vec<NodeId>,
    pub steps: usize,
}

impl From<&NavigationOutcome> for NavigationRecord {
    fn from(outcome: &NavigationOutcome) -> Self {
        Self {
            reached: outcome.reached,
            termination: outcome.termination,
            final_node: outcome.final_node.clone(),
            final_distance_to_target: outcome.final_distance_to_target,
            visited: outcome.visited.clone(),
            steps: outcome.steps,
        }
    }
}

pub fn save_task(task: &NavigationTask, path: &Path) -> Result<(), GraphError> {
    write_json(path, task)
}

pub fn load_task(path: &Path) -> Result<NavigationTask, GraphError> {
    let text = fs::read_to_string(path)?;
    let task: NavigationTask = serde_json::from_str(&text)?;
    tracing::debug!(
        path = %path.display(),
        nodes = task.graph().node_count(),
        "loaded navigation task"
    );
    Ok(task)
}

pub fn save_records(records: &[NavigationRecord], path: &Path) -> Result<(), GraphError> {
    write_json(path, &records)
}

pub fn load_records(path: &Path) -> Result<Vec<NavigationRecord>, GraphError> {
    read_json(path)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), GraphError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, GraphError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
