// Error types for the fatal paths of the engine.
//
// Navigation outcomes (reached, loop, step budget, no path, ...) are NOT
// errors; they are `navigate::Termination` values the caller inspects. The
// enums here cover only conditions a caller cannot treat as a normal run
// result: malformed ids, a provider that cannot be reached, an unreachable
// planning target, a corrupt persisted graph.
//
// See also: `navigate.rs` for `Termination`, `panonav_client` which maps
// HTTP failures onto `ProviderError` and `OracleError`.

use crate::types::{Coordinate, NodeId};

/// A node-id string that does not decode to a coordinate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NodeIdError {
    #[error("node id {0:?} has no ',' separator")]
    MissingSeparator(String),

    #[error("node id {id:?} has a non-numeric component {part:?}")]
    InvalidNumber { id: String, part: String },

    #[error("node id {id:?} has latitude {lat} outside [-90, 90]")]
    LatitudeOutOfRange { id: String, lat: f64 },
}

/// Failure talking to the metadata provider or the image source.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("provider transport error: {0}")]
    Transport(String),

    #[error("provider returned HTTP {status} for {endpoint}")]
    Status { status: u16, endpoint: String },

    #[error("provider response could not be decoded: {0}")]
    Decode(String),

    #[error("provider I/O error: {0}")]
    Io(String),
}

/// Graph construction failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    /// The seed resolved to nothing, even after snapping to a road.
    #[error("no panorama metadata found near {coordinate}")]
    NoMetadataFound { coordinate: Coordinate },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Shortest-path planning failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
    #[error("{target} is not reachable from {start}")]
    NotReachable { start: NodeId, target: NodeId },

    #[error("node {0} is not in the graph")]
    UnknownNode(NodeId),
}

/// Structural or persistence problem with a graph, task, or trajectory.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("node {0} is not in the graph")]
    UnknownNode(NodeId),

    #[error("graph has no navigation target")]
    MissingTarget,

    #[error("graph has no nodes")]
    EmptyGraph,

    #[error("node {key} does not match its stored coordinate")]
    IdMismatch { key: NodeId },

    #[error("link {from} -> {to} has heading {heading}, outside [0, 360)")]
    InvalidHeading { from: NodeId, to: NodeId, heading: f64 },

    #[error("trajectory needs at least 2 points, got {len}")]
    TrajectoryTooShort { len: usize },

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The decision oracle could not produce a choice at all.
///
/// A reply that names a node which is not a legal move is NOT an
/// `OracleError`; the loop handles that as an ordinary stop.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OracleError {
    #[error("oracle transport error: {0}")]
    Transport(String),

    #[error("oracle returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("oracle returned an empty reply")]
    EmptyReply,

    #[error("oracle reply names no candidate node: {0:?}")]
    Unparsable(String),
}
