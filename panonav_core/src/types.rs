// Core value types shared by every engine module.
//
// - `Coordinate`: latitude/longitude in decimal degrees. The constructor
//   folds longitude into [-180, 180) so every coordinate in a graph uses the
//   same signed (east-positive) convention.
// - `NodeId`: the stable identity of a viewpoint, derived only from its
//   coordinate. Provider-assigned panorama ids are transient (a coordinate
//   lookup and a neighbor lookup may hand back different ids for the same
//   physical panorama), so they never key the graph.
// - `Action` / `Instruction`: one parsed turn-by-turn direction.
// - `CancelFlag`: cooperative cancellation shared between a caller and a
//   running crawl or navigation loop.
//
// See also: `graph.rs` which keys `PanoGraph` by `NodeId`, `directions.rs`
// which produces `Instruction`s.

use crate::error::NodeIdError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Decimal places kept in a `NodeId` (about 1 cm on the ground).
pub const NODE_ID_DECIMALS: i32 = 7;

// ---------------------------------------------------------------------------
// Coordinate
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    /// Build a coordinate, folding longitude into [-180, 180).
    pub fn new(lat: f64, lng: f64) -> Self {
        let lng = (lng + 180.0).rem_euclid(360.0) - 180.0;
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

// ---------------------------------------------------------------------------
// NodeId
// ---------------------------------------------------------------------------

/// Coordinate-derived viewpoint key, formatted `"<lat>,<lng>"` with both
/// components rounded to `NODE_ID_DECIMALS` places.
///
/// Deserializing goes through `FromStr`, so an id read from a file is
/// parsed and re-canonicalized or rejected.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(String);

impl NodeId {
    pub fn from_coordinate(coord: Coordinate) -> Self {
        let coord = Coordinate::new(coord.lat, coord.lng);
        NodeId(format!(
            "{:.prec$},{:.prec$}",
            round_component(coord.lat),
            round_component(coord.lng),
            prec = NODE_ID_DECIMALS as usize
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recover the (rounded) coordinate this id was derived from.
    pub fn coordinate(&self) -> Result<Coordinate, NodeIdError> {
        let (lat, lng) = self
            .0
            .split_once(',')
            .ok_or_else(|| NodeIdError::MissingSeparator(self.0.clone()))?;
        let lat = parse_component(&self.0, lat)?;
        let lng = parse_component(&self.0, lng)?;
        if !(-90.0..=90.0).contains(&lat) {
            return Err(NodeIdError::LatitudeOutOfRange {
                id: self.0.clone(),
                lat,
            });
        }
        Ok(Coordinate::new(lat, lng))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NodeId {
    type Err = NodeIdError;

    /// Parse and re-canonicalize, so `"1.5,2"` and `"1.5000000,2.0000000"`
    /// name the same node.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = NodeId(s.trim().to_string());
        raw.coordinate().map(NodeId::from_coordinate)
    }
}

impl TryFrom<String> for NodeId {
    type Error = NodeIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

fn round_component(value: f64) -> f64 {
    let scale = 10f64.powi(NODE_ID_DECIMALS);
    // Adding 0.0 turns a rounded -0.0 into 0.0 so it formats without a sign.
    (value * scale).round() / scale + 0.0
}

fn parse_component(id: &str, part: &str) -> Result<f64, NodeIdError> {
    let value: f64 = part
        .trim()
        .parse()
        .map_err(|_| NodeIdError::InvalidNumber {
            id: id.to_string(),
            part: part.to_string(),
        })?;
    if !value.is_finite() {
        return Err(NodeIdError::InvalidNumber {
            id: id.to_string(),
            part: part.to_string(),
        });
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Straight,
    Left,
    Right,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Straight => "straight",
            Action::Left => "left",
            Action::Right => "right",
        })
    }
}

/// One leg of a route: perform `action`, then travel `distance` metres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub action: Action,
    pub distance: f64,
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Shared flag checked between crawl expansions and navigation steps.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
