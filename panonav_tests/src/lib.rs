// Test doubles for end-to-end navigation tests.
//
// `GridProvider` is a synthetic street grid served through the real
// `MetadataProvider` seam: a `rows x cols` lattice of panoramas `spacing_m`
// apart, each linked to its four orthogonal neighbors. Like the real
// service it hands out a different transient panorama id on every
// response, so a crawl that keyed anything by provider id would fall apart.
// Grid cells can be removed to model missing panoramas.
//
// The oracles are deterministic stand-ins for a model:
// - `HintFollower` turns the way the current hint says and otherwise goes
//   straight, never revisiting a node.
// - `PathFollower` replays a planned node sequence.
//
// See also: `tests/full_pipeline.rs` for the scenarios.

use std::collections::BTreeSet;

use panonav_core::error::{OracleError, ProviderError};
use panonav_core::geo::{angular_diff, haversine_m, initial_bearing, offset_meters};
use panonav_core::oracle::{DecisionOracle, DecisionRequest};
use panonav_core::provider::{LinkMetadata, MetadataProvider, PanoMetadata};
use panonav_core::types::{Action, Coordinate, NodeId};

/// Search radius for coordinate lookups, as the real service uses.
pub const LOOKUP_RADIUS_M: f64 = 50.0;

pub struct GridProvider {
    origin: Coordinate,
    rows: usize,
    cols: usize,
    spacing_m: f64,
    missing: BTreeSet<(usize, usize)>,
    /// Responses served so far; also the suffix of each transient id.
    pub responses: usize,
}

impl GridProvider {
    pub fn new(origin: Coordinate, rows: usize, cols: usize, spacing_m: f64) -> Self {
        Self {
            origin,
            rows,
            cols,
            spacing_m,
            missing: BTreeSet::new(),
            responses: 0,
        }
    }

    /// Remove the panorama at `(row, col)`. Its neighbors still advertise
    /// links to it.
    pub fn without(mut self, row: usize, col: usize) -> Self {
        self.missing.insert((row, col));
        self
    }

    /// Coordinate of cell `(row, col)`; row grows north, col grows east.
    pub fn coord(&self, row: usize, col: usize) -> Coordinate {
        offset_meters(
            self.origin,
            row as f64 * self.spacing_m,
            col as f64 * self.spacing_m,
        )
    }

    pub fn node_id(&self, row: usize, col: usize) -> NodeId {
        NodeId::from_coordinate(self.coord(row, col))
    }

    fn exists(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols && !self.missing.contains(&(row, col))
    }

    fn record(&mut self, row: usize, col: usize) -> PanoMetadata {
        self.responses += 1;
        let here = self.coord(row, col);
        let mut links = Vec::new();
        let candidates = [
            (row.checked_add(1), Some(col)),
            (Some(row), col.checked_add(1)),
            (row.checked_sub(1), Some(col)),
            (Some(row), col.checked_sub(1)),
        ];
        for (r, c) in candidates {
            let (Some(r), Some(c)) = (r, c) else { continue };
            if r >= self.rows || c >= self.cols {
                continue;
            }
            links.push(LinkMetadata {
                provider_id: self.transient_id(r, c),
                heading: initial_bearing(here, self.coord(r, c)),
                text: format!("Row {r}"),
                elevation: None,
            });
        }
        PanoMetadata {
            provider_id: self.transient_id(row, col),
            lat: here.lat,
            lng: here.lng,
            links,
        }
    }

    fn transient_id(&self, row: usize, col: usize) -> String {
        format!("g{row}_{col}#{}", self.responses)
    }

    fn parse_id(provider_id: &str) -> Option<(usize, usize)> {
        let stable = provider_id.strip_prefix('g')?.split('#').next()?;
        let (r, c) = stable.split_once('_')?;
        Some((r.parse().ok()?, c.parse().ok()?))
    }
}

impl MetadataProvider for GridProvider {
    fn resolve_by_coordinate(
        &mut self,
        coord: Coordinate,
    ) -> Result<Option<PanoMetadata>, ProviderError> {
        let mut best: Option<(usize, usize, f64)> = None;
        for r in 0..self.rows {
            for c in 0..self.cols {
                if !self.exists(r, c) {
                    continue;
                }
                let d = haversine_m(coord, self.coord(r, c));
                if d <= LOOKUP_RADIUS_M && best.is_none_or(|(_, _, bd)| d < bd) {
                    best = Some((r, c, d));
                }
            }
        }
        Ok(best.map(|(r, c, _)| self.record(r, c)))
    }

    fn resolve_by_id(&mut self, provider_id: &str) -> Result<Option<PanoMetadata>, ProviderError> {
        let Some((r, c)) = Self::parse_id(provider_id) else {
            return Err(ProviderError::Decode(format!("unknown id {provider_id}")));
        };
        Ok(self.exists(r, c).then(|| self.record(r, c)))
    }
}

/// Turns the way the hint says, otherwise goes straight.
#[derive(Default)]
pub struct HintFollower {
    pub requests: Vec<DecisionRequest>,
}

impl DecisionOracle for HintFollower {
    fn choose_next(&mut self, request: &DecisionRequest) -> Result<NodeId, OracleError> {
        let wanted = match request.hint {
            Some(Action::Left) => 270.0,
            Some(Action::Right) => 90.0,
            Some(Action::Straight) | None => 0.0,
        };
        let pick = request
            .neighbors
            .iter()
            .filter(|n| !request.visited.contains(&n.id))
            .min_by(|a, b| {
                angular_diff(a.rel_heading, wanted).total_cmp(&angular_diff(b.rel_heading, wanted))
            })
            .map(|n| n.id.clone());
        self.requests.push(request.clone());
        pick.ok_or(OracleError::EmptyReply)
    }
}

/// Replays `path`: from `path[i]` it always picks `path[i + 1]`.
pub struct PathFollower {
    path: Vec<NodeId>,
}

impl PathFollower {
    pub fn new(path: Vec<NodeId>) -> Self {
        Self { path }
    }
}

impl DecisionOracle for PathFollower {
    fn choose_next(&mut self, request: &DecisionRequest) -> Result<NodeId, OracleError> {
        self.path
            .iter()
            .position(|id| id == &request.current)
            .and_then(|i| self.path.get(i + 1))
            .cloned()
            .ok_or_else(|| OracleError::Unparsable(request.current.to_string()))
    }
}
