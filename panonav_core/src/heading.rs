// Four-direction ego-relative heading frame.
//
// A panorama can have any number of links at irregular headings. The oracle
// and any renderer are shown a fixed frame of exactly four directions
// instead: the node's link headings relative to the agent's facing, with
// gaps filled from the default offsets {0, 90, 180, 270} and surplus links
// merged away.
//
// `canonicalize` is the pure core over a list of relative headings:
// 1. Fold into [0, 360), sort, drop near-duplicates.
// 2. While more than four remain, take the closest adjacent pair (wrapping)
//    and drop whichever member is farther from straight ahead.
// 3. While fewer than four remain, take the widest gap (wrapping; the first
//    widest on ties) and insert the default offset strictly inside it whose
//    smaller distance to the two gap edges is largest (the earlier default
//    on ties). If no default lies inside the gap, insert the gap's midpoint.
// 4. If the first heading is farther from 0 than the last, move the last to
//    the front, so index 0 is the direction closest to straight ahead.
//
// The output is therefore ascending cyclically: ascending after the one
// possible rotation in step 4.
//
// See also: `navigate.rs` which hands the frame to the oracle,
// `observation_headings` for the absolute headings imagery is fetched at,
// and `move_in_frame` for discrete four-direction movement.

use crate::error::GraphError;
use crate::geo::{angular_diff, normalize_heading, relative_heading};
use crate::graph::{PanoGraph, PanoNode};
use crate::types::NodeId;
use serde::{Deserialize, Serialize};

/// Default offsets used to fill empty sectors.
pub const DEFAULT_HEADINGS: [f64; 4] = [0.0, 90.0, 180.0, 270.0];

/// Headings closer than this are the same direction.
const DUPLICATE_EPSILON_DEG: f64 = 1e-6;

/// Canonical four-direction frame for `node` as seen by an agent facing
/// `ego_heading`. Values are relative headings.
pub fn canonical_headings(node: &PanoNode, ego_heading: f64) -> [f64; 4] {
    let relative: Vec<f64> = node
        .links
        .values()
        .map(|link| relative_heading(link.heading, ego_heading))
        .collect();
    canonicalize(&relative)
}

/// The canonical frame rotated back to absolute compass headings.
pub fn observation_headings(node: &PanoNode, ego_heading: f64) -> [f64; 4] {
    canonical_headings(node, ego_heading).map(|h| normalize_heading(h + ego_heading))
}

/// Reduce any set of relative headings to exactly four.
pub fn canonicalize(relative: &[f64]) -> [f64; 4] {
    let mut headings: Vec<f64> = relative
        .iter()
        .copied()
        .filter(|h| h.is_finite())
        .map(normalize_heading)
        .collect();
    headings.sort_by(f64::total_cmp);
    dedup_headings(&mut headings);

    while headings.len() > 4 {
        drop_most_crowded(&mut headings);
    }
    if headings.is_empty() {
        headings.extend_from_slice(&DEFAULT_HEADINGS);
    }
    while headings.len() < 4 {
        fill_widest_gap(&mut headings);
    }

    let mut out = [headings[0], headings[1], headings[2], headings[3]];
    if angular_diff(out[0], 0.0) > angular_diff(out[3], 0.0) {
        out.rotate_right(1);
    }
    out
}

fn dedup_headings(sorted: &mut Vec<f64>) {
    sorted.dedup_by(|b, a| angular_diff(*a, *b) < DUPLICATE_EPSILON_DEG);
    // 0.0 and 359.9999999 sit at opposite ends of the sorted list.
    if sorted.len() > 1 {
        let last = sorted[sorted.len() - 1];
        if angular_diff(last, sorted[0]) < DUPLICATE_EPSILON_DEG {
            sorted.pop();
        }
    }
}

/// Span of the gap starting at `sorted[i]`, walking clockwise to the next
/// heading (wrapping past 360 for the last one). Returns `(lo, hi)` with
/// `hi` possibly above 360.
fn gap(sorted: &[f64], i: usize) -> (f64, f64) {
    let lo = sorted[i];
    let hi = if i + 1 < sorted.len() {
        sorted[i + 1]
    } else {
        sorted[0] + 360.0
    };
    (lo, hi)
}

fn fill_widest_gap(sorted: &mut Vec<f64>) {
    let mut widest = 0;
    let mut widest_span = f64::NEG_INFINITY;
    for i in 0..sorted.len() {
        let (lo, hi) = gap(sorted, i);
        if hi - lo > widest_span {
            widest_span = hi - lo;
            widest = i;
        }
    }

    let (lo, hi) = gap(sorted, widest);
    let mut best: Option<(f64, f64)> = None;
    for d in DEFAULT_HEADINGS {
        let unwrapped = if d < lo { d + 360.0 } else { d };
        if !(lo < unwrapped && unwrapped < hi) {
            continue;
        }
        let score = angular_diff(d, lo).min(angular_diff(d, hi));
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((d, score));
        }
    }
    let fill = match best {
        Some((d, _)) => d,
        None => normalize_heading(lo + (hi - lo) / 2.0),
    };
    sorted.push(fill);
    sorted.sort_by(f64::total_cmp);
}

fn drop_most_crowded(sorted: &mut Vec<f64>) {
    let n = sorted.len();
    let mut closest = 0;
    let mut closest_span = f64::INFINITY;
    for i in 0..n {
        let (lo, hi) = gap(sorted, i);
        if hi - lo < closest_span {
            closest_span = hi - lo;
            closest = i;
        }
    }
    let a = closest;
    let b = (closest + 1) % n;
    let victim = if angular_diff(sorted[a], 0.0) > angular_diff(sorted[b], 0.0) {
        a
    } else {
        b
    };
    sorted.remove(victim);
}

// ---------------------------------------------------------------------------
// Discrete frame movement
// ---------------------------------------------------------------------------

/// A move expressed in the four-direction frame. Indexes the canonical
/// headings, so `Forward` is whichever slot ended up closest to ahead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameAction {
    Forward,
    Right,
    Back,
    Left,
}

impl FrameAction {
    pub fn slot(self) -> usize {
        match self {
            FrameAction::Forward => 0,
            FrameAction::Right => 1,
            FrameAction::Back => 2,
            FrameAction::Left => 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FrameMove {
    /// Node after the move; unchanged when the slot had no link.
    pub node: NodeId,
    /// Absolute heading of the chosen slot.
    pub heading: f64,
}

/// Take `action` from `node` while facing `ego_heading`.
///
/// Each link belongs to the slot nearest its relative heading; when several
/// share a slot the one nearest the slot's heading wins. An empty slot turns
/// the agent in place.
pub fn move_in_frame(
    graph: &PanoGraph,
    node: &NodeId,
    ego_heading: f64,
    action: FrameAction,
) -> Result<FrameMove, GraphError> {
    let pano = graph
        .node(node)
        .ok_or_else(|| GraphError::UnknownNode(node.clone()))?;
    let slots = canonical_headings(pano, ego_heading);
    let slot = slots[action.slot()];

    let mut best: Option<(&NodeId, f64)> = None;
    for (neighbor, link) in &pano.links {
        let rel = relative_heading(link.heading, ego_heading);
        let nearest_slot = nearest_index(&slots, rel);
        if nearest_slot != action.slot() {
            continue;
        }
        let off = angular_diff(rel, slot);
        if best.is_none_or(|(_, b)| off < b) {
            best = Some((neighbor, off));
        }
    }

    Ok(FrameMove {
        node: best.map_or_else(|| node.clone(), |(id, _)| id.clone()),
        heading: normalize_heading(slot + ego_heading),
    })
}

fn nearest_index(slots: &[f64; 4], rel: f64) -> usize {
    let mut best = 0;
    for (i, s) in slots.iter().enumerate() {
        if angular_diff(rel, *s) < angular_diff(rel, slots[best]) {
            best = i;
        }
    }
    best
}
