// Decision-oracle seam.
//
// The navigation loop never decides where to go on its own; each step it
// builds a `DecisionRequest` (where the agent is, where it is going, what it
// has visited, the menu of neighbors, an optional turn hint, the
// four-direction frame, and any imagery) and asks a `DecisionOracle` for one
// neighbor id. Production wires in a model-backed client
// (`panonav_client::ChatOracle`); tests use closures or scripted oracles.
//
// This module also owns the text rendering of a request and the extraction
// of a node id from a free-text reply, so every oracle implementation
// presents and parses the same way.

use crate::error::OracleError;
use crate::provider::ViewImage;
use crate::types::{Action, NodeId};

/// Closing line of every rendered prompt.
pub const REPLY_FORMAT_INSTRUCTION: &str = "Choose next node. Reply with exactly one node ID (lat,lng string) on a single line, with no additional commentary";

/// One candidate move.
#[derive(Clone, Debug, PartialEq)]
pub struct NeighborOption {
    pub id: NodeId,
    /// Compass heading of the link.
    pub abs_heading: f64,
    /// Heading of the link relative to the agent's facing.
    pub rel_heading: f64,
    pub distance_m: f64,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DecisionRequest {
    /// Zero-based step number within the run.
    pub step: usize,
    pub current: NodeId,
    pub target: NodeId,
    /// Visited nodes in order, ending with `current`.
    pub visited: Vec<NodeId>,
    pub neighbors: Vec<NeighborOption>,
    /// Set only on the step where a new instruction took effect.
    pub hint: Option<Action>,
    /// Relative headings of the four-direction frame at `current`.
    pub frame: [f64; 4],
    /// Images at the frame's absolute headings, when imagery is enabled.
    pub imagery: Vec<ViewImage>,
}

impl DecisionRequest {
    pub fn candidate_ids(&self) -> Vec<NodeId> {
        self.neighbors.iter().map(|n| n.id.clone()).collect()
    }
}

pub trait DecisionOracle {
    /// Name one neighbor of `request.current` to move to.
    fn choose_next(&mut self, request: &DecisionRequest) -> Result<NodeId, OracleError>;
}

impl<F> DecisionOracle for F
where
    F: FnMut(&DecisionRequest) -> Result<NodeId, OracleError>,
{
    fn choose_next(&mut self, request: &DecisionRequest) -> Result<NodeId, OracleError> {
        self(request)
    }
}

/// Natural-language guidance for the required turn. `None` renders the
/// go-straight guidance.
pub fn turn_hint(action: Option<Action>) -> &'static str {
    match action {
        Some(Action::Left) => {
            "At the current node, you need to turn left. That means, among the adjacent neighbor nodes, you should identify the one with the most leftward relative heading angle and move toward it."
        }
        Some(Action::Right) => {
            "At the current node, you need to turn right. That means, among the adjacent neighbor nodes, you should identify the one with the most rightward relative heading angle and move toward it."
        }
        Some(Action::Straight) | None => {
            "At the current node, you need to go straight. That means, among the adjacent neighbor nodes, you should identify the one with the most forward-facing relative heading angle and move toward it."
        }
    }
}

/// Render a request as the text part of an oracle prompt.
pub fn render_prompt(request: &DecisionRequest) -> String {
    let visited: Vec<&str> = request.visited.iter().map(NodeId::as_str).collect();
    let mut out = format!(
        "Current node: {}\nTarget: {}\nVisited: [{}]\nNeighbors:\n",
        request.current,
        request.target,
        visited.join("; ")
    );
    for n in &request.neighbors {
        out.push_str(&neighbor_line(n));
    }
    out.push_str(turn_hint(request.hint));
    out.push('\n');
    out.push_str(REPLY_FORMAT_INSTRUCTION);
    out
}

fn neighbor_line(n: &NeighborOption) -> String {
    let mut line = format!(
        "- {} | abs_heading={:.1}° rel_heading={:.1}° dist={:.1}m",
        n.id, n.abs_heading, n.rel_heading, n.distance_m
    );
    if !n.text.is_empty() {
        line.push_str(&format!(" text={:?}", n.text));
    }
    line.push('\n');
    line
}

/// Find the candidate a free-text reply names.
///
/// Lines are scanned in order; the first line that parses as one of the
/// candidates (after stripping list markers, quotes and backticks) or
/// contains a candidate id verbatim wins.
pub fn extract_node_id(reply: &str, candidates: &[NodeId]) -> Option<NodeId> {
    for line in reply.lines() {
        let cleaned = line
            .trim()
            .trim_start_matches(['-', '*', '>'])
            .trim()
            .trim_matches(['`', '"', '\'', '.', ' ']);
        if cleaned.is_empty() {
            continue;
        }
        if let Ok(id) = cleaned.parse::<NodeId>() {
            if candidates.contains(&id) {
                return Some(id);
            }
        }
        if let Some(hit) = candidates.iter().find(|c| line.contains(c.as_str())) {
            return Some(hit.clone());
        }
    }
    None
}
