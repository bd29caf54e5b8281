// Instruction-following navigation loop.
//
// One run walks a `PanoGraph` from its source towards its target, guided by
// parsed `Instruction`s and a `DecisionOracle`. The run state is an explicit
// `Traveling` record (instruction index, remaining distance on it, current
// node, heading, visited list, trajectory) advanced once per step:
//
// 1. Record the current coordinate in the trajectory.
// 2. At the target: `Reached`.
// 3. Back on the node visited two steps ago: `Loop` (two-node ping-pong).
// 4. Append the current node to `visited`.
// 5. Build the neighbor menu: distance, absolute and relative heading, text.
// 6. The most straight-ahead neighbor is the edge that physically consumes
//    instruction distance, whatever the instruction's action says.
// 7. Subtract that edge from the remaining distance. If the remainder grew
//    in magnitude (the step overshot), move to the next instruction and
//    hint its action to the oracle; with none left: `InstructionsExhausted`.
// 8. Ask the oracle. A valid choice is a neighbor that is unvisited, or the
//    node just left (which step 3 then reports as `Loop`). Anything else is
//    `NoPath`. The heading becomes the heading of the edge taken.
//
// The step budget ends the run with `MaxSteps`; a `CancelFlag` with
// `Cancelled`; an oracle that cannot answer at all with `OracleFailed`.
// These are ordinary outcomes, not errors. Only a graph without a target
// or with an unknown source is an `Err`.
//
// See also: `oracle.rs` for the request/oracle seam, `heading.rs` for the
// frame and observation headings, `directions.rs` for instructions.

use crate::config::NavigationConfig;
use crate::error::{GraphError, OracleError};
use crate::geo::{angular_diff, haversine_m, relative_heading};
use crate::graph::{PanoGraph, PanoNode};
use crate::heading::{canonical_headings, observation_headings};
use crate::oracle::{DecisionOracle, DecisionRequest, NeighborOption};
use crate::provider::{ImageSource, ViewImage};
use crate::types::{Action, CancelFlag, Coordinate, Instruction, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a navigation run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Reached,
    /// The node had no usable links, or the oracle named an illegal move.
    NoPath,
    /// Returned to the node visited two steps earlier.
    Loop,
    MaxSteps,
    InstructionsExhausted,
    Cancelled,
    /// The oracle failed to produce any answer.
    OracleFailed,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Termination::Reached => "reached",
            Termination::NoPath => "no_path",
            Termination::Loop => "loop",
            Termination::MaxSteps => "max_steps",
            Termination::InstructionsExhausted => "instructions_exhausted",
            Termination::Cancelled => "cancelled",
            Termination::OracleFailed => "oracle_failed",
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NavigationOutcome {
    pub reached: bool,
    pub termination: Termination,
    pub final_node: NodeId,
    /// Zero when reached.
    pub final_distance_to_target: f64,
    pub visited: Vec<NodeId>,
    pub trajectory: Vec<Coordinate>,
    /// Moves taken.
    pub steps: usize,
}

/// Optional collaborators of a run.
#[derive(Default)]
pub struct NavigationContext<'a> {
    pub images: Option<&'a mut dyn ImageSource>,
    pub cancel: Option<&'a CancelFlag>,
}

/// Run state between steps.
struct Traveling {
    instruction: usize,
    remaining: f64,
    current: NodeId,
    heading: f64,
    visited: Vec<NodeId>,
    trajectory: Vec<Coordinate>,
    moves: usize,
}

impl Traveling {
    fn previous(&self) -> Option<&NodeId> {
        self.visited.len().checked_sub(2).and_then(|i| self.visited.get(i))
    }
}

/// Navigate `graph` from its source to its target.
pub fn navigate<O: DecisionOracle + ?Sized>(
    graph: &PanoGraph,
    instructions: &[Instruction],
    initial_heading: f64,
    oracle: &mut O,
    config: &NavigationConfig,
) -> Result<NavigationOutcome, GraphError> {
    navigate_with(
        graph,
        instructions,
        initial_heading,
        oracle,
        config,
        NavigationContext::default(),
    )
}

/// `navigate` with an image source and/or a cancellation flag.
pub fn navigate_with<O: DecisionOracle + ?Sized>(
    graph: &PanoGraph,
    instructions: &[Instruction],
    initial_heading: f64,
    oracle: &mut O,
    config: &NavigationConfig,
    mut ctx: NavigationContext<'_>,
) -> Result<NavigationOutcome, GraphError> {
    let target = graph.target().ok_or(GraphError::MissingTarget)?.clone();
    let target_coord = graph
        .node(&target)
        .ok_or_else(|| GraphError::UnknownNode(target.clone()))?
        .coordinate;
    if !graph.contains(graph.source()) {
        return Err(GraphError::UnknownNode(graph.source().clone()));
    }

    let mut state = Traveling {
        instruction: 0,
        remaining: instructions.first().map_or(0.0, |i| i.distance),
        current: graph.source().clone(),
        heading: initial_heading,
        visited: Vec::new(),
        trajectory: Vec::new(),
        moves: 0,
    };
    let mut termination = Termination::MaxSteps;

    for step in 0..config.max_steps {
        if ctx.cancel.is_some_and(CancelFlag::is_cancelled) {
            termination = Termination::Cancelled;
            break;
        }
        let node = graph
            .node(&state.current)
            .ok_or_else(|| GraphError::UnknownNode(state.current.clone()))?;
        state.trajectory.push(node.coordinate);

        if state.current == target {
            termination = Termination::Reached;
            break;
        }
        if state.previous() == Some(&state.current) {
            termination = Termination::Loop;
            break;
        }
        state.visited.push(state.current.clone());

        let neighbors = neighbor_menu(graph, node, state.heading);
        let forward = config.forward_angle_deg;
        let Some(best) = neighbors.iter().min_by(|a, b| {
            angular_diff(a.rel_heading, forward).total_cmp(&angular_diff(b.rel_heading, forward))
        }) else {
            tracing::debug!(node = %state.current, "node has no usable links");
            termination = Termination::NoPath;
            break;
        };

        let before = state.remaining;
        state.remaining -= best.distance_m;
        let mut hint: Option<Action> = None;
        if state.remaining.abs() > before.abs() {
            state.instruction += 1;
            match instructions.get(state.instruction) {
                Some(next) => {
                    state.remaining = next.distance;
                    hint = Some(next.action);
                }
                None => {
                    termination = Termination::InstructionsExhausted;
                    break;
                }
            }
        }

        tracing::debug!(
            step,
            node = %state.current,
            instruction = state.instruction,
            remaining_m = state.remaining,
            neighbors = neighbors.len(),
            "navigation step"
        );

        let imagery = if config.fetch_imagery {
            fetch_imagery(&mut ctx, node, state.heading)
        } else {
            Vec::new()
        };

        let request = DecisionRequest {
            step,
            current: state.current.clone(),
            target: target.clone(),
            visited: state.visited.clone(),
            neighbors,
            hint,
            frame: canonical_headings(node, state.heading),
            imagery,
        };

        let choice = match oracle.choose_next(&request) {
            Ok(choice) => choice,
            Err(OracleError::EmptyReply | OracleError::Unparsable(_)) => {
                tracing::warn!(node = %state.current, "oracle reply names no neighbor");
                termination = Termination::NoPath;
                break;
            }
            Err(e) => {
                tracing::warn!(node = %state.current, error = %e, "oracle failed");
                termination = Termination::OracleFailed;
                break;
            }
        };

        let backtrack = state.previous() == Some(&choice);
        let link = node
            .links
            .get(&choice)
            .filter(|_| graph.contains(&choice))
            .filter(|_| backtrack || !state.visited.contains(&choice));
        match link {
            Some(link) => {
                state.heading = link.heading;
                state.current = choice;
                state.moves += 1;
            }
            None => {
                tracing::warn!(node = %state.current, choice = %choice, "oracle chose an invalid or visited node");
                termination = Termination::NoPath;
                break;
            }
        }
    }

    let final_distance_to_target = if termination == Termination::Reached {
        0.0
    } else {
        graph
            .node(&state.current)
            .map_or(f64::INFINITY, |n| haversine_m(n.coordinate, target_coord))
    };

    tracing::info!(
        outcome = %termination,
        final_node = %state.current,
        distance_to_target_m = final_distance_to_target,
        visited = state.visited.len(),
        steps = state.moves,
        "navigation finished"
    );

    Ok(NavigationOutcome {
        reached: termination == Termination::Reached,
        termination,
        final_node: state.current,
        final_distance_to_target,
        visited: state.visited,
        trajectory: state.trajectory,
        steps: state.moves,
    })
}

/// Candidate moves from `node`, skipping links that leave the graph.
fn neighbor_menu(graph: &PanoGraph, node: &PanoNode, heading: f64) -> Vec<NeighborOption> {
    node.links
        .values()
        .filter_map(|link| {
            let neighbor = graph.node(&link.neighbor)?;
            Some(NeighborOption {
                id: link.neighbor.clone(),
                abs_heading: link.heading,
                rel_heading: relative_heading(link.heading, heading),
                distance_m: haversine_m(node.coordinate, neighbor.coordinate),
                text: link.text.clone(),
            })
        })
        .collect()
}

fn fetch_imagery(ctx: &mut NavigationContext<'_>, node: &PanoNode, heading: f64) -> Vec<ViewImage> {
    let Some(images) = ctx.images.as_deref_mut() else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(4);
    for h in observation_headings(node, heading) {
        match images.get_or_fetch(node.coordinate, h) {
            Ok(image) => out.push(image),
            Err(e) => tracing::warn!(node = %node.id, heading = h, error = %e, "image fetch failed"),
        }
    }
    out
}
