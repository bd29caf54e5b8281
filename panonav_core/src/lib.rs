// panonav_core: the panorama navigation graph engine.
//
// Harvests a locality-bounded graph of street-level viewpoints from a
// metadata provider, plans reference shortest paths through it, and runs the
// turn-by-turn traversal loop that turns free-text directions into discrete
// graph moves with the help of an external decision oracle. The crate does
// no network I/O of its own: the provider, the oracle, and the image source
// are traits implemented in `panonav_client` (HTTP) or by test doubles.
//
// Module overview:
// - `geo.rs`:         Geodesy kernel (haversine, bearing, angle math, Mercator, scene bounds).
// - `types.rs`:       Coordinate, NodeId (stable viewpoint identity), Action, Instruction, CancelFlag.
// - `graph.rs`:       PanoNode / Link / PanoGraph / NavigationTask.
// - `provider.rs`:    MetadataProvider + ImageSource traits and the metadata records they return.
// - `builder.rs`:     Bounded breadth-first crawl against a provider.
// - `pathfinding.rs`: Dijkstra shortest path + far start-node sampling.
// - `heading.rs`:     Four-direction ego-relative heading canonicalization and frame moves.
// - `directions.rs`:  Free-text directions -> ordered instructions.
// - `oracle.rs`:      DecisionOracle trait, decision request, reply extraction.
// - `navigate.rs`:    The instruction-following navigation state machine.
// - `task.rs`:        Task construction, reference trajectories, initial heading.
// - `artifact.rs`:    Trajectory and result records plus JSON save/load helpers.
// - `config.rs`:      EngineConfig (crawl / navigation / task parameters).
// - `error.rs`:       Error enums for the fatal paths.
// - `prng`:           Re-exported from `panonav_prng`.
//
// **Critical constraint: reproducibility.** Graph storage uses `BTreeMap` so
// iteration order (and therefore tie-breaking in the planner, the crawl, and
// the loop) depends only on node ids. All randomness goes through `TaskRng`.

pub mod artifact;
pub mod builder;
pub mod config;
pub mod directions;
pub mod error;
pub mod geo;
pub mod graph;
pub mod heading;
pub mod navigate;
pub mod oracle;
pub mod pathfinding;
pub use panonav_prng as prng;
pub mod provider;
pub mod task;
pub mod types;
