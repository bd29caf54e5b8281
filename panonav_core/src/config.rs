// Engine configuration.
//
// Every tunable of the crawl, the navigation loop, and task synthesis lives
// in `EngineConfig`, loaded from JSON. Parameter groups are nested structs
// (`CrawlConfig`, `NavigationConfig`, `TaskConfig`), each with a complete
// `Default` and `#[serde(default)]` so a partial JSON file fills the gaps
// from the defaults.
//
// See also: `builder.rs` (reads `CrawlConfig`), `navigate.rs` (reads
// `NavigationConfig`), `task.rs` (reads `TaskConfig`). HTTP-side settings
// (endpoints, keys, timeouts) live in `panonav_client::config`.
//
// **Critical constraint: reproducibility.** A dataset is only regenerable
// from the same config plus the same seed, so defaults must not change
// silently.

use serde::{Deserialize, Serialize};

/// Bounds on one breadth-first crawl.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Neighbors farther than this from the seed panorama are not admitted.
    /// Measured from the seed, not from the node being expanded.
    pub distance_threshold_m: f64,
    /// Node budget. Once reached, no new nodes are admitted.
    pub max_nodes: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            distance_threshold_m: 50.0,
            max_nodes: 2000,
        }
    }
}

impl CrawlConfig {
    pub fn with_threshold(distance_threshold_m: f64) -> Self {
        Self {
            distance_threshold_m,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Step budget for one run.
    pub max_steps: usize,
    /// Relative heading treated as "straight ahead" when picking the edge
    /// that consumes instruction distance.
    pub forward_angle_deg: f64,
    /// Fetch one image per observation heading each step and hand them to
    /// the oracle. Requires an `ImageSource`.
    pub fetch_imagery: bool,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            max_steps: 80,
            forward_angle_deg: 0.0,
            fetch_imagery: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Crawl radius as a multiple of the straight-line source-target distance.
    pub coefficient: f64,
    /// A synthesized start node is drawn from nodes farther than this from
    /// the original source.
    pub min_start_distance_m: f64,
    pub seed: u64,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            coefficient: 1.0,
            min_start_distance_m: 10.0,
            seed: 0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub crawl: CrawlConfig,
    pub navigation: NavigationConfig,
    pub task: TaskConfig,
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
