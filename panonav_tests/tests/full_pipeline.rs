// End-to-end tests of the navigation pipeline.
//
// Each scenario drives the public engine API against the synthetic street
// grid from `panonav_tests`: crawl -> task construction -> reference route
// -> instruction-following run -> persisted artifacts. The last scenario
// swaps the scripted oracle for the real `ChatOracle` talking to a local
// completions stand-in, so the HTTP path is exercised too.

use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use panonav_client::ChatOracle;
use panonav_client::config::OracleConfig;
use panonav_core::artifact::{
    NavigationRecord, TrajectoryFile, load_records, load_task, save_records, save_task,
};
use panonav_core::builder::build_graph;
use panonav_core::config::{CrawlConfig, EngineConfig, NavigationConfig, TaskConfig};
use panonav_core::directions::parse_directions;
use panonav_core::navigate::{NavigationContext, Termination, navigate, navigate_with};
use panonav_core::prng::TaskRng;
use panonav_core::task::{construct_task, generate_reference, initial_heading};
use panonav_core::types::{Action, CancelFlag, Coordinate, NodeId};
use panonav_tests::{GridProvider, HintFollower, PathFollower};

/// Grid spacing. Well under the lookup radius, so every cell is reachable.
const SPACING_M: f64 = 10.0;

fn origin() -> Coordinate {
    Coordinate::new(40.7580, -73.9855)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn node_ids(path: &[Coordinate]) -> Vec<NodeId> {
    path.iter().copied().map(NodeId::from_coordinate).collect()
}

// ---------------------------------------------------------------------------
// Crawl
// ---------------------------------------------------------------------------

#[test]
fn crawl_keys_nodes_by_coordinate() {
    init_tracing();
    let mut grid = GridProvider::new(origin(), 4, 4, SPACING_M);
    let seed = grid.coord(0, 0);
    let graph = build_graph(&mut grid, seed, &CrawlConfig::with_threshold(100.0), None).unwrap();

    assert_eq!(graph.node_count(), 16);
    assert_eq!(graph.source(), &grid.node_id(0, 0));
    assert_eq!(graph.max_degree(), 4);
    assert_eq!(graph.node(&grid.node_id(0, 0)).unwrap().degree(), 2);
    assert_eq!(graph.node(&grid.node_id(0, 1)).unwrap().degree(), 3);
    assert_eq!(graph.node(&grid.node_id(1, 1)).unwrap().degree(), 4);
    assert!(graph.dangling_links().is_empty());
    graph.validate().unwrap();

    // Transient ids were different on every response, yet links agree.
    let a = grid.node_id(1, 1);
    let b = grid.node_id(1, 2);
    assert!(graph.link(&a, &b).is_some());
    assert!(graph.link(&b, &a).is_some());
    assert!(grid.responses > 16);
}

#[test]
fn missing_panorama_is_skipped() {
    let mut grid = GridProvider::new(origin(), 3, 3, SPACING_M).without(1, 1);
    let seed = grid.coord(0, 0);
    let graph = build_graph(&mut grid, seed, &CrawlConfig::with_threshold(100.0), None).unwrap();

    assert_eq!(graph.node_count(), 8);
    let hole = grid.node_id(1, 1);
    assert!(!graph.contains(&hole));
    assert!(graph.nodes().all(|n| !n.links.contains_key(&hole)));
    assert!(graph.dangling_links().is_empty());
}

#[test]
fn engine_config_budget_limits_crawl() {
    let config = EngineConfig::from_json(r#"{ "crawl": { "max_nodes": 5 } }"#).unwrap();
    assert_eq!(config.crawl.distance_threshold_m, 50.0);
    let mut grid = GridProvider::new(origin(), 4, 4, SPACING_M);
    let seed = grid.coord(0, 0);
    let graph = build_graph(&mut grid, seed, &config.crawl, None).unwrap();
    assert_eq!(graph.node_count(), 5);
    assert!(graph.dangling_links().is_empty());
}

#[test]
fn cancelled_crawl_and_run_stop_early() {
    let cancel = CancelFlag::new();
    cancel.cancel();
    let mut grid = GridProvider::new(origin(), 4, 4, SPACING_M);
    let seed = grid.coord(0, 0);
    let mut graph =
        build_graph(&mut grid, seed, &CrawlConfig::default(), Some(&cancel)).unwrap();
    assert_eq!(graph.node_count(), 1);

    graph.set_target(grid.node_id(0, 0)).unwrap();
    let outcome = navigate_with(
        &graph,
        &parse_directions("Head north 100 m"),
        0.0,
        &mut HintFollower::default(),
        &NavigationConfig::default(),
        NavigationContext {
            images: None,
            cancel: Some(&cancel),
        },
    )
    .unwrap();
    assert_eq!(outcome.termination, Termination::Cancelled);
    assert_eq!(outcome.steps, 0);
}

// ---------------------------------------------------------------------------
// Tasks and runs
// ---------------------------------------------------------------------------

#[test]
fn turn_by_turn_directions_reach_target() {
    init_tracing();
    let mut grid = GridProvider::new(origin(), 5, 5, SPACING_M);
    let source = grid.coord(0, 0);
    let target = grid.coord(3, 2);
    let task = construct_task(&mut grid, source, target, 2.0, &CrawlConfig::default(), None)
        .unwrap();
    assert_eq!(task.graph().node_count(), 25);
    assert_eq!(task.source(), &grid.node_id(0, 0));
    assert_eq!(task.target(), &grid.node_id(3, 2));

    let directions = "1. Head north for 30 m\n2. Turn right and walk 20 m\n3. Arrive at your destination";
    let instructions = parse_directions(directions);
    assert_eq!(instructions.len(), 2);

    let mut oracle = HintFollower::default();
    let outcome = navigate(
        task.graph(),
        &instructions,
        0.0,
        &mut oracle,
        &NavigationConfig::default(),
    )
    .unwrap();

    assert_eq!(outcome.termination, Termination::Reached);
    assert!(outcome.reached);
    assert_eq!(outcome.final_node, grid.node_id(3, 2));
    assert_eq!(outcome.final_distance_to_target, 0.0);
    assert_eq!(outcome.steps, 5);
    assert_eq!(outcome.trajectory.len(), 6);
    assert_eq!(
        outcome.visited,
        vec![
            grid.node_id(0, 0),
            grid.node_id(1, 0),
            grid.node_id(2, 0),
            grid.node_id(3, 0),
            grid.node_id(3, 1),
        ]
    );

    // The turn is hinted exactly once, on the step where it takes effect.
    let hints: Vec<Option<Action>> = oracle.requests.iter().map(|r| r.hint).collect();
    assert_eq!(hints, vec![None, None, None, Some(Action::Right), None]);
}

#[test]
fn wrong_turn_ends_in_instructions_exhausted() {
    let mut grid = GridProvider::new(origin(), 5, 5, SPACING_M);
    let (source, target) = (grid.coord(0, 0), grid.coord(3, 2));
    let task = construct_task(&mut grid, source, target, 2.0, &CrawlConfig::default(), None)
        .unwrap();
    // Far too short: the first edge already overshoots the only instruction.
    let instructions = parse_directions("Head north for 4 m");
    let outcome = navigate(
        task.graph(),
        &instructions,
        0.0,
        &mut HintFollower::default(),
        &NavigationConfig::default(),
    )
    .unwrap();
    assert_eq!(outcome.termination, Termination::InstructionsExhausted);
    assert!(!outcome.reached);
    assert_eq!(outcome.steps, 0);
    assert!(outcome.final_distance_to_target > 30.0);
}

#[test]
fn reference_route_replays_and_persists() {
    init_tracing();
    let mut grid = GridProvider::new(origin(), 6, 6, SPACING_M);
    let source = grid.coord(0, 0);
    let target = grid.coord(5, 5);
    let task = construct_task(&mut grid, source, target, 1.5, &CrawlConfig::default(), None)
        .unwrap();
    assert_eq!(task.graph().node_count(), 36);

    let config = TaskConfig {
        min_start_distance_m: 40.0,
        seed: 7,
        ..TaskConfig::default()
    };
    let mut rng = TaskRng::new(config.seed);
    let route = generate_reference(&task, &config, &mut rng).unwrap();
    assert_eq!(route.task.target(), task.source());
    assert!(route.trajectory.len() >= 5);

    let heading = initial_heading(&route.trajectory).unwrap();
    let mut oracle = PathFollower::new(node_ids(&route.trajectory));
    let outcome = navigate(
        route.task.graph(),
        &parse_directions("Follow the route for 2 km"),
        heading,
        &mut oracle,
        &NavigationConfig::default(),
    )
    .unwrap();
    assert_eq!(outcome.termination, Termination::Reached);
    assert_eq!(outcome.steps, route.trajectory.len() - 1);
    assert_eq!(outcome.trajectory, route.trajectory);

    // Same seed, same route.
    let again = generate_reference(&task, &config, &mut TaskRng::new(config.seed)).unwrap();
    assert_eq!(again.trajectory, route.trajectory);

    let dir = tempfile::tempdir().unwrap();
    let task_path = dir.path().join("tasks/navi_env_0.json");
    let reference_path = dir.path().join("tasks/navi_traj_0.json");
    let run_path = dir.path().join("results/res_traj_0.json");
    let records_path = dir.path().join("results/records.json");

    save_task(&route.task, &task_path).unwrap();
    TrajectoryFile::new(route.trajectory.clone())
        .save(&reference_path)
        .unwrap();
    TrajectoryFile::new(outcome.trajectory.clone())
        .save(&run_path)
        .unwrap();
    save_records(&[NavigationRecord::from(&outcome)], &records_path).unwrap();

    let loaded = load_task(&task_path).unwrap();
    assert_eq!(loaded, route.task);
    assert_eq!(
        TrajectoryFile::load(&reference_path).unwrap().coordinates,
        route.trajectory
    );
    let records = load_records(&records_path).unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].reached);
    assert_eq!(records[0].steps, outcome.steps);
}

// ---------------------------------------------------------------------------
// HTTP oracle
// ---------------------------------------------------------------------------

/// A completions endpoint that answers with the next node of `path` after
/// the prompt's current node.
struct CompletionsStub {
    addr: String,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CompletionsStub {
    fn start(path: Vec<NodeId>) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap().to_string();
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            while !thread_stop.load(Ordering::Relaxed) {
                let mut request = match server.recv_timeout(Duration::from_millis(20)) {
                    Ok(Some(request)) => request,
                    Ok(None) => continue,
                    Err(_) => break,
                };
                let mut body = String::new();
                request.as_reader().read_to_string(&mut body).unwrap();
                let body: serde_json::Value = serde_json::from_str(&body).unwrap();
                let prompt = body["messages"][1]["content"][0]["text"].as_str().unwrap();
                let current = prompt
                    .lines()
                    .find_map(|l| l.strip_prefix("Current node: "))
                    .unwrap();
                let next = path
                    .iter()
                    .position(|id| id.as_str() == current)
                    .and_then(|i| path.get(i + 1))
                    .map_or_else(|| "no idea".to_string(), |id| format!("Next: {id}"));
                let reply = serde_json::json!({
                    "choices": [{ "message": { "role": "assistant", "content": next } }],
                    "usage": { "prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12 },
                });
                let _ = request.respond(tiny_http::Response::from_string(reply.to_string()));
            }
        });
        Self {
            addr,
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for CompletionsStub {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[test]
fn chat_oracle_drives_a_run_over_http() {
    init_tracing();
    let mut grid = GridProvider::new(origin(), 3, 3, SPACING_M);
    let (source, target) = (grid.coord(2, 2), grid.coord(0, 0));
    let task = construct_task(&mut grid, source, target, 2.0, &CrawlConfig::default(), None)
        .unwrap();
    let route = generate_reference(
        &task,
        &TaskConfig {
            min_start_distance_m: 25.0,
            ..TaskConfig::default()
        },
        &mut TaskRng::new(3),
    )
    .unwrap();

    let stub = CompletionsStub::start(node_ids(&route.trajectory));
    let mut chat = ChatOracle::new(OracleConfig {
        api_key: "sk-local".into(),
        base_url: format!("http://{}/v1", stub.addr),
        ..OracleConfig::default()
    })
    .unwrap();

    let outcome = navigate(
        route.task.graph(),
        &parse_directions("Walk 1 km"),
        initial_heading(&route.trajectory).unwrap(),
        &mut chat,
        &NavigationConfig::default(),
    )
    .unwrap();
    assert_eq!(outcome.termination, Termination::Reached);
    assert_eq!(chat.calls(), outcome.steps);
    assert_eq!(chat.usage().total_tokens, 12 * outcome.steps as u64);
}
