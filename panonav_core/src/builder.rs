// Bounded breadth-first crawl of the panorama graph.
//
// Starting from the panorama nearest a seed coordinate, expands one metadata
// record at a time from a FIFO queue. Each link on the record is resolved
// by provider id; the neighbor is admitted (node created, link added, record
// enqueued) only if it lies within `distance_threshold_m` of the SEED
// panorama. The distance is never measured from the node being expanded, so
// a neighbor just past the threshold is dropped even when it is a few metres
// from the frontier.
//
// If the seed resolves to a record without links (a panorama off the road
// network), the seed is snapped to the nearest road and resolved once more.
//
// Budgets: `CrawlConfig::max_nodes` caps admitted nodes, and a `CancelFlag`
// ends the crawl between expansions. Either way the returned graph is closed:
// a link is only added once its neighbor is a node of the graph.
//
// See also: `provider.rs` for the `MetadataProvider` seam, `config.rs` for
// `CrawlConfig`, `task.rs::construct_task` which sizes the threshold from a
// source-target distance.
//
// **Critical constraint: determinism.** Expansion is strictly FIFO and the
// links of a record are visited in provider order, so the same provider
// responses always produce the same graph.

use crate::config::CrawlConfig;
use crate::error::BuildError;
use crate::geo::{haversine_m, normalize_heading};
use crate::graph::{Link, PanoGraph};
use crate::provider::{MetadataProvider, PanoMetadata};
use crate::types::{CancelFlag, Coordinate, NodeId};
use std::collections::{BTreeSet, VecDeque};

/// Crawl the graph around `seed`.
///
/// Fails with `NoMetadataFound` when neither the seed nor its road-snapped
/// position has a panorama, and with `Provider` when resolving the seed
/// itself fails. Errors resolving individual neighbors are logged and the
/// neighbor is skipped.
pub fn build_graph<P: MetadataProvider + ?Sized>(
    provider: &mut P,
    seed: Coordinate,
    config: &CrawlConfig,
    cancel: Option<&CancelFlag>,
) -> Result<PanoGraph, BuildError> {
    let seed_meta = resolve_seed(provider, seed)?;
    let seed_coord = seed_meta.coordinate();

    tracing::info!(
        seed = %seed,
        source = %seed_meta.node_id(),
        threshold_m = config.distance_threshold_m,
        "starting panorama crawl"
    );

    let mut graph = PanoGraph::new(seed_meta.to_node());
    let mut visited: BTreeSet<NodeId> = BTreeSet::new();
    let mut queue: VecDeque<PanoMetadata> = VecDeque::from([seed_meta]);
    let mut budget_hit = false;
    let mut cancelled = false;

    'crawl: while let Some(meta) = queue.pop_front() {
        let current = meta.node_id();
        if !visited.insert(current.clone()) {
            continue;
        }
        tracing::debug!(node = %current, links = meta.links.len(), queued = queue.len(), "expanding");

        for link in &meta.links {
            if cancel.is_some_and(CancelFlag::is_cancelled) {
                cancelled = true;
                break 'crawl;
            }

            let neighbor = match provider.resolve_by_id(&link.provider_id) {
                Ok(Some(neighbor)) => neighbor,
                Ok(None) => {
                    tracing::debug!(provider_id = %link.provider_id, "neighbor has no metadata");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(provider_id = %link.provider_id, error = %e, "neighbor lookup failed");
                    continue;
                }
            };

            let neighbor_id = neighbor.node_id();
            if neighbor_id == current {
                continue;
            }
            if haversine_m(seed_coord, neighbor.coordinate()) > config.distance_threshold_m {
                continue;
            }

            if !graph.contains(&neighbor_id) {
                if graph.node_count() >= config.max_nodes {
                    if !budget_hit {
                        tracing::warn!(max_nodes = config.max_nodes, "crawl node budget reached");
                        budget_hit = true;
                    }
                    continue;
                }
                graph.insert_node(neighbor.to_node());
                queue.push_back(neighbor);
            }

            // `current` is always a node: it was either the seed or admitted
            // before it was enqueued.
            let added = graph.add_link(
                &current,
                Link {
                    neighbor: neighbor_id,
                    heading: normalize_heading(link.heading),
                    text: link.text.clone(),
                    elevation: link.elevation,
                    provider_id: link.provider_id.clone(),
                },
            );
            if let Err(e) = added {
                tracing::warn!(node = %current, error = %e, "dropping link from unknown node");
            }
        }
    }

    if cancelled || cancel.is_some_and(CancelFlag::is_cancelled) {
        tracing::info!(nodes = graph.node_count(), "crawl cancelled; returning partial graph");
    } else {
        tracing::info!(
            nodes = graph.node_count(),
            max_degree = graph.max_degree(),
            "crawl finished"
        );
    }
    Ok(graph)
}

/// Resolve the seed, snapping to a road once if the first lookup yields no
/// record or a record without links.
fn resolve_seed<P: MetadataProvider + ?Sized>(
    provider: &mut P,
    seed: Coordinate,
) -> Result<PanoMetadata, BuildError> {
    let first = provider.resolve_by_coordinate(seed)?;
    if let Some(meta) = &first {
        if !meta.links.is_empty() {
            return Ok(meta.clone());
        }
    }

    let snapped = match provider.snap_to_road(seed)? {
        Some(snapped) => {
            tracing::debug!(seed = %seed, snapped = %snapped, "seed has no links; snapped to road");
            provider.resolve_by_coordinate(snapped)?
        }
        None => None,
    };

    snapped
        .or(first)
        .ok_or(BuildError::NoMetadataFound { coordinate: seed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::geo::{initial_bearing, offset_meters};
    use crate::provider::LinkMetadata;

    /// Panoramas every `spacing_m` metres due north, each linked to the next
    /// and previous one. Transient ids carry a call counter, so the same
    /// panorama gets a different provider id on every lookup.
    struct ChainProvider {
        coords: Vec<Coordinate>,
        calls: usize,
        failing: BTreeSet<usize>,
        snap_target: Option<Coordinate>,
        bare_seed: bool,
    }

    impl ChainProvider {
        fn new(count: usize, spacing_m: f64) -> Self {
            let origin = Coordinate::new(40.7780, -73.9542);
            Self {
                coords: (0..count)
                    .map(|i| offset_meters(origin, spacing_m * i as f64, 0.0))
                    .collect(),
                calls: 0,
                failing: BTreeSet::new(),
                snap_target: None,
                bare_seed: false,
            }
        }

        fn record(&mut self, index: usize) -> PanoMetadata {
            self.calls += 1;
            let here = self.coords[index];
            let mut links = Vec::new();
            for j in [index.wrapping_sub(1), index + 1] {
                if let Some(there) = self.coords.get(j) {
                    links.push(LinkMetadata {
                        provider_id: format!("pano{j}#{}", self.calls),
                        heading: initial_bearing(here, *there),
                        text: "Main St".to_string(),
                        elevation: Some(12.0),
                    });
                }
            }
            PanoMetadata {
                provider_id: format!("pano{index}#{}", self.calls),
                lat: here.lat,
                lng: here.lng,
                links,
            }
        }
    }

    impl MetadataProvider for ChainProvider {
        fn resolve_by_coordinate(
            &mut self,
            coord: Coordinate,
        ) -> Result<Option<PanoMetadata>, ProviderError> {
            let nearest = (0..self.coords.len())
                .min_by(|&a, &b| {
                    haversine_m(coord, self.coords[a]).total_cmp(&haversine_m(coord, self.coords[b]))
                });
            let Some(index) = nearest else {
                return Ok(None);
            };
            if haversine_m(coord, self.coords[index]) > 50.0 {
                return Ok(None);
            }
            let mut meta = self.record(index);
            if self.bare_seed && coord == self.coords[0] {
                meta.links.clear();
            }
            Ok(Some(meta))
        }

        fn resolve_by_id(&mut self, provider_id: &str) -> Result<Option<PanoMetadata>, ProviderError> {
            let index: usize = provider_id
                .trim_start_matches("pano")
                .split('#')
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| ProviderError::Decode(provider_id.to_string()))?;
            if self.failing.contains(&index) {
                return Err(ProviderError::Transport("connection reset".into()));
            }
            if index >= self.coords.len() {
                return Ok(None);
            }
            Ok(Some(self.record(index)))
        }

        fn snap_to_road(&mut self, _coord: Coordinate) -> Result<Option<Coordinate>, ProviderError> {
            Ok(self.snap_target)
        }
    }

    fn id(c: Coordinate) -> NodeId {
        NodeId::from_coordinate(c)
    }

    #[test]
    fn threshold_prunes_by_distance_from_seed() {
        let mut provider = ChainProvider::new(5, 10.0);
        let seed = provider.coords[0];
        let graph = build_graph(
            &mut provider,
            seed,
            &CrawlConfig::with_threshold(25.0),
            None,
        )
        .unwrap();

        assert_eq!(graph.node_count(), 3);
        for c in &provider.coords[..3] {
            assert!(graph.contains(&id(*c)));
        }
        for c in &provider.coords[3..] {
            assert!(!graph.contains(&id(*c)));
        }
        // Links exist between admitted nodes only.
        let middle = graph.node(&id(provider.coords[1])).unwrap();
        assert_eq!(middle.degree(), 2);
        let edge = graph.node(&id(provider.coords[2])).unwrap();
        assert_eq!(edge.degree(), 1);
        assert!(graph.dangling_links().is_empty());
    }

    #[test]
    fn same_panorama_gets_same_id_by_coordinate_and_by_link() {
        let mut provider = ChainProvider::new(3, 10.0);
        let seed = provider.coords[0];
        let by_coord = provider.resolve_by_coordinate(seed).unwrap().unwrap();
        let next = provider
            .resolve_by_id(&by_coord.links[0].provider_id)
            .unwrap()
            .unwrap();
        let back_link = next
            .links
            .iter()
            .find(|l| l.provider_id.starts_with("pano0#"))
            .unwrap();
        let by_link = provider.resolve_by_id(&back_link.provider_id).unwrap().unwrap();

        assert_ne!(by_coord.provider_id, by_link.provider_id);
        assert_eq!(by_coord.node_id(), by_link.node_id());
    }

    #[test]
    fn headings_are_normalized_and_metadata_copied() {
        let mut provider = ChainProvider::new(3, 10.0);
        let seed = provider.coords[1];
        let graph = build_graph(
            &mut provider,
            seed,
            &CrawlConfig::with_threshold(100.0),
            None,
        )
        .unwrap();
        let middle = graph.node(&id(provider.coords[1])).unwrap();
        let south = &middle.links[&id(provider.coords[0])];
        assert!((south.heading - 180.0).abs() < 1e-6);
        assert_eq!(south.text, "Main St");
        assert_eq!(south.elevation, Some(12.0));
        for link in middle.links.values() {
            assert!((0.0..360.0).contains(&link.heading));
        }
    }

    #[test]
    fn seed_without_metadata_fails() {
        let mut provider = ChainProvider::new(3, 10.0);
        let far = Coordinate::new(0.0, 0.0);
        let err = build_graph(&mut provider, far, &CrawlConfig::default(), None).unwrap_err();
        assert_eq!(err, BuildError::NoMetadataFound { coordinate: far });
    }

    #[test]
    fn linkless_seed_is_snapped_to_road() {
        let mut provider = ChainProvider::new(3, 10.0);
        provider.bare_seed = true;
        provider.snap_target = Some(provider.coords[1]);
        let seed = provider.coords[0];
        let graph = build_graph(
            &mut provider,
            seed,
            &CrawlConfig::with_threshold(100.0),
            None,
        )
        .unwrap();
        assert_eq!(graph.source(), &id(provider.coords[1]));
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn linkless_seed_without_snap_yields_single_node() {
        let mut provider = ChainProvider::new(3, 10.0);
        provider.bare_seed = true;
        let seed = provider.coords[0];
        let graph = build_graph(
            &mut provider,
            seed,
            &CrawlConfig::with_threshold(100.0),
            None,
        )
        .unwrap();
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn failing_neighbor_is_skipped() {
        let mut provider = ChainProvider::new(4, 10.0);
        provider.failing.insert(2);
        let seed = provider.coords[0];
        let graph = build_graph(
            &mut provider,
            seed,
            &CrawlConfig::with_threshold(100.0),
            None,
        )
        .unwrap();
        assert_eq!(graph.node_count(), 2);
        assert!(graph.dangling_links().is_empty());
    }

    #[test]
    fn node_budget_caps_admission() {
        let mut provider = ChainProvider::new(10, 10.0);
        let config = CrawlConfig {
            distance_threshold_m: 1_000.0,
            max_nodes: 4,
        };
        let seed = provider.coords[0];
        let graph = build_graph(&mut provider, seed, &config, None).unwrap();
        assert_eq!(graph.node_count(), 4);
        assert!(graph.dangling_links().is_empty());
    }

    #[test]
    fn cancelled_crawl_returns_closed_partial_graph() {
        let mut provider = ChainProvider::new(10, 10.0);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let seed = provider.coords[0];
        let graph = build_graph(
            &mut provider,
            seed,
            &CrawlConfig::with_threshold(1_000.0),
            Some(&cancel),
        )
        .unwrap();
        assert_eq!(graph.node_count(), 1);
        assert!(graph.dangling_links().is_empty());
    }
}
