// Seams to the external collaborators the engine consumes.
//
// `MetadataProvider` resolves panorama metadata by coordinate or by the
// provider's own panorama id, and optionally snaps a coordinate onto the
// nearest routable point. `ImageSource` is a get-or-fetch street-level image
// store. Both are implemented over HTTP in `panonav_client` and by synthetic
// doubles in `panonav_tests`.
//
// Metadata records carry the provider's transient panorama id. The engine
// never keys anything by it; `PanoMetadata::node_id` derives the stable key
// from the coordinate.

use crate::error::ProviderError;
use crate::graph::PanoNode;
use crate::types::{Coordinate, NodeId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One neighbor reference inside a metadata record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkMetadata {
    pub provider_id: String,
    pub heading: f64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub elevation: Option<f64>,
}

/// Metadata for one panorama as returned by the provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PanoMetadata {
    pub provider_id: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub links: Vec<LinkMetadata>,
}

impl PanoMetadata {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }

    pub fn node_id(&self) -> NodeId {
        NodeId::from_coordinate(self.coordinate())
    }

    /// A graph node for this panorama, without links.
    pub fn to_node(&self) -> PanoNode {
        PanoNode::new(self.coordinate(), self.provider_id.clone())
    }
}

pub trait MetadataProvider {
    /// Panorama nearest to `coord`, if any.
    fn resolve_by_coordinate(
        &mut self,
        coord: Coordinate,
    ) -> Result<Option<PanoMetadata>, ProviderError>;

    /// Panorama with the given provider id, if it still exists.
    fn resolve_by_id(&mut self, provider_id: &str) -> Result<Option<PanoMetadata>, ProviderError>;

    /// Nearest routable point to `coord`. Providers without a roads service
    /// return `None`, which disables the snap-and-retry step of a crawl.
    fn snap_to_road(&mut self, coord: Coordinate) -> Result<Option<Coordinate>, ProviderError> {
        let _ = coord;
        Ok(None)
    }
}

/// A street-level image taken at one heading.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewImage {
    pub heading: f64,
    /// JPEG bytes.
    pub bytes: Vec<u8>,
    /// Where the image is cached on disk, when it is.
    pub path: Option<PathBuf>,
}

pub trait ImageSource {
    /// Return the image looking along `heading` from `coord`, fetching it
    /// only if it is not already available.
    fn get_or_fetch(&mut self, coord: Coordinate, heading: f64) -> Result<ViewImage, ProviderError>;
}
