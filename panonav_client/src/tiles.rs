// Street-view metadata client over the map tiles API.
//
// Implements `MetadataProvider` with three endpoints:
//
// - `POST {tiles}/v1/createSession?key=..` with `{mapType, language, region}`
//   returns the session token every metadata call needs. The token is
//   requested lazily on the first lookup and reused for the client's life.
// - `GET {tiles}/v1/streetview/metadata?session&key&lat&lng&radius` and
//   `...?session&key&panoId` return one panorama record. A 404 means "no
//   panorama here" and is reported as `Ok(None)`.
// - `GET {roads}/v1/snapToRoads?path=lat,lng&interpolate=false&key` snaps a
//   coordinate to the nearest road. A non-success status disables the snap
//   (`Ok(None)`) rather than failing the crawl.
//
// See also: `panonav_core::builder` which drives these calls, `http.rs` for
// request logging with the key redacted.

use crate::config::{MAPS_KEY_VAR, TilesConfig};
use crate::error::ClientError;
use crate::http::{build_client, check_status, decode_error, send};
use panonav_core::error::ProviderError;
use panonav_core::provider::{LinkMetadata, MetadataProvider, PanoMetadata};
use panonav_core::types::Coordinate;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionRequest<'a> {
    map_type: &'a str,
    language: &'a str,
    region: &'a str,
}

#[derive(Deserialize)]
struct SessionResponse {
    session: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMetadata {
    pano_id: String,
    lat: f64,
    lng: f64,
    #[serde(default)]
    links: Vec<WireLink>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireLink {
    pano_id: String,
    heading: f64,
    #[serde(default)]
    text: String,
    #[serde(default)]
    elevation_above_egm96: Option<f64>,
}

impl From<WireMetadata> for PanoMetadata {
    fn from(wire: WireMetadata) -> Self {
        PanoMetadata {
            provider_id: wire.pano_id,
            lat: wire.lat,
            lng: wire.lng,
            links: wire
                .links
                .into_iter()
                .map(|l| LinkMetadata {
                    provider_id: l.pano_id,
                    heading: l.heading,
                    text: l.text,
                    elevation: l.elevation_above_egm96,
                })
                .collect(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapResponse {
    #[serde(default)]
    snapped_points: Vec<SnappedPoint>,
}

#[derive(Deserialize)]
struct SnappedPoint {
    location: SnappedLocation,
}

#[derive(Deserialize)]
struct SnappedLocation {
    latitude: f64,
    longitude: f64,
}

pub struct TilesClient {
    http: Client,
    config: TilesConfig,
    session: Option<String>,
}

impl TilesClient {
    pub fn new(config: TilesConfig) -> Result<Self, ClientError> {
        if config.api_key.is_empty() {
            return Err(ClientError::MissingCredential(MAPS_KEY_VAR));
        }
        Ok(Self {
            http: build_client(config.timeout())?,
            config,
            session: None,
        })
    }

    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(TilesConfig::from_env())
    }

    /// The session token, created on first use.
    pub fn session_token(&mut self) -> Result<String, ProviderError> {
        if let Some(token) = &self.session {
            return Ok(token.clone());
        }
        let key = &self.config.api_key;
        let request = self
            .http
            .post(format!("{}/v1/createSession", self.config.tiles_base_url))
            .query(&[("key", key.as_str())])
            .json(&SessionRequest {
                map_type: "streetview",
                language: &self.config.language,
                region: &self.config.region,
            });
        let response = check_status(send(&self.http, request, key)?)?;
        let body: SessionResponse = response.json().map_err(decode_error)?;
        tracing::info!("created street-view session");
        self.session = Some(body.session.clone());
        Ok(body.session)
    }

    fn metadata(
        &mut self,
        lookup: &[(&str, String)],
    ) -> Result<Option<PanoMetadata>, ProviderError> {
        let session = self.session_token()?;
        let key = &self.config.api_key;
        let request = self
            .http
            .get(format!("{}/v1/streetview/metadata", self.config.tiles_base_url))
            .query(&[("session", session.as_str()), ("key", key.as_str())])
            .query(lookup);
        let response = send(&self.http, request, key)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let wire: WireMetadata = check_status(response)?.json().map_err(decode_error)?;
        Ok(Some(wire.into()))
    }
}

impl MetadataProvider for TilesClient {
    fn resolve_by_coordinate(
        &mut self,
        coord: Coordinate,
    ) -> Result<Option<PanoMetadata>, ProviderError> {
        let radius = self.config.radius_m;
        self.metadata(&[
            ("lat", coord.lat.to_string()),
            ("lng", coord.lng.to_string()),
            ("radius", radius.to_string()),
        ])
    }

    fn resolve_by_id(&mut self, provider_id: &str) -> Result<Option<PanoMetadata>, ProviderError> {
        self.metadata(&[("panoId", provider_id.to_string())])
    }

    fn snap_to_road(&mut self, coord: Coordinate) -> Result<Option<Coordinate>, ProviderError> {
        let key = &self.config.api_key;
        let request = self
            .http
            .get(format!("{}/v1/snapToRoads", self.config.roads_base_url))
            .query(&[
                ("path", coord.to_string()),
                ("interpolate", "false".to_string()),
                ("key", key.clone()),
            ]);
        let response = match check_status(send(&self.http, request, key)?) {
            Ok(response) => response,
            Err(_) => return Ok(None),
        };
        let body: SnapResponse = response.json().map_err(decode_error)?;
        Ok(body
            .snapped_points
            .first()
            .map(|p| Coordinate::new(p.location.latitude, p.location.longitude)))
    }
}
