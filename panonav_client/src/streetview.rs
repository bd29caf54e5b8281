// Get-or-fetch cache of street-view images.
//
// Each image is stored as `{cache_dir}/{lat,lng}_{heading}_{pitch}_{fov}_{size}.jpg`.
// A lookup reads the file when it exists and only otherwise calls
// `GET {base}?size&location&heading&pitch&fov&key`, writing the bytes to the
// cache before returning them. Hit and miss counts are kept for the run
// summary.

use crate::config::{MAPS_KEY_VAR, StreetViewConfig};
use crate::error::ClientError;
use crate::http::{build_client, check_status, send};
use panonav_core::error::ProviderError;
use panonav_core::geo::normalize_heading;
use panonav_core::provider::{ImageSource, ViewImage};
use panonav_core::types::Coordinate;
use reqwest::blocking::Client;
use std::fs;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

pub struct StreetViewCache {
    http: Client,
    config: StreetViewConfig,
    stats: CacheStats,
}

impl StreetViewCache {
    pub fn new(config: StreetViewConfig) -> Result<Self, ClientError> {
        if config.api_key.is_empty() {
            return Err(ClientError::MissingCredential(MAPS_KEY_VAR));
        }
        fs::create_dir_all(&config.cache_dir)?;
        Ok(Self {
            http: build_client(config.timeout())?,
            config,
            stats: CacheStats::default(),
        })
    }

    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(StreetViewConfig::from_env())
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn cache_path(&self, coord: Coordinate, heading: f64) -> PathBuf {
        let c = &self.config;
        self.config.cache_dir.join(format!(
            "{coord}_{heading}_{}_{}_{}.jpg",
            c.pitch, c.fov, c.size
        ))
    }

    fn fetch(&self, coord: Coordinate, heading: f64) -> Result<Vec<u8>, ProviderError> {
        let c = &self.config;
        let request = self.http.get(&c.base_url).query(&[
            ("size", c.size.clone()),
            ("location", coord.to_string()),
            ("heading", heading.to_string()),
            ("pitch", c.pitch.to_string()),
            ("fov", c.fov.to_string()),
            ("key", c.api_key.clone()),
        ]);
        let response = check_status(send(&self.http, request, &c.api_key)?)?;
        let bytes = response
            .bytes()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

impl ImageSource for StreetViewCache {
    fn get_or_fetch(&mut self, coord: Coordinate, heading: f64) -> Result<ViewImage, ProviderError> {
        let heading = normalize_heading(heading);
        let path = self.cache_path(coord, heading);
        if path.is_file() {
            let bytes = fs::read(&path).map_err(|e| ProviderError::Io(e.to_string()))?;
            self.stats.hits += 1;
            return Ok(ViewImage {
                heading,
                bytes,
                path: Some(path),
            });
        }

        let bytes = self.fetch(coord, heading)?;
        fs::write(&path, &bytes).map_err(|e| ProviderError::Io(e.to_string()))?;
        self.stats.misses += 1;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "cached street view");
        Ok(ViewImage {
            heading,
            bytes,
            path: Some(path),
        })
    }
}
