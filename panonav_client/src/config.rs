// Connection settings for the HTTP collaborators.
//
// Each client owns one config struct. All of them deserialize from JSON with
// per-field defaults (partial files load), and `from_env()` fills in the
// credentials from the process environment:
//
// - `GOOGLE_MAP_API_KEY` for `TilesConfig` and `StreetViewConfig`
// - `OPENAI_API_KEY` and optionally `OPENAI_BASE_URL` for `OracleConfig`
//
// Base URLs are plain fields so tests can point a client at a local mock.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const MAPS_KEY_VAR: &str = "GOOGLE_MAP_API_KEY";
pub const ORACLE_KEY_VAR: &str = "OPENAI_API_KEY";
pub const ORACLE_BASE_URL_VAR: &str = "OPENAI_BASE_URL";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

fn env_or_default(var: &str) -> String {
    std::env::var(var).unwrap_or_default()
}

/// Panorama metadata service (session, metadata, roads).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TilesConfig {
    pub api_key: String,
    pub tiles_base_url: String,
    pub roads_base_url: String,
    /// Search radius for coordinate lookups.
    pub radius_m: f64,
    pub language: String,
    pub region: String,
    pub timeout_secs: u64,
}

impl Default for TilesConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            tiles_base_url: "https://tile.googleapis.com".into(),
            roads_base_url: "https://roads.googleapis.com".into(),
            radius_m: 50.0,
            language: "en-US".into(),
            region: "US".into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl TilesConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: env_or_default(MAPS_KEY_VAR),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Street-view static image endpoint and its on-disk cache.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreetViewConfig {
    pub api_key: String,
    pub base_url: String,
    pub cache_dir: PathBuf,
    /// `"<width>x<height>"` in pixels.
    pub size: String,
    pub fov: u32,
    pub pitch: i32,
    pub timeout_secs: u64,
}

impl Default for StreetViewConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://maps.googleapis.com/maps/api/streetview".into(),
            cache_dir: PathBuf::from("data/street_views"),
            size: "600x400".into(),
            fov: 90,
            pitch: 0,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl StreetViewConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: env_or_default(MAPS_KEY_VAR),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// OpenAI-compatible chat completions endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub api_key: String,
    /// Everything before `/chat/completions`.
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            max_tokens: 300,
            temperature: 1.0,
            top_p: 1.0,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl OracleConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: env_or_default(ORACLE_KEY_VAR),
            base_url: std::env::var(ORACLE_BASE_URL_VAR).unwrap_or(defaults.base_url.clone()),
            ..defaults
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
