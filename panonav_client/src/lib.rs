// HTTP implementations of the engine's external collaborators.
//
// - `tiles.rs`:      TilesClient, the panorama MetadataProvider (session token,
//                    metadata by coordinate or id, snap-to-road).
// - `streetview.rs`: StreetViewCache, a file-backed get-or-fetch ImageSource.
// - `chat.rs`:       ChatOracle, a DecisionOracle over an OpenAI-compatible
//                    chat completions endpoint.
// - `config.rs`:     Per-client settings, loadable from JSON or the environment.
// - `http.rs`:       Shared request plumbing and key redaction.
//
// All clients are blocking and hold their own `reqwest` client; nothing here
// is process-global. Request failures surface as the core's `ProviderError`
// and `OracleError`; only construction can fail with `ClientError`.
//
// **Critical constraint: no secrets in logs.** Every logged URL and error
// string passes through `http::redact` first.

pub mod chat;
pub mod config;
pub mod error;
mod http;
#[cfg(test)]
mod mock;
pub mod streetview;
pub mod tiles;

pub use chat::ChatOracle;
pub use error::ClientError;
pub use streetview::StreetViewCache;
pub use tiles::TilesClient;
