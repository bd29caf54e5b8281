// Client construction errors.
//
// Request-time failures are reported through the core error types
// (`ProviderError` for metadata and imagery, `OracleError` for the chat
// oracle) so the engine can handle them without knowing about HTTP.

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0} is not set")]
    MissingCredential(&'static str),

    #[error("cache directory error: {0}")]
    Io(#[from] std::io::Error),
}
