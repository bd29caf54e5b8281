// Shared blocking-HTTP plumbing: client construction, API-key redaction for
// log lines, and the mapping of transport failures onto `ProviderError`.

use crate::error::ClientError;
use panonav_core::error::ProviderError;
use reqwest::blocking::{Client, RequestBuilder, Response};
use std::time::Duration;

pub(crate) fn build_client(timeout: Duration) -> Result<Client, ClientError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Replace every occurrence of `secret` in `text` with `***`.
pub(crate) fn redact(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        text.to_string()
    } else {
        text.replace(secret, "***")
    }
}

/// Build, log (with the key redacted), and send a request.
pub(crate) fn send(
    client: &Client,
    request: RequestBuilder,
    secret: &str,
) -> Result<Response, ProviderError> {
    let request = request
        .build()
        .map_err(|e| ProviderError::Transport(redact(&e.to_string(), secret)))?;
    tracing::debug!(
        method = %request.method(),
        url = %redact(request.url().as_str(), secret),
        "provider request"
    );
    client
        .execute(request)
        .map_err(|e| ProviderError::Transport(redact(&e.to_string(), secret)))
}

/// Pass a 2xx response through; log and convert anything else.
pub(crate) fn check_status(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let endpoint = response.url().path().to_string();
    tracing::warn!(status = status.as_u16(), endpoint = %endpoint, "provider request failed");
    Err(ProviderError::Status {
        status: status.as_u16(),
        endpoint,
    })
}

pub(crate) fn decode_error(err: reqwest::Error) -> ProviderError {
    ProviderError::Decode(err.to_string())
}
