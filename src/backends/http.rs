use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::errors::{BackendError, BackendResult};

pub(crate) fn build_client(timeout: Duration) -> BackendResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(BackendError::from_reqwest)
}

/// Sends `request` once and turns non-2xx responses into typed errors.
pub(crate) async fn send(request: RequestBuilder, operation: &str) -> BackendResult<Response> {
    let response = request.send().await.map_err(|e| {
        warn!("[{}] Request failed: {}", operation, e);
        BackendError::from_reqwest(e)
    })?;

    let status = response.status();
    debug!("[{}] Response: {}", operation, status);

    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read response body>".to_string());
        warn!(
            "[{}] Error response - Status: {}, Body: {}",
            operation,
            status.as_u16(),
            excerpt(&body)
        );
        return Err(BackendError::from_status(status.as_u16(), body));
    }

    Ok(response)
}

/// Reads the body as text first so a parse failure can log what arrived.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: Response,
    operation: &str,
) -> BackendResult<T> {
    let text = response.text().await.map_err(|e| {
        warn!("[{}] Failed to read response body: {}", operation, e);
        BackendError::from_reqwest(e)
    })?;

    serde_json::from_str(&text).map_err(|e| {
        warn!(
            "[{}] Failed to parse response: {} (body: {})",
            operation,
            e,
            excerpt(&text)
        );
        BackendError::Decode(format!("{}: {}", operation, e))
    })
}

pub(crate) async fn get_json<T: DeserializeOwned>(
    request: RequestBuilder,
    operation: &str,
) -> BackendResult<T> {
    let response = send(request, operation).await?;
    read_json(response, operation).await
}

/// `path` under the server URL with `query` form-encoded. A path prefix on
/// the server URL (reverse proxies) is kept. Empty if `base` does not parse.
pub(crate) fn endpoint_url(base: &str, path: &str, query: &[(&str, &str)]) -> String {
    let mut url = match Url::parse(base) {
        Ok(url) => url,
        Err(e) => {
            warn!("Invalid server URL '{}': {}", base, e);
            return String::new();
        }
    };

    let full_path = format!("{}{}", url.path().trim_end_matches('/'), path);
    url.set_path(&full_path);
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    url.into()
}

fn excerpt(body: &str) -> String {
    body.chars().take(500).collect()
}
