use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::GoogleError;

/// Shared HTTP client for all Google endpoints.
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("insyflow/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")
}

/// Decode a successful JSON response, or turn a non-2xx one into
/// [`GoogleError::Status`] carrying the upstream body for diagnostics.
pub(crate) async fn read_json<T: DeserializeOwned>(
    resp: Response,
    service: &'static str,
) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(GoogleError::Status {
            service,
            status: status.as_u16(),
            body: truncate(&body, 2048),
        }
        .into());
    }
    resp.json::<T>()
        .await
        .with_context(|| format!("{service} response parse failed"))
}

fn truncate(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}
