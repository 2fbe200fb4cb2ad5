//! Google-backed implementations of the `insyflow-core` source traits.

pub mod auth;
pub mod ga4;
pub mod gemini;
pub mod http;
pub mod search_console;

#[cfg(test)]
mod testing;

use thiserror::Error;

pub use auth::{ServiceAccountKey, TokenProvider};
pub use ga4::Ga4Client;
pub use gemini::GeminiClient;
pub use http::build_http_client;
pub use search_console::SearchConsoleClient;

#[derive(Debug, Error)]
pub enum GoogleError {
    #[error("invalid service account key: {0}")]
    InvalidKey(String),

    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },
}
