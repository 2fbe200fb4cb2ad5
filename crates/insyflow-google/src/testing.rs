//! Shared fixtures for client tests against a local mock server.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::{
    auth::{ServiceAccountKey, TokenProvider},
    http::build_http_client,
};

pub(crate) const ACCESS_TOKEN: &str = "ya29.test-token";

const PRIVATE_KEY: &str = include_str!("../testdata/service_account_key.pem");

/// A key whose token URI points at `server`.
pub(crate) fn service_account_key(server: &MockServer) -> ServiceAccountKey {
    let raw = json!({
        "type": "service_account",
        "client_email": "reporter@insyflow-test.iam.gserviceaccount.com",
        "private_key": PRIVATE_KEY,
        "token_uri": format!("{}/token", server.uri()),
    });
    ServiceAccountKey::from_json(&raw.to_string()).expect("test key")
}

pub(crate) fn http() -> reqwest::Client {
    build_http_client(std::time::Duration::from_secs(5)).expect("http client")
}

/// Token endpoint that grants [`ACCESS_TOKEN`] for `expires_in` seconds.
pub(crate) fn token_endpoint(expires_in: i64) -> Mock {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains(
            "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
        ))
        .and(body_string_contains("assertion="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": ACCESS_TOKEN,
            "expires_in": expires_in,
            "token_type": "Bearer"
        })))
}

/// Token provider backed by a mounted token endpoint on `server`.
pub(crate) async fn token_provider(server: &MockServer, scope: &'static str) -> Arc<TokenProvider> {
    token_endpoint(3600).mount(server).await;
    Arc::new(TokenProvider::new(http(), service_account_key(server), scope).expect("provider"))
}
