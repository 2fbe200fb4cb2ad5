use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::state::AppState;

/// `GET /health` - liveness check.
///
/// Always `200 OK`: an unconfigured upstream degrades its own routes, not the
/// process. The `upstreams` block reports which ones are usable.
///
/// Response shape:
/// ```json
/// { "status": "ok", "version": "0.1.0", "upstreams": { "ga4": true, "searchConsole": false, "ai": true } }
/// ```
#[tracing::instrument(skip(state))]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "upstreams": {
            "ga4": state.traffic.is_ready(),
            "searchConsole": state.search.is_ready(),
            "ai": state.assistant.is_ready(),
        }
    }))
}
