use std::sync::Arc;

use axum::{extract::State, http::header, response::IntoResponse, Json};
use serde::Serialize;

use insyflow_core::assistant::{build_prompt, split_bullets, AssistantRequest};

use crate::{error::AppError, routes::NO_STORE, state::AppState};

#[derive(Debug, Serialize)]
pub struct AssistantReply {
    pub text: String,
    /// Present for insight requests only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<String>>,
}

/// `POST /api/ai` - Answer a question or summarize dashboard data.
///
/// Body: `{"type": "ask" | "insights" | "seoInsights", "payload": {...}}`.
#[tracing::instrument(skip_all)]
pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AssistantRequest>,
) -> Result<impl IntoResponse, AppError> {
    let model = state.assistant.get()?;
    tracing::debug!(kind = request.kind(), "Assistant request");

    let prompt = build_prompt(&request);
    let text = model
        .generate(&prompt)
        .await
        .map_err(|e| AppError::upstream("AI request failed", e))?;

    let items = request.expects_bullets().then(|| split_bullets(&text));
    Ok(([(header::CACHE_CONTROL, NO_STORE)], Json(AssistantReply { text, items })))
}
