use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};

use insyflow_core::preferences::PreferencesUpdate;

use crate::{error::AppError, state::AppState};

/// `GET /api/preferences`
pub async fn get_preferences(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.preferences.get().await)
}

/// `PATCH /api/preferences` - Partial update; `"website": null` disconnects.
#[tracing::instrument(skip(state))]
pub async fn update_preferences(
    State(state): State<Arc<AppState>>,
    Json(update): Json<PreferencesUpdate>,
) -> Result<impl IntoResponse, AppError> {
    let prefs = state.preferences.update(update).await?;
    tracing::info!(theme = ?prefs.theme, locale = %prefs.locale, "Preferences updated");
    Ok(Json(prefs))
}
