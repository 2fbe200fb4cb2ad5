use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use insyflow_core::{
    report::{compute_periods, RangeCode, SEARCH_LAG_DAYS},
    source::SearchType,
};

use crate::{
    error::AppError,
    reports::build_search_dashboard,
    routes::{NO_STORE, REPORT_CACHE_CONTROL},
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub range: Option<String>,
    pub search_type: Option<String>,
}

/// `GET /api/gsc?range=&searchType=` - Search Console dashboard for
/// `GSC_SITE_URL`.
#[tracing::instrument(skip(state))]
pub async fn get_search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, AppError> {
    let range = RangeCode::parse(query.range.as_deref())?;
    let search_type = SearchType::parse(query.search_type.as_deref())?;
    let source = state.search_for_site()?;

    let (current, previous) = compute_periods(range, SEARCH_LAG_DAYS);
    let dashboard = build_search_dashboard(source.as_ref(), search_type, current, previous).await?;
    tracing::debug!(
        range = range.as_str(),
        search_type = %search_type,
        end = %current.end(),
        "Search dashboard built"
    );

    Ok(([(header::CACHE_CONTROL, REPORT_CACHE_CONTROL)], Json(dashboard)))
}

/// `GET /api/gsc-sites` - Properties the service account can read.
#[tracing::instrument(skip(state))]
pub async fn list_sites(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let source = state.search.get()?;
    let items = source
        .list_sites()
        .await
        .map_err(|e| AppError::upstream("GSC sites request failed", e))?;

    Ok(([(header::CACHE_CONTROL, NO_STORE)], Json(json!({ "items": items }))))
}
