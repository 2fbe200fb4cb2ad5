use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use insyflow_core::report::{compute_periods, RangeCode, TRAFFIC_LAG_DAYS};

use crate::{
    error::AppError,
    reports::{build_traffic_dashboard, fetch_realtime},
    routes::{REALTIME_CACHE_CONTROL, REPORT_CACHE_CONTROL},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct TrafficQuery {
    pub range: Option<String>,
}

/// `GET /api/ga4?range=7d|30d|90d` - Traffic dashboard.
///
/// The current period ends yesterday (UTC); the previous period is the
/// window of equal length right before it.
#[tracing::instrument(skip(state))]
pub async fn get_traffic(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrafficQuery>,
) -> Result<impl IntoResponse, AppError> {
    let range = RangeCode::parse(query.range.as_deref())?;
    let source = state.traffic.get()?;

    let (current, previous) = compute_periods(range, TRAFFIC_LAG_DAYS);
    let dashboard = build_traffic_dashboard(source.as_ref(), current, previous).await?;
    tracing::debug!(range = range.as_str(), start = %current.start(), end = %current.end(), "Traffic dashboard built");

    Ok(([(header::CACHE_CONTROL, REPORT_CACHE_CONTROL)], Json(dashboard)))
}

/// `GET /api/ga4-rt` - Active users and event count right now.
#[tracing::instrument(skip(state))]
pub async fn get_realtime(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let source = state.traffic.get()?;
    let snapshot = fetch_realtime(source.as_ref()).await?;

    Ok(([(header::CACHE_CONTROL, REALTIME_CACHE_CONTROL)], Json(snapshot)))
}
