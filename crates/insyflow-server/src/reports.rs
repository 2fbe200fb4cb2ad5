//! Dashboard assembly: fan out upstream queries, then normalize.
//!
//! Each builder takes the source trait object and the periods to report on,
//! so handlers own period selection and tests can pin the dates.

use serde::Serialize;

use insyflow_core::{
    report::{
        build_trend, format_compact_date, page_path, reshape_dimension_rows, search_kpis,
        traffic_kpis, DimensionSlice, Kpi, Period, RawDimensionRow, ReshapeOptions,
        SearchPerformancePoint, SearchTotals, TrafficTotals, TrendPoint, TOP_N,
    },
    source::{
        OrderBy, ReportRequest, SearchAnalyticsQuery, SearchAnalyticsRow, SearchDimension,
        SearchSource, SearchType, TrafficSource,
    },
};

use crate::error::AppError;

/// Daily series are capped well above the longest range.
const SERIES_ROW_LIMIT: u32 = 1000;

const REALTIME_METRICS: [&str; 2] = ["activeUsers", "eventCount"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficDashboard {
    pub kpis: Vec<Kpi>,
    pub users_trend: Vec<TrendPoint>,
    pub traffic_channels: Vec<DimensionSlice>,
    pub top_pages: Vec<DimensionSlice>,
    pub period: Period,
    pub previous_period: Period,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDashboard {
    pub seo_kpis: Vec<Kpi>,
    pub performance: Vec<SearchPerformancePoint>,
    pub top_queries: Vec<DimensionSlice>,
    pub top_pages: Vec<DimensionSlice>,
    pub period: Period,
    pub previous_period: Period,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeSnapshot {
    pub active_users: f64,
    pub event_count: f64,
}

/// Traffic KPIs, users trend, channel shares and top pages for `current`.
pub async fn build_traffic_dashboard(
    source: &dyn TrafficSource,
    current: Period,
    previous: Period,
) -> Result<TrafficDashboard, AppError> {
    let totals_cur = ReportRequest::totals(current, &TrafficTotals::METRICS);
    let totals_prev = ReportRequest::totals(previous, &TrafficTotals::METRICS);
    let trend = ReportRequest::by_dimension(current, "date", &["totalUsers"])
        .order_by(OrderBy::DimensionAsc("date".to_string()))
        .limit(SERIES_ROW_LIMIT);
    let channels = ReportRequest::by_dimension(current, "sessionDefaultChannelGroup", &["sessions"])
        .order_by(OrderBy::MetricDesc("sessions".to_string()))
        .limit(TOP_N as u32);
    let pages = ReportRequest::by_dimension(current, "pagePath", &["screenPageViews", "totalUsers"])
        .order_by(OrderBy::MetricDesc("screenPageViews".to_string()))
        .limit(TOP_N as u32);

    let (totals_cur, totals_prev, trend, channels, pages) = tokio::try_join!(
        source.run_report(&totals_cur),
        source.run_report(&totals_prev),
        source.run_report(&trend),
        source.run_report(&channels),
        source.run_report(&pages),
    )
    .map_err(|e| AppError::upstream("GA4 request failed", e))?;

    let cur = TrafficTotals::from_values(&totals_cur.aggregate().metrics);
    let prev = TrafficTotals::from_values(&totals_prev.aggregate().metrics);

    let users_trend = build_trend(
        trend
            .rows
            .iter()
            .map(|row| TrendPoint {
                date: format_compact_date(row.dimension(0).unwrap_or_default()),
                value: row.metric(0),
            })
            .collect(),
    );

    let traffic_channels = reshape_dimension_rows(
        channels
            .rows
            .iter()
            .map(|row| RawDimensionRow::new(label_or(row.dimension(0), "Other"), vec![row.metric(0)]))
            .collect(),
        ReshapeOptions {
            sort_metric: 0,
            ratio_total: Some(cur.sessions),
        },
    );

    let top_pages = reshape_dimension_rows(
        pages
            .rows
            .iter()
            .map(|row| {
                RawDimensionRow::new(label_or(row.dimension(0), "/"), vec![row.metric(0), row.metric(1)])
            })
            .collect(),
        ReshapeOptions::default(),
    );

    Ok(TrafficDashboard {
        kpis: traffic_kpis(&cur, &prev),
        users_trend,
        traffic_channels,
        top_pages,
        period: current,
        previous_period: previous,
    })
}

/// Search KPIs, daily performance, top queries and top pages for `current`.
pub async fn build_search_dashboard(
    source: &dyn SearchSource,
    search_type: SearchType,
    current: Period,
    previous: Period,
) -> Result<SearchDashboard, AppError> {
    let totals_cur = SearchAnalyticsQuery::totals(current, search_type);
    let totals_prev = SearchAnalyticsQuery::totals(previous, search_type);
    let performance =
        SearchAnalyticsQuery::by_dimension(current, search_type, SearchDimension::Date, SERIES_ROW_LIMIT);
    let queries =
        SearchAnalyticsQuery::by_dimension(current, search_type, SearchDimension::Query, TOP_N as u32);
    let pages =
        SearchAnalyticsQuery::by_dimension(current, search_type, SearchDimension::Page, TOP_N as u32);

    let (totals_cur, totals_prev, performance, queries, pages) = tokio::try_join!(
        source.query(&totals_cur),
        source.query(&totals_prev),
        source.query(&performance),
        source.query(&queries),
        source.query(&pages),
    )
    .map_err(|e| AppError::upstream("GSC request failed", e))?;

    let cur = search_totals(&totals_cur);
    let prev = search_totals(&totals_prev);

    let performance = build_trend(
        performance
            .iter()
            .map(|row| {
                let totals = row_totals(row);
                SearchPerformancePoint {
                    date: row.key(0).to_string(),
                    clicks: totals.clicks,
                    impressions: totals.impressions,
                }
            })
            .collect(),
    );

    let top_queries = search_table(&queries, |key| key.to_string());
    let top_pages = search_table(&pages, page_path);

    Ok(SearchDashboard {
        seo_kpis: search_kpis(&cur, &prev),
        performance,
        top_queries,
        top_pages,
        period: current,
        previous_period: previous,
    })
}

/// Active users and event count right now.
pub async fn fetch_realtime(source: &dyn TrafficSource) -> Result<RealtimeSnapshot, AppError> {
    let report = source
        .run_realtime_report(&REALTIME_METRICS)
        .await
        .map_err(|e| AppError::upstream("GA4 realtime request failed", e))?;
    let row = report.aggregate();
    Ok(RealtimeSnapshot {
        active_users: row.metric(0),
        event_count: row.metric(1),
    })
}

fn label_or(raw: Option<&str>, fallback: &str) -> String {
    match raw.map(str::trim) {
        Some(label) if !label.is_empty() => label.to_string(),
        _ => fallback.to_string(),
    }
}

fn row_totals(row: &SearchAnalyticsRow) -> SearchTotals {
    SearchTotals::from_raw(row.clicks, row.impressions, row.ctr, row.position)
}

/// Site-wide totals come back as a single keyless row, or no rows at all.
fn search_totals(rows: &[SearchAnalyticsRow]) -> SearchTotals {
    rows.first().map(row_totals).unwrap_or_default()
}

fn search_table(rows: &[SearchAnalyticsRow], label: impl Fn(&str) -> String) -> Vec<DimensionSlice> {
    reshape_dimension_rows(
        rows.iter()
            .map(|row| RawDimensionRow::new(label(row.key(0)), row_totals(row).to_metrics()))
            .collect(),
        ReshapeOptions::default(),
    )
}
