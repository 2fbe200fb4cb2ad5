//! Reporting normalizer.
//!
//! Pure functions that turn raw upstream aggregates into the KPI, trend and
//! table shapes the dashboard renders. Nothing here performs I/O; absent or
//! malformed upstream values arrive as `0` and stay `0`.

use std::str::FromStr;

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::error::CoreError;

/// Number of rows kept by [`reshape_dimension_rows`].
pub const TOP_N: usize = 10;

/// GA4 totals for "yesterday" are considered final.
pub const TRAFFIC_LAG_DAYS: u32 = 1;

/// Search Console data settles roughly two days behind.
pub const SEARCH_LAG_DAYS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeCode {
    Last7Days,
    #[default]
    Last30Days,
    Last90Days,
}

impl RangeCode {
    /// Parse the `range` query parameter. Absent means the 30-day default.
    pub fn parse(raw: Option<&str>) -> Result<Self, CoreError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(other) => other.parse(),
        }
    }

    pub fn days(self) -> i64 {
        match self {
            Self::Last7Days => 7,
            Self::Last30Days => 30,
            Self::Last90Days => 90,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Last7Days => "7d",
            Self::Last30Days => "30d",
            Self::Last90Days => "90d",
        }
    }
}

impl FromStr for RangeCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "7d" => Ok(Self::Last7Days),
            "30d" => Ok(Self::Last30Days),
            "90d" => Ok(Self::Last90Days),
            other => Err(CoreError::UnknownRange(other.to_string())),
        }
    }
}

/// Closed UTC date interval, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    start: NaiveDate,
    end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CoreError> {
        if end < start {
            return Err(CoreError::InvertedPeriod { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Inclusive length in days.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// The window of equal length ending the day before this one starts.
    pub fn preceding(&self) -> Self {
        let end = self.start - Duration::days(1);
        Self {
            start: end - Duration::days(self.num_days() - 1),
            end,
        }
    }
}

/// Current and previous reporting windows, evaluated against today's UTC date.
pub fn compute_periods(range: RangeCode, lag_days: u32) -> (Period, Period) {
    compute_periods_at(range, lag_days, Utc::now().date_naive())
}

pub fn compute_periods_at(range: RangeCode, lag_days: u32, today: NaiveDate) -> (Period, Period) {
    let end = today - Duration::days(i64::from(lag_days));
    let current = Period {
        start: end - Duration::days(range.days() - 1),
        end,
    };
    let previous = current.preceding();
    (current, previous)
}

/// Signed percent change; `0` when there is no baseline.
pub fn percent_change(curr: f64, prev: f64) -> f64 {
    if prev == 0.0 {
        return 0.0;
    }
    (curr - prev) / prev * 100.0
}

/// Percent change for lower-is-better metrics, so improvement is positive.
pub fn percent_change_inverted(curr: f64, prev: f64) -> f64 {
    if prev == 0.0 {
        return 0.0;
    }
    (prev - curr) / prev * 100.0
}

pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    numerator / denominator
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KpiFormat {
    Number,
    Time,
    Percent,
    Decimal,
}

impl FromStr for KpiFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "number" => Ok(Self::Number),
            "time" => Ok(Self::Time),
            "percent" => Ok(Self::Percent),
            "decimal" => Ok(Self::Decimal),
            other => Err(CoreError::UnknownKpiFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpi {
    pub key: String,
    /// Translation key resolved by the presentation layer, e.g. `kpi.users`.
    pub label: String,
    pub value: f64,
    pub change_pct: f64,
    pub format: KpiFormat,
}

pub fn build_kpi(key: &str, label: &str, value: f64, change_pct: f64, format: KpiFormat) -> Kpi {
    Kpi {
        key: key.to_string(),
        label: label.to_string(),
        value,
        change_pct,
        format,
    }
}

/// Anything ordered on a `YYYY-MM-DD` date string.
pub trait Dated {
    fn date(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: String,
    pub value: f64,
}

impl Dated for TrendPoint {
    fn date(&self) -> &str {
        &self.date
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchPerformancePoint {
    pub date: String,
    pub clicks: f64,
    pub impressions: f64,
}

impl Dated for SearchPerformancePoint {
    fn date(&self) -> &str {
        &self.date
    }
}

/// Drop undated points and order the rest ascending by date.
///
/// Days the upstream did not report stay absent; nothing is zero-filled.
pub fn build_trend<T: Dated>(points: Vec<T>) -> Vec<T> {
    let mut points: Vec<T> = points.into_iter().filter(|p| !p.date().is_empty()).collect();
    points.sort_by(|a, b| a.date().cmp(b.date()));
    points
}

/// One raw row of a dimensioned report, metric values already numeric.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDimensionRow {
    pub label: String,
    pub metrics: Vec<f64>,
}

impl RawDimensionRow {
    pub fn new(label: impl Into<String>, metrics: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            metrics,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionSlice {
    pub label: String,
    pub metric_values: Vec<f64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReshapeOptions {
    /// Index into each row's metrics used for the descending sort.
    pub sort_metric: usize,
    /// When set, metric values are shown as a rounded percentage of this total.
    pub ratio_total: Option<f64>,
}

/// Sort by the chosen metric (descending, stable), keep [`TOP_N`] rows and
/// optionally express values as a share of a total.
///
/// Non-finite metric values count as `0`. Rows past the cut are dropped, not
/// rolled up into an "Other" row.
pub fn reshape_dimension_rows(
    rows: Vec<RawDimensionRow>,
    options: ReshapeOptions,
) -> Vec<DimensionSlice> {
    let mut rows: Vec<RawDimensionRow> = rows
        .into_iter()
        .map(|mut row| {
            for v in row.metrics.iter_mut() {
                if !v.is_finite() {
                    *v = 0.0;
                }
            }
            row
        })
        .collect();

    // Keys are finite here; `total_cmp` keeps the comparator a total order.
    let sort_key = |row: &RawDimensionRow| row.metrics.get(options.sort_metric).copied().unwrap_or(0.0);
    rows.sort_by(|a, b| sort_key(b).total_cmp(&sort_key(a)));
    rows.truncate(TOP_N);

    let total = options.ratio_total.map(|t| t.max(1.0));
    rows.into_iter()
        .map(|row| DimensionSlice {
            label: row.label,
            metric_values: match total {
                Some(total) => row
                    .metrics
                    .into_iter()
                    .map(|v| (v / total * 100.0).round())
                    .collect(),
                None => row.metrics,
            },
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMetric {
    Clicks,
    Impressions,
    /// Arrives as a 0..1 fraction.
    Ctr,
    /// Average ranking position; lower is better.
    Position,
}

pub fn normalize_search_metric(metric: SearchMetric, raw: f64) -> f64 {
    let raw = if raw.is_finite() { raw } else { 0.0 };
    match metric {
        SearchMetric::Clicks | SearchMetric::Impressions => raw.round(),
        SearchMetric::Ctr => raw * 100.0,
        SearchMetric::Position => raw,
    }
}

/// Numeric value of an upstream metric string; anything unusable is `0`.
pub fn parse_metric_value(raw: Option<&str>) -> f64 {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// `20250801` → `2025-08-01`. Anything not eight characters long is returned as is.
pub fn format_compact_date(raw: &str) -> String {
    if raw.len() != 8 || !raw.is_ascii() {
        return raw.to_string();
    }
    format!("{}-{}-{}", &raw[0..4], &raw[4..6], &raw[6..8])
}

/// Path component of an absolute page URL; non-URLs pass through.
pub fn page_path(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(url) if url.path().is_empty() => "/".to_string(),
        Ok(url) => url.path().to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Site-wide traffic aggregate for one period.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrafficTotals {
    pub total_users: f64,
    pub sessions: f64,
    pub screen_page_views: f64,
    /// Summed engagement seconds across all sessions.
    pub user_engagement_duration: f64,
}

impl TrafficTotals {
    /// Metric names in the order [`TrafficTotals::from_values`] expects.
    pub const METRICS: [&'static str; 4] = [
        "totalUsers",
        "sessions",
        "screenPageViews",
        "userEngagementDuration",
    ];

    pub fn from_values(values: &[f64]) -> Self {
        let at = |i: usize| values.get(i).copied().unwrap_or(0.0);
        Self {
            total_users: at(0),
            sessions: at(1),
            screen_page_views: at(2),
            user_engagement_duration: at(3),
        }
    }

    pub fn avg_engagement_seconds(&self) -> f64 {
        safe_ratio(self.user_engagement_duration, self.sessions)
    }
}

/// Headline traffic KPIs with period-over-period change.
pub fn traffic_kpis(current: &TrafficTotals, previous: &TrafficTotals) -> Vec<Kpi> {
    let avg_cur = current.avg_engagement_seconds();
    let avg_prev = previous.avg_engagement_seconds();
    vec![
        build_kpi(
            "users",
            "kpi.users",
            current.total_users,
            percent_change(current.total_users, previous.total_users),
            KpiFormat::Number,
        ),
        build_kpi(
            "sessions",
            "kpi.sessions",
            current.sessions,
            percent_change(current.sessions, previous.sessions),
            KpiFormat::Number,
        ),
        build_kpi(
            "pageviews",
            "kpi.pageviews",
            current.screen_page_views,
            percent_change(current.screen_page_views, previous.screen_page_views),
            KpiFormat::Number,
        ),
        // Displayed rounded, compared unrounded.
        build_kpi(
            "engagement",
            "kpi.avgEngagement",
            avg_cur.round(),
            percent_change(avg_cur, avg_prev),
            KpiFormat::Time,
        ),
    ]
}

/// Site-wide search aggregate for one period, already display-normalized.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SearchTotals {
    pub clicks: f64,
    pub impressions: f64,
    /// Percentage, 0..100.
    pub ctr: f64,
    pub position: f64,
}

impl SearchTotals {
    pub fn from_raw(clicks: f64, impressions: f64, ctr: f64, position: f64) -> Self {
        Self {
            clicks: normalize_search_metric(SearchMetric::Clicks, clicks),
            impressions: normalize_search_metric(SearchMetric::Impressions, impressions),
            ctr: normalize_search_metric(SearchMetric::Ctr, ctr),
            position: normalize_search_metric(SearchMetric::Position, position),
        }
    }

    /// `[clicks, impressions, ctr, position]`, the metric layout of search tables.
    pub fn to_metrics(self) -> Vec<f64> {
        vec![self.clicks, self.impressions, self.ctr, self.position]
    }
}

pub fn search_kpis(current: &SearchTotals, previous: &SearchTotals) -> Vec<Kpi> {
    vec![
        build_kpi(
            "clicks",
            "kpi.totalClicks",
            current.clicks,
            percent_change(current.clicks, previous.clicks),
            KpiFormat::Number,
        ),
        build_kpi(
            "impressions",
            "kpi.totalImpressions",
            current.impressions,
            percent_change(current.impressions, previous.impressions),
            KpiFormat::Number,
        ),
        build_kpi(
            "ctr",
            "kpi.avgCtr",
            current.ctr,
            percent_change(current.ctr, previous.ctr),
            KpiFormat::Percent,
        ),
        build_kpi(
            "position",
            "kpi.avgPosition",
            current.position,
            percent_change_inverted(current.position, previous.position),
            KpiFormat::Decimal,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn periods_are_equal_contiguous_and_lagged() {
        let today = date(2026, 3, 1);
        for range in [RangeCode::Last7Days, RangeCode::Last30Days, RangeCode::Last90Days] {
            for lag in [TRAFFIC_LAG_DAYS, SEARCH_LAG_DAYS] {
                let (current, previous) = compute_periods_at(range, lag, today);
                assert_eq!(current.num_days(), range.days());
                assert_eq!(previous.num_days(), range.days());
                assert_eq!(current.end(), today - Duration::days(i64::from(lag)));
                assert_eq!(previous.end(), current.start() - Duration::days(1));
                assert!(previous.start() <= previous.end());
            }
        }
    }

    #[test]
    fn seven_day_traffic_window_crosses_month_boundary() {
        let (current, previous) = compute_periods_at(RangeCode::Last7Days, 1, date(2026, 3, 3));
        assert_eq!(current.start(), date(2026, 2, 24));
        assert_eq!(current.end(), date(2026, 3, 2));
        assert_eq!(previous.start(), date(2026, 2, 17));
        assert_eq!(previous.end(), date(2026, 2, 23));
    }

    #[test]
    fn range_parsing() {
        assert_eq!(RangeCode::parse(None).expect("default"), RangeCode::Last30Days);
        assert_eq!(RangeCode::parse(Some("7d")).expect("7d"), RangeCode::Last7Days);
        assert_eq!(RangeCode::parse(Some(" 90d ")).expect("90d"), RangeCode::Last90Days);
        assert!(RangeCode::parse(Some("365d")).is_err());
        for code in ["7d", "30d", "90d"] {
            assert_eq!(RangeCode::parse(Some(code)).expect("range").as_str(), code);
        }
    }

    #[test]
    fn period_rejects_inverted_bounds() {
        assert!(Period::new(date(2026, 1, 2), date(2026, 1, 1)).is_err());
        let single = Period::new(date(2026, 1, 1), date(2026, 1, 1)).expect("period");
        assert_eq!(single.num_days(), 1);
    }

    #[test]
    fn percent_change_behaviour() {
        assert_eq!(percent_change(42.0, 0.0), 0.0);
        assert_eq!(percent_change(0.0, 0.0), 0.0);
        assert!(approx(percent_change(110.0, 100.0), 10.0));
        assert!(approx(percent_change(90.0, 100.0), -10.0));
    }

    #[test]
    fn inverted_change_rewards_lower_values() {
        assert!(approx(percent_change_inverted(9.0, 10.0), 10.0));
        assert!(approx(percent_change_inverted(11.0, 10.0), -10.0));
        assert_eq!(percent_change_inverted(5.0, 0.0), 0.0);
    }

    #[test]
    fn safe_ratio_never_divides_by_zero() {
        assert_eq!(safe_ratio(17.0, 0.0), 0.0);
        assert_eq!(safe_ratio(120.0, 2.0), 60.0);
    }

    #[test]
    fn kpi_format_parsing_and_serialization() {
        assert_eq!("time".parse::<KpiFormat>().expect("format"), KpiFormat::Time);
        assert!("currency".parse::<KpiFormat>().is_err());

        let kpi = build_kpi("ctr", "kpi.avgCtr", 2.7, 1.5, KpiFormat::Percent);
        let json = serde_json::to_value(&kpi).expect("json");
        assert_eq!(json["format"], "percent");
        assert_eq!(json["changePct"], 1.5);
        assert_eq!(json["label"], "kpi.avgCtr");
    }

    #[test]
    fn reshape_sorts_descending_and_truncates() {
        let rows: Vec<RawDimensionRow> = (0..25)
            .map(|i| RawDimensionRow::new(format!("/p{i}"), vec![f64::from(i % 7), 1.0]))
            .collect();
        let slices = reshape_dimension_rows(rows, ReshapeOptions::default());
        assert_eq!(slices.len(), TOP_N);
        for pair in slices.windows(2) {
            assert!(pair[0].metric_values[0] >= pair[1].metric_values[0]);
        }
    }

    #[test]
    fn reshape_treats_non_finite_values_as_zero() {
        let rows: Vec<RawDimensionRow> = (0..60)
            .map(|i| {
                let value = if i % 5 == 0 { f64::NAN } else { f64::from(i) };
                RawDimensionRow::new(format!("/p{i}"), vec![value])
            })
            .chain([RawDimensionRow::new("/inf", vec![f64::INFINITY])])
            .collect();

        let slices = reshape_dimension_rows(rows, ReshapeOptions::default());
        assert_eq!(slices.len(), TOP_N);
        assert_eq!(slices[0].label, "/p59");
        assert!(slices.iter().all(|s| s.metric_values[0].is_finite()));
        for pair in slices.windows(2) {
            assert!(pair[0].metric_values[0] >= pair[1].metric_values[0]);
        }

        let ratio = reshape_dimension_rows(
            vec![RawDimensionRow::new("Direct", vec![f64::NAN])],
            ReshapeOptions {
                sort_metric: 0,
                ratio_total: Some(100.0),
            },
        );
        assert_eq!(ratio[0].metric_values, vec![0.0]);
    }

    #[test]
    fn reshape_keeps_input_order_for_ties() {
        let rows = vec![
            RawDimensionRow::new("a", vec![1.0, 5.0]),
            RawDimensionRow::new("b", vec![3.0, 5.0]),
            RawDimensionRow::new("c", vec![2.0, 9.0]),
            RawDimensionRow::new("d", vec![4.0, 5.0]),
        ];
        let slices = reshape_dimension_rows(
            rows,
            ReshapeOptions {
                sort_metric: 1,
                ratio_total: None,
            },
        );
        let labels: Vec<&str> = slices.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn reshape_ratio_to_total() {
        let rows = vec![
            RawDimensionRow::new("Direct", vec![220.0]),
            RawDimensionRow::new("Organic Search", vec![580.0]),
            RawDimensionRow::new("Referral", vec![200.0]),
        ];
        let slices = reshape_dimension_rows(
            rows,
            ReshapeOptions {
                sort_metric: 0,
                ratio_total: Some(1000.0),
            },
        );
        assert_eq!(slices[0].label, "Organic Search");
        assert_eq!(slices[0].metric_values, vec![58.0]);
        assert_eq!(slices[1].metric_values, vec![22.0]);
        assert_eq!(slices[2].metric_values, vec![20.0]);
    }

    #[test]
    fn reshape_ratio_clamps_empty_total() {
        let slices = reshape_dimension_rows(
            vec![RawDimensionRow::new("Direct", vec![0.0])],
            ReshapeOptions {
                sort_metric: 0,
                ratio_total: Some(0.0),
            },
        );
        assert_eq!(slices[0].metric_values, vec![0.0]);
    }

    #[test]
    fn search_metric_normalization() {
        assert!(approx(normalize_search_metric(SearchMetric::Ctr, 0.027), 2.7));
        assert_eq!(normalize_search_metric(SearchMetric::Clicks, 12.6), 13.0);
        assert_eq!(normalize_search_metric(SearchMetric::Impressions, 99.4), 99.0);
        assert_eq!(normalize_search_metric(SearchMetric::Position, 18.34), 18.34);
        assert_eq!(normalize_search_metric(SearchMetric::Clicks, f64::NAN), 0.0);
    }

    #[test]
    fn metric_value_parsing_defaults_to_zero() {
        assert_eq!(parse_metric_value(Some("12890")), 12890.0);
        assert_eq!(parse_metric_value(Some("212.5")), 212.5);
        assert_eq!(parse_metric_value(Some("n/a")), 0.0);
        assert_eq!(parse_metric_value(Some("inf")), 0.0);
        assert_eq!(parse_metric_value(None), 0.0);
    }

    #[test]
    fn compact_dates_and_page_paths() {
        assert_eq!(format_compact_date("20250801"), "2025-08-01");
        assert_eq!(format_compact_date("2025-08-01"), "2025-08-01");
        assert_eq!(format_compact_date(""), "");
        assert_eq!(page_path("https://example.com/blog/seo-tips?x=1"), "/blog/seo-tips");
        assert_eq!(page_path("https://example.com"), "/");
        assert_eq!(page_path("/already/a/path"), "/already/a/path");
    }

    #[test]
    fn trend_is_ascending_without_gap_filling() {
        let points = vec![
            TrendPoint { date: "2026-02-03".into(), value: 3.0 },
            TrendPoint { date: "".into(), value: 9.0 },
            TrendPoint { date: "2026-02-01".into(), value: 1.0 },
        ];
        let trend = build_trend(points);
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].date, "2026-02-01");
        assert_eq!(trend[1].date, "2026-02-03");
    }

    #[test]
    fn users_kpi_end_to_end() {
        let current = TrafficTotals::from_values(&[12890.0, 19670.0, 48210.0, 4_170_000.0]);
        let previous = TrafficTotals::from_values(&[11890.0, 18700.0, 49650.0, 3_900_000.0]);
        let kpis = traffic_kpis(&current, &previous);

        let users = &kpis[0];
        assert_eq!(users.key, "users");
        assert_eq!(users.value, 12890.0);
        assert!((users.change_pct - 8.41).abs() < 0.01);

        let engagement = &kpis[3];
        assert_eq!(engagement.format, KpiFormat::Time);
        assert_eq!(engagement.value, 212.0);
    }

    #[test]
    fn traffic_kpis_with_empty_previous_period() {
        let current = TrafficTotals::from_values(&[10.0, 0.0]);
        let kpis = traffic_kpis(&current, &TrafficTotals::default());
        assert!(kpis.iter().all(|k| k.change_pct == 0.0));
        assert_eq!(kpis[3].value, 0.0);
    }

    #[test]
    fn position_kpi_is_inverted() {
        let current = SearchTotals::from_raw(5820.4, 212000.0, 0.027, 9.0);
        let previous = SearchTotals::from_raw(5000.0, 200000.0, 0.025, 10.0);
        let kpis = search_kpis(&current, &previous);
        assert_eq!(kpis[0].value, 5820.0);
        assert!(approx(kpis[2].value, 2.7));
        assert_eq!(kpis[3].format, KpiFormat::Decimal);
        assert!(approx(kpis[3].change_pct, 10.0));
    }
}
