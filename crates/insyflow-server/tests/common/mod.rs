#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use chrono::{Duration, NaiveDate, Utc};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use insyflow_core::{
    config::Config,
    preferences::PreferencesStore,
    report::TRAFFIC_LAG_DAYS,
    source::{
        AssistantModel, ReportRequest, ReportResponse, ReportRow, SearchAnalyticsQuery,
        SearchAnalyticsRow, SearchDimension, SearchSource, SiteEntry, TrafficSource,
    },
};
use insyflow_server::{
    app::build_app,
    state::{AppState, Upstream, Upstreams},
};

pub fn test_config() -> Config {
    Config::from_lookup(|name| {
        match name {
            "GA4_PROPERTY_ID" => Some("123456789"),
            "GSC_SITE_URL" => Some("sc-domain:example.com"),
            "GOOGLE_SERVICE_ACCOUNT_KEY" => Some("{}"),
            "GEMINI_API_KEY" => Some("test-key"),
            _ => None,
        }
        .map(str::to_string)
    })
    .expect("test config")
}

pub fn row(dimensions: &[Option<&str>], metrics: &[f64]) -> ReportRow {
    ReportRow {
        dimensions: dimensions.iter().map(|d| d.map(str::to_string)).collect(),
        metrics: metrics.to_vec(),
    }
}

/// GA4 stand-in answering with fixed numbers. Requests are recorded.
#[derive(Default)]
pub struct FakeTraffic {
    pub fail: bool,
    pub requests: Mutex<Vec<ReportRequest>>,
}

impl FakeTraffic {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl TrafficSource for FakeTraffic {
    async fn run_report(&self, request: &ReportRequest) -> anyhow::Result<ReportResponse> {
        self.requests.lock().expect("lock").push(request.clone());
        if self.fail {
            return Err(anyhow!("GA4 returned HTTP 403: permission denied"));
        }

        // The current period ends at the traffic lag; the previous one ends a
        // week or more earlier. One day of slack covers a UTC midnight rollover.
        let today = Utc::now().date_naive();
        let lag = Duration::days(i64::from(TRAFFIC_LAG_DAYS));
        let is_current = request.period.end() >= today - lag - Duration::days(1);
        let rows = match request.dimensions.first().map(String::as_str) {
            None if is_current => vec![row(&[], &[12890.0, 15000.0, 40000.0, 1_800_000.0])],
            None => vec![row(&[], &[11890.0, 14000.0, 38000.0, 1_400_000.0])],
            Some("date") => vec![
                row(&[Some("20250802")], &[420.0]),
                row(&[Some("20250801")], &[400.0]),
            ],
            Some("sessionDefaultChannelGroup") => vec![
                row(&[Some("Organic Search")], &[9000.0]),
                row(&[Some("Direct")], &[4500.0]),
                row(&[None], &[1500.0]),
            ],
            Some(_) => vec![
                row(&[Some("/")], &[2000.0, 800.0]),
                row(&[Some("/pricing")], &[900.0, 300.0]),
            ],
        };
        Ok(ReportResponse {
            rows,
            totals: Vec::new(),
        })
    }

    async fn run_realtime_report(&self, metrics: &[&str]) -> anyhow::Result<ReportResponse> {
        if self.fail {
            return Err(anyhow!("GA4 realtime unavailable"));
        }
        assert_eq!(metrics, ["activeUsers", "eventCount"]);
        Ok(ReportResponse {
            rows: vec![row(&[], &[17.0, 230.0])],
            totals: Vec::new(),
        })
    }
}

/// Search Console stand-in. Every query is recorded.
#[derive(Default)]
pub struct FakeSearch {
    pub queries: Mutex<Vec<SearchAnalyticsQuery>>,
}

fn search_row(key: Option<&str>, clicks: f64, impressions: f64, ctr: f64, position: f64) -> SearchAnalyticsRow {
    SearchAnalyticsRow {
        keys: key.map(|k| vec![k.to_string()]).unwrap_or_default(),
        clicks,
        impressions,
        ctr,
        position,
    }
}

#[async_trait]
impl SearchSource for FakeSearch {
    async fn query(&self, query: &SearchAnalyticsQuery) -> anyhow::Result<Vec<SearchAnalyticsRow>> {
        self.queries.lock().expect("lock").push(query.clone());
        Ok(match query.dimensions.first() {
            None => vec![search_row(None, 540.0, 20000.0, 0.027, 12.5)],
            Some(SearchDimension::Date) => vec![
                search_row(Some("2025-08-02"), 80.0, 3000.0, 0.026, 12.0),
                search_row(Some("2025-08-01"), 70.0, 2900.0, 0.024, 13.0),
            ],
            Some(SearchDimension::Query) => vec![
                search_row(Some("ga4 dashboard"), 45.0, 900.0, 0.05, 4.2),
                search_row(Some("insyflow"), 120.0, 400.0, 0.3, 1.1),
            ],
            Some(SearchDimension::Page) => vec![search_row(
                Some("https://example.com/blog/seo-basics"),
                60.0,
                2400.0,
                0.025,
                7.4,
            )],
        })
    }

    async fn list_sites(&self) -> anyhow::Result<Vec<SiteEntry>> {
        Ok(vec![SiteEntry {
            site_url: "sc-domain:example.com".to_string(),
            permission_level: "siteOwner".to_string(),
        }])
    }
}

/// Model stand-in that echoes a canned reply and keeps the last prompt.
pub struct FakeModel {
    pub reply: String,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AssistantModel for FakeModel {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        self.prompts.lock().expect("lock").push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

pub struct Fakes {
    pub traffic: Arc<FakeTraffic>,
    pub search: Arc<FakeSearch>,
    pub model: Arc<FakeModel>,
}

impl Default for Fakes {
    fn default() -> Self {
        Self {
            traffic: Arc::new(FakeTraffic::default()),
            search: Arc::new(FakeSearch::default()),
            model: Arc::new(FakeModel::replying("- Organic search drives most sessions\n- Direct is flat")),
        }
    }
}

impl Fakes {
    pub fn app(&self) -> Router {
        self.app_with(test_config(), PreferencesStore::in_memory())
    }

    pub fn app_with(&self, config: Config, preferences: PreferencesStore) -> Router {
        let traffic: Arc<dyn TrafficSource> = self.traffic.clone();
        let search: Arc<dyn SearchSource> = self.search.clone();
        let assistant: Arc<dyn AssistantModel> = self.model.clone();
        let upstreams = Upstreams {
            traffic: Upstream::Ready(traffic),
            search: Upstream::Ready(search),
            assistant: Upstream::Ready(assistant),
        };
        build_app(Arc::new(AppState::new(config, upstreams, preferences)))
    }
}

/// The dates a period lagging `lag_days` behind "today" may end on, where
/// today is sampled before and after the request.
pub fn lagged_end_window(before: NaiveDate, after: NaiveDate, lag_days: i64) -> [String; 2] {
    [
        (before - Duration::days(lag_days)).to_string(),
        (after - Duration::days(lag_days)).to_string(),
    ]
}

pub fn period_end(json: &Value) -> String {
    json["period"]["end"].as_str().unwrap_or_default().to_string()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse JSON")
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    app.oneshot(request).await.expect("request")
}

pub async fn send_json(app: Router, method: &str, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request");
    app.oneshot(request).await.expect("request")
}

pub fn cache_control(response: &Response<Body>) -> &str {
    response
        .headers()
        .get("cache-control")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}
