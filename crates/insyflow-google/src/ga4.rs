//! GA4 Data API client (`runReport`, `runRealtimeReport`).

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use insyflow_core::report::parse_metric_value;
use insyflow_core::source::{OrderBy, ReportRequest, ReportResponse, ReportRow, TrafficSource};

use crate::{auth::TokenProvider, http::read_json};

pub const GA4_API: &str = "https://analyticsdata.googleapis.com/v1beta";

#[derive(Clone)]
pub struct Ga4Client {
    http: Client,
    base_url: String,
    property: String,
    tokens: Arc<TokenProvider>,
}

impl Ga4Client {
    pub fn new(http: Client, property_id: &str, tokens: Arc<TokenProvider>) -> Self {
        let id = property_id.trim();
        let property = if id.starts_with("properties/") {
            id.to_string()
        } else {
            format!("properties/{id}")
        };
        Self {
            http,
            base_url: GA4_API.to_string(),
            property,
            tokens,
        }
    }

    /// Point the client at another endpoint (emulators, proxies).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn post<B: Serialize>(&self, method: &str, body: &B) -> Result<ReportResponse> {
        let token = self.tokens.access_token().await?;
        let url = format!("{}/{}:{method}", self.base_url, self.property);
        let resp = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("GA4 {method} request failed"))?;
        let wire: WireReport = read_json(resp, "GA4").await?;
        Ok(decode_report(wire))
    }
}

#[async_trait]
impl TrafficSource for Ga4Client {
    async fn run_report(&self, request: &ReportRequest) -> Result<ReportResponse> {
        self.post("runReport", &encode_report_request(request)).await
    }

    async fn run_realtime_report(&self, metrics: &[&str]) -> Result<ReportResponse> {
        let body = WireRealtimeRequest {
            metrics: metrics.iter().map(|m| WireName { name: m.to_string() }).collect(),
        };
        self.post("runRealtimeReport", &body).await
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireDateRange {
    start_date: String,
    end_date: String,
}

#[derive(Debug, Serialize)]
struct WireName {
    name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum WireOrderBy {
    Dimension {
        #[serde(rename = "dimensionName")]
        dimension_name: String,
    },
    Metric {
        #[serde(rename = "metricName")]
        metric_name: String,
    },
}

#[derive(Debug, Serialize)]
struct WireOrder {
    #[serde(flatten)]
    by: WireOrderBy,
    desc: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireReportRequest {
    date_ranges: Vec<WireDateRange>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dimensions: Vec<WireName>,
    metrics: Vec<WireName>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    order_bys: Vec<WireOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

#[derive(Debug, Serialize)]
struct WireRealtimeRequest {
    metrics: Vec<WireName>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireValue {
    value: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WireRow {
    dimension_values: Vec<WireValue>,
    metric_values: Vec<WireValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireReport {
    rows: Vec<WireRow>,
    totals: Vec<WireRow>,
}

fn encode_report_request(request: &ReportRequest) -> WireReportRequest {
    let names = |items: &[String]| {
        items
            .iter()
            .map(|name| WireName { name: name.clone() })
            .collect::<Vec<_>>()
    };
    let order_bys = match &request.order_by {
        Some(OrderBy::DimensionAsc(name)) => vec![WireOrder {
            by: WireOrderBy::Dimension {
                dimension_name: name.clone(),
            },
            desc: false,
        }],
        Some(OrderBy::MetricDesc(name)) => vec![WireOrder {
            by: WireOrderBy::Metric {
                metric_name: name.clone(),
            },
            desc: true,
        }],
        None => Vec::new(),
    };
    WireReportRequest {
        date_ranges: vec![WireDateRange {
            start_date: request.period.start().to_string(),
            end_date: request.period.end().to_string(),
        }],
        dimensions: names(&request.dimensions),
        metrics: names(&request.metrics),
        order_bys,
        limit: request.limit,
    }
}

fn decode_row(row: WireRow) -> ReportRow {
    ReportRow {
        dimensions: row.dimension_values.into_iter().map(|v| v.value).collect(),
        metrics: row
            .metric_values
            .iter()
            .map(|v| parse_metric_value(v.value.as_deref()))
            .collect(),
    }
}

fn decode_report(wire: WireReport) -> ReportResponse {
    ReportResponse {
        rows: wire.rows.into_iter().map(decode_row).collect(),
        totals: wire.totals.into_iter().map(decode_row).collect(),
    }
}
