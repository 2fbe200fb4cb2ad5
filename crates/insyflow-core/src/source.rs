//! Upstream data source abstraction.
//!
//! Route handlers only see these traits. The Google-backed implementations
//! live in `insyflow-google`; tests substitute in-memory fakes.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::report::Period;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderBy {
    DimensionAsc(String),
    MetricDesc(String),
}

/// A GA4-style report over one period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub period: Period,
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<u32>,
}

impl ReportRequest {
    /// Undimensioned totals for `metrics` over `period`.
    pub fn totals(period: Period, metrics: &[&str]) -> Self {
        Self {
            period,
            dimensions: Vec::new(),
            metrics: metrics.iter().map(|m| m.to_string()).collect(),
            order_by: None,
            limit: None,
        }
    }

    pub fn by_dimension(period: Period, dimension: &str, metrics: &[&str]) -> Self {
        Self {
            dimensions: vec![dimension.to_string()],
            ..Self::totals(period, metrics)
        }
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by = Some(order);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One report row. Missing values stay `None` / `0.0`; nothing here fails.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportRow {
    pub dimensions: Vec<Option<String>>,
    pub metrics: Vec<f64>,
}

impl ReportRow {
    pub fn dimension(&self, index: usize) -> Option<&str> {
        self.dimensions.get(index).and_then(|d| d.as_deref())
    }

    pub fn metric(&self, index: usize) -> f64 {
        self.metrics.get(index).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportResponse {
    pub rows: Vec<ReportRow>,
    /// Only populated when the upstream computed aggregate totals.
    pub totals: Vec<ReportRow>,
}

impl ReportResponse {
    /// The single aggregate row of an undimensioned report, falling back to
    /// the totals block. An empty report yields an all-zero row.
    pub fn aggregate(&self) -> ReportRow {
        self.rows
            .first()
            .or_else(|| self.totals.first())
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[default]
    Web,
    Image,
    Video,
    News,
}

impl SearchType {
    pub fn parse(raw: Option<&str>) -> Result<Self, CoreError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(other) => other.parse(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Image => "image",
            Self::Video => "video",
            Self::News => "news",
        }
    }
}

impl FromStr for SearchType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web" => Ok(Self::Web),
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "news" => Ok(Self::News),
            other => Err(CoreError::UnknownSearchType(other.to_string())),
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDimension {
    Date,
    Query,
    Page,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchAnalyticsQuery {
    pub period: Period,
    pub dimensions: Vec<SearchDimension>,
    pub search_type: SearchType,
    pub row_limit: Option<u32>,
}

impl SearchAnalyticsQuery {
    pub fn totals(period: Period, search_type: SearchType) -> Self {
        Self {
            period,
            dimensions: Vec::new(),
            search_type,
            row_limit: None,
        }
    }

    pub fn by_dimension(
        period: Period,
        search_type: SearchType,
        dimension: SearchDimension,
        row_limit: u32,
    ) -> Self {
        Self {
            dimensions: vec![dimension],
            row_limit: Some(row_limit),
            ..Self::totals(period, search_type)
        }
    }
}

/// A Search Console analytics row. `ctr` is a 0..1 fraction as delivered.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchAnalyticsRow {
    pub keys: Vec<String>,
    pub clicks: f64,
    pub impressions: f64,
    pub ctr: f64,
    pub position: f64,
}

impl SearchAnalyticsRow {
    pub fn key(&self, index: usize) -> &str {
        self.keys.get(index).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteEntry {
    #[serde(default)]
    pub site_url: String,
    #[serde(default)]
    pub permission_level: String,
}

/// Site traffic reports (GA4 Data API).
#[async_trait]
pub trait TrafficSource: Send + Sync + 'static {
    async fn run_report(&self, request: &ReportRequest) -> anyhow::Result<ReportResponse>;

    async fn run_realtime_report(&self, metrics: &[&str]) -> anyhow::Result<ReportResponse>;
}

/// Search ranking reports (Search Console API).
#[async_trait]
pub trait SearchSource: Send + Sync + 'static {
    async fn query(&self, query: &SearchAnalyticsQuery) -> anyhow::Result<Vec<SearchAnalyticsRow>>;

    async fn list_sites(&self) -> anyhow::Result<Vec<SiteEntry>>;
}

/// Text generation (generative-language API).
#[async_trait]
pub trait AssistantModel: Send + Sync + 'static {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}
