//! Search Console API client (search analytics and site listing).

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use insyflow_core::source::{
    SearchAnalyticsQuery, SearchAnalyticsRow, SearchDimension, SearchSource, SearchType, SiteEntry,
};

use crate::{auth::TokenProvider, http::read_json};

pub const SEARCH_CONSOLE_API: &str = "https://www.googleapis.com/webmasters/v3";

/// Client bound to one service account. The site is optional because
/// listing sites does not need one.
#[derive(Clone)]
pub struct SearchConsoleClient {
    http: Client,
    base_url: String,
    site_url: Option<String>,
    tokens: Arc<TokenProvider>,
}

impl SearchConsoleClient {
    pub fn new(http: Client, site_url: Option<&str>, tokens: Arc<TokenProvider>) -> Self {
        Self {
            http,
            base_url: SEARCH_CONSOLE_API.to_string(),
            site_url: site_url.map(|s| s.trim().to_string()),
            tokens,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

/// Site URLs (`https://example.com/`, `sc-domain:example.com`) travel as a
/// single, fully escaped path segment.
fn site_query_url(base_url: &str, site_url: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(site_url.as_bytes()).collect();
    format!("{base_url}/sites/{encoded}/searchAnalytics/query")
}

#[async_trait]
impl SearchSource for SearchConsoleClient {
    async fn query(&self, query: &SearchAnalyticsQuery) -> Result<Vec<SearchAnalyticsRow>> {
        let site_url = self
            .site_url
            .as_deref()
            .context("GSC_SITE_URL is not configured")?;
        let token = self.tokens.access_token().await?;
        let resp = self
            .http
            .post(site_query_url(&self.base_url, site_url))
            .bearer_auth(token)
            .json(&encode_query(query))
            .send()
            .await
            .context("Search Console query failed")?;
        let wire: WireQueryResponse = read_json(resp, "Search Console").await?;
        Ok(wire.rows)
    }

    async fn list_sites(&self) -> Result<Vec<SiteEntry>> {
        let token = self.tokens.access_token().await?;
        let resp = self
            .http
            .get(format!("{}/sites", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .context("Search Console site listing failed")?;
        let wire: WireSiteList = read_json(resp, "Search Console").await?;
        Ok(wire.site_entry)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireQuery {
    start_date: String,
    end_date: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dimensions: Vec<SearchDimension>,
    #[serde(rename = "type")]
    search_type: SearchType,
    #[serde(skip_serializing_if = "Option::is_none")]
    row_limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireQueryResponse {
    rows: Vec<SearchAnalyticsRow>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WireSiteList {
    site_entry: Vec<SiteEntry>,
}

fn encode_query(query: &SearchAnalyticsQuery) -> WireQuery {
    WireQuery {
        start_date: query.period.start().to_string(),
        end_date: query.period.end().to_string(),
        dimensions: query.dimensions.clone(),
        search_type: query.search_type,
        row_limit: query.row_limit,
    }
}
