use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use insyflow_core::{
    config::Config,
    preferences::PreferencesStore,
    source::{AssistantModel, SearchSource, TrafficSource},
};
use insyflow_google::{
    auth::{ANALYTICS_READONLY_SCOPE, WEBMASTERS_READONLY_SCOPE},
    build_http_client, Ga4Client, GeminiClient, SearchConsoleClient,
    ServiceAccountKey, TokenProvider,
};

use crate::error::AppError;

/// An upstream collaborator, or the reason it cannot be used.
pub enum Upstream<T: ?Sized> {
    Ready(Arc<T>),
    Unavailable(String),
}

impl<T: ?Sized> Upstream<T> {
    /// The collaborator, or a `503 not_configured` naming what is missing.
    pub fn get(&self) -> Result<Arc<T>, AppError> {
        match self {
            Upstream::Ready(inner) => Ok(Arc::clone(inner)),
            Upstream::Unavailable(reason) => Err(AppError::NotConfigured(reason.clone())),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Upstream::Ready(_))
    }
}

fn missing(vars: &[&str]) -> String {
    format!("Missing {}", vars.join(" and "))
}

/// The three upstream services, built once from configuration.
pub struct Upstreams {
    pub traffic: Upstream<dyn TrafficSource>,
    pub search: Upstream<dyn SearchSource>,
    pub assistant: Upstream<dyn AssistantModel>,
}

impl Upstreams {
    /// Build clients for every configured service.
    ///
    /// Missing or invalid credentials are not fatal: the affected service is
    /// marked unavailable and its routes answer 503 with the reason.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let http = build_http_client(cfg.upstream_timeout())?;

        let key = cfg
            .service_account_key
            .as_deref()
            .map(|raw| ServiceAccountKey::from_json(raw).map_err(|e| e.to_string()));
        let tokens = |scope: &'static str| -> Result<Arc<TokenProvider>, String> {
            match &key {
                None => Err(missing(&["GOOGLE_SERVICE_ACCOUNT_KEY"])),
                Some(Err(e)) => Err(e.clone()),
                Some(Ok(key)) => {
                    let provider = TokenProvider::new(http.clone(), key.clone(), scope)
                        .map_err(|e| e.to_string())?;
                    debug!(client_email = provider.client_email(), scope, "Token provider ready");
                    Ok(Arc::new(provider))
                }
            }
        };

        let traffic: Upstream<dyn TrafficSource> = match (&cfg.ga4_property_id, cfg.missing_for_traffic()) {
            (Some(property_id), gaps) if gaps.is_empty() => match tokens(ANALYTICS_READONLY_SCOPE) {
                Ok(tokens) => Upstream::Ready(Arc::new(Ga4Client::new(http.clone(), property_id, tokens))),
                Err(reason) => Upstream::Unavailable(reason),
            },
            (_, gaps) => Upstream::Unavailable(missing(&gaps)),
        };

        let search: Upstream<dyn SearchSource> = match tokens(WEBMASTERS_READONLY_SCOPE) {
            Ok(tokens) => Upstream::Ready(Arc::new(SearchConsoleClient::new(
                http.clone(),
                cfg.gsc_site_url.as_deref(),
                tokens,
            ))),
            Err(reason) => Upstream::Unavailable(reason),
        };

        let assistant: Upstream<dyn AssistantModel> = match &cfg.gemini_api_key {
            Some(api_key) => Upstream::Ready(Arc::new(GeminiClient::new(
                http.clone(),
                api_key,
                &cfg.gemini_model,
            ))),
            None => Upstream::Unavailable(missing(&cfg.missing_for_assistant())),
        };

        Ok(Self {
            traffic,
            search,
            assistant,
        })
    }

    pub fn log_status(&self) {
        for (name, ready, reason) in [
            ("ga4", self.traffic.is_ready(), unavailable_reason(&self.traffic)),
            ("search_console", self.search.is_ready(), unavailable_reason(&self.search)),
            ("gemini", self.assistant.is_ready(), unavailable_reason(&self.assistant)),
        ] {
            if ready {
                info!(upstream = name, "Upstream configured");
            } else {
                warn!(upstream = name, reason = reason.unwrap_or_default(), "Upstream unavailable");
            }
        }
    }
}

fn unavailable_reason<T: ?Sized>(upstream: &Upstream<T>) -> Option<&str> {
    match upstream {
        Upstream::Ready(_) => None,
        Upstream::Unavailable(reason) => Some(reason.as_str()),
    }
}

/// Shared application state injected into every Axum handler via
/// [`axum::extract::State`].
///
/// Nothing here is request-scoped: reports are rebuilt from the upstreams on
/// every request and never cached.
pub struct AppState {
    /// Parsed configuration, loaded once at startup from environment variables.
    pub config: Arc<Config>,

    pub traffic: Upstream<dyn TrafficSource>,
    pub search: Upstream<dyn SearchSource>,
    pub assistant: Upstream<dyn AssistantModel>,

    pub preferences: PreferencesStore,
}

impl AppState {
    pub fn new(config: Config, upstreams: Upstreams, preferences: PreferencesStore) -> Self {
        Self {
            config: Arc::new(config),
            traffic: upstreams.traffic,
            search: upstreams.search,
            assistant: upstreams.assistant,
            preferences,
        }
    }

    /// Search Console client for the configured site.
    ///
    /// Listing sites works without `GSC_SITE_URL`; reports do not.
    pub fn search_for_site(&self) -> Result<Arc<dyn SearchSource>, AppError> {
        let gaps = self.config.missing_for_search();
        if !gaps.is_empty() {
            return Err(AppError::NotConfigured(missing(&gaps)));
        }
        self.search.get()
    }
}
