use std::time::Duration;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub preferences_path: String,
    pub upstream_timeout_secs: u64,
    pub ga4_property_id: Option<String>,
    pub gsc_site_url: Option<String>,
    /// Raw service-account JSON as read from `GOOGLE_SERVICE_ACCOUNT_KEY`.
    pub service_account_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    ///
    /// Empty and whitespace-only values count as unset, so a blank
    /// `GA4_PROPERTY_ID=` line in `.env` reports the variable as missing
    /// instead of issuing requests against an empty property.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(Self {
            port: var("INSYFLOW_PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            cors_origins: var("INSYFLOW_CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            preferences_path: var("INSYFLOW_PREFERENCES_PATH")
                .unwrap_or_else(|| "./data/preferences.json".to_string()),
            upstream_timeout_secs: parse_timeout(var("INSYFLOW_UPSTREAM_TIMEOUT_SECS"))?,
            ga4_property_id: var("GA4_PROPERTY_ID"),
            gsc_site_url: var("GSC_SITE_URL"),
            service_account_key: var("GOOGLE_SERVICE_ACCOUNT_KEY"),
            gemini_api_key: var("GEMINI_API_KEY"),
            gemini_model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
        })
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    /// Names of the variables the GA4 routes need but do not have.
    pub fn missing_for_traffic(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.ga4_property_id.is_none() {
            missing.push("GA4_PROPERTY_ID");
        }
        if self.service_account_key.is_none() {
            missing.push("GOOGLE_SERVICE_ACCOUNT_KEY");
        }
        missing
    }

    /// Names of the variables the Search Console report needs but does not have.
    ///
    /// Listing sites only needs the service account, so `GSC_SITE_URL` is
    /// checked separately by the caller.
    pub fn missing_for_search(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.gsc_site_url.is_none() {
            missing.push("GSC_SITE_URL");
        }
        if self.service_account_key.is_none() {
            missing.push("GOOGLE_SERVICE_ACCOUNT_KEY");
        }
        missing
    }

    pub fn missing_for_assistant(&self) -> Vec<&'static str> {
        if self.gemini_api_key.is_none() {
            vec!["GEMINI_API_KEY"]
        } else {
            Vec::new()
        }
    }
}

/// Seconds for every upstream call; absent means 30, zero is refused.
fn parse_timeout(raw: Option<String>) -> Result<u64, String> {
    let Some(raw) = raw else {
        return Ok(30);
    };
    match raw.parse::<u64>() {
        Ok(0) => Err("invalid upstream timeout: must be at least 1 second".to_string()),
        Ok(secs) => Ok(secs),
        Err(e) => Err(format!("invalid upstream timeout: {e}")),
    }
}
