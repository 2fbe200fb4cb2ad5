//! Prompt construction and response shaping for the AI assistant.

use serde::Deserialize;
use serde_json::Value;

const PREAMBLE: &str = "You are insy-ai, a concise analytics assistant. Use ONLY the provided JSON data.\n\
If the data is insufficient, say so briefly. Be accurate and actionable.\n\
Prefer short sentences, and bullet points when listing.";

const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskPayload {
    pub question: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub dashboard_data: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsPayload {
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub dashboard_data: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoInsightsPayload {
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub seo_data: Value,
}

/// Body of `POST /api/ai`: `{"type": ..., "payload": {...}}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum AssistantRequest {
    Ask(AskPayload),
    Insights(InsightsPayload),
    SeoInsights(SeoInsightsPayload),
}

impl AssistantRequest {
    /// Whether the answer is a bullet list the caller wants split into items.
    pub fn expects_bullets(&self) -> bool {
        !matches!(self, Self::Ask(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ask(_) => "ask",
            Self::Insights(_) => "insights",
            Self::SeoInsights(_) => "seoInsights",
        }
    }
}

fn context_block(language: Option<&str>, website: Option<&str>, label: &str, data: &Value) -> String {
    let language = language
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(DEFAULT_LANGUAGE);
    let data = serde_json::to_string_pretty(data).unwrap_or_else(|_| "null".to_string());
    format!(
        "{PREAMBLE}\n\nLanguage: {language}\nWebsite: {}\n{label} (JSON):\n{data}\n",
        website.unwrap_or("unknown")
    )
}

pub fn build_prompt(request: &AssistantRequest) -> String {
    match request {
        AssistantRequest::Ask(p) => format!(
            "{}\nUser question:\n\"{}\"\n\nAnswer directly with a short, data-backed response.",
            context_block(
                p.language.as_deref(),
                p.website.as_deref(),
                "Available dashboard data",
                &p.dashboard_data
            ),
            p.question.trim()
        ),
        AssistantRequest::Insights(p) => format!(
            "{}\nTask: Provide 3-4 concise, actionable insights as bullet points.",
            context_block(
                p.language.as_deref(),
                p.website.as_deref(),
                "Dashboard data",
                &p.dashboard_data
            )
        ),
        AssistantRequest::SeoInsights(p) => format!(
            "{}\nTask: Provide 3-4 concise SEO recommendations as bullet points.",
            context_block(p.language.as_deref(), p.website.as_deref(), "SEO data", &p.seo_data)
        ),
    }
}

/// Strip a leading `- `, `* ` or `12. ` list marker, if present.
fn strip_list_marker(line: &str) -> Option<&str> {
    if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return Some(rest.trim());
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = line[digits..].strip_prefix('.')?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim())
}

/// Split model output into list items.
///
/// Only marked lines count as items. Text without any list markers comes back
/// as a single item; blank text yields nothing.
pub fn split_bullets(text: &str) -> Vec<String> {
    let items: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter_map(strip_list_marker)
        .map(str::to_string)
        .collect();

    if !items.is_empty() {
        return items;
    }
    let whole = text.trim();
    if whole.is_empty() {
        Vec::new()
    } else {
        vec![whole.to_string()]
    }
}
