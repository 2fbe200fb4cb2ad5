use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use insyflow_core::error::CoreError;

/// Application-level errors that map directly to HTTP responses.
///
/// Every variant implements [`IntoResponse`] so Axum handlers can use
/// `Result<impl IntoResponse, AppError>` as their return type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Required configuration (credentials, identifiers) is absent or unusable.
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// A Google API call failed. `context` is the client-facing summary; the
    /// upstream error text is passed through as `details`.
    #[error("{context}: {source}")]
    Upstream {
        context: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn upstream(context: &'static str, source: anyhow::Error) -> Self {
        Self::Upstream { context, source }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnknownRange(_)
            | CoreError::UnknownSearchType(_)
            | CoreError::UnknownKpiFormat(_)
            | CoreError::InvertedPeriod { .. }
            | CoreError::InvalidPreference(_) => AppError::BadRequest(err.to_string()),
            other => AppError::Internal(other.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                msg.clone(),
                None,
            ),
            AppError::NotConfigured(msg) => {
                tracing::warn!(reason = %msg, "Request needs missing configuration");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "not_configured",
                    msg.clone(),
                    None,
                )
            }
            AppError::Upstream { context, source } => {
                tracing::error!(error = %format!("{source:#}"), "{context}");
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream_error",
                    context.to_string(),
                    Some(format!("{source:#}")),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let mut error = json!({
            "code": code,
            "message": message,
            "field": null
        });
        if let Some(details) = details {
            error["details"] = json!(details);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
