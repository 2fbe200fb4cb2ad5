use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("range must be one of: 7d, 30d, 90d (got {0:?})")]
    UnknownRange(String),

    #[error("searchType must be one of: web, image, video, news (got {0:?})")]
    UnknownSearchType(String),

    #[error("unknown KPI format: {0:?}")]
    UnknownKpiFormat(String),

    #[error("period end {end} is before start {start}")]
    InvertedPeriod {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("invalid preference: {0}")]
    InvalidPreference(String),

    #[error("preferences I/O error: {0}")]
    Io(#[from] std::io::Error),
}
