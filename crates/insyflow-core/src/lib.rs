pub mod assistant;
pub mod config;
pub mod error;
pub mod preferences;
pub mod report;
pub mod source;
