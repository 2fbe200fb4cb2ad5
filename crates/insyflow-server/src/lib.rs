pub mod app;
pub mod error;
pub mod reports;
pub mod routes;
pub mod state;
