use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use insyflow_core::{config::Config, preferences::PreferencesStore};
use insyflow_server::state::{AppState, Upstreams};

/// `insyflow health` - liveness probe for Docker HEALTHCHECK.
///
/// Calls `GET http://localhost:$INSYFLOW_PORT/health`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("INSYFLOW_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{}/health", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }

    // A missing .env is normal in containers.
    dotenvy::dotenv().ok();

    // Structured JSON logging. Level controlled via RUST_LOG env var.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("insyflow=info".parse()?),
        )
        .json()
        .init();

    let cfg = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    let upstreams = Upstreams::from_config(&cfg)?;
    upstreams.log_status();

    let preferences = PreferencesStore::load(&cfg.preferences_path);
    if let Some(path) = preferences.path() {
        info!(path = %path.display(), "Preferences loaded");
    }

    let addr = format!("0.0.0.0:{}", cfg.port);
    let port = cfg.port;
    let state = Arc::new(AppState::new(cfg, upstreams, preferences));
    let app = insyflow_server::app::build_app(state);

    info!(port, "Insyflow listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    Ok(())
}
