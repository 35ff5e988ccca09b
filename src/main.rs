use std::time::Duration;

use messmate::{app, auth::services::seed_admin, config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "messmate=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    let (host, port) = (config.host.clone(), config.port);
    let seed = config.seed_admin.clone();

    let (app_state, handle) = AppState::init(config).await?;

    if let Some(seed) = seed {
        if let Err(e) = seed_admin(app_state.store.as_ref(), &seed).await {
            tracing::warn!(error = %e, "admin seeding failed; continuing");
        }
    }

    let monitor = handle
        .as_ref()
        .map(|h| h.spawn_monitor(Duration::from_secs(30)));

    let result = app::serve(app::build_app(app_state), &host, port).await;

    if let Some(monitor) = monitor {
        monitor.abort();
    }
    if let Some(handle) = handle {
        handle.close().await;
    }
    result
}
