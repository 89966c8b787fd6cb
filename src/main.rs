use anyhow::Context;
use tracing_subscriber::EnvFilter;

use student_portal::config::config;
use student_portal::database::DatabaseManager;
use student_portal::{app, scheduler, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("student_portal=info,tower_http=info")),
        )
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config().clone();
    config.validate().map_err(anyhow::Error::msg).context("invalid configuration")?;
    tracing::info!("Starting student portal in {:?} mode", config.environment);

    let db = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    db.migrate().await.context("failed to apply migrations")?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let scheduler_enabled = config.scheduler.enabled;
    let state = AppState::new(db, config);

    let mut jobs = if scheduler_enabled {
        Some(scheduler::start_scheduler(state.clone()).await.context("failed to start scheduler")?)
    } else {
        tracing::info!("Job scheduler disabled");
        None
    };

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Student portal listening on http://{}", bind_addr);

    axum::serve(listener, app(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(jobs) = jobs.as_mut() {
        if let Err(e) = jobs.shutdown().await {
            tracing::warn!("Scheduler shutdown failed: {}", e);
        }
    }
    state.db.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
