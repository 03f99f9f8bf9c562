//! Racefuel Server - Main entry point

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use racefuel_common::logging::{init_logging, LogConfig};
use tokio::signal;
use tracing::info;

use racefuel_server::{
    api,
    config::Config,
    db::{self, postgres::PgRecordStore},
    features::{plans::RecordCountQuota, FeatureState},
    storage::{config::StorageConfig, S3BlobStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::builder()
        .log_file_prefix("racefuel-server")
        .filter_directives("racefuel_server=debug,tower_http=debug,sqlx=info")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().overlay_env().unwrap_or(log_config);

    let _log_guard = init_logging(&log_config)?;

    info!("Starting Racefuel Server");

    let config = Config::load()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        catalog_bucket = %config.gpx.catalog_bucket,
        plan_bucket = %config.gpx.plan_bucket,
        "Configuration loaded"
    );

    let pool = db::create_pool(&config.database).await?;

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    info!("Database migrations completed");

    let blobs = S3BlobStore::new(StorageConfig::from_env()?).await?;

    let records = Arc::new(PgRecordStore::new(pool));
    let state = FeatureState {
        blobs: Arc::new(blobs),
        quota: Arc::new(RecordCountQuota::new(
            records.clone(),
            config.plans.max_per_user,
        )),
        records,
        gpx: Arc::new(config.gpx.clone()),
    };

    let app = api::create_router(state, &config.cors);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // In-flight sagas run on their own tasks; give them time to finish
    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
