use std::sync::Arc;

use axum::{routing::get, Router};
use clap::Parser;
use futures::future::join;
use kube::Client;
use tracing::{error, info};

use mysql_backup_operator::config::OperatorConfig;
use mysql_backup_operator::controllers::backup_schedule;
use mysql_backup_operator::metrics::prometheus::MetricsState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = OperatorConfig::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,kube=info".into()),
        )
        .json()
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        namespace = %config.namespace,
        template_policy = ?config.template_policy,
        "Starting mysql-backup-operator"
    );

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes API server");

    let metrics_state = Arc::new(MetricsState::new());

    let listener = tokio::net::TcpListener::bind(config.metrics_addr).await?;

    // Health and metrics server
    let health_metrics_server = {
        let metrics_state = Arc::clone(&metrics_state);
        let addr = config.metrics_addr;
        async move {
            let app = Router::new()
                .route("/healthz", get(|| async { "ok" }))
                .route("/readyz", get(|| async { "ok" }))
                .route(
                    "/metrics",
                    get(move || {
                        let state = Arc::clone(&metrics_state);
                        async move { state.gather() }
                    }),
                );

            info!(%addr, "Starting health/metrics server");
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
            {
                error!(error = %e, "Health/metrics server error");
            }
        }
    };

    let controller = backup_schedule::run(client, &config, Arc::clone(&metrics_state));

    info!("Controller started, watching for MySQLBackupSchedule resources");

    join(controller, health_metrics_server).await;

    info!("Operator shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
