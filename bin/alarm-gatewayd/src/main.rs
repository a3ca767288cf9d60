//! Alarm gateway service binary (component M): wires the config loader (K)
//! into the routing and login databases (E/F), constructs the gateways
//! manager (I), and exposes a minimal HTTP surface for health and for
//! submitting a detected code.

mod http;
mod reporting;

use alarm_config::ConfigLoader;
use alarm_gateway::GatewaysManager;
use anyhow::Context;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    alarm_common::logging::init_default_logging();

    info!("starting alarm gateway service");

    let raw = ConfigLoader::new().load().context("loading configuration")?;
    let (message_db, login_db) = alarm_config::build(&raw).context("building routing/login databases")?;

    let status_cb = Arc::new(reporting::LoggingStatusCallback);
    let exception_cb = Arc::new(reporting::LoggingExceptionCallback);

    let manager = Arc::new(GatewaysManager::with_protocol_logging(
        message_db,
        login_db,
        status_cb,
        exception_cb,
        raw.protocol.default,
    ));

    let host = std::env::var("ALARMGW_HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("ALARMGW_HTTP_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080);

    let app = http::build_router(manager.clone());
    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("binding {host}:{port}"))?;

    info!(%host, port, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    manager.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}
