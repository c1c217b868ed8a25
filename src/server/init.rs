//! Server initialization and main run loop
//!
//! Contains the main `run()` function that starts all server components.

use super::background_tasks::start_sweeper;
use super::config::AppConfig;
use anyhow::{Context, Result};
use axum::{routing::get, Extension, Router};
use devbox_core::{shutdown_signal_with_controller, Runtime, ShutdownController};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

/// Build the router with every endpoint bound to `runtime`
pub fn build_router(runtime: Arc<Runtime>) -> Router {
    Router::new()
        .merge(crate::api::health_routes())
        .merge(crate::api::api_router())
        .merge(crate::websocket::websocket_router())
        .route("/", get(|| async { "Devbox" }))
        .layer(Extension(runtime))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Run the server
pub async fn run(config: AppConfig) -> Result<()> {
    info!("Starting Devbox v{}", env!("CARGO_PKG_VERSION"));

    let supervisor_config = config.supervisor.to_supervisor_config();
    info!(
        shell = %supervisor_config.default_shell,
        log_buffer_capacity = supervisor_config.log_buffer_capacity,
        terminate_grace_secs = supervisor_config.terminate_grace_secs,
        "Supervisor configured"
    );
    let runtime = Runtime::new(supervisor_config);

    let shutdown_controller = ShutdownController::new();
    let sweeper = start_sweeper(&runtime, &shutdown_controller);

    let app = build_router(runtime.clone());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_with_controller(
            shutdown_controller.clone(),
            runtime.clone(),
        ))
        .await
        .context("HTTP server error")?;

    // Covers a server that stopped for a reason other than a signal
    shutdown_controller.shutdown(&runtime).await;

    match tokio::time::timeout(Duration::from_secs(5), sweeper).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Sweeper task error: {}", e),
        Err(_) => warn!("Sweeper shutdown timeout, aborting"),
    }

    info!("Devbox shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use devbox_core::SupervisorConfig;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_router_serves_health_and_api() {
        let runtime = Runtime::new(SupervisorConfig::default());
        let app = build_router(runtime);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/sessions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
