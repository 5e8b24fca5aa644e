//! Calculator Service Binary
//!
//! Starts the gRPC calculator and its health endpoint.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin calculator-service
//! ```
//!
//! # Environment Variables
//!
//! - `CALCULATOR_GRPC_PORT`: gRPC server port (default: 50069)
//! - `CALCULATOR_HEALTH_PORT`: Health check HTTP port (default: 8083)
//! - `CALCULATOR_DEADLINE_WORK_STEPS`: Work steps in `SumWithDeadline` (default: 3)
//! - `CALCULATOR_DEADLINE_STEP_MS`: Duration of one step (default: 1000)
//! - `CALCULATOR_FACTOR_EMIT_INTERVAL_MS`: Pause after each factor (default: 500)
//! - `CALCULATOR_MAX_ECHO_MODE`: `latest` | `running-max` (default: latest)
//! - `CALCULATOR_RESPONSE_BUFFER`: Response channel capacity (default: 64)
//! - `OTEL_ENABLED`: Enable OpenTelemetry export (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: calculator-service)
//! - `RUST_LOG`: Log level (default: info)

use std::net::SocketAddr;
use std::sync::Arc;

use calculator_service::infrastructure::grpc::proto::calculator::v1::calculator_service_server::CalculatorServiceServer;
use calculator_service::infrastructure::telemetry;
use calculator_service::{
    CalculatorServer, HealthServer, HealthServerState, ServiceConfig, init_metrics,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_dotenv();

    // Initialize telemetry (tracing + optional OTLP export)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting Calculator Service");

    // Initialize Prometheus metrics
    let _metrics_handle = init_metrics();

    let config = ServiceConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Initialize gRPC server
    let grpc_server = Arc::new(CalculatorServer::new(
        config.handlers.clone(),
        shutdown_token.clone(),
    ));

    // Initialize health server
    let health_state = Arc::new(HealthServerState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        grpc_server.stats(),
        shutdown_token.clone(),
    ));
    let health_server = HealthServer::new(
        config.server.health_port,
        health_state,
        shutdown_token.clone(),
    );

    tokio::spawn(async move {
        if let Err(e) = health_server.run().await {
            tracing::error!(error = %e, "Health server error");
        }
    });

    // Spawn gRPC server
    let grpc_addr = SocketAddr::from(([0, 0, 0, 0], config.server.grpc_port));
    let grpc_service = CalculatorServiceServer::from_arc(grpc_server);
    let grpc_shutdown = shutdown_token.clone();

    let grpc_task = tokio::spawn(async move {
        tracing::info!(addr = %grpc_addr, "gRPC server listening");
        if let Err(e) = Server::builder()
            .add_service(grpc_service)
            .serve_with_shutdown(grpc_addr, grpc_shutdown.cancelled())
            .await
        {
            tracing::error!(error = %e, "gRPC server error");
            grpc_shutdown.cancel();
        }
        tracing::info!("gRPC server stopped");
    });

    tracing::info!("Calculator service ready");

    await_shutdown(shutdown_token).await;

    if let Err(e) = grpc_task.await {
        tracing::error!(error = %e, "gRPC server task failed");
    }

    tracing::info!("Calculator service stopped");
    Ok(())
}

/// Log the parsed configuration.
fn log_config(config: &ServiceConfig) {
    tracing::info!(
        grpc_port = config.server.grpc_port,
        health_port = config.server.health_port,
        echo_mode = %config.handlers.echo_mode,
        "Configuration loaded"
    );
    tracing::debug!(
        deadline_steps = config.handlers.deadline_work.steps,
        deadline_step_ms = config.handlers.deadline_work.step.as_millis(),
        factor_emit_interval_ms = config.handlers.factor_emit_interval.as_millis(),
        response_buffer = config.handlers.response_buffer,
        "Handler settings"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT), or for the gRPC server to
/// stop on its own.
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
        () = shutdown_token.cancelled() => {
            tracing::warn!("Server stopped without a signal");
        }
    }

    shutdown_token.cancel();
    tracing::info!("Graceful shutdown started; in-flight calls are cancelled");
}
