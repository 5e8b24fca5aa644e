//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the gRPC adapters for the port interfaces defined in
//! the application layer, plus configuration and observability.

/// gRPC server, client and stream adapters.
pub mod grpc;

/// Configuration loading.
pub mod config;

/// Health check HTTP endpoint.
pub mod health;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Logging and OpenTelemetry tracing integration.
pub mod telemetry;
