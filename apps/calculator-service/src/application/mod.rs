//! Application Layer - Ports and streaming protocol services.
//!
//! The services implement the per-shape call protocols against the port
//! traits; adapters in the infrastructure layer plug gRPC streams into them.

/// Port interfaces (stream sources and sinks).
pub mod ports;

/// Call handlers and the client-side driver.
pub mod services;
