#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements,
        clippy::panic
    )
)]

//! Calculator Service - Streaming RPC Arithmetic
//!
//! A gRPC service exposing arithmetic over the four call shapes, and the
//! client-side driver that talks to it.
//!
//! | RPC               | Shape            | Result                        |
//! |-------------------|------------------|-------------------------------|
//! | `Sum`             | unary            | `a + b`                       |
//! | `SumWithDeadline` | unary            | `a + b` after bounded work    |
//! | `Square`          | unary            | square root, or rejection     |
//! | `Factorize`       | server streaming | one message per prime factor  |
//! | `Average`         | client streaming | mean of the streamed values   |
//! | `FindMax`         | bidirectional    | one response per request      |
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Arithmetic and call-session types
//!   - `operations`: Sum, square root, prime factors, running aggregates
//!   - `session`: Call shapes, lifecycle state, deadline and cancellation
//!
//! - **Application**: Streaming protocols and port definitions
//!   - `ports`: Message sources and sinks with tagged `Item | End | Error`
//!   - `services`: One handler per call shape, plus the client driver
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `grpc`: tonic server, client, stream adapters and status mapping
//!   - `config`: Environment configuration
//!   - `health`, `metrics`, `telemetry`: Observability
//!
//! # Call Flow
//!
//! ```text
//! client driver                          server
//! ─────────────                          ──────
//! send task ──► requests ──► Streaming ──► handler (owns the accumulator)
//! recv task ◄── responses ◄── channel ◄──┘
//!     └── join: returns once both directions ended
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Arithmetic and sessions with no transport dependencies.
pub mod domain;

/// Application layer - Streaming protocols and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::session::{
    CallContext, CallError, CallShape, ErrorKind, SessionState, StreamSession,
};

// Application
pub use application::ports::{MessageSink, MessageSource, StreamEvent};
pub use application::services::{EchoMode, Exchange, Pacing};

// Infrastructure config
pub use infrastructure::config::{
    ClientSettings, ConfigError, HandlerSettings, ServerSettings, ServiceConfig,
};

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// gRPC server and client (for integration tests)
pub use infrastructure::grpc::{
    CalculatorClient, CalculatorServer, proto::calculator::v1 as proto,
};

// Metrics
pub use infrastructure::metrics::{CallStats, init_metrics};

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
