//! gRPC Calculator Service
//!
//! Implements `calculator.v1.CalculatorService` on top of the application
//! services and provides the matching client-side driver.
//!
//! # Architecture
//!
//! Each RPC opens a [`StreamSession`](crate::domain::session::StreamSession)
//! carrying the caller's deadline (from the `grpc-timeout` header) and a
//! cancellation token derived from the server's shutdown token. Streaming
//! RPCs then:
//!
//! 1. Adapt the inbound `tonic::Streaming` into a message source
//! 2. Spawn a task that runs the protocol handler against a response channel
//! 3. Return the channel's receiving end as the response stream
//! 4. Report the call's outcome to metrics when the task ends

pub mod client;
pub mod server;
pub mod status;
pub mod stream;
pub mod timeout;

// Allow clippy warnings and missing docs in generated code
#[allow(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
pub mod proto {
    pub mod calculator {
        pub mod v1 {
            include!("../../../../../packages/schema-gen/rust/calculator/v1/calculator.v1.rs");
            include!("../../../../../packages/schema-gen/rust/calculator/v1/calculator.v1.tonic.rs");
        }
    }
}

pub use client::CalculatorClient;
pub use server::CalculatorServer;
