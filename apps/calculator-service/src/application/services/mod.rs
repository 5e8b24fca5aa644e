//! Application Services
//!
//! Protocol-layer handlers, one per call shape, plus the client-side driver.
//! All of them are generic over the ports in [`crate::application::ports`]
//! and take the call's [`crate::domain::session::StreamSession`], so they run
//! the same against gRPC streams and in-memory channels.

/// Bidirectional request/response exchange.
pub mod bidirectional;
/// Client-streaming aggregation.
pub mod client_stream;
/// Client-side send/receive coordination.
pub mod driver;
/// Server-streaming emission.
pub mod server_stream;
/// Unary calls, with and without bounded work.
pub mod unary;

pub use bidirectional::{exchange, EchoMode, MaxResponder, Responder};
pub use client_stream::{collect_stream, Accumulator};
pub use driver::{drain, drive_bidirectional, drive_client_streaming, send_all, Exchange, Pacing};
pub use server_stream::stream_items;
pub use unary::{respond, respond_after_work, BoundedWork};
