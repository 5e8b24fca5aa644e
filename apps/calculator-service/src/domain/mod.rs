//! Domain Layer - Arithmetic and call-session types.
//!
//! This layer has no transport dependencies: operations are pure functions
//! and sessions describe a call's lifecycle independent of gRPC.

/// Pure arithmetic operations and accumulators.
pub mod operations;

/// Call sessions, contexts and errors.
pub mod session;
