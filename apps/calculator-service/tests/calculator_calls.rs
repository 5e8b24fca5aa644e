//! Unary Call Integration Tests
//!
//! Sum, Square and SumWithDeadline over a real tonic transport.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

mod common;

use std::time::Duration;

use calculator_service::application::services::BoundedWork;
use calculator_service::proto::{SquareRequest, calculator_service_client::CalculatorServiceClient};
use calculator_service::{ErrorKind, HandlerSettings};
use tonic::Code;
use tonic_types::StatusExt;

use common::{immediate, start_server};

fn short_work() -> HandlerSettings {
    HandlerSettings {
        deadline_work: BoundedWork {
            steps: 3,
            step: Duration::from_millis(100),
        },
        ..immediate()
    }
}

// =============================================================================
// Sum
// =============================================================================

#[tokio::test]
async fn test_sum() {
    let server = start_server(immediate()).await;
    let mut client = server.client().await;

    assert_eq!(client.sum(4, 6).await.unwrap(), 10);
    assert_eq!(client.sum(-7, 7).await.unwrap(), 0);
}

#[tokio::test]
async fn test_sum_wraps_on_overflow() {
    let server = start_server(immediate()).await;
    let mut client = server.client().await;

    assert_eq!(client.sum(i32::MAX, 1).await.unwrap(), i32::MIN);
}

// =============================================================================
// Square
// =============================================================================

#[tokio::test]
async fn test_square_root() {
    let server = start_server(immediate()).await;
    let mut client = server.client().await;

    assert_eq!(client.square_root(49).await.unwrap(), 7.0);
    assert_eq!(client.square_root(0).await.unwrap(), 0.0);
}

#[tokio::test]
async fn test_square_rejects_negative() {
    let server = start_server(immediate()).await;
    let mut client = server.client().await;

    let err = client.square_root(-234).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(err.message().contains("-234"));
}

#[tokio::test]
async fn test_square_rejection_carries_error_details() {
    let server = start_server(immediate()).await;
    let mut raw = CalculatorServiceClient::connect(server.endpoint())
        .await
        .unwrap();

    let status = raw
        .square(SquareRequest { num: -1 })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    let bad_request = status.get_details_bad_request().unwrap();
    assert_eq!(bad_request.field_violations.len(), 1);
    assert_eq!(bad_request.field_violations[0].field, "num");

    let info = status.get_details_error_info().unwrap();
    assert_eq!(info.reason, "INVALID_ARGUMENT");
    assert_eq!(info.domain, "calculator.v1");
}

// =============================================================================
// SumWithDeadline
// =============================================================================

#[tokio::test]
async fn test_sum_with_deadline_completes_in_time() {
    let server = start_server(short_work()).await;
    let mut client = server.client().await;

    let result = client
        .sum_with_deadline(3, 7, Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(result, 10);
}

#[tokio::test]
async fn test_sum_with_deadline_expires() {
    let server = start_server(short_work()).await;
    let mut client = server.client().await;

    let err = client
        .sum_with_deadline(3, 7, Duration::from_millis(150))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
}

#[tokio::test]
async fn test_expired_call_is_counted_as_failed() {
    let server = start_server(short_work()).await;
    let mut client = server.client().await;

    let _ = client
        .sum_with_deadline(1, 1, Duration::from_millis(50))
        .await
        .unwrap_err();

    // The server notices the deadline on its own clock
    tokio::time::sleep(Duration::from_millis(400)).await;
    let stats = server.stats.snapshot();
    assert_eq!(stats.started, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.active, 0);
}

#[tokio::test]
async fn test_connection_survives_expired_call() {
    let server = start_server(short_work()).await;
    let mut client = server.client().await;

    let _ = client
        .sum_with_deadline(1, 1, Duration::from_millis(50))
        .await
        .unwrap_err();
    assert_eq!(client.sum(2, 2).await.unwrap(), 4);
}
