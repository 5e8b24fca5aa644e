//! gRPC Calculator Client
//!
//! Client-side stream driver over a tonic channel. Unary calls map the
//! response straight through; streaming calls run through
//! [`crate::application::services::driver`], so the send and receive paths
//! progress concurrently and every call returns only after both directions
//! finished.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Request, Status};

use super::proto::calculator::v1::{
    AverageRequest, FactorResponse, FactorizeRequest, MaxRequest, MaxResponse, SquareRequest,
    SumRequest, calculator_service_client::CalculatorServiceClient,
};
use super::stream::RequestSink;
use crate::application::ports::SourceExt;
use crate::application::services::{
    Exchange, Pacing, drain, drive_bidirectional, drive_client_streaming,
};
use crate::domain::session::CallError;

/// Capacity of the outbound request channel of a streaming call.
const REQUEST_BUFFER: usize = 16;

/// Calculator client.
#[derive(Debug, Clone)]
pub struct CalculatorClient {
    inner: CalculatorServiceClient<Channel>,
}

impl CalculatorClient {
    /// Connect to `endpoint` (for example `http://127.0.0.1:50069`).
    pub async fn connect(endpoint: impl Into<String>) -> Result<Self, CallError> {
        let endpoint = endpoint.into();
        let channel = Endpoint::from_shared(endpoint.clone())
            .map_err(|e| CallError::invalid_argument(format!("bad endpoint {endpoint}: {e}")))?
            .connect()
            .await
            .map_err(|e| CallError::unknown(format!("connect to {endpoint}: {e}")))?;

        tracing::debug!(endpoint, "Connected to calculator service");
        Ok(Self::from_channel(channel))
    }

    /// Use an established channel.
    #[must_use]
    pub fn from_channel(channel: Channel) -> Self {
        Self {
            inner: CalculatorServiceClient::new(channel),
        }
    }

    /// `a + b`.
    pub async fn sum(&mut self, a: i32, b: i32) -> Result<i32, CallError> {
        let response = self.inner.sum(SumRequest { a, b }).await?;
        Ok(response.into_inner().result)
    }

    /// `a + b` with a deadline of `timeout` from now.
    ///
    /// The deadline travels to the server as `grpc-timeout` and is also
    /// enforced locally, so an expired call reports `DeadlineExceeded` whether
    /// the server answered in time or not.
    pub async fn sum_with_deadline(
        &mut self,
        a: i32,
        b: i32,
        timeout: Duration,
    ) -> Result<i32, CallError> {
        let mut request = Request::new(SumRequest { a, b });
        request.set_timeout(timeout);

        let started = Instant::now();
        match tokio::time::timeout(timeout, self.inner.sum_with_deadline(request)).await {
            Ok(Ok(response)) => Ok(response.into_inner().result),
            Ok(Err(status)) => Err(classify_after_deadline(&status, started, timeout)),
            Err(_) => Err(CallError::deadline_exceeded(format!(
                "no response within {}ms",
                timeout.as_millis()
            ))),
        }
    }

    /// Square root of `num`.
    pub async fn square_root(&mut self, num: i32) -> Result<f64, CallError> {
        let response = self.inner.square(SquareRequest { num }).await?;
        Ok(response.into_inner().result)
    }

    /// Prime factors of `number`, in the order the server emitted them.
    pub async fn factorize(&mut self, number: i32) -> Result<Vec<i32>, CallError> {
        let mut factors = Vec::new();
        self.factorize_with(number, |factor| factors.push(factor))
            .await?;
        Ok(factors)
    }

    /// Prime factors of `number`, handing each to `on_factor` as it arrives.
    ///
    /// Returns the number of factors received.
    pub async fn factorize_with<F>(&mut self, number: i32, on_factor: F) -> Result<u64, CallError>
    where
        F: FnMut(i32) + Send,
    {
        let response = self.inner.factorize(FactorizeRequest { number }).await?;
        let mut factors = response
            .into_inner()
            .map_items(|message: FactorResponse| message.factor);
        drain(&mut factors, on_factor).await
    }

    /// Mean of `values`, streamed with `pacing` between messages.
    pub async fn average(&mut self, values: Vec<f32>, pacing: Pacing) -> Result<f32, CallError> {
        let (tx, rx) = mpsc::channel(REQUEST_BUFFER);
        let requests: Vec<AverageRequest> =
            values.into_iter().map(|value| AverageRequest { value }).collect();

        let mut inner = self.inner.clone();
        let response = async move {
            let response = inner.average(ReceiverStream::new(rx)).await?;
            Ok::<f32, CallError>(response.into_inner().result)
        };

        let (sent, result) =
            drive_client_streaming(requests, pacing, RequestSink::new(tx), response).await?;
        tracing::debug!(sent, result, "Average completed");
        Ok(result)
    }

    /// Stream `values` to `FindMax` with `pacing` between messages while
    /// receiving its responses; `on_response` sees each response as it
    /// arrives.
    pub async fn find_max<F>(
        &mut self,
        values: Vec<i32>,
        pacing: Pacing,
        on_response: F,
    ) -> Result<Exchange<i32>, CallError>
    where
        F: FnMut(&i32) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(REQUEST_BUFFER);
        let requests: Vec<MaxRequest> = values.into_iter().map(|value| MaxRequest { value }).collect();

        let response = self.inner.find_max(ReceiverStream::new(rx)).await?;
        let responses = response
            .into_inner()
            .map_items(|message: MaxResponse| message.result);

        drive_bidirectional(requests, pacing, RequestSink::new(tx), responses, on_response).await
    }
}

/// A call the transport cancelled once its deadline passed timed out.
fn classify_after_deadline(status: &Status, started: Instant, timeout: Duration) -> CallError {
    if status.code() == Code::Cancelled && started.elapsed() >= timeout {
        return CallError::deadline_exceeded(status.message());
    }
    CallError::from(status.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::ErrorKind;

    #[tokio::test(start_paused = true)]
    async fn cancellation_after_deadline_is_a_timeout() {
        let started = Instant::now();
        tokio::time::advance(Duration::from_millis(20)).await;

        let late = classify_after_deadline(
            &Status::cancelled("Timeout expired"),
            started,
            Duration::from_millis(10),
        );
        assert_eq!(late.kind(), ErrorKind::DeadlineExceeded);

        let early = classify_after_deadline(
            &Status::cancelled("client went away"),
            started,
            Duration::from_secs(10),
        );
        assert_eq!(early.kind(), ErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn connect_rejects_malformed_endpoint() {
        let err = CalculatorClient::connect("not a uri").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn connect_reports_unreachable_server() {
        let err = CalculatorClient::connect("http://127.0.0.1:1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }
}
