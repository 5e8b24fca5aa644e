//! gRPC Calculator Server Implementation
//!
//! Implements the `CalculatorService` gRPC service.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::Stream;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status, Streaming};

use super::proto::calculator::v1::{
    AverageRequest, AverageResponse, FactorResponse, FactorizeRequest, MaxRequest, MaxResponse,
    SquareRequest, SquareResponse, SumRequest, SumResponse,
    calculator_service_server::CalculatorService,
};
use super::status::to_status_with_field;
use super::timeout::request_timeout;
use crate::application::ports::SourceExt;
use crate::application::services::{
    MaxResponder, Responder, collect_stream, exchange, respond, respond_after_work, stream_items,
};
use crate::domain::operations::{self, PrimeFactors, RunningAverage};
use crate::domain::session::{CallContext, CallError, CallShape, StreamSession};
use crate::infrastructure::config::HandlerSettings;
use crate::infrastructure::metrics::{CallRecorder, CallStats};

// =============================================================================
// Type Aliases
// =============================================================================

type CallResult<T> = Result<Response<T>, Status>;
type BoxedStream<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send>>;
type ResponseSender<T> = mpsc::Sender<Result<T, Status>>;

// =============================================================================
// Server Implementation
// =============================================================================

/// gRPC calculator server.
pub struct CalculatorServer {
    settings: HandlerSettings,
    shutdown: CancellationToken,
    stats: Arc<CallStats>,
}

impl CalculatorServer {
    /// Create a new calculator server.
    ///
    /// Calls in flight when `shutdown` is cancelled fail with `Cancelled`.
    #[must_use]
    pub fn new(settings: HandlerSettings, shutdown: CancellationToken) -> Self {
        Self {
            settings,
            shutdown,
            stats: Arc::new(CallStats::new()),
        }
    }

    /// Call counters shared with the health endpoint.
    #[must_use]
    pub fn stats(&self) -> Arc<CallStats> {
        Arc::clone(&self.stats)
    }

    /// Handler settings in effect.
    #[must_use]
    pub const fn settings(&self) -> &HandlerSettings {
        &self.settings
    }

    fn open<T>(&self, request: &Request<T>, method: &'static str, shape: CallShape) -> CallRecorder {
        let mut context = CallContext::new(self.shutdown.child_token());
        if let Some(timeout) = request_timeout(request.metadata()) {
            context = context.with_timeout(timeout);
        }
        let session = Arc::new(StreamSession::new(method, shape, context));
        CallRecorder::start(Arc::clone(&self.stats), session)
    }
}

/// Run a streaming handler on its own task, feeding the response channel.
///
/// The handler gets its own sender; once it returns, any error is delivered
/// as the stream's final status and the channel closes. A client that drops
/// the response stream cancels the handler.
fn spawn_responder<T, F, Fut>(recorder: CallRecorder, tx: ResponseSender<T>, handler: F)
where
    T: Send + 'static,
    F: FnOnce(Arc<StreamSession>, ResponseSender<T>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<u64, CallError>> + Send + 'static,
{
    tokio::spawn(async move {
        let session = Arc::clone(recorder.session());

        let result = tokio::select! {
            result = handler(Arc::clone(&session), tx.clone()) => result,
            () = tx.closed() => Err(CallError::cancelled("client closed the response stream")),
        };

        if let Err(err) = result {
            session.fail(&err);
            if tx.send(Err(Status::from(err))).await.is_err() {
                tracing::debug!(call_id = %session.id(), "Client gone before final status");
            }
        }
        drop(recorder);
    });
}

#[tonic::async_trait]
impl CalculatorService for CalculatorServer {
    type FactorizeStream = BoxedStream<FactorResponse>;
    type FindMaxStream = BoxedStream<MaxResponse>;

    async fn sum(&self, request: Request<SumRequest>) -> CallResult<SumResponse> {
        let recorder = self.open(&request, "Sum", CallShape::Unary);
        let SumRequest { a, b } = request.into_inner();

        let result = respond(recorder.session(), || Ok(operations::sum(a, b)))?;
        Ok(Response::new(SumResponse { result }))
    }

    async fn sum_with_deadline(&self, request: Request<SumRequest>) -> CallResult<SumResponse> {
        let recorder = self.open(&request, "SumWithDeadline", CallShape::Unary);
        let SumRequest { a, b } = request.into_inner();

        let result = respond_after_work(recorder.session(), self.settings.deadline_work, || {
            Ok(operations::sum(a, b))
        })
        .await
        .inspect_err(|err| {
            tracing::warn!(call_id = %recorder.session().id(), error = %err, "SumWithDeadline aborted");
        })?;
        Ok(Response::new(SumResponse { result }))
    }

    async fn square(&self, request: Request<SquareRequest>) -> CallResult<SquareResponse> {
        let recorder = self.open(&request, "Square", CallShape::Unary);
        let SquareRequest { num } = request.into_inner();

        let result = respond(recorder.session(), || Ok(operations::square_root(num)?))
            .map_err(|err| to_status_with_field(&err, "num"))?;
        Ok(Response::new(SquareResponse { result }))
    }

    async fn factorize(
        &self,
        request: Request<FactorizeRequest>,
    ) -> CallResult<Self::FactorizeStream> {
        let recorder = self.open(&request, "Factorize", CallShape::ServerStreaming);
        let FactorizeRequest { number } = request.into_inner();

        let factors = PrimeFactors::new(number).map_err(|e| {
            let err = CallError::from(e);
            recorder.session().fail(&err);
            to_status_with_field(&err, "number")
        })?;

        let (tx, rx) = mpsc::channel(self.settings.response_buffer);
        let interval = self.settings.factor_emit_interval;

        spawn_responder(recorder, tx, move |session, mut sink| async move {
            let responses = factors.map(|factor| FactorResponse { factor });
            stream_items(&session, responses, &mut sink, interval).await
        });

        Ok(Response::new(
            Box::pin(ReceiverStream::new(rx)) as Self::FactorizeStream
        ))
    }

    async fn average(
        &self,
        request: Request<Streaming<AverageRequest>>,
    ) -> CallResult<AverageResponse> {
        let recorder = self.open(&request, "Average", CallShape::ClientStreaming);
        let mut values = request
            .into_inner()
            .map_items(|message: AverageRequest| message.value);

        let result = collect_stream(recorder.session(), &mut values, RunningAverage::new()).await?;
        Ok(Response::new(AverageResponse { result }))
    }

    async fn find_max(
        &self,
        request: Request<Streaming<MaxRequest>>,
    ) -> CallResult<Self::FindMaxStream> {
        let recorder = self.open(&request, "FindMax", CallShape::Bidirectional);
        let mut values = request
            .into_inner()
            .map_items(|message: MaxRequest| message.value);

        let (tx, rx) = mpsc::channel(self.settings.response_buffer);
        let mut max = MaxResponder::new(self.settings.echo_mode);

        spawn_responder(recorder, tx, move |session, mut sink| async move {
            let responder = move |value: i32| MaxResponse {
                result: max.respond(value),
            };
            exchange(&session, &mut values, &mut sink, responder).await
        });

        Ok(Response::new(
            Box::pin(ReceiverStream::new(rx)) as Self::FindMaxStream
        ))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::EchoMode;
    use crate::domain::session::SessionState;
    use crate::infrastructure::grpc::status::field_violations;
    use std::time::Duration;
    use tokio_stream::StreamExt;
    use tonic::Code;

    fn server() -> CalculatorServer {
        CalculatorServer::new(HandlerSettings::immediate(), CancellationToken::new())
    }

    #[tokio::test]
    async fn sum_adds() {
        let response = server()
            .sum(Request::new(SumRequest { a: 4, b: 6 }))
            .await
            .unwrap();
        assert_eq!(response.into_inner().result, 10);
    }

    #[tokio::test]
    async fn square_rejects_negative_with_field_violation() {
        let status = server()
            .square(Request::new(SquareRequest { num: -234 }))
            .await
            .unwrap_err();

        assert_eq!(status.code(), Code::InvalidArgument);
        assert!(status.message().contains("-234"));
        assert_eq!(field_violations(&status)[0].0, "num");
    }

    #[tokio::test]
    async fn factorize_streams_factors() {
        let srv = server();
        let response = srv
            .factorize(Request::new(FactorizeRequest { number: 120 }))
            .await
            .unwrap();

        let factors: Vec<i32> = response
            .into_inner()
            .map(|r| r.unwrap().factor)
            .collect()
            .await;
        assert_eq!(factors, vec![2, 2, 2, 3, 5]);
    }

    #[tokio::test]
    async fn factorize_rejects_zero() {
        let srv = server();
        let status = match srv
            .factorize(Request::new(FactorizeRequest { number: 0 }))
            .await
        {
            Ok(_) => panic!("zero must be rejected"),
            Err(status) => status,
        };
        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(srv.stats().snapshot().failed, 1);
    }

    #[tokio::test]
    async fn deadline_from_header_aborts_bounded_work() {
        let srv = CalculatorServer::new(
            HandlerSettings {
                deadline_work: crate::application::services::BoundedWork {
                    steps: 3,
                    step: Duration::from_millis(200),
                },
                ..HandlerSettings::immediate()
            },
            CancellationToken::new(),
        );

        let mut request = Request::new(SumRequest { a: 1, b: 2 });
        request
            .metadata_mut()
            .insert("grpc-timeout", "100m".parse().unwrap());

        let status = srv.sum_with_deadline(request).await.unwrap_err();
        assert_eq!(status.code(), Code::DeadlineExceeded);
    }

    #[tokio::test]
    async fn shutdown_cancels_bounded_work() {
        let shutdown = CancellationToken::new();
        let srv = CalculatorServer::new(HandlerSettings::default(), shutdown.clone());
        shutdown.cancel();

        let status = srv
            .sum_with_deadline(Request::new(SumRequest { a: 1, b: 2 }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::Cancelled);
    }

    #[tokio::test]
    async fn open_applies_timeout_header() {
        let srv = server();
        let mut request = Request::new(());
        request
            .metadata_mut()
            .insert("grpc-timeout", "2S".parse().unwrap());

        let recorder = srv.open(&request, "Sum", CallShape::Unary);
        let remaining = recorder.session().context().remaining().unwrap();
        assert!(remaining <= Duration::from_secs(2));
        assert_eq!(recorder.session().state(), SessionState::Open);

        recorder.session().close();
        drop(recorder);
        assert_eq!(srv.stats().snapshot().succeeded, 1);
    }

    #[tokio::test]
    async fn find_max_uses_configured_echo_mode() {
        let srv = CalculatorServer::new(
            HandlerSettings {
                echo_mode: EchoMode::RunningMax,
                ..HandlerSettings::immediate()
            },
            CancellationToken::new(),
        );
        assert_eq!(srv.settings().echo_mode, EchoMode::RunningMax);
    }
}
