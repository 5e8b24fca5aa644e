//! Client-Side Stream Driver
//!
//! Runs the send path and the receive path of a streaming call concurrently
//! so neither blocks the other:
//!
//! ```text
//!            ┌─── send task ──── send_all ──► sink (dropped = completion)
//! call ──────┤
//!            └─── receive task ─ drain ◄──── source (End | Error)
//!                        │
//!                  join barrier: return once both are terminal
//! ```
//!
//! Send-completion is the sink being dropped after the last request, which
//! happens exactly once and leaves nothing to send afterwards.

use std::future::Future;
use std::time::Duration;

use futures::future::{Either, select};
use futures::pin_mut;
use tokio::task::JoinError;

use crate::application::ports::{MessageSink, MessageSource, StreamEvent};
use crate::domain::session::{CallError, ErrorKind};

/// Delay inserted between consecutive requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pacing {
    interval: Duration,
}

impl Pacing {
    /// Send requests back to back.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            interval: Duration::ZERO,
        }
    }

    /// Wait `interval` between consecutive requests.
    #[must_use]
    pub const fn every(interval: Duration) -> Self {
        Self { interval }
    }

    /// The inter-message delay.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

/// Result of a bidirectional exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange<U> {
    /// Requests sent.
    pub sent: u64,
    /// Responses received, in arrival order.
    pub responses: Vec<U>,
}

/// Send `requests` in order, then signal completion by dropping `sink`.
pub async fn send_all<T, I, S>(requests: I, pacing: Pacing, mut sink: S) -> Result<u64, CallError>
where
    T: Send + 'static,
    I: IntoIterator<Item = T>,
    S: MessageSink<T>,
{
    let mut sent = 0u64;
    for request in requests {
        if sent > 0 && !pacing.interval.is_zero() {
            tokio::time::sleep(pacing.interval).await;
        }
        sink.send(request).await?;
        sent += 1;
    }
    drop(sink);
    tracing::debug!(sent, "Send direction completed");
    Ok(sent)
}

/// Receive until the source reports a terminal event, handing every item to
/// `on_item`.
pub async fn drain<T, S, F>(source: &mut S, mut on_item: F) -> Result<u64, CallError>
where
    T: Send + 'static,
    S: MessageSource<T>,
    F: FnMut(T) + Send,
{
    let mut received = 0u64;
    loop {
        match source.next_event().await {
            StreamEvent::Item(item) => {
                received += 1;
                on_item(item);
            }
            StreamEvent::End => return Ok(received),
            StreamEvent::Error(err) => return Err(err),
        }
    }
}

/// Stream `requests` while awaiting the single response of a client-streaming
/// call.
///
/// Both paths are polled on the current task. A failed response cancels the
/// remaining sends. If the request stream is closed under the sender, the
/// response's own error is reported in preference to the closed stream.
pub async fn drive_client_streaming<T, R, S, F>(
    requests: Vec<T>,
    pacing: Pacing,
    sink: S,
    response: F,
) -> Result<(u64, R), CallError>
where
    T: Send + 'static,
    S: MessageSink<T>,
    F: Future<Output = Result<R, CallError>>,
{
    let send = send_all(requests, pacing, sink);
    pin_mut!(send, response);

    match select(send, response).await {
        Either::Left((Ok(sent), response)) => Ok((sent, response.await?)),
        Either::Left((Err(send_err), response)) if send_err.kind() == ErrorKind::Cancelled => {
            match response.await {
                Err(err) => Err(err),
                Ok(_) => Err(send_err),
            }
        }
        Either::Left((Err(send_err), _)) => Err(send_err),
        Either::Right((Ok(result), send)) => Ok((send.await?, result)),
        Either::Right((Err(err), _)) => Err(err),
    }
}

/// Run a bidirectional exchange: one task sends `requests`, another drains
/// `source`, and this call returns only after both reached a terminal state.
///
/// `on_response` sees each response as it arrives. If the receive path fails
/// the send task is aborted, and the receive error is returned once that task
/// has ended and dropped its sink.
pub async fn drive_bidirectional<T, U, S, Src, F>(
    requests: Vec<T>,
    pacing: Pacing,
    sink: S,
    mut source: Src,
    mut on_response: F,
) -> Result<Exchange<U>, CallError>
where
    T: Send + 'static,
    U: Send + 'static,
    S: MessageSink<T> + 'static,
    Src: MessageSource<U> + 'static,
    F: FnMut(&U) + Send + 'static,
{
    let sender = tokio::spawn(send_all(requests, pacing, sink));
    let receiver = tokio::spawn(async move {
        let mut responses = Vec::new();
        drain(&mut source, |response| {
            on_response(&response);
            responses.push(response);
        })
        .await
        .map(|_| responses)
    });

    let responses = match receiver.await.map_err(join_error).and_then(|r| r) {
        Ok(responses) => responses,
        Err(err) => {
            sender.abort();
            match sender.await {
                Err(join) if !join.is_cancelled() => {
                    tracing::warn!(error = %join, "Send task failed after receive error");
                }
                _ => {}
            }
            return Err(err);
        }
    };
    let sent = sender.await.map_err(join_error)??;

    Ok(Exchange { sent, responses })
}

fn join_error(err: JoinError) -> CallError {
    if err.is_cancelled() {
        CallError::cancelled("stream task was cancelled")
    } else {
        CallError::unknown(format!("stream task panicked: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockMessageSink;
    use crate::application::services::bidirectional::{exchange, EchoMode, MaxResponder};
    use crate::domain::session::{CallContext, CallShape, ErrorKind, StreamSession};
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    type Chan<T> = (
        mpsc::Sender<Result<T, CallError>>,
        mpsc::Receiver<Result<T, CallError>>,
    );

    fn chan<T>(capacity: usize) -> Chan<T> {
        mpsc::channel(capacity)
    }

    #[tokio::test(start_paused = true)]
    async fn send_all_paces_between_messages() {
        let (tx, mut rx) = chan::<i32>(8);
        let started = Instant::now();

        let sent = send_all(vec![1, 2, 3], Pacing::every(Duration::from_secs(1)), tx)
            .await
            .unwrap();

        assert_eq!(sent, 3);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
        let mut got = Vec::new();
        while let Some(Ok(v)) = rx.recv().await {
            got.push(v);
        }
        // The channel closed: completion was signalled after the last send.
        assert_eq!(got, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn send_all_stops_on_first_failure() {
        let mut sink = MockMessageSink::<i32>::new();
        let mut calls = 0;
        sink.expect_send().times(2).returning(move |_| {
            calls += 1;
            if calls == 2 {
                Err(CallError::unknown("broken pipe"))
            } else {
                Ok(())
            }
        });

        let err = send_all(vec![1, 2, 3], Pacing::none(), sink).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }

    #[tokio::test]
    async fn drain_reports_error_after_items() {
        let (tx, mut rx) = chan::<i32>(4);
        tx.send(Ok(1)).await.unwrap();
        tx.send(Err(CallError::cancelled("server shutting down"))).await.unwrap();

        let mut seen = Vec::new();
        let err = drain(&mut rx, |v| seen.push(v)).await.unwrap_err();
        assert_eq!(seen, vec![1]);
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn bidirectional_against_in_memory_handler() {
        let (req_tx, mut req_rx) = chan::<i32>(1);
        let (mut resp_tx, resp_rx) = chan::<i32>(1);

        let handler = tokio::spawn(async move {
            let session =
                StreamSession::new("FindMax", CallShape::Bidirectional, CallContext::default());
            let sent = exchange(&session, &mut req_rx, &mut resp_tx, MaxResponder::new(EchoMode::Latest))
                .await;
            drop(resp_tx);
            sent
        });

        let arrivals = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen = Arc::clone(&arrivals);
        let started = Instant::now();

        let out = drive_bidirectional(
            vec![5, 10, 6, 7, 9],
            Pacing::every(Duration::from_secs(1)),
            req_tx,
            resp_rx,
            move |v: &i32| seen.lock().push((*v, started.elapsed())),
        )
        .await
        .unwrap();

        assert_eq!(out.sent, 5);
        assert_eq!(out.responses, vec![5, 10, 6, 7, 9]);
        assert_eq!(handler.await.unwrap(), Ok(5));

        // Responses arrive while requests are still being paced out.
        let arrivals = arrivals.lock();
        assert!(arrivals[0].1 < Duration::from_secs(1));
        assert!(arrivals[3].1 >= Duration::from_secs(3));
    }

    #[tokio::test]
    async fn bidirectional_receive_failure_aborts_sender() {
        let (req_tx, _req_rx) = chan::<i32>(1);
        let (resp_tx, resp_rx) = chan::<i32>(1);
        resp_tx
            .send(Err(CallError::deadline_exceeded("deadline elapsed")))
            .await
            .unwrap();

        let err = drive_bidirectional(
            vec![1, 2, 3],
            Pacing::every(Duration::from_secs(60)),
            req_tx,
            resp_rx,
            |_: &i32| {},
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
    }

    #[tokio::test]
    async fn bidirectional_failure_returns_after_send_direction_closed() {
        let (req_tx, mut req_rx) = chan::<i32>(4);
        let (resp_tx, resp_rx) = chan::<i32>(1);
        resp_tx.send(Err(CallError::unknown("reset"))).await.unwrap();

        let err = drive_bidirectional(
            vec![1, 2, 3],
            Pacing::every(Duration::from_secs(60)),
            req_tx,
            resp_rx,
            |_: &i32| {},
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);

        loop {
            match req_rx.try_recv() {
                Ok(_) => {}
                Err(e) => {
                    assert_eq!(e, mpsc::error::TryRecvError::Disconnected);
                    break;
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn client_streaming_prefers_response_error_over_closed_requests() {
        let (tx, rx) = chan::<f32>(1);
        drop(rx);
        let response = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Err::<f32, CallError>(CallError::invalid_argument("value out of range"))
        };

        let err = drive_client_streaming(vec![1.0, 2.0], Pacing::none(), tx, response)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn client_streaming_response_failure_stops_sending() {
        let (tx, _rx) = chan::<f32>(1);
        let response = async { Err::<f32, CallError>(CallError::deadline_exceeded("deadline elapsed")) };

        let err = drive_client_streaming(
            vec![1.0, 2.0, 3.0],
            Pacing::every(Duration::from_secs(60)),
            tx,
            response,
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
    }

    #[tokio::test]
    async fn client_streaming_joins_both_paths() {
        let (tx, mut rx) = chan::<f32>(8);
        let response = async move {
            let mut total = 0.0;
            drain(&mut rx, |v| total += v).await?;
            Ok::<f32, CallError>(total)
        };

        let (sent, total) =
            drive_client_streaming(vec![1.0, 2.0, 3.5], Pacing::none(), tx, response)
                .await
                .unwrap();
        assert_eq!(sent, 3);
        assert!((total - 6.5f32).abs() < f32::EPSILON);
    }
}
