//! Client-Streaming Handler
//!
//! Folds a received sequence into one response. The three receive outcomes
//! are handled separately: an item updates the accumulator, the sender's
//! completion produces exactly one response, and a transport error aborts the
//! call with no response.

use crate::application::ports::{MessageSource, StreamEvent};
use crate::domain::operations::RunningAverage;
use crate::domain::session::{CallError, StreamSession};

/// Per-call aggregate over a client stream.
pub trait Accumulator<T> {
    /// Response produced when the stream completes.
    type Output;

    /// Fold one received item in.
    fn observe(&mut self, item: T);

    /// Produce the single response.
    fn finish(self) -> Self::Output;
}

impl Accumulator<f32> for RunningAverage {
    type Output = f32;

    fn observe(&mut self, item: f32) {
        Self::observe(self, item);
    }

    fn finish(self) -> f32 {
        self.result()
    }
}

/// Drain `source` into `acc` and return its result once the sender completes.
pub async fn collect_stream<T, S, A>(
    session: &StreamSession,
    source: &mut S,
    mut acc: A,
) -> Result<A::Output, CallError>
where
    T: Send + 'static,
    S: MessageSource<T>,
    A: Accumulator<T> + Send,
{
    let ctx = session.context();

    let result = loop {
        match ctx.guard(source.next_event()).await {
            Ok(StreamEvent::Item(item)) => {
                session.record_received();
                acc.observe(item);
            }
            Ok(StreamEvent::End) => {
                session.begin_closing();
                tracing::debug!(
                    call_id = %session.id(),
                    received = session.received(),
                    "Client stream completed"
                );
                break Ok(acc.finish());
            }
            Ok(StreamEvent::Error(err)) | Err(err) => break Err(err),
        }
    };

    if result.is_ok() {
        session.record_sent();
    }
    session.finish(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockMessageSource;
    use crate::domain::session::{CallContext, CallShape, ErrorKind, SessionState};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio_test::{assert_err, assert_ok};

    fn session(ctx: CallContext) -> StreamSession {
        StreamSession::new("Average", CallShape::ClientStreaming, ctx)
    }

    #[tokio::test]
    async fn averages_until_sender_completes() {
        let (tx, mut rx) = mpsc::channel::<Result<f32, CallError>>(8);
        for v in [5.0, 10.0, 6.0, 7.0, 9.0] {
            tx.send(Ok(v)).await.unwrap();
        }
        drop(tx);

        let s = session(CallContext::default());
        let avg = assert_ok!(collect_stream(&s, &mut rx, RunningAverage::new()).await);

        assert!((avg - 7.4).abs() < 1e-6);
        assert_eq!((s.received(), s.sent()), (5, 1));
        assert_eq!(s.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn empty_stream_averages_to_zero() {
        let (tx, mut rx) = mpsc::channel::<Result<f32, CallError>>(1);
        drop(tx);

        let s = session(CallContext::default());
        let avg = assert_ok!(collect_stream(&s, &mut rx, RunningAverage::new()).await);
        assert_eq!(avg, 0.0);
    }

    #[tokio::test]
    async fn transport_error_yields_no_response() {
        let mut source = MockMessageSource::<f32>::new();
        let mut events = vec![
            StreamEvent::Error(CallError::unknown("connection reset")),
            StreamEvent::Item(3.0),
        ];
        source
            .expect_next_event()
            .times(2)
            .returning(move || events.pop().unwrap_or(StreamEvent::End));

        let s = session(CallContext::default());
        let err = assert_err!(collect_stream(&s, &mut source, RunningAverage::new()).await);

        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!((s.received(), s.sent()), (1, 0));
        assert_eq!(s.state(), SessionState::Failed(ErrorKind::Unknown));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_while_waiting_for_messages() {
        let (_tx, mut rx) = mpsc::channel::<Result<f32, CallError>>(1);

        let s = session(CallContext::default().with_timeout(Duration::from_secs(1)));
        let err = assert_err!(collect_stream(&s, &mut rx, RunningAverage::new()).await);
        assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
    }
}
