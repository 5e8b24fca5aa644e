//! Bidirectional-Streaming Handler
//!
//! Every received message is answered immediately with exactly one response,
//! so responses come out in request order and interleave with the requests.
//! The session walks `Open → Closing → Closed` on the sender's completion, or
//! ends in `Failed` on any error.

use std::fmt;
use std::str::FromStr;

use crate::application::ports::{MessageSink, MessageSource, StreamEvent};
use crate::domain::operations::RunningMax;
use crate::domain::session::{CallError, StreamSession};

/// Per-call logic producing one response per request.
pub trait Responder<T> {
    /// Response type.
    type Output;

    /// Answer one request.
    fn respond(&mut self, item: T) -> Self::Output;
}

impl<T, U, F> Responder<T> for F
where
    F: FnMut(T) -> U,
{
    type Output = U;

    fn respond(&mut self, item: T) -> U {
        self(item)
    }
}

/// What `FindMax` sends back for each request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EchoMode {
    /// Echo the value just received.
    #[default]
    Latest,
    /// Send the maximum seen so far.
    RunningMax,
}

impl EchoMode {
    /// Configuration spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::RunningMax => "running-max",
        }
    }
}

impl fmt::Display for EchoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised echo mode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown echo mode '{0}', expected 'latest' or 'running-max'")]
pub struct ParseEchoModeError(String);

impl FromStr for EchoMode {
    type Err = ParseEchoModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latest" | "echo" => Ok(Self::Latest),
            "running-max" | "running_max" | "max" => Ok(Self::RunningMax),
            other => Err(ParseEchoModeError(other.to_string())),
        }
    }
}

/// Running-maximum responder for `FindMax`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxResponder {
    max: RunningMax,
    mode: EchoMode,
}

impl MaxResponder {
    /// Fresh responder for one call.
    #[must_use]
    pub const fn new(mode: EchoMode) -> Self {
        Self {
            max: RunningMax::new(),
            mode,
        }
    }

    /// Maximum seen so far.
    #[must_use]
    pub const fn current(&self) -> Option<i32> {
        self.max.current()
    }
}

impl Responder<i32> for MaxResponder {
    type Output = i32;

    fn respond(&mut self, item: i32) -> i32 {
        let max = self.max.observe(item);
        match self.mode {
            EchoMode::Latest => item,
            EchoMode::RunningMax => max,
        }
    }
}

/// Answer every request from `source` through `sink` until the sender
/// completes.
///
/// Returns the number of responses sent. The caller closes the response
/// direction by dropping the sink once this returns.
pub async fn exchange<T, U, Src, Snk, R>(
    session: &StreamSession,
    source: &mut Src,
    sink: &mut Snk,
    mut responder: R,
) -> Result<u64, CallError>
where
    T: Send + 'static,
    U: Send + 'static,
    Src: MessageSource<T>,
    Snk: MessageSink<U>,
    R: Responder<T, Output = U> + Send,
{
    let ctx = session.context();

    let result = loop {
        let event = match ctx.guard(source.next_event()).await {
            Ok(event) => event,
            Err(err) => break Err(err),
        };

        match event {
            StreamEvent::Item(item) => {
                session.record_received();
                let response = responder.respond(item);
                if let Err(err) = ctx.guard(sink.send(response)).await.and_then(|sent| sent) {
                    break Err(err);
                }
                session.record_sent();
            }
            StreamEvent::End => {
                session.begin_closing();
                break Ok(session.sent());
            }
            StreamEvent::Error(err) => break Err(err),
        }
    };

    session.finish(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{MockMessageSink, MockMessageSource};
    use crate::domain::session::{CallContext, CallShape, ErrorKind, SessionState};
    use proptest::prelude::*;
    use test_case::test_case;
    use tokio::sync::mpsc;

    fn session() -> StreamSession {
        StreamSession::new("FindMax", CallShape::Bidirectional, CallContext::default())
    }

    async fn run(mode: EchoMode, values: &[i32]) -> (Vec<i32>, StreamSession) {
        let capacity = values.len().max(1);
        let (req_tx, mut req_rx) = mpsc::channel::<Result<i32, CallError>>(capacity);
        let (mut resp_tx, mut resp_rx) = mpsc::channel::<Result<i32, CallError>>(capacity);
        for &v in values {
            req_tx.send(Ok(v)).await.unwrap();
        }
        drop(req_tx);

        let s = session();
        let sent = exchange(&s, &mut req_rx, &mut resp_tx, MaxResponder::new(mode))
            .await
            .unwrap();
        drop(resp_tx);

        let mut out = Vec::new();
        while let Some(Ok(v)) = resp_rx.recv().await {
            out.push(v);
        }
        assert_eq!(sent, out.len() as u64);
        (out, s)
    }

    #[tokio::test]
    async fn one_response_per_request_in_order() {
        let (out, s) = run(EchoMode::Latest, &[5, 10, 6, 7, 9]).await;
        assert_eq!(out, vec![5, 10, 6, 7, 9]);
        assert_eq!((s.received(), s.sent()), (5, 5));
        assert_eq!(s.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn running_max_mode() {
        let (out, _) = run(EchoMode::RunningMax, &[5, 10, 6, 7, 12]).await;
        assert_eq!(out, vec![5, 10, 10, 10, 12]);
    }

    #[tokio::test]
    async fn empty_request_stream_closes_cleanly() {
        let (out, s) = run(EchoMode::Latest, &[]).await;
        assert!(out.is_empty());
        assert_eq!(s.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn transport_error_fails_the_session() {
        let mut source = MockMessageSource::<i32>::new();
        let mut events = vec![
            StreamEvent::Error(CallError::unknown("stream reset")),
            StreamEvent::Item(4),
        ];
        source
            .expect_next_event()
            .times(2)
            .returning(move || events.pop().unwrap_or(StreamEvent::End));

        let mut sink = MockMessageSink::<i32>::new();
        sink.expect_send()
            .withf(|v| *v == 4)
            .times(1)
            .returning(|_| Ok(()));

        let s = session();
        let err = exchange(&s, &mut source, &mut sink, MaxResponder::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(s.state(), SessionState::Failed(ErrorKind::Unknown));
    }

    #[tokio::test]
    async fn closure_responder() {
        let (tx, mut rx) = mpsc::channel::<Result<i32, CallError>>(4);
        let (mut out_tx, mut out_rx) = mpsc::channel::<Result<String, CallError>>(4);
        tx.send(Ok(3)).await.unwrap();
        drop(tx);

        let s = session();
        exchange(&s, &mut rx, &mut out_tx, |v: i32| v.to_string())
            .await
            .unwrap();
        assert_eq!(out_rx.recv().await, Some(Ok("3".to_string())));
    }

    #[test_case("latest", EchoMode::Latest; "latest")]
    #[test_case("running-max", EchoMode::RunningMax; "running max")]
    #[test_case(" RUNNING_MAX ", EchoMode::RunningMax; "case and underscore")]
    fn parse_echo_mode(input: &str, expected: EchoMode) {
        assert_eq!(input.parse::<EchoMode>(), Ok(expected));
    }

    #[test]
    fn parse_echo_mode_rejects_unknown() {
        assert!("loudest".parse::<EchoMode>().is_err());
        assert_eq!(EchoMode::RunningMax.to_string(), "running-max");
    }

    fn block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(fut)
    }

    proptest! {
        #[test]
        fn latest_answers_every_request_in_order(values in prop::collection::vec(any::<i32>(), 0..64)) {
            let (out, s) = block_on(run(EchoMode::Latest, &values));
            prop_assert_eq!(&out, &values);
            prop_assert_eq!(s.received(), values.len() as u64);
            prop_assert_eq!(s.state(), SessionState::Closed);
        }

        #[test]
        fn running_max_answers_with_prefix_maximum(values in prop::collection::vec(any::<i32>(), 0..64)) {
            let (out, _) = block_on(run(EchoMode::RunningMax, &values));
            prop_assert_eq!(out.len(), values.len());
            for (i, max) in out.iter().enumerate() {
                prop_assert_eq!(Some(max), values[..=i].iter().max());
            }
        }
    }
}
