//! gRPC Port Adapters
//!
//! Plug tonic's streams into the application ports:
//!
//! - `tonic::Streaming<T>` is a [`MessageSource`] on both sides of a call.
//! - The server's per-call response channel is a [`MessageSink`].
//! - [`RequestSink`] feeds a client's outbound request stream.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tonic::{Status, Streaming};

use crate::application::ports::{MessageSink, MessageSource, StreamEvent};
use crate::domain::session::CallError;

#[async_trait]
impl<T: Send + 'static> MessageSource<T> for Streaming<T> {
    async fn next_event(&mut self) -> StreamEvent<T> {
        match self.message().await {
            Ok(Some(message)) => StreamEvent::Item(message),
            Ok(None) => StreamEvent::End,
            Err(status) => StreamEvent::Error(CallError::from(status)),
        }
    }
}

#[async_trait]
impl<T: Send + 'static> MessageSink<T> for mpsc::Sender<Result<T, Status>> {
    async fn send(&mut self, item: T) -> Result<(), CallError> {
        mpsc::Sender::send(self, Ok(item))
            .await
            .map_err(|_| CallError::cancelled("client closed the response stream"))
    }
}

/// Client-side sink feeding an outbound request stream.
///
/// Pair it with a `ReceiverStream` over the other end of the channel; dropping
/// the sink ends the request stream.
#[derive(Debug)]
pub struct RequestSink<T> {
    tx: mpsc::Sender<T>,
}

impl<T> RequestSink<T> {
    /// Wrap the sending half of the request channel.
    #[must_use]
    pub const fn new(tx: mpsc::Sender<T>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl<T: Send + 'static> MessageSink<T> for RequestSink<T> {
    async fn send(&mut self, item: T) -> Result<(), CallError> {
        self.tx
            .send(item)
            .await
            .map_err(|_| CallError::cancelled("request stream closed by the transport"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::ErrorKind;

    #[tokio::test]
    async fn response_channel_sink() {
        let (mut tx, mut rx) = mpsc::channel::<Result<u8, Status>>(2);
        MessageSink::send(&mut tx, 9).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().unwrap(), 9);

        drop(rx);
        let err = MessageSink::send(&mut tx, 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn request_sink_closes_on_drop() {
        let (tx, mut rx) = mpsc::channel::<u8>(2);
        let mut sink = RequestSink::new(tx);
        sink.send(4).await.unwrap();
        drop(sink);

        assert_eq!(rx.recv().await, Some(4));
        assert_eq!(rx.recv().await, None);
    }
}
