//! Port Interfaces
//!
//! The protocol handlers talk to the transport only through these two ports:
//!
//! - [`MessageSource`]: the receiving half of one direction of a session.
//!   Every receive resolves to a [`StreamEvent`], which keeps "the peer
//!   finished" ([`StreamEvent::End`]) apart from "the transport failed"
//!   ([`StreamEvent::Error`]).
//! - [`MessageSink`]: the sending half. Dropping a sink is the end-of-stream
//!   signal for its direction, so ownership guarantees it happens once.
//!
//! In-memory adapters over `tokio::sync::mpsc` live here; the gRPC adapters
//! live in `infrastructure::grpc`.

use std::marker::PhantomData;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::session::CallError;

/// Outcome of one receive on a stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent<T> {
    /// The next message.
    Item(T),
    /// The sender finished cleanly; no more messages follow.
    End,
    /// The stream failed; no more messages follow.
    Error(CallError),
}

impl<T> StreamEvent<T> {
    /// Whether no further events follow this one.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Item(_))
    }

    /// Transform the carried item.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> StreamEvent<U> {
        match self {
            Self::Item(item) => StreamEvent::Item(f(item)),
            Self::End => StreamEvent::End,
            Self::Error(err) => StreamEvent::Error(err),
        }
    }
}

/// Receiving half of a stream.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSource<T: Send + 'static>: Send {
    /// Wait for the next event. After a terminal event the source must not be
    /// polled again.
    async fn next_event(&mut self) -> StreamEvent<T>;
}

/// Sending half of a stream.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSink<T: Send + 'static>: Send {
    /// Send one message, waiting for capacity.
    async fn send(&mut self, item: T) -> Result<(), CallError>;
}

#[async_trait]
impl<T: Send + 'static> MessageSource<T> for mpsc::Receiver<Result<T, CallError>> {
    async fn next_event(&mut self) -> StreamEvent<T> {
        match self.recv().await {
            Some(Ok(item)) => StreamEvent::Item(item),
            Some(Err(err)) => StreamEvent::Error(err),
            None => StreamEvent::End,
        }
    }
}

#[async_trait]
impl<T: Send + 'static> MessageSink<T> for mpsc::Sender<Result<T, CallError>> {
    async fn send(&mut self, item: T) -> Result<(), CallError> {
        mpsc::Sender::send(self, Ok(item))
            .await
            .map_err(|_| CallError::cancelled("peer closed the stream"))
    }
}

/// Source adapter applying `f` to every item.
pub struct MapItems<S, F, T> {
    inner: S,
    f: F,
    _item: PhantomData<fn(T)>,
}

#[async_trait]
impl<S, F, T, U> MessageSource<U> for MapItems<S, F, T>
where
    S: MessageSource<T>,
    F: FnMut(T) -> U + Send,
    T: Send + 'static,
    U: Send + 'static,
{
    async fn next_event(&mut self) -> StreamEvent<U> {
        let event = self.inner.next_event().await;
        event.map(&mut self.f)
    }
}

/// Combinators for [`MessageSource`].
pub trait SourceExt<T: Send + 'static>: MessageSource<T> + Sized {
    /// Map every item through `f`.
    fn map_items<U, F>(self, f: F) -> MapItems<Self, F, T>
    where
        F: FnMut(T) -> U + Send,
    {
        MapItems {
            inner: self,
            f,
            _item: PhantomData,
        }
    }
}

impl<T: Send + 'static, S: MessageSource<T>> SourceExt<T> for S {}
