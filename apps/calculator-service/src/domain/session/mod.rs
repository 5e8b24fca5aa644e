//! Stream Sessions
//!
//! A [`StreamSession`] is the logical scope of one call: its shape, its
//! [`CallContext`], per-direction message counters and the lifecycle state.
//! The session is created when a call opens and dropped when it ends; nothing
//! in it outlives the call.
//!
//! # Lifecycle
//!
//! ```text
//! Open ──(peer completed)──► Closing ──► Closed
//!   │                           │
//!   └────────(error)────────────┴──────► Failed
//! ```
//!
//! `Closed` and `Failed` are terminal. The transition into a terminal state
//! happens exactly once; later attempts report `false` and change nothing.

mod context;
mod error;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

pub use context::CallContext;
pub use error::{CallError, ErrorKind};

/// RPC call shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallShape {
    /// One request, one response.
    Unary,
    /// One request, many responses.
    ServerStreaming,
    /// Many requests, one response.
    ClientStreaming,
    /// Many requests and many responses, interleaved.
    Bidirectional,
}

impl CallShape {
    /// Which directions of the session carry a stream.
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Self::Unary => Direction::Single,
            Self::ServerStreaming => Direction::ResponseOnly,
            Self::ClientStreaming => Direction::RequestOnly,
            Self::Bidirectional => Direction::Both,
        }
    }

    /// Stable lowercase name, used for log fields and metric labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unary => "unary",
            Self::ServerStreaming => "server_streaming",
            Self::ClientStreaming => "client_streaming",
            Self::Bidirectional => "bidirectional",
        }
    }
}

/// Streaming direction(s) of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Neither side streams.
    Single,
    /// Only requests stream (client to server).
    RequestOnly,
    /// Only responses stream (server to client).
    ResponseOnly,
    /// Both sides stream.
    Both,
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Messages may flow.
    Open,
    /// The peer signalled completion; only the final close remains.
    Closing,
    /// Terminated normally.
    Closed,
    /// Terminated by an error of the given kind.
    Failed(ErrorKind),
}

impl SessionState {
    /// Whether no further messages may flow.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed(_))
    }
}

/// One call's message exchange.
#[derive(Debug)]
pub struct StreamSession {
    id: Uuid,
    method: &'static str,
    shape: CallShape,
    context: CallContext,
    opened_at: Instant,
    state: Mutex<SessionState>,
    received: AtomicU64,
    sent: AtomicU64,
}

impl StreamSession {
    /// Open a session for `method`.
    #[must_use]
    pub fn new(method: &'static str, shape: CallShape, context: CallContext) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            shape,
            context,
            opened_at: Instant::now(),
            state: Mutex::new(SessionState::Open),
            received: AtomicU64::new(0),
            sent: AtomicU64::new(0),
        }
    }

    /// Unique call id.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// RPC method name.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        self.method
    }

    /// Call shape.
    #[must_use]
    pub const fn shape(&self) -> CallShape {
        self.shape
    }

    /// Deadline and cancellation for this call.
    #[must_use]
    pub const fn context(&self) -> &CallContext {
        &self.context
    }

    /// Time since the session opened.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.opened_at.elapsed()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Count one inbound message.
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one outbound message.
    pub fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Inbound messages so far.
    #[must_use]
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Outbound messages so far.
    #[must_use]
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// `Open → Closing`. Returns `false` from any other state.
    pub fn begin_closing(&self) -> bool {
        let mut state = self.state.lock();
        if *state == SessionState::Open {
            *state = SessionState::Closing;
            return true;
        }
        false
    }

    /// Terminate normally. Returns `false` if already terminal.
    pub fn close(&self) -> bool {
        self.transition_terminal(SessionState::Closed)
    }

    /// Terminate with `err`. Returns `false` if already terminal.
    pub fn fail(&self, err: &CallError) -> bool {
        self.transition_terminal(SessionState::Failed(err.kind()))
    }

    /// Terminate according to `result` and hand it back.
    pub fn finish<T>(&self, result: Result<T, CallError>) -> Result<T, CallError> {
        match &result {
            Ok(_) => {
                self.close();
            }
            Err(err) => {
                self.fail(err);
            }
        }
        result
    }

    fn transition_terminal(&self, next: SessionState) -> bool {
        let mut state = self.state.lock();
        if state.is_terminal() {
            return false;
        }
        *state = next;
        true
    }
}
