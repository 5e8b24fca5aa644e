//! Prometheus Metrics Module
//!
//! Exposes call metrics in Prometheus format for monitoring.
//!
//! # Metrics
//!
//! - `calculator_calls_started_total{method,shape}`
//! - `calculator_calls_finished_total{method,outcome}`
//! - `calculator_messages_received_total{method}`
//! - `calculator_messages_sent_total{method}`
//! - `calculator_active_calls`
//! - `calculator_call_duration_seconds{method}`
//!
//! Metrics are exposed at `/metrics` on the health server port.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;

use crate::domain::session::{ErrorKind, SessionState, StreamSession};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Safe to call more than once; later calls return the first handle. If
/// another global recorder is already installed, the handle renders nothing.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let recorder = PrometheusBuilder::new().build_recorder();
            let handle = recorder.handle();
            if let Err(e) = metrics::set_global_recorder(recorder) {
                tracing::warn!(error = %e, "Prometheus recorder not installed");
            }

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

fn register_metrics() {
    describe_counter!(
        "calculator_calls_started_total",
        "Total calls opened, by method and call shape"
    );
    describe_counter!(
        "calculator_calls_finished_total",
        "Total calls terminated, by method and outcome"
    );
    describe_counter!(
        "calculator_messages_received_total",
        "Total request messages received"
    );
    describe_counter!(
        "calculator_messages_sent_total",
        "Total response messages sent"
    );
    describe_gauge!("calculator_active_calls", "Number of calls in flight");
    describe_histogram!(
        "calculator_call_duration_seconds",
        "Wall time from call open to termination"
    );
}

// =============================================================================
// Call Outcome
// =============================================================================

/// How a call terminated, as a metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    /// Completed normally.
    Ok,
    /// Terminated by an error of the given kind.
    Failed(ErrorKind),
}

impl CallOutcome {
    /// Label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Failed(kind) => kind.as_str(),
        }
    }

    /// Outcome of a session. A session dropped before reaching a terminal
    /// state was abandoned by its caller and counts as cancelled.
    #[must_use]
    pub const fn of(state: SessionState) -> Self {
        match state {
            SessionState::Closed => Self::Ok,
            SessionState::Failed(kind) => Self::Failed(kind),
            SessionState::Open | SessionState::Closing => Self::Failed(ErrorKind::Cancelled),
        }
    }
}

// =============================================================================
// Call Statistics
// =============================================================================

/// Process-wide call counters for the health endpoint.
#[derive(Debug, Default)]
pub struct CallStats {
    active: AtomicU64,
    started: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`CallStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CallStatsSnapshot {
    /// Calls in flight.
    pub active: u64,
    /// Calls opened since start.
    pub started: u64,
    /// Calls closed normally.
    pub succeeded: u64,
    /// Calls terminated by an error.
    pub failed: u64,
}

impl CallStats {
    /// Create zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            active: AtomicU64::new(0),
            started: AtomicU64::new(0),
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Current values.
    #[must_use]
    pub fn snapshot(&self) -> CallStatsSnapshot {
        CallStatsSnapshot {
            active: self.active.load(Ordering::Relaxed),
            started: self.started.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// Per-Call Recording
// =============================================================================

/// Records one call's metrics: opened on creation, finished on drop.
///
/// Drop it after the session reached its terminal state; a session still open
/// at that point is recorded as cancelled.
pub struct CallRecorder {
    stats: Arc<CallStats>,
    session: Arc<StreamSession>,
    started_at: Instant,
}

impl CallRecorder {
    /// Record that `session` opened.
    #[must_use]
    pub fn start(stats: Arc<CallStats>, session: Arc<StreamSession>) -> Self {
        let method = session.method();
        counter!(
            "calculator_calls_started_total",
            "method" => method,
            "shape" => session.shape().as_str()
        )
        .increment(1);
        gauge!("calculator_active_calls").increment(1.0);

        stats.started.fetch_add(1, Ordering::Relaxed);
        stats.active.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            call_id = %session.id(),
            method,
            shape = session.shape().as_str(),
            "Call opened"
        );

        Self {
            stats,
            session,
            started_at: Instant::now(),
        }
    }

    /// The recorded session.
    #[must_use]
    pub fn session(&self) -> &Arc<StreamSession> {
        &self.session
    }
}

impl Drop for CallRecorder {
    fn drop(&mut self) {
        let session = &self.session;
        let method = session.method();
        let outcome = CallOutcome::of(session.state());
        let elapsed = self.started_at.elapsed();

        counter!(
            "calculator_calls_finished_total",
            "method" => method,
            "outcome" => outcome.as_str()
        )
        .increment(1);
        counter!("calculator_messages_received_total", "method" => method)
            .increment(session.received());
        counter!("calculator_messages_sent_total", "method" => method).increment(session.sent());
        histogram!("calculator_call_duration_seconds", "method" => method)
            .record(elapsed.as_secs_f64());
        gauge!("calculator_active_calls").decrement(1.0);

        self.stats.active.fetch_sub(1, Ordering::Relaxed);
        if outcome == CallOutcome::Ok {
            self.stats.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
        }

        tracing::info!(
            call_id = %session.id(),
            method,
            outcome = outcome.as_str(),
            received = session.received(),
            sent = session.sent(),
            elapsed_ms = elapsed.as_millis(),
            "Call finished"
        );
    }
}

// =============================================================================
// Tests
// =============================================================================
