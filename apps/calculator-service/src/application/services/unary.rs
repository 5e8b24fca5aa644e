//! Unary Call Handler
//!
//! One request, one response. The deadline-aware variant simulates a fixed
//! amount of work and gives up as soon as the caller's deadline passes or the
//! call is cancelled.

use std::time::Duration;

use crate::domain::session::{CallError, StreamSession};

/// Simulated work performed before answering a deadline-aware call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedWork {
    /// Number of waiting steps.
    pub steps: u32,
    /// Duration of one step.
    pub step: Duration,
}

impl BoundedWork {
    /// Total time the work takes when nothing interrupts it.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.step.saturating_mul(self.steps)
    }
}

impl Default for BoundedWork {
    fn default() -> Self {
        Self {
            steps: 3,
            step: Duration::from_secs(1),
        }
    }
}

/// Answer a unary call with `compute`.
pub fn respond<T>(
    session: &StreamSession,
    compute: impl FnOnce() -> Result<T, CallError>,
) -> Result<T, CallError> {
    session.record_received();
    let result = session.context().check().and_then(|()| compute());
    if result.is_ok() {
        session.record_sent();
    }
    session.finish(result)
}

/// Answer a unary call with `compute` after performing `work`.
///
/// The call context is checked before every step and the steps themselves
/// wake up early on cancellation or deadline, so a call never produces a
/// result after its abort was detected.
pub async fn respond_after_work<T>(
    session: &StreamSession,
    work: BoundedWork,
    compute: impl FnOnce() -> Result<T, CallError>,
) -> Result<T, CallError> {
    session.record_received();
    let ctx = session.context();

    let result = async {
        for step in 0..work.steps {
            ctx.check()?;
            tracing::trace!(call_id = %session.id(), step, "Working");
            ctx.sleep(work.step).await?;
        }
        ctx.check()?;
        compute()
    }
    .await;

    if let Err(err) = &result {
        tracing::debug!(
            call_id = %session.id(),
            kind = %err.kind(),
            elapsed_ms = session.elapsed().as_millis(),
            "Bounded work aborted"
        );
    } else {
        session.record_sent();
    }
    session.finish(result)
}
