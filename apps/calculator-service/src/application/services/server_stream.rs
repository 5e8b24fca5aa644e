//! Server-Streaming Handler
//!
//! Emits a produced sequence one message at a time. Items are pulled from the
//! iterator lazily, so each is sent as soon as it is computed, and the sink is
//! awaited for capacity before the next one is produced.

use std::time::Duration;

use crate::application::ports::MessageSink;
use crate::domain::session::{CallError, StreamSession};

/// Send every item of `items` through `sink`, pausing `emit_interval` after
/// each one.
///
/// Returns the number of messages sent. The caller closes the response
/// direction by dropping the sink once this returns.
pub async fn stream_items<I, S>(
    session: &StreamSession,
    items: I,
    sink: &mut S,
    emit_interval: Duration,
) -> Result<u64, CallError>
where
    I: IntoIterator,
    I::IntoIter: Send,
    I::Item: Send + 'static,
    S: MessageSink<I::Item>,
{
    session.record_received();
    let ctx = session.context();

    let result = async {
        for item in items {
            ctx.guard(sink.send(item)).await??;
            session.record_sent();
            if !emit_interval.is_zero() {
                ctx.sleep(emit_interval).await?;
            }
        }
        Ok(session.sent())
    }
    .await;

    if result.is_ok() {
        session.begin_closing();
    }
    session.finish(result)
}
