//! # Dual-Stream Coordinator
//!
//! Single and side-by-side runs over a [`RelayClient`]. Both compare sessions
//! are polled on the calling task; neither can abort or alter the other.

use crate::{
    consumer::{CancelHandle, ConsumeOutcome, RelayClient, StreamObserver, StreamSession, Tee},
    schemas::CompletionRequest,
};
use std::time::Instant;
use tracing::debug;

/// Stream `request` into `session`, also feeding `watcher`.
///
/// The response time is stamped when the `done` record arrives.
pub async fn run_single<W>(
    client: &RelayClient,
    request: &CompletionRequest,
    session: &mut StreamSession,
    watcher: &mut W,
    cancel: &CancelHandle,
) -> ConsumeOutcome
where
    W: StreamObserver + ?Sized,
{
    let started = Instant::now();
    session.begin(request.model.clone());

    let outcome = client.stream(request, &mut Tee(&mut *session, watcher), cancel).await;
    if outcome == ConsumeOutcome::Completed {
        session.response_time = Some(started.elapsed());
    }
    session.is_streaming = false;

    debug!(model = %request.model, outcome = ?outcome, "Single run finished");
    outcome
}

/// Stream `left` and `right` concurrently into their own sessions.
///
/// One cancel handle and one start instant are shared. The combined elapsed
/// time is stamped on both sessions once both have finished, whatever their
/// outcome.
pub async fn run_compare(
    client: &RelayClient,
    left: &CompletionRequest,
    right: &CompletionRequest,
    left_session: &mut StreamSession,
    right_session: &mut StreamSession,
    cancel: &CancelHandle,
) -> (ConsumeOutcome, ConsumeOutcome) {
    let started = Instant::now();
    left_session.begin(left.model.clone());
    right_session.begin(right.model.clone());

    let (left_outcome, right_outcome) = tokio::join!(
        client.stream(left, &mut *left_session, cancel),
        client.stream(right, &mut *right_session, cancel),
    );

    let elapsed = started.elapsed();
    for session in [&mut *left_session, &mut *right_session] {
        session.response_time = Some(elapsed);
        session.is_streaming = false;
    }

    debug!(
        left = %left.model,
        right = %right.model,
        left_outcome = ?left_outcome,
        right_outcome = ?right_outcome,
        elapsed_ms = elapsed.as_millis() as u64,
        "Compare run finished"
    );
    (left_outcome, right_outcome)
}
