//! # Relay Encoder
//!
//! Drains a normalized [`EventStream`] into the outgoing record channel.
//!
//! The sender is taken by value, so the channel closes on every path out of
//! [`relay_events`]: after the terminal record, on a write failure, and when
//! the client goes away. The bounded channel provides backpressure; the next
//! upstream event is not pulled until the previous record has been queued.

use crate::streaming::core::{create_error_record, encode_event, EventStream, StreamEvent, StreamingMetrics};
use bytes::Bytes;
use futures_util::{FutureExt, StreamExt};
use std::{convert::Infallible, panic::AssertUnwindSafe, time::Instant};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error, info, warn};

/// Message of the record written when the relay itself breaks.
pub const RELAY_FAILURE_MESSAGE: &str = "Stream processing failed";

/// Item type of the outgoing record channel.
pub type RecordSender = mpsc::Sender<Result<Bytes, Infallible>>;

/// How a relay session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// `done` record written
    Completed,
    /// `error` record written (best effort)
    Failed,
    /// Client disconnected; upstream dropped without writing anything further
    ClientDisconnected,
}

/// Relay `events` into `tx` until a terminal event or client disconnect.
pub async fn relay_events(mut events: EventStream, tx: RecordSender, request_id: &str) -> RelayOutcome {
    let started = Instant::now();
    let mut metrics = StreamingMetrics::new();

    let outcome = loop {
        let next = tokio::select! {
            biased;
            _ = tx.closed() => {
                info!(request_id, "Client disconnected, dropping upstream stream");
                break RelayOutcome::ClientDisconnected;
            }
            next = events.next() => next,
        };

        // Adapters always end with a terminal event; treat silence as completion.
        let event = next.unwrap_or_else(|| {
            warn!(request_id, "Upstream event stream ended without a terminal event");
            StreamEvent::Completion(None)
        });

        let record = match encode_event(&event) {
            Ok(record) => record,
            Err(e) => {
                error!(request_id, "Failed to encode relay record: {}", e);
                metrics.record_error();
                let _ = tx.send(Ok(create_error_record(RELAY_FAILURE_MESSAGE))).await;
                break RelayOutcome::Failed;
            }
        };

        if let StreamEvent::ContentDelta(text) = &event {
            metrics.record_chunk(text.len());
        }
        if let StreamEvent::Failure(message) = &event {
            warn!(request_id, "Relaying upstream failure: {}", message);
            metrics.record_error();
        }

        if tx.send(Ok(record)).await.is_err() {
            info!(request_id, "Client disconnected mid-write");
            break RelayOutcome::ClientDisconnected;
        }

        match event {
            StreamEvent::Completion(_) => break RelayOutcome::Completed,
            StreamEvent::Failure(_) => break RelayOutcome::Failed,
            StreamEvent::ContentDelta(_) => {}
        }
    };

    // Release the upstream connection before logging the summary
    drop(events);
    metrics.set_duration(started.elapsed().as_millis() as u64);
    debug!(
        request_id,
        outcome = ?outcome,
        chunks = metrics.total_chunks,
        bytes = metrics.total_bytes,
        errors = metrics.errors,
        duration_ms = metrics.stream_duration_ms,
        "Relay session closed"
    );

    outcome
}

/// Run [`relay_events`] on its own task.
///
/// A panic while pulling or writing is caught; a best-effort `error` record is
/// queued and the channel closes once the last sender drops. Returns `None`
/// from the join handle in that case.
pub fn spawn_relay(events: EventStream, tx: RecordSender, request_id: String) -> JoinHandle<Option<RelayOutcome>> {
    let fallback = tx.clone();
    tokio::spawn(async move {
        let relay = AssertUnwindSafe(relay_events(events, tx, &request_id)).catch_unwind();

        match relay.await {
            Ok(outcome) => {
                info!(request_id = %request_id, outcome = ?outcome, "Relay stream closed");
                Some(outcome)
            }
            Err(_) => {
                error!(request_id = %request_id, "Relay task panicked");
                let _ = fallback.try_send(Ok(create_error_record(RELAY_FAILURE_MESSAGE)));
                None
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };
    use std::time::Duration;

    async fn drain(mut rx: mpsc::Receiver<Result<Bytes, Infallible>>) -> String {
        let mut out = String::new();
        while let Some(Ok(bytes)) = rx.recv().await {
            out.push_str(std::str::from_utf8(&bytes).unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_successful_stream_then_close() {
        let events = stream::iter(vec![
            StreamEvent::ContentDelta("Hel".into()),
            StreamEvent::ContentDelta("lo".into()),
            StreamEvent::Completion(None),
        ])
        .boxed();
        let (tx, rx) = mpsc::channel(4);

        let relay = tokio::spawn(async move { relay_events(events, tx, "t1").await });
        let body = drain(rx).await;

        assert_eq!(relay.await.unwrap(), RelayOutcome::Completed);
        assert_eq!(
            body,
            "data: {\"content\":\"Hel\"}\n\ndata: {\"content\":\"lo\"}\n\ndata: {\"done\":true}\n\n"
        );
    }

    #[tokio::test]
    async fn test_failure_record_then_close() {
        let events = stream::iter(vec![
            StreamEvent::ContentDelta("partial".into()),
            StreamEvent::Failure("401 Incorrect API key provided".into()),
        ])
        .boxed();
        let (tx, rx) = mpsc::channel(4);

        let relay = tokio::spawn(async move { relay_events(events, tx, "t2").await });
        let body = drain(rx).await;

        assert_eq!(relay.await.unwrap(), RelayOutcome::Failed);
        assert!(body.ends_with("data: {\"error\":\"401 Incorrect API key provided\"}\n\n"));
    }

    #[tokio::test]
    async fn test_nothing_after_terminal() {
        let events = stream::iter(vec![
            StreamEvent::Completion(None),
            StreamEvent::ContentDelta("late".into()),
        ])
        .boxed();
        let (tx, rx) = mpsc::channel(4);

        relay_events(events, tx, "t3").await;
        assert_eq!(drain(rx).await, "data: {\"done\":true}\n\n");
    }

    #[tokio::test]
    async fn test_client_disconnect_drops_upstream() {
        struct DropFlag(Arc<AtomicBool>);
        impl Drop for DropFlag {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let dropped = Arc::new(AtomicBool::new(false));
        let guard = DropFlag(dropped.clone());
        // Upstream that never produces anything
        let events = stream::unfold(guard, |guard| async move {
            std::future::pending::<()>().await;
            Some((StreamEvent::Completion(None), guard))
        })
        .boxed();

        let (tx, rx) = mpsc::channel(4);
        let relay = tokio::spawn(async move { relay_events(events, tx, "t4").await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(rx);

        let outcome = tokio::time::timeout(Duration::from_secs(1), relay).await.unwrap().unwrap();
        assert_eq!(outcome, RelayOutcome::ClientDisconnected);
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_exhaustion_without_terminal_completes() {
        let events = stream::iter(vec![StreamEvent::ContentDelta("x".into())]).boxed();
        let (tx, rx) = mpsc::channel(4);

        assert_eq!(relay_events(events, tx, "t5").await, RelayOutcome::Completed);
        assert!(drain(rx).await.ends_with("data: {\"done\":true}\n\n"));
    }

    #[tokio::test]
    async fn test_panic_mid_stream_writes_error_then_closes() {
        let events = stream::iter(vec![StreamEvent::ContentDelta("Hel".into())])
            .chain(stream::poll_fn(|_| -> std::task::Poll<Option<StreamEvent>> {
                panic!("upstream reader blew up")
            }))
            .boxed();
        let (tx, mut rx) = mpsc::channel(4);

        let handle = spawn_relay(events, tx, "t6".to_string());

        let first = rx.recv().await.unwrap().unwrap();
        assert_eq!(&first[..], b"data: {\"content\":\"Hel\"}\n\n");
        let second = rx.recv().await.unwrap().unwrap();
        assert_eq!(&second[..], b"data: {\"error\":\"Stream processing failed\"}\n\n");
        assert!(rx.recv().await.is_none());
        assert_eq!(handle.await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_spawned_relay_reports_outcome() {
        let events = stream::iter(vec![StreamEvent::Completion(None)]).boxed();
        let (tx, rx) = mpsc::channel(4);

        let handle = spawn_relay(events, tx, "t7".to_string());

        assert_eq!(drain(rx).await, "data: {\"done\":true}\n\n");
        assert_eq!(handle.await.unwrap(), Some(RelayOutcome::Completed));
    }
}
