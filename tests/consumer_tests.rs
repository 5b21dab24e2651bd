//! # Client Consumer Tests
//!
//! Feeds in-memory byte streams to the consumer: slow producers, arbitrary
//! read boundaries, malformed records and cancellation.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use playground_relay::{
    consume_stream,
    streaming::{create_content_record, create_done_record, create_error_record},
    CancelHandle, ConsumeOutcome, StreamSession, TokenUsage,
};
use std::{
    convert::Infallible,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Endless producer emitting one content record every `interval`.
fn slow_stream(interval: Duration, dropped: Arc<AtomicBool>) -> impl Stream<Item = Result<Bytes, Infallible>> {
    stream::unfold((0u32, DropFlag(dropped)), move |(n, guard)| async move {
        tokio::time::sleep(interval).await;
        let record = format!("data: {{\"content\":\"tok{} \"}}\n\n", n);
        Some((Ok(Bytes::from(record)), (n + 1, guard)))
    })
}

fn byte_at_a_time(text: &str) -> impl Stream<Item = Result<Bytes, Infallible>> {
    let bytes: Vec<_> = text.bytes().map(|b| Ok(Bytes::copy_from_slice(&[b]))).collect();
    stream::iter(bytes)
}

#[tokio::test]
async fn test_cancel_mid_stream_closes_connection() {
    let dropped = Arc::new(AtomicBool::new(false));
    let body = slow_stream(Duration::from_millis(20), dropped.clone());

    let cancel = CancelHandle::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let mut session = StreamSession::new("llama-3.3-70b-versatile");
    session.is_streaming = true;
    let outcome = tokio::time::timeout(Duration::from_secs(2), consume_stream(body, &mut session, &cancel))
        .await
        .unwrap();

    assert_eq!(outcome, ConsumeOutcome::Cancelled);
    assert!(session.error.is_none(), "cancellation is not an error");
    assert!(session.response.starts_with("tok0 "));
    assert!(dropped.load(Ordering::SeqCst), "producer must be dropped on cancel");
}

#[tokio::test]
async fn test_cancel_after_terminal_is_noop() {
    let mut session = StreamSession::default();
    let cancel = CancelHandle::new();
    let body = stream::iter(vec![
        Ok::<_, Infallible>(create_content_record("done already").unwrap()),
        Ok(create_done_record(None).unwrap()),
    ]);

    let outcome = consume_stream(body, &mut session, &cancel).await;
    let snapshot = session.clone();
    cancel.cancel();
    cancel.cancel();

    assert_eq!(outcome, ConsumeOutcome::Completed);
    assert_eq!(session, snapshot);
    assert!(session.error.is_none());
}

#[tokio::test]
async fn test_records_split_at_every_byte() {
    let text = "data: {\"content\":\"héllo \"}\n\ndata: {\"content\":\"wörld 🌍\"}\n\ndata: {\"done\":true}\n\n";
    let mut session = StreamSession::default();

    let outcome = consume_stream(byte_at_a_time(text), &mut session, &CancelHandle::new()).await;

    assert_eq!(outcome, ConsumeOutcome::Completed);
    assert_eq!(session.response, "héllo wörld 🌍");
}

#[tokio::test]
async fn test_malformed_record_skipped() {
    let body = stream::iter(vec![Ok::<_, Infallible>(Bytes::from_static(
        b"data: {\"content\":\"a\"}\n\ndata: {oops}\n\n: keep-alive\n\ndata: {\"content\":\"b\"}\n\ndata: {\"done\":true}\n\n",
    ))]);
    let mut session = StreamSession::default();

    let outcome = consume_stream(body, &mut session, &CancelHandle::new()).await;

    assert_eq!(outcome, ConsumeOutcome::Completed);
    assert_eq!(session.response, "ab");
    assert!(session.error.is_none());
}

#[tokio::test]
async fn test_encoder_output_decodes_to_same_session() {
    let usage = TokenUsage {
        prompt_tokens: 3,
        completion_tokens: 4,
        total_tokens: 7,
    };
    let records = vec![
        create_content_record("line one\n").unwrap(),
        create_content_record("\"quoted\"\n\nline three").unwrap(),
        create_done_record(Some(usage)).unwrap(),
    ];
    let body = stream::iter(records.into_iter().map(Ok::<_, Infallible>));
    let mut session = StreamSession::default();

    consume_stream(body, &mut session, &CancelHandle::new()).await;

    assert_eq!(session.response, "line one\n\"quoted\"\n\nline three");
    assert_eq!(session.usage, Some(usage));
}

#[tokio::test]
async fn test_error_record_ends_stream() {
    let body = stream::iter(vec![
        Ok::<_, Infallible>(create_content_record("partial").unwrap()),
        Ok(create_error_record("Upstream stream aborted")),
        Ok(create_content_record("ignored").unwrap()),
    ]);
    let mut session = StreamSession::default();

    let outcome = consume_stream(body, &mut session, &CancelHandle::new()).await;

    assert_eq!(outcome, ConsumeOutcome::Failed);
    assert_eq!(session.response, "partial");
    assert_eq!(session.error.as_deref(), Some("Upstream stream aborted"));
}

#[tokio::test]
async fn test_two_sessions_progress_independently() {
    let left_body = stream::iter(vec![
        Ok::<_, Infallible>(create_content_record("left").unwrap()),
        Ok(create_done_record(None).unwrap()),
    ]);
    let right_body = stream::iter(vec![Ok::<_, Infallible>(create_error_record("401 Incorrect API key provided"))])
        .chain(stream::pending());

    let cancel = CancelHandle::new();
    let mut left = StreamSession::default();
    let mut right = StreamSession::default();

    let (left_outcome, right_outcome) = tokio::join!(
        consume_stream(left_body, &mut left, &cancel),
        consume_stream(right_body, &mut right, &cancel),
    );

    assert_eq!(left_outcome, ConsumeOutcome::Completed);
    assert_eq!(right_outcome, ConsumeOutcome::Failed);
    assert_eq!(left.response, "left");
    assert!(left.error.is_none());
    assert_eq!(right.error.as_deref(), Some("401 Incorrect API key provided"));
}

#[tokio::test]
async fn test_content_on_done_record_is_kept() {
    let body = stream::iter(vec![Ok::<_, Infallible>(Bytes::from_static(
        b"data: {\"content\":\"Hel\"}\n\ndata: {\"content\":\"lo\",\"done\":true}\n\n",
    ))]);
    let mut session = StreamSession::default();

    let outcome = consume_stream(body, &mut session, &CancelHandle::new()).await;

    assert_eq!(outcome, ConsumeOutcome::Completed);
    assert_eq!(session.response, "Hello");
    assert!(session.error.is_none());
}

#[tokio::test]
async fn test_content_on_error_record_is_kept() {
    let body = stream::iter(vec![Ok::<_, Infallible>(Bytes::from_static(
        b"data: {\"content\":\"partial\",\"error\":\"boom\"}\n\n",
    ))]);
    let mut session = StreamSession::default();

    let outcome = consume_stream(body, &mut session, &CancelHandle::new()).await;

    assert_eq!(outcome, ConsumeOutcome::Failed);
    assert_eq!(session.response, "partial");
    assert_eq!(session.error.as_deref(), Some("boom"));
}
