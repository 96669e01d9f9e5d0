//! Pacing tests for the send loop, run on a paused tokio clock.

mod common;

use std::time::Duration;

use bulk_notify::core::{EligibilityPolicy, Message, OperationStatus};
use futures::future::join_all;
use tokio::time::Instant;

use common::*;

fn message() -> Message {
    Message::custom("Reminder", "Your assignment is due soon")
}

#[tokio::test(start_paused = true)]
async fn test_sends_are_spaced_by_delay() {
    let transport = ScriptedTransport::new();
    let orchestrator = orchestrator(transport.clone());
    let start = Instant::now();

    let submission = orchestrator
        .submit(
            numbered_recipients(3),
            message(),
            &EligibilityPolicy::default(),
            Duration::from_secs(2),
        )
        .unwrap();
    // Submission never waits on the send loop.
    assert_eq!(start.elapsed(), Duration::ZERO);

    let report = submission.handle.join().await.unwrap();
    assert_eq!(report.status, OperationStatus::Completed);
    assert!(start.elapsed() >= Duration::from_secs(4));

    let instants = transport.call_instants();
    assert_eq!(instants.len(), 3);
    assert_eq!(instants[0] - start, Duration::ZERO);
    for pair in instants.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_secs(2));
    }
}

#[tokio::test(start_paused = true)]
async fn test_zero_delay_sends_back_to_back() {
    let transport = ScriptedTransport::new();
    let orchestrator = orchestrator(transport.clone());
    let start = Instant::now();

    let submission = orchestrator
        .submit(
            numbered_recipients(5),
            message(),
            &EligibilityPolicy::default(),
            Duration::ZERO,
        )
        .unwrap();
    submission.handle.join().await.unwrap();

    assert_eq!(transport.calls().len(), 5);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_operations_are_paced_independently() {
    let transport = ScriptedTransport::new();
    let orchestrator = orchestrator(transport.clone());
    let start = Instant::now();

    let handles: Vec<_> = (0..3)
        .map(|_| {
            orchestrator
                .submit(
                    numbered_recipients(3),
                    message(),
                    &EligibilityPolicy::default(),
                    Duration::from_secs(2),
                )
                .unwrap()
                .handle
        })
        .collect();

    let reports = join_all(handles.into_iter().map(|h| h.join())).await;
    for report in reports {
        assert_eq!(report.unwrap().sent, 3);
    }

    // Three sequential runs would take 12s; concurrent ones overlap.
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(4));
    assert!(elapsed < Duration::from_secs(6));
    assert_eq!(transport.calls().len(), 9);
}
