//! Streaming runner against the real sandbox

use std::sync::Arc;

use arbiter::{ExecutionMode, StreamEvent, TestCase, stream_execution};

use super::test_judge;

async fn collect(
    mut rx: tokio::sync::mpsc::Receiver<StreamEvent>,
) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

#[tokio::test]
#[ignore = "requires root"]
async fn event_order_is_preserved_under_parallelism() {
    // Every test runs the same program; test 2 sleeps the longest, so it
    // finishes last even though its event must come third
    let code = "import time\nx=int(input())\ntime.sleep(x/10)\nprint(x)";
    let tests = vec![
        TestCase::new("1", "1"),
        TestCase::new("2", "2"),
        TestCase::new("15", "15"),
        TestCase::new("3", "3"),
        TestCase::new("4", "999"), // deliberate WA
    ];

    let judge = Arc::new(test_judge());
    let rx = stream_execution(judge, "python", code, tests, ExecutionMode::Submit);
    let events = collect(rx).await;

    assert!(matches!(events.first(), Some(StreamEvent::Start { total: 5 })));
    assert!(matches!(events.last(), Some(StreamEvent::Complete { .. })));

    let indices: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Test { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);

    let ac_count = events
        .iter()
        .filter(|e| matches!(e, StreamEvent::Test { is_accepted: true, .. }))
        .count();
    match events.last().unwrap() {
        StreamEvent::Complete { summary: Some(s) } => {
            assert_eq!(s.passed, ac_count);
            assert_eq!(s.passed, 4);
            assert_eq!(s.failed, 1);
            assert_eq!(s.total, 5);
        }
        other => panic!("expected a summary, got {other:?}"),
    }
}

#[tokio::test]
#[ignore = "requires root"]
async fn custom_run_reports_stdout_per_test() {
    let code = "print(input()[::-1])";
    let tests = vec![TestCase::new("abc", ""), TestCase::new("xyz", "")];

    let judge = Arc::new(test_judge());
    let rx = stream_execution(judge, "python", code, tests, ExecutionMode::CustomRun);
    let events = collect(rx).await;

    match &events[1] {
        StreamEvent::Custom { index: 0, stdout, .. } => {
            assert_eq!(stdout.trim_end(), "cba");
        }
        other => panic!("expected custom event, got {other:?}"),
    }
    assert!(matches!(
        events.last(),
        Some(StreamEvent::Complete { summary: None })
    ));
}

#[tokio::test]
#[ignore = "requires root"]
async fn custom_run_needs_input_terminates_the_stream() {
    // input() with an empty feed raises EOFError, which classifies as
    // NEEDS_INPUT and must cut a custom-run stream with an error event
    let code = "print(input())";
    let tests = vec![TestCase::default()];

    let judge = Arc::new(test_judge());
    let rx = stream_execution(judge, "python", code, tests, ExecutionMode::CustomRun);
    let events = collect(rx).await;

    assert!(matches!(events.first(), Some(StreamEvent::Start { total: 1 })));
    match &events[1] {
        StreamEvent::Error { index, .. } => assert_eq!(*index, Some(0)),
        other => panic!("expected error event, got {other:?}"),
    }
    assert_eq!(events.len(), 2, "stream must terminate after the error");
}
