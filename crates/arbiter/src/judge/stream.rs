//! Streaming test runner
//!
//! Runs many tests concurrently against the same code and emits an
//! ordered event stream: one `start`, one event per test in input order,
//! one `complete`. Completion order is decoupled from emission order by
//! per-index slots flushed as contiguous prefixes finish.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::judge::execute::Judge;
use crate::judge::verdict::{Verdict, VerdictStatus};
use crate::types::{ExecutionMode, TestCase};

/// Channel depth before the emitter suspends on a slow consumer
const EVENT_BUFFER: usize = 16;

/// Executes one test case; the seam between the streaming runner and the
/// sandbox-backed judge, so ordering logic is testable with scripted
/// executors.
pub trait TestExecutor: Send + Sync + 'static {
    fn execute(
        &self,
        language: &str,
        code: &str,
        test: &TestCase,
    ) -> impl Future<Output = Verdict> + Send;
}

impl TestExecutor for Judge {
    async fn execute(&self, language: &str, code: &str, test: &TestCase) -> Verdict {
        self.execute_code(language, code, &test.input, &test.expected)
            .await
    }
}

/// Aggregate result of a submit-mode run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Percentage of passed tests, rounded to two decimals
    pub success_rate: f64,
}

impl RunSummary {
    fn new(total: usize, passed: usize, failed: usize) -> Self {
        let success_rate = if total > 0 {
            (passed as f64 / total as f64 * 10000.0).round() / 100.0
        } else {
            0.0
        };
        Self {
            total,
            passed,
            failed,
            success_rate,
        }
    }
}

/// One event of the streaming protocol.
///
/// The `type` tags and field names are stable protocol surface.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Emitted once, before any test event
    Start { total: usize },

    /// Per-test result in submit mode
    Test {
        index: usize,
        is_sample: bool,
        status: VerdictStatus,
        time: f64,
        memory: u64,
        stdout: String,
        stderr: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        expected: String,
        is_accepted: bool,
        /// Tests completed so far, including this one
        progress: usize,
        passed: usize,
        failed: usize,
    },

    /// Per-test result in custom-run mode
    Custom {
        index: usize,
        status: VerdictStatus,
        time: f64,
        memory: u64,
        stdout: String,
        stderr: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Fatal condition; the stream terminates after this event
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
        message: String,
    },

    /// A single custom run hit the end of its input feed
    NeedsInput { index: usize, message: String },

    /// Emitted once, after every test event
    Complete {
        #[serde(skip_serializing_if = "Option::is_none")]
        summary: Option<RunSummary>,
    },
}

/// Frame an event for a server-sent-events stream
pub fn sse_frame(event: &StreamEvent) -> String {
    let json = serde_json::to_string(event).expect("stream events serialize to JSON");
    format!("data: {json}\n\n")
}

/// Run every test case against `code` and stream ordered events.
///
/// Tests are dispatched concurrently (bounded by the executor's box
/// pool), but events follow test-case input order. Dropping the receiver
/// cancels the run: in-flight executions are aborted and their boxes
/// reclaimed by the sandbox teardown guards.
pub fn stream_execution<E: TestExecutor>(
    executor: Arc<E>,
    language: impl Into<String>,
    code: impl Into<String>,
    test_cases: Vec<TestCase>,
    mode: ExecutionMode,
) -> mpsc::Receiver<StreamEvent> {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    tokio::spawn(drive(
        executor,
        language.into(),
        code.into(),
        test_cases,
        mode,
        tx,
    ));
    rx
}

async fn drive<E: TestExecutor>(
    executor: Arc<E>,
    language: String,
    code: String,
    mut tests: Vec<TestCase>,
    mode: ExecutionMode,
    tx: mpsc::Sender<StreamEvent>,
) {
    if tests.is_empty() {
        match mode {
            // A bare custom run still executes once with empty input
            ExecutionMode::CustomRun => tests.push(TestCase::default()),
            ExecutionMode::Submit => {
                let _ = tx.send(StreamEvent::Start { total: 0 }).await;
                let _ = tx
                    .send(StreamEvent::Error {
                        index: None,
                        message: "no test cases available for submission".to_string(),
                    })
                    .await;
                let _ = tx
                    .send(StreamEvent::Complete {
                        summary: Some(RunSummary::new(0, 0, 0)),
                    })
                    .await;
                return;
            }
        }
    }

    let total = tests.len();
    if tx.send(StreamEvent::Start { total }).await.is_err() {
        return;
    }

    // One child per test; the pool's acquire suspends surplus children,
    // so in-flight work is bounded by pool capacity
    let mut children: JoinSet<(usize, TestCase, Verdict)> = JoinSet::new();
    for (index, test) in tests.into_iter().enumerate() {
        let executor = Arc::clone(&executor);
        let language = language.clone();
        let code = code.clone();
        children.spawn(async move {
            let verdict = executor.execute(&language, &code, &test).await;
            (index, test, verdict)
        });
    }

    let mut slots: BTreeMap<usize, (TestCase, Verdict)> = BTreeMap::new();
    let mut next = 0usize;
    let mut passed = 0usize;
    let mut failed = 0usize;

    while let Some(joined) = children.join_next().await {
        let (index, test, verdict) = match joined {
            Ok(completed) => completed,
            Err(e) => {
                // A panicked child cannot be attributed to an index, so the
                // whole batch terminates
                warn!(error = %e, "test task failed, terminating stream");
                let _ = tx
                    .send(StreamEvent::Error {
                        index: None,
                        message: "internal error: test task failed".to_string(),
                    })
                    .await;
                return;
            }
        };

        debug!(index, status = %verdict.status, "test completed");
        slots.insert(index, (test, verdict));

        // Flush the contiguous prefix in input order
        while let Some((test, verdict)) = slots.remove(&next) {
            let index = next;
            next += 1;

            match mode {
                ExecutionMode::CustomRun => {
                    if verdict.status == VerdictStatus::NeedsInput {
                        // Interactive programs are unsupported; cut the stream
                        let _ = tx
                            .send(StreamEvent::Error {
                                index: Some(index),
                                message: "program is waiting for input".to_string(),
                            })
                            .await;
                        return;
                    }
                    let event = StreamEvent::Custom {
                        index,
                        status: verdict.status,
                        time: verdict.time,
                        memory: verdict.memory,
                        stdout: verdict.stdout,
                        stderr: verdict.stderr,
                        exit_code: verdict.exit_code,
                        message: verdict.message,
                    };
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
                ExecutionMode::Submit => {
                    if verdict.is_accepted() {
                        passed += 1;
                    } else {
                        failed += 1;
                    }
                    let is_accepted = verdict.is_accepted();
                    let event = StreamEvent::Test {
                        index,
                        is_sample: test.is_sample,
                        status: verdict.status,
                        time: verdict.time,
                        memory: verdict.memory,
                        stdout: verdict.stdout,
                        stderr: verdict.stderr,
                        exit_code: verdict.exit_code,
                        message: verdict.message,
                        expected: test.expected,
                        is_accepted,
                        progress: passed + failed,
                        passed,
                        failed,
                    };
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
            }
        }
    }

    let summary = match mode {
        ExecutionMode::Submit => Some(RunSummary::new(total, passed, failed)),
        ExecutionMode::CustomRun => None,
    };
    let _ = tx.send(StreamEvent::Complete { summary }).await;
}
