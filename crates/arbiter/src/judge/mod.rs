//! Judging layer: verdicts, classification, and the test runners
//!
//! The sandbox layer produces raw runs; this module turns them into
//! user-visible verdicts and composes them into single-test and
//! streaming multi-test execution.

pub use crate::judge::classify::{classify_compile, classify_run, normalize_output};
pub use crate::judge::execute::{Judge, RunCounts};
pub use crate::judge::stream::{
    RunSummary, StreamEvent, TestExecutor, sse_frame, stream_execution,
};
pub use crate::judge::verdict::{
    MAX_STDERR_CHARS, MAX_STDOUT_CHARS, Verdict, VerdictStatus,
};
pub use crate::judge::wrapper::{CodeWrapper, wrap};

mod classify;
mod execute;
mod stream;
mod verdict;
mod wrapper;
