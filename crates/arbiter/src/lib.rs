//! Online-judge execution core.
//!
//! Arbiter accepts a submitted program plus a set of test cases, runs
//! each test in a hardened sandbox backed by IOI Isolate, and streams
//! per-test verdicts in input order.
//!
//! # Features
//!
//! - **Sandboxed execution** — pooled box lifecycle for running untrusted
//!   code under resource limits, with supervised teardown on every path.
//! - **Multi-language** — a TOML-backed registry of compiled and
//!   interpreted languages (Python, C, C++, Java, Go, JavaScript,
//!   TypeScript out of the box).
//! - **Verdict classification** — meta-file driven AC/WA/CE/RE/TLE/MLE/
//!   RTE/IE/OK/NEEDS_INPUT outcomes with whitespace-tolerant comparison.
//! - **Streaming runner** — concurrent test execution with an ordered
//!   server-sent-events style event stream and aggregate summary.

pub use config::{Config, ConfigError, EXAMPLE_CONFIG, Language};
pub use isolate::{
    BoxLease, BoxPool, IsolateError, MetaFile, PoolStats, RawRun, Sandbox,
};
pub use judge::{
    CodeWrapper, Judge, RunCounts, RunSummary, StreamEvent, TestExecutor, Verdict,
    VerdictStatus, sse_frame, stream_execution, wrap,
};
pub use problems::{ProblemBundle, ProblemDefinition, ProblemStore, StaticProblemStore};
pub use types::{ExecutionMode, ExecutionStatus, MountConfig, ResourceLimits, TestCase};

pub mod config;
pub mod isolate;
pub mod judge;
pub mod problems;
pub mod types;
