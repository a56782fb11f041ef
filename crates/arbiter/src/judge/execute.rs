//! Single-test executor
//!
//! Orchestrates box acquisition, sandbox initialization, the per-language
//! compile/run pipeline and verdict classification for one
//! (code, input, expected) triple.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::config::{Config, Language};
use crate::isolate::{
    BoxPool, IsolateAction, IsolateCommand, IsolateError, RawRun, Sandbox, resolve_command,
    run_isolated, validate_mounts,
};
use crate::judge::classify::{classify_compile, classify_run};
use crate::judge::verdict::{Verdict, VerdictStatus};
use crate::types::{MountConfig, ResourceLimits};

/// Snapshot of the judge's lifetime run counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunCounts {
    /// Tests executed since startup
    pub total: u64,
    /// Verdicts that passed (AC, or OK for custom runs)
    pub passed: u64,
    /// Every other verdict
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    total: AtomicU64,
    passed: AtomicU64,
    failed: AtomicU64,
}

/// Compilation gets looser limits than the submitted program: compilers
/// fork, allocate freely and take their time.
fn default_compile_limits() -> ResourceLimits {
    ResourceLimits {
        time_limit: Some(30.0),
        wall_time_limit: Some(60.0),
        memory_limit: Some(524288),
        max_processes: Some(10),
        max_output: Some(65536),
        max_open_files: Some(512),
        ..Default::default()
    }
}

/// Executes single tests against the sandbox pool
#[derive(Debug, Clone)]
pub struct Judge {
    config: Arc<Config>,
    pool: BoxPool,
    counters: Arc<Counters>,
}

impl Judge {
    /// Create a judge with a pool spanning the configured box id range
    pub fn new(config: Config) -> Self {
        let pool = BoxPool::new(config.box_min_id, config.box_max_id);
        Self::with_pool(config, pool)
    }

    /// Create a judge over an injected pool (small pools for tests,
    /// shared pools across judges)
    pub fn with_pool(config: Config, pool: BoxPool) -> Self {
        Self {
            config: Arc::new(config),
            pool,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the box pool
    pub fn pool(&self) -> &BoxPool {
        &self.pool
    }

    /// Lifetime run counters
    pub fn run_counts(&self) -> RunCounts {
        RunCounts {
            total: self.counters.total.load(Ordering::Relaxed),
            passed: self.counters.passed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Execute one test case and classify the outcome.
    ///
    /// Never returns an error: every failure mode folds into a verdict
    /// (CE at compile, IE at the sandbox boundary, WA at comparison).
    /// The acquired box is cleaned up and released on every path.
    #[instrument(skip(self, code, input, expected))]
    pub async fn execute_code(
        &self,
        language: &str,
        code: &str,
        input: &str,
        expected: &str,
    ) -> Verdict {
        let verdict = self.execute_inner(language, code, input, expected).await;

        self.counters.total.fetch_add(1, Ordering::Relaxed);
        match verdict.status {
            VerdictStatus::Accepted | VerdictStatus::Ok => {
                self.counters.passed.fetch_add(1, Ordering::Relaxed);
            }
            _ => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
        if verdict.status == VerdictStatus::InternalError {
            warn!(language, message = ?verdict.message, "internal error during execution");
        }

        verdict
    }

    async fn execute_inner(
        &self,
        language: &str,
        code: &str,
        input: &str,
        expected: &str,
    ) -> Verdict {
        // Reject bad tags before a box is even acquired
        let language = match self.config.get_language(language) {
            Ok(language) => language,
            Err(_) => return Verdict::internal_error("unsupported language"),
        };

        // Suspends under load; the pool is the back-pressure point
        let lease = match self.pool.acquire().await {
            Ok(lease) => lease,
            Err(e) => return Verdict::internal_error(format!("box acquisition failed: {e}")),
        };

        let mut sandbox = match Sandbox::init(lease.id(), self.config.isolate_binary()).await {
            Ok(sandbox) => sandbox,
            // The lease drop releases the id
            Err(e) => return Verdict::internal_error(format!("sandbox init failed: {e}")),
        };

        let verdict = self
            .run_in_sandbox(&sandbox, language, code, input, expected)
            .await;

        // Teardown runs on every path; the lease returns the id afterwards
        sandbox.cleanup().await;
        drop(lease);

        verdict
    }

    async fn run_in_sandbox(
        &self,
        sandbox: &Sandbox,
        language: &Language,
        code: &str,
        input: &str,
        expected: &str,
    ) -> Verdict {
        if let Err(e) = sandbox
            .write_source(language.file_name.as_str(), code)
            .await
        {
            return Verdict::internal_error(format!("failed to write source: {e}"));
        }

        if let Some(compile) = &language.compile {
            let limits = default_compile_limits()
                .with_overrides(compile.limits.as_ref().unwrap_or(&ResourceLimits::new()))
                .sanitized();
            let argv = language
                .compile_argv()
                .expect("compile config implies a compile argv");

            let raw = match self
                .run_step(sandbox, argv, "", &compile.env, &[], limits, language)
                .await
            {
                Ok(raw) => raw,
                Err(e) => return Verdict::internal_error(format!("compile step failed: {e}")),
            };

            debug!(
                status = ?raw.meta.status(),
                exit_code = ?raw.meta.exit_code(),
                "compilation complete"
            );

            if let Some(verdict) = classify_compile(&raw) {
                return verdict;
            }
        }

        let limits = self
            .config
            .effective_limits(language.run.limits.as_ref())
            .sanitized();
        let memory_limit = limits.memory_limit;

        let raw = match self
            .run_step(
                sandbox,
                language.run_argv(),
                input,
                &language.run.env,
                &language.run.mounts,
                limits,
                language,
            )
            .await
        {
            Ok(raw) => raw,
            Err(e) => return Verdict::internal_error(format!("run step failed: {e}")),
        };

        classify_run(&raw, expected, memory_limit)
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_step(
        &self,
        sandbox: &Sandbox,
        mut argv: Vec<String>,
        stdin_text: &str,
        env: &std::collections::HashMap<String, String>,
        mounts: &[MountConfig],
        limits: ResourceLimits,
        language: &Language,
    ) -> Result<RawRun, IsolateError> {
        // isolate execs directly, without a PATH search
        resolve_command(&mut argv)?;
        validate_mounts(mounts)?;

        let supervision = Duration::from_secs_f64(limits.supervision_timeout());
        let command = IsolateCommand::new(self.config.isolate_binary(), sandbox.id())
            .action(IsolateAction::Run)
            .limits(limits)
            .working_dir("/box")
            .env("PATH", &language.run.path)
            .envs(env.iter().map(|(k, v)| (k.clone(), v.clone())))
            .mounts(self.config.sandbox_mounts.iter().cloned())
            .mounts(mounts.iter().cloned())
            .share_net(self.config.share_net)
            .command(argv);

        run_isolated(sandbox, command, stdin_text, supervision).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_judge() -> Judge {
        // A bogus isolate path: every sandbox init fails fast, which is
        // exactly what the IE paths under test need
        let mut config = Config::default();
        config.isolate_path = Some("/definitely/not/isolate".into());
        Judge::with_pool(config, BoxPool::new(0, 3))
    }

    #[test]
    fn default_compile_limits_are_loose() {
        let limits = default_compile_limits();
        assert_eq!(limits.time_limit, Some(30.0));
        assert_eq!(limits.memory_limit, Some(524288));
        assert_eq!(limits.max_processes, Some(10));
    }

    #[tokio::test]
    async fn unknown_language_is_ie() {
        let judge = test_judge();
        let verdict = judge.execute_code("cobol", "DISPLAY 'HI'", "", "").await;
        assert_eq!(verdict.status, VerdictStatus::InternalError);
        assert_eq!(verdict.message.as_deref(), Some("unsupported language"));
    }

    #[tokio::test]
    async fn unknown_language_releases_box() {
        let judge = test_judge();
        let before = judge.pool().stats();
        let _ = judge.execute_code("cobol", "", "", "").await;
        let after = judge.pool().stats();
        assert_eq!(before, after);
        assert_eq!(after.in_use, 0);
    }

    #[tokio::test]
    async fn broken_isolate_is_ie_and_releases_box() {
        let judge = test_judge();
        let verdict = judge
            .execute_code("python", "print('hi')", "", "hi")
            .await;
        assert_eq!(verdict.status, VerdictStatus::InternalError);
        assert!(verdict.message.unwrap().contains("sandbox init failed"));
        assert_eq!(judge.pool().stats().in_use, 0);
    }

    #[tokio::test]
    async fn every_failure_path_releases_its_box() {
        // Pool of one: any leaked box would deadlock the second call
        let mut config = Config::default();
        config.isolate_path = Some("/definitely/not/isolate".into());
        let judge = Judge::with_pool(config, BoxPool::new(0, 0));

        for _ in 0..5 {
            let verdict = tokio::time::timeout(
                Duration::from_secs(5),
                judge.execute_code("python", "print(1)", "", ""),
            )
            .await
            .expect("execution must not deadlock on a leaked box");
            assert_eq!(verdict.status, VerdictStatus::InternalError);
        }
        assert_eq!(judge.pool().stats().free, 1);
    }

    #[tokio::test]
    async fn run_counts_track_outcomes() {
        let judge = test_judge();
        assert_eq!(
            judge.run_counts(),
            RunCounts {
                total: 0,
                passed: 0,
                failed: 0
            }
        );

        let _ = judge.execute_code("cobol", "", "", "").await;
        let _ = judge.execute_code("fortran", "", "", "").await;

        let counts = judge.run_counts();
        assert_eq!(counts.total, 2);
        assert_eq!(counts.passed, 0);
        assert_eq!(counts.failed, 2);
    }

    #[tokio::test]
    async fn concurrent_ie_paths_do_not_poison_the_pool() {
        let mut config = Config::default();
        config.isolate_path = Some("/definitely/not/isolate".into());
        let judge = Judge::with_pool(config, BoxPool::new(0, 1));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let judge = judge.clone();
            tasks.spawn(async move { judge.execute_code("python", "print(1)", "", "").await });
        }
        while let Some(result) = tasks.join_next().await {
            assert_eq!(result.unwrap().status, VerdictStatus::InternalError);
        }
        assert_eq!(judge.pool().stats().free, 2);
    }
}
