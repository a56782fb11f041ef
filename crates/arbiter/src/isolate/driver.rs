//! Sandbox driver: box lifecycle and supervised execution
//!
//! Wraps the isolate binary for one box: cleanup-then-init (with retries
//! on mount races), source writes, supervised `--run` invocations, and
//! best-effort teardown.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::isolate::IsolateError;
use crate::isolate::command::{IsolateAction, IsolateCommand};
use crate::isolate::meta::MetaFile;

/// Cap on how much of out.txt / err.txt is read back per run
const MAX_CAPTURE_BYTES: u64 = 64 * 1024;

/// Attempts for the cleanup-then-init cycle
const INIT_ATTEMPTS: u32 = 3;

/// Delay between init attempts
const INIT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// File names inside the box directory
const INPUT_FILE: &str = "input.txt";
const STDOUT_FILE: &str = "out.txt";
const STDERR_FILE: &str = "err.txt";
const META_FILE: &str = "meta.txt";

/// Raw result of one isolate run: captured stdio plus the parsed meta
/// record. Classification into a verdict happens a layer up.
#[derive(Debug, Clone)]
pub struct RawRun {
    /// Captured stdout, truncated to a safe cap
    pub stdout: String,

    /// Captured stderr, truncated to a safe cap
    pub stderr: String,

    /// Parsed meta record for the run
    pub meta: MetaFile,
}

/// An initialized isolate box
///
/// # Cleanup
///
/// Always call [`cleanup()`](Self::cleanup) before dropping. The `Drop`
/// implementation attempts best-effort teardown via a spawned thread so a
/// panicking or cancelled task cannot leak a box, but that path may not
/// complete before process exit.
#[derive(Debug)]
pub struct Sandbox {
    /// Box ID
    id: u32,

    /// Root directory for this box (`<root>/<id>`)
    root_path: PathBuf,

    /// Writable box directory (`<root>/<id>/box`)
    box_path: PathBuf,

    /// Path to the isolate binary
    isolate_path: PathBuf,

    /// Whether the box still needs teardown
    initialized: bool,
}

impl Sandbox {
    /// Initialize a box: clean stale state, then `isolate --init`.
    ///
    /// Init can fail transiently when a previous occupant's mounts are
    /// still being torn down; those failures are retried up to three
    /// times, each attempt running a full cleanup-then-init cycle.
    #[instrument(skip(isolate_path))]
    pub async fn init(id: u32, isolate_path: impl Into<PathBuf>) -> Result<Self, IsolateError> {
        let isolate_path = isolate_path.into();

        let mut attempt = 1;
        loop {
            // Stale state from a crashed run makes --init fail; always clean first
            let cleanup_args = IsolateCommand::new(&isolate_path, id)
                .action(IsolateAction::Cleanup)
                .build();
            let _ = run_isolate_binary(&cleanup_args).await;

            let init_args = IsolateCommand::new(&isolate_path, id)
                .action(IsolateAction::Init)
                .build();
            debug!(?init_args, attempt, "initializing isolate box");

            let output = run_isolate_binary(&init_args).await?;
            if output.status.success() {
                // isolate --init prints the box root directory
                let stdout = String::from_utf8_lossy(&output.stdout);
                let root_path = PathBuf::from(stdout.trim());
                let box_path = root_path.join("box");

                if !box_path.exists() {
                    return Err(IsolateError::InitFailed {
                        id,
                        message: format!("box path does not exist: {}", box_path.display()),
                    });
                }

                debug!(?box_path, "box initialized");
                return Ok(Self {
                    id,
                    root_path,
                    box_path,
                    isolate_path,
                    initialized: true,
                });
            }

            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            if attempt < INIT_ATTEMPTS && is_mount_error(&stderr) {
                warn!(id, attempt, stderr = %stderr, "init hit a mount race, retrying");
                tokio::time::sleep(INIT_RETRY_DELAY).await;
                attempt += 1;
                continue;
            }

            return Err(IsolateError::InitFailed {
                id,
                message: stderr,
            });
        }
    }

    /// Get the box ID
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Get the path to the writable box directory
    pub fn path(&self) -> &Path {
        &self.box_path
    }

    /// Get the path to the isolate binary
    pub fn isolate_path(&self) -> &Path {
        &self.isolate_path
    }

    /// Get the host path to a file inside the box
    ///
    /// Returns an error if the path contains path traversal attempts.
    pub fn file_path(&self, name: &str) -> Result<PathBuf, IsolateError> {
        if name.contains("..") || name.starts_with('/') {
            return Err(IsolateError::InvalidPath(format!(
                "path traversal not allowed: {name}"
            )));
        }
        Ok(self.box_path.join(name))
    }

    /// Write a UTF-8 source file into the box
    #[instrument(skip(self, content))]
    pub async fn write_source(&self, name: &str, content: &str) -> Result<(), IsolateError> {
        let path = self.file_path(name)?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&path, content.as_bytes()).await?;
        debug!(?path, len = content.len(), "wrote source file to box");
        Ok(())
    }

    /// Check if a file exists in the box
    pub async fn file_exists(&self, name: &str) -> Result<bool, IsolateError> {
        let path = self.file_path(name)?;
        Ok(tokio::fs::metadata(&path).await.is_ok())
    }

    /// Read the meta file for the last run. Some isolators leave the meta
    /// file in the box's parent directory rather than the box itself, so
    /// both locations are checked.
    async fn read_meta(&self) -> Result<MetaFile, IsolateError> {
        let primary = self.box_path.join(META_FILE);
        if primary.exists() {
            return MetaFile::load(&primary).await;
        }
        let fallback = self.root_path.join(META_FILE);
        if fallback.exists() {
            return MetaFile::load(&fallback).await;
        }
        Err(IsolateError::MetaMissing(self.id))
    }

    /// Clean up the box. Cleanup is best-effort: failures are logged and
    /// swallowed so teardown never masks the verdict of a run.
    #[instrument(skip(self))]
    pub async fn cleanup(&mut self) {
        if !self.initialized {
            return;
        }
        self.initialized = false;

        let args = IsolateCommand::new(&self.isolate_path, self.id)
            .action(IsolateAction::Cleanup)
            .build();
        debug!(?args, "cleaning up isolate box");

        match run_isolate_binary(&args).await {
            Ok(output) if output.status.success() => {
                debug!("box cleaned up");
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!(id = self.id, stderr = %stderr, "cleanup failed");
            }
            Err(e) => {
                warn!(id = self.id, error = %e, "cleanup spawn failed");
            }
        }
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        if self.initialized {
            // Callers should cleanup() explicitly; this path covers panics
            // and cancelled tasks so the box directory is not leaked.
            warn!(
                box_id = self.id,
                "Sandbox dropped without explicit cleanup, attempting best-effort teardown"
            );

            let isolate_path = self.isolate_path.clone();
            let id = self.id;

            std::thread::spawn(move || {
                let args = IsolateCommand::new(&isolate_path, id)
                    .action(IsolateAction::Cleanup)
                    .build();

                if let Some(program) = args.first() {
                    match std::process::Command::new(program).args(&args[1..]).output() {
                        Ok(output) if output.status.success() => {
                            debug!(box_id = id, "best-effort cleanup succeeded");
                        }
                        Ok(output) => {
                            let stderr = String::from_utf8_lossy(&output.stderr);
                            warn!(box_id = id, stderr = %stderr, "best-effort cleanup failed");
                        }
                        Err(e) => {
                            warn!(box_id = id, error = %e, "best-effort cleanup spawn failed");
                        }
                    }
                }
            });
        }
    }
}

/// Run a command in the box under the isolator, batch I/O.
///
/// Writes `input.txt` unconditionally (programs probing for EOF must see a
/// definite empty file, not a missing path), purges stale output files,
/// then runs the isolator under a supervisory wall-clock timeout. A hung
/// isolator is killed and reported as a synthetic `TO` so the caller
/// still gets a classifiable result.
#[instrument(skip(sandbox, command, stdin_text))]
pub async fn run_isolated(
    sandbox: &Sandbox,
    command: IsolateCommand,
    stdin_text: &str,
    supervision: Duration,
) -> Result<RawRun, IsolateError> {
    // Purge stale results from the previous run in this box
    for name in [STDOUT_FILE, STDERR_FILE, META_FILE] {
        let path = sandbox.file_path(name)?;
        if path.exists() {
            let _ = tokio::fs::remove_file(&path).await;
        }
    }

    let input_path = sandbox.file_path(INPUT_FILE)?;
    tokio::fs::write(&input_path, stdin_text.as_bytes()).await?;

    // stdin/stdout/stderr paths are opened by isolate relative to the box
    // working directory; the meta file is written by isolate itself and
    // takes a host path.
    let meta_path = sandbox.path().join(META_FILE);
    let command = command
        .meta_file(&meta_path)
        .stdin(INPUT_FILE)
        .stdout(STDOUT_FILE)
        .stderr(STDERR_FILE);

    let args = command.build();
    debug!(?args, "running isolate command");

    let program = args
        .first()
        .ok_or_else(|| IsolateError::CommandFailed("empty command arguments".to_string()))?;
    let mut child = Command::new(program)
        .args(&args[1..])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(IsolateError::SpawnFailed)?;

    let mut isolate_stderr_pipe = child.stderr.take();
    let supervised = async {
        let status = child.wait().await?;
        let mut isolate_stderr = String::new();
        if let Some(ref mut pipe) = isolate_stderr_pipe {
            let _ = pipe.read_to_string(&mut isolate_stderr).await;
        }
        Ok::<_, std::io::Error>((status, isolate_stderr))
    };

    let meta = match timeout(supervision, supervised).await {
        Ok(result) => {
            let (_status, isolate_stderr) = result?;
            match sandbox.read_meta().await {
                Ok(meta) => meta,
                Err(IsolateError::MetaMissing(_)) => {
                    // The isolator itself broke before producing a record
                    return Err(IsolateError::CommandFailed(isolate_stderr));
                }
                Err(e) => return Err(e),
            }
        }
        Err(_elapsed) => {
            warn!(
                id = sandbox.id(),
                timeout = ?supervision,
                "isolate run exceeded the supervisory timeout, killing"
            );
            let _ = child.kill().await;
            MetaFile::synthetic_timeout(supervision.as_secs_f64())
        }
    };

    let stdout = read_capped(&sandbox.file_path(STDOUT_FILE)?).await;
    let stderr = read_capped(&sandbox.file_path(STDERR_FILE)?).await;

    debug!(
        status = ?meta.status(),
        time = meta.time(),
        memory = meta.memory(),
        "execution complete"
    );

    Ok(RawRun {
        stdout,
        stderr,
        meta,
    })
}

/// Run the isolate binary itself (init/cleanup paths) and collect output
async fn run_isolate_binary(args: &[String]) -> Result<std::process::Output, IsolateError> {
    let program = args
        .first()
        .ok_or_else(|| IsolateError::CommandFailed("empty command arguments".to_string()))?;
    Command::new(program)
        .args(&args[1..])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(IsolateError::SpawnFailed)
}

/// Read a box output file, truncated to the capture cap. A missing file
/// reads as empty (the program may never have written to the stream).
async fn read_capped(path: &Path) -> String {
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(_) => return String::new(),
    };

    let mut buf = Vec::new();
    let mut handle = file.take(MAX_CAPTURE_BYTES);
    if handle.read_to_end(&mut buf).await.is_err() {
        return String::new();
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Init failures worth retrying: leftover mounts from a previous occupant
/// that the kernel has not released yet.
fn is_mount_error(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("mountpoint") || lower.contains("mount")
}
