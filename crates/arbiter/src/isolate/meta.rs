//! Meta file parsing for isolate
//!
//! Parses the meta file produced by isolate after a run. The meta file is
//! the authoritative source of time, memory, exit code and status for
//! verdict classification.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;

use crate::isolate::IsolateError;
use crate::types::ExecutionStatus;

/// Error that occurs during meta file parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("meta file parse error at line {line_number}: {message} (line: {line:?})")]
pub struct MetaParseError {
    /// Line number (1-indexed) where the error occurred
    pub line_number: usize,
    /// The problematic line content
    pub line: String,
    /// Description of the error
    pub message: String,
}

/// Parsed meta file from Isolate
#[derive(Debug, Clone, Default)]
pub struct MetaFile {
    /// Raw key-value pairs from the meta file
    pub entries: HashMap<String, String>,
}

impl MetaFile {
    /// Parse meta file content from a string
    ///
    /// This is a lenient parser that skips malformed lines. For strict parsing
    /// that reports errors, use [`try_parse`](Self::try_parse).
    pub fn parse(content: &str) -> Self {
        let mut entries = HashMap::new();

        // Meta-file entries are key-value pairs separated by colons
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some((key, value)) = line.split_once(':') {
                let key = key.trim();
                // The value is everything after the first colon; values may
                // themselves contain colons (e.g. messages)
                let value = value.trim();
                if !key.is_empty() {
                    entries.insert(key.to_string(), value.to_string());
                }
            }
        }

        Self { entries }
    }

    /// Parse meta file content with strict error handling
    ///
    /// Returns an error if any line is malformed (non-empty but missing colon).
    /// Empty lines are ignored.
    pub fn try_parse(content: &str) -> Result<Self, MetaParseError> {
        let mut entries = HashMap::new();

        for (line_idx, line) in content.lines().enumerate() {
            let line_number = line_idx + 1;
            let trimmed = line.trim();

            if trimmed.is_empty() {
                continue;
            }

            match trimmed.split_once(':') {
                Some((key, value)) => {
                    let key = key.trim();
                    let value = value.trim();

                    if key.is_empty() {
                        return Err(MetaParseError {
                            line_number,
                            line: line.to_string(),
                            message: "empty key before colon".to_string(),
                        });
                    }

                    entries.insert(key.to_string(), value.to_string());
                }
                None => {
                    return Err(MetaParseError {
                        line_number,
                        line: line.to_string(),
                        message: "missing colon separator".to_string(),
                    });
                }
            }
        }

        Ok(Self { entries })
    }

    /// Load and parse a meta file from disk
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, IsolateError> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Ok(Self::parse(&content))
    }

    /// Load and parse a meta file from disk with strict error handling
    pub async fn try_load(path: impl AsRef<Path>) -> Result<Self, IsolateError> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::try_parse(&content).map_err(|e| IsolateError::MetaParseFailed(e.to_string()))
    }

    /// Synthetic meta record for a run the supervisory timer had to kill.
    /// Produced when isolate itself hangs and never writes a meta file.
    pub fn synthetic_timeout(wall_time: f64) -> Self {
        let mut entries = HashMap::new();
        entries.insert("status".to_string(), "TO".to_string());
        entries.insert("time".to_string(), format!("{wall_time:.3}"));
        entries.insert("time-wall".to_string(), format!("{wall_time:.3}"));
        entries.insert(
            "message".to_string(),
            "supervisor killed a hung sandbox".to_string(),
        );
        Self { entries }
    }

    /// Get a string value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Get a float value
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// Get an integer value
    pub fn get_i32(&self, key: &str) -> Option<i32> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// Get an unsigned integer value
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// Get the execution status. A meta file without a `status` key means
    /// the run completed normally.
    pub fn status(&self) -> ExecutionStatus {
        self.get("status")
            .map(ExecutionStatus::from_isolate_status)
            .unwrap_or(ExecutionStatus::Ok)
    }

    /// Get the CPU time used in seconds
    pub fn time(&self) -> f64 {
        self.get_f64("time").unwrap_or(0.0)
    }

    /// Get the wall clock time used in seconds
    pub fn wall_time(&self) -> f64 {
        self.get_f64("time-wall").unwrap_or(0.0)
    }

    /// Get the peak resident memory in kilobytes
    pub fn memory(&self) -> u64 {
        self.get_u64("max-rss").unwrap_or(0)
    }

    /// Get the exit code
    pub fn exit_code(&self) -> Option<i32> {
        self.get_i32("exitcode")
    }

    /// Get the signal that killed the process
    pub fn signal(&self) -> Option<i32> {
        self.get_i32("exitsig")
    }

    /// Get the message from isolate
    pub fn message(&self) -> Option<String> {
        self.get("message").map(String::from)
    }
}
