//! Verdict types
//!
//! The classified outcome of executing one test case. User-visible
//! outcomes are always verdicts, never errors; infrastructure failures
//! fold into [`VerdictStatus::InternalError`].

use serde::{Deserialize, Serialize};

/// Cap on stdout carried by a verdict
pub const MAX_STDOUT_CHARS: usize = 5000;

/// Cap on stderr carried by a verdict
pub const MAX_STDERR_CHARS: usize = 2000;

/// Classified outcome of one test execution.
///
/// The serialized literals are part of the streaming protocol and must
/// not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerdictStatus {
    /// Output matched the expected output
    #[serde(rename = "AC")]
    Accepted,

    /// Ran cleanly but output did not match
    #[serde(rename = "WA")]
    WrongAnswer,

    /// Compilation failed
    #[serde(rename = "CE")]
    CompileError,

    /// Non-zero exit
    #[serde(rename = "RE")]
    RuntimeError,

    /// CPU or wall time limit exceeded
    #[serde(rename = "TLE")]
    TimeLimitExceeded,

    /// Killed by a signal with memory at the limit
    #[serde(rename = "MLE")]
    MemoryLimitExceeded,

    /// Killed by a signal not attributable to memory
    #[serde(rename = "RTE")]
    RuntimeSignal,

    /// Infrastructure failure (isolator missing, init failure, unparsable meta)
    #[serde(rename = "IE")]
    InternalError,

    /// Ran cleanly with no expected output to compare against
    #[serde(rename = "OK")]
    Ok,

    /// Exited nonzero while complaining about exhausted stdin
    #[serde(rename = "NEEDS_INPUT")]
    NeedsInput,
}

impl VerdictStatus {
    /// The protocol literal for this status
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictStatus::Accepted => "AC",
            VerdictStatus::WrongAnswer => "WA",
            VerdictStatus::CompileError => "CE",
            VerdictStatus::RuntimeError => "RE",
            VerdictStatus::TimeLimitExceeded => "TLE",
            VerdictStatus::MemoryLimitExceeded => "MLE",
            VerdictStatus::RuntimeSignal => "RTE",
            VerdictStatus::InternalError => "IE",
            VerdictStatus::Ok => "OK",
            VerdictStatus::NeedsInput => "NEEDS_INPUT",
        }
    }
}

impl std::fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of executing one test case
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    /// Classified status
    pub status: VerdictStatus,

    /// Program stdout, truncated to [`MAX_STDOUT_CHARS`]
    pub stdout: String,

    /// Program stderr, truncated to [`MAX_STDERR_CHARS`]
    pub stderr: String,

    /// Observed CPU time in seconds
    pub time: f64,

    /// Observed peak memory in kilobytes
    pub memory: u64,

    /// Child exit code, if it exited normally
    pub exit_code: Option<i32>,

    /// Optional diagnostic (compiler output, isolator message, comparison note)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Verdict {
    /// A bare verdict with the given status and empty observables
    pub fn bare(status: VerdictStatus) -> Self {
        Self {
            status,
            stdout: String::new(),
            stderr: String::new(),
            time: 0.0,
            memory: 0,
            exit_code: None,
            message: None,
        }
    }

    /// Infrastructure failure with a diagnostic message
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::bare(VerdictStatus::InternalError)
        }
    }

    /// Compilation failure carrying the compiler diagnostics
    pub fn compile_error(compiler_output: &str) -> Self {
        let diagnostics = truncate_chars(compiler_output, MAX_STDERR_CHARS);
        Self {
            stderr: diagnostics.clone(),
            message: Some(diagnostics),
            ..Self::bare(VerdictStatus::CompileError)
        }
    }

    /// Whether this verdict counts as a passed test
    pub fn is_accepted(&self) -> bool {
        matches!(self.status, VerdictStatus::Accepted)
    }
}

/// Truncate a string to at most `max` characters, respecting char boundaries
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_literals_are_bit_exact() {
        let expected = [
            (VerdictStatus::Accepted, "AC"),
            (VerdictStatus::WrongAnswer, "WA"),
            (VerdictStatus::CompileError, "CE"),
            (VerdictStatus::RuntimeError, "RE"),
            (VerdictStatus::TimeLimitExceeded, "TLE"),
            (VerdictStatus::MemoryLimitExceeded, "MLE"),
            (VerdictStatus::RuntimeSignal, "RTE"),
            (VerdictStatus::InternalError, "IE"),
            (VerdictStatus::Ok, "OK"),
            (VerdictStatus::NeedsInput, "NEEDS_INPUT"),
        ];
        for (status, literal) in expected {
            assert_eq!(status.as_str(), literal);
            assert_eq!(status.to_string(), literal);
            assert_eq!(
                serde_json::to_string(&status).unwrap(),
                format!("\"{literal}\"")
            );
        }
    }

    #[test]
    fn status_roundtrips_through_serde() {
        let status: VerdictStatus = serde_json::from_str("\"NEEDS_INPUT\"").unwrap();
        assert_eq!(status, VerdictStatus::NeedsInput);
    }

    #[test]
    fn internal_error_carries_message() {
        let verdict = Verdict::internal_error("unsupported language");
        assert_eq!(verdict.status, VerdictStatus::InternalError);
        assert_eq!(verdict.message.as_deref(), Some("unsupported language"));
        assert!(!verdict.is_accepted());
    }

    #[test]
    fn compile_error_truncates_diagnostics() {
        let long = "e".repeat(MAX_STDERR_CHARS + 100);
        let verdict = Verdict::compile_error(&long);
        assert_eq!(verdict.status, VerdictStatus::CompileError);
        assert_eq!(verdict.stderr.chars().count(), MAX_STDERR_CHARS);
        assert_eq!(
            verdict.message.as_ref().unwrap().chars().count(),
            MAX_STDERR_CHARS
        );
    }

    #[test]
    fn is_accepted_only_for_ac() {
        assert!(Verdict::bare(VerdictStatus::Accepted).is_accepted());
        assert!(!Verdict::bare(VerdictStatus::Ok).is_accepted());
        assert!(!Verdict::bare(VerdictStatus::WrongAnswer).is_accepted());
    }

    #[test]
    fn truncate_chars_short_string_unchanged() {
        assert_eq!(truncate_chars("hello", 10), "hello");
    }

    #[test]
    fn truncate_chars_respects_char_boundaries() {
        let s = "αβγδε";
        assert_eq!(truncate_chars(s, 3), "αβγ");
    }

    #[test]
    fn verdict_serializes_without_empty_message() {
        let verdict = Verdict::bare(VerdictStatus::Ok);
        let json = serde_json::to_value(&verdict).unwrap();
        assert!(json.get("message").is_none());
        assert_eq!(json["status"], "OK");
    }
}
