//! Verdict classification
//!
//! Maps (compile result, run meta, stdout, expected) to a [`Verdict`].
//! The meta record is authoritative for time, memory, exit code and
//! status; stderr only serves as a diagnostic and for spotting programs
//! that ran out of stdin.

use crate::isolate::RawRun;
use crate::judge::verdict::{
    MAX_STDERR_CHARS, MAX_STDOUT_CHARS, Verdict, VerdictStatus, truncate_chars,
};
use crate::types::ExecutionStatus;

/// Stderr markers of a program that exhausted its input rather than
/// genuinely crashing. One per supported runtime family.
const INPUT_EXHAUSTED_MARKERS: [&str; 5] = [
    "EOFError",
    "InputMismatchException",
    "NoSuchElementException",
    "EOF when reading",
    "Scanner is closed",
];

/// Normalize program output for comparison: trim each line's trailing
/// whitespace, then drop leading and trailing blank lines.
///
/// Idempotent: `normalize_output(normalize_output(x)) == normalize_output(x)`.
pub fn normalize_output(text: &str) -> String {
    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();

    let Some(start) = lines.iter().position(|line| !line.is_empty()) else {
        return String::new();
    };
    let end = lines
        .iter()
        .rposition(|line| !line.is_empty())
        .expect("a non-empty line exists");

    lines[start..=end].join("\n")
}

/// Collapse every maximal run of whitespace to a single space.
/// The lenient fallback comparison for outputs that differ only in spacing.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// How stdout compared against the expected output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputComparison {
    /// Equal after normalization
    Match,
    /// Equal only after the whitespace-collapsed fallback
    MatchCollapsed,
    /// Not equal
    Mismatch,
}

fn compare_outputs(stdout: &str, expected: &str) -> OutputComparison {
    let normalized_output = normalize_output(stdout);
    let normalized_expected = normalize_output(expected);

    if normalized_output == normalized_expected {
        return OutputComparison::Match;
    }
    if collapse_whitespace(&normalized_output) == collapse_whitespace(&normalized_expected) {
        return OutputComparison::MatchCollapsed;
    }
    OutputComparison::Mismatch
}

fn is_input_exhausted(stderr: &str) -> bool {
    INPUT_EXHAUSTED_MARKERS
        .iter()
        .any(|marker| stderr.contains(marker))
}

/// Classify the compile step. Returns a CE verdict if compilation failed,
/// None if it succeeded and the run step may proceed.
///
/// The meta status decides; compiler stderr is the diagnostic. Warnings
/// on stderr with a zero exit do not fail the build.
pub fn classify_compile(compile: &RawRun) -> Option<Verdict> {
    let meta_failed = compile.meta.status() != ExecutionStatus::Ok;
    let exit_failed =
        !compile.stderr.is_empty() && compile.meta.exit_code().is_some_and(|code| code != 0);

    if meta_failed || exit_failed {
        let mut verdict = Verdict::compile_error(&compile.stderr);
        verdict.time = compile.meta.time();
        verdict.memory = compile.meta.memory();
        verdict.exit_code = compile.meta.exit_code();
        return Some(verdict);
    }
    None
}

/// Classify the run step against the expected output.
///
/// `memory_limit` is the limit the run was subject to, in kilobytes; a
/// signal kill with memory at that limit is reported as MLE.
pub fn classify_run(run: &RawRun, expected: &str, memory_limit: Option<u64>) -> Verdict {
    let meta = &run.meta;
    let mut verdict = Verdict {
        status: VerdictStatus::InternalError,
        stdout: truncate_chars(&run.stdout, MAX_STDOUT_CHARS),
        stderr: truncate_chars(&run.stderr, MAX_STDERR_CHARS),
        time: meta.time(),
        memory: meta.memory(),
        exit_code: meta.exit_code(),
        message: None,
    };

    match meta.status() {
        ExecutionStatus::TimeLimitExceeded => {
            verdict.status = VerdictStatus::TimeLimitExceeded;
            verdict.message = meta.message();
        }
        ExecutionStatus::Signaled => {
            let at_memory_limit =
                memory_limit.is_some_and(|limit| limit > 0 && meta.memory() >= limit);
            if at_memory_limit {
                verdict.status = VerdictStatus::MemoryLimitExceeded;
            } else {
                verdict.status = VerdictStatus::RuntimeSignal;
                verdict.message = meta
                    .signal()
                    .map(|sig| format!("killed by signal {sig}"))
                    .or_else(|| meta.message());
            }
        }
        ExecutionStatus::RuntimeError => {
            if is_input_exhausted(&run.stderr) {
                verdict.status = VerdictStatus::NeedsInput;
                verdict.message = Some("program expects more input than provided".to_string());
            } else {
                verdict.status = VerdictStatus::RuntimeError;
                verdict.message = meta.message();
            }
        }
        ExecutionStatus::InternalError => {
            verdict.status = VerdictStatus::InternalError;
            verdict.message = meta.message();
        }
        ExecutionStatus::Ok => {
            if expected.is_empty() {
                // Nothing to compare against; report stdout verbatim
                verdict.status = VerdictStatus::Ok;
            } else {
                match compare_outputs(&run.stdout, expected) {
                    OutputComparison::Match => {
                        verdict.status = VerdictStatus::Accepted;
                    }
                    OutputComparison::MatchCollapsed => {
                        verdict.status = VerdictStatus::Accepted;
                        verdict.message =
                            Some("accepted after whitespace-insensitive comparison".to_string());
                    }
                    OutputComparison::Mismatch => {
                        verdict.status = VerdictStatus::WrongAnswer;
                    }
                }
            }
        }
    }

    verdict
}


#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;
    use crate::isolate::MetaFile;

    fn ok_run(stdout: &str) -> RawRun {
        RawRun {
            stdout: stdout.to_string(),
            stderr: String::new(),
            meta: MetaFile::parse("time:0.01\nexitcode:0"),
        }
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(text in ".*") {
            let once = normalize_output(&text);
            prop_assert_eq!(normalize_output(&once), once);
        }

        #[test]
        fn normalize_never_panics(text in "\\PC*") {
            let _ = normalize_output(&text);
        }

        #[test]
        fn ac_iff_normalized_equal(stdout in "[a-c \n]{0,24}", expected in "[a-c \n]{1,24}") {
            // Restrict to a non-empty expected so the OK branch is not taken
            prop_assume!(!expected.is_empty());
            let verdict = classify_run(&ok_run(&stdout), &expected, None);

            let normalized_equal = normalize_output(&stdout) == normalize_output(&expected);
            match verdict.status {
                VerdictStatus::Accepted if verdict.message.is_none() => {
                    prop_assert!(normalized_equal);
                }
                VerdictStatus::Accepted => {
                    // Whitespace-collapsed fallback match
                    prop_assert!(!normalized_equal);
                }
                VerdictStatus::WrongAnswer => {
                    prop_assert!(!normalized_equal);
                }
                other => prop_assert!(false, "unexpected status {other:?}"),
            }
        }

        #[test]
        fn clean_run_is_ac_or_wa(stdout in ".{0,40}", expected in ".{1,40}") {
            prop_assume!(!expected.is_empty());
            let verdict = classify_run(&ok_run(&stdout), &expected, None);
            prop_assert!(matches!(
                verdict.status,
                VerdictStatus::Accepted | VerdictStatus::WrongAnswer
            ));
        }
    }
}
