use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// CPU time limit in seconds
    #[serde(default)]
    pub time_limit: Option<f64>,

    /// Wall clock time limit in seconds
    #[serde(default)]
    pub wall_time_limit: Option<f64>,

    /// Memory limit in kilobytes
    #[serde(default)]
    pub memory_limit: Option<u64>,

    /// Stack size limit in kilobytes
    #[serde(default)]
    pub stack_limit: Option<u64>,

    /// Maximum number of processes/threads
    #[serde(default)]
    pub max_processes: Option<u32>,

    /// Maximum output file size in kilobytes
    #[serde(default)]
    pub max_output: Option<u64>,

    /// Maximum open files
    #[serde(default)]
    pub max_open_files: Option<u32>,

    /// Extra time before killing (grace period) in seconds
    #[serde(default)]
    pub extra_time: Option<f64>,
}

impl ResourceLimits {
    /// 1 kilobyte in bytes
    pub const KB: u64 = 1;
    /// 1 megabyte in kilobytes
    pub const MB: u64 = 1024;
    /// 1 gigabyte in kilobytes
    pub const GB: u64 = 1024 * 1024;

    /// Create new resource limits with all fields set to None
    pub fn new() -> Self {
        Self {
            time_limit: None,
            wall_time_limit: None,
            memory_limit: None,
            stack_limit: None,
            max_processes: None,
            max_output: None,
            max_open_files: None,
            extra_time: None,
        }
    }

    /// Set the CPU time limit in seconds
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    /// Set the wall clock time limit in seconds
    pub fn with_wall_time_limit(mut self, seconds: f64) -> Self {
        self.wall_time_limit = Some(seconds);
        self
    }

    /// Set the memory limit in kilobytes
    pub fn with_memory_limit(mut self, kb: u64) -> Self {
        self.memory_limit = Some(kb);
        self
    }

    /// Set the stack size limit in kilobytes
    pub fn with_stack_limit(mut self, kb: u64) -> Self {
        self.stack_limit = Some(kb);
        self
    }

    /// Set the maximum number of processes
    pub fn with_max_processes(mut self, count: u32) -> Self {
        self.max_processes = Some(count);
        self
    }

    /// Set the maximum output file size in kilobytes
    pub fn with_max_output(mut self, kb: u64) -> Self {
        self.max_output = Some(kb);
        self
    }

    /// Apply overrides from another ResourceLimits, preferring values from `overrides`
    ///
    /// Returns a new ResourceLimits with values from `overrides` taking precedence
    /// over values from `self` when both are present.
    pub fn with_overrides(&self, overrides: &ResourceLimits) -> ResourceLimits {
        ResourceLimits {
            time_limit: overrides.time_limit.or(self.time_limit),
            wall_time_limit: overrides.wall_time_limit.or(self.wall_time_limit),
            memory_limit: overrides.memory_limit.or(self.memory_limit),
            stack_limit: overrides.stack_limit.or(self.stack_limit),
            max_processes: overrides.max_processes.or(self.max_processes),
            max_output: overrides.max_output.or(self.max_output),
            max_open_files: overrides.max_open_files.or(self.max_open_files),
            extra_time: overrides.extra_time.or(self.extra_time),
        }
    }

    /// Enforce the invariant that the wall clock limit is strictly larger
    /// than the CPU limit. Programs that sleep would otherwise never be
    /// reaped by the CPU timer alone.
    pub fn sanitized(mut self) -> ResourceLimits {
        if let (Some(time), Some(wall)) = (self.time_limit, self.wall_time_limit)
            && wall <= time
        {
            self.wall_time_limit = Some(time + 3.0);
        }
        self
    }

    /// Wall-clock budget for the supervisory timer around one isolate
    /// invocation: the wall limit (or CPU limit when no wall limit is
    /// set) plus grace time and a fixed buffer for isolate's own setup.
    pub fn supervision_timeout(&self) -> f64 {
        let wall = self
            .wall_time_limit
            .or(self.time_limit.map(|t| t + 3.0))
            .unwrap_or(60.0);
        wall + self.extra_time.unwrap_or(0.0) + 2.0
    }
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            time_limit: Some(2.0),
            wall_time_limit: Some(5.0),
            memory_limit: Some(524288), // 512 MB
            stack_limit: Some(262144),  // 256 MB
            max_processes: Some(4),
            max_output: Some(51200), // 50 MB
            max_open_files: Some(64),
            extra_time: Some(0.5),
        }
    }
}

/// Status of one isolate run
/// Corresponds to IOI Isolate two-letter status codes; OK is implicit
/// (a meta file without a `status` key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Program exited normally
    #[serde(rename = "OK")]
    Ok,

    /// Runtime error (non-zero exit code)
    #[serde(rename = "RE")]
    RuntimeError,

    /// Time limit exceeded
    #[serde(rename = "TO")]
    TimeLimitExceeded,

    /// Program was killed by a signal
    #[serde(rename = "SG")]
    Signaled,

    /// Internal error in Isolate
    #[serde(rename = "XX")]
    InternalError,
}

impl ExecutionStatus {
    /// Parse status from isolate meta file status string
    pub fn from_isolate_status(status: &str) -> Self {
        match status {
            "OK" => ExecutionStatus::Ok,
            "RE" => ExecutionStatus::RuntimeError,
            "TO" => ExecutionStatus::TimeLimitExceeded,
            "SG" => ExecutionStatus::Signaled,
            "XX" => ExecutionStatus::InternalError,
            _ => ExecutionStatus::InternalError,
        }
    }
}

/// One test case of a submission job
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestCase {
    /// Text fed to the program's stdin
    #[serde(default)]
    pub input: String,

    /// Expected stdout; empty means "don't compare"
    #[serde(default)]
    pub expected: String,

    /// Whether this is a publicly visible sample case
    #[serde(default)]
    pub is_sample: bool,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected: expected.into(),
            is_sample: false,
        }
    }
}

/// Execution mode of a submission job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Run against user-supplied input; stdout is reported verbatim
    CustomRun,
    /// Run against graded test cases; produces AC/WA and aggregate counts
    Submit,
}

/// Configuration for a directory mount in Isolate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountConfig {
    /// Source path on the host
    pub source: String,

    /// Target path in the sandbox
    pub target: String,

    /// Whether the mount is read-write (default: read-only)
    #[serde(default)]
    pub writable: bool,

    /// Whether this mount is optional (don't fail if source doesn't exist)
    /// Maps to isolate's `:maybe` flag
    #[serde(default)]
    pub optional: bool,
}


#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn with_overrides_identity(
            time in proptest::option::of(0.0f64..1000.0),
            wall_time in proptest::option::of(0.0f64..1000.0),
            memory in proptest::option::of(0u64..1_000_000),
            stack in proptest::option::of(0u64..1_000_000),
            procs in proptest::option::of(0u32..100),
            output in proptest::option::of(0u64..1_000_000),
            open_files in proptest::option::of(0u32..1000),
            extra in proptest::option::of(0.0f64..10.0),
        ) {
            let base = ResourceLimits {
                time_limit: time,
                wall_time_limit: wall_time,
                memory_limit: memory,
                stack_limit: stack,
                max_processes: procs,
                max_output: output,
                max_open_files: open_files,
                extra_time: extra,
            };

            let result = base.with_overrides(&ResourceLimits::new());
            prop_assert_eq!(result.time_limit, base.time_limit);
            prop_assert_eq!(result.wall_time_limit, base.wall_time_limit);
            prop_assert_eq!(result.memory_limit, base.memory_limit);
            prop_assert_eq!(result.stack_limit, base.stack_limit);
            prop_assert_eq!(result.max_processes, base.max_processes);
            prop_assert_eq!(result.max_output, base.max_output);
            prop_assert_eq!(result.max_open_files, base.max_open_files);
            prop_assert_eq!(result.extra_time, base.extra_time);
        }

        #[test]
        fn with_overrides_full_override(
            base_time in proptest::option::of(0.0f64..1000.0),
            override_time in 0.0f64..1000.0,
        ) {
            let base = ResourceLimits {
                time_limit: base_time,
                ..Default::default()
            };
            let overrides = ResourceLimits {
                time_limit: Some(override_time),
                ..ResourceLimits::new()
            };

            let result = base.with_overrides(&overrides);
            prop_assert_eq!(result.time_limit, Some(override_time));
        }

        #[test]
        fn sanitized_wall_always_exceeds_cpu(
            time in 0.1f64..100.0,
            wall in 0.1f64..100.0,
        ) {
            let limits = ResourceLimits::new()
                .with_time_limit(time)
                .with_wall_time_limit(wall)
                .sanitized();
            prop_assert!(limits.wall_time_limit.unwrap() > limits.time_limit.unwrap());
        }

        #[test]
        fn execution_status_from_isolate_never_panics(status in ".*") {
            let _ = ExecutionStatus::from_isolate_status(&status);
        }
    }
}
