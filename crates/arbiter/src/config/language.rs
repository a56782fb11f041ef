use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::config::ConfigError;
use crate::types::{MountConfig, ResourceLimits};

/// Configuration for a programming language
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Language {
    /// Human-readable name for the language (e.g., "C++17 (GCC)")
    pub name: String,

    /// Source file name inside the box (e.g., "solution.cpp").
    /// Java is the special case: the file must be named after its main
    /// class, so the registry fixes it to `Solution.java`.
    pub file_name: SourceFileName,

    /// Compilation configuration (None for interpreted languages)
    #[serde(default)]
    pub compile: Option<CompileConfig>,

    /// Execution configuration
    pub run: RunConfig,
}

impl Language {
    /// Check if the language is compiled
    pub fn is_compiled(&self) -> bool {
        self.compile.is_some()
    }

    /// Name of the artifact the run command refers to: the compile
    /// output for compiled languages, the source file otherwise.
    pub fn artifact_name(&self) -> &str {
        match self.compile {
            Some(ref compile) => &compile.output_name,
            None => self.file_name.as_str(),
        }
    }

    /// Expand placeholders in the given command
    pub fn expand_command(command: &[String], source: &str, artifact: &str) -> Vec<String> {
        command
            .iter()
            .map(|arg| {
                arg.replace("{source}", source)
                    .replace("{output}", artifact)
                    .replace("{binary}", artifact)
            })
            .collect()
    }

    /// The fully expanded compile argv, if this language compiles
    pub fn compile_argv(&self) -> Option<Vec<String>> {
        self.compile.as_ref().map(|compile| {
            Self::expand_command(&compile.command, self.file_name.as_str(), &compile.output_name)
        })
    }

    /// The fully expanded run argv
    pub fn run_argv(&self) -> Vec<String> {
        Self::expand_command(&self.run.command, self.file_name.as_str(), self.artifact_name())
    }
}

/// A file name valid inside the sandbox box directory: relative, no
/// traversal components.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFileName(String);

impl SourceFileName {
    pub fn new(name: &str) -> Result<Self, ConfigError> {
        if name.is_empty() || name.contains('/') || name.contains("..") {
            return Err(ConfigError::InvalidSourceFileName(name.to_owned()));
        }
        Ok(Self(name.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for SourceFileName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SourceFileName::new(&s).map_err(|_| {
            de::Error::invalid_value(
                de::Unexpected::Str(&s),
                &"a non-empty file name without '/' or '..'",
            )
        })
    }
}

impl std::fmt::Display for SourceFileName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration for the compilation step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileConfig {
    /// Command and arguments with placeholders
    /// Placeholders: {source}, {output}
    pub command: Vec<String>,

    /// Name of the compile output the run command refers to. Lives in
    /// the same box as the source (e.g., "solution" for C, "solution.js"
    /// for TypeScript, "Solution.class" for Java).
    pub output_name: String,

    /// Environment variables to set during compilation
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Resource limits for compilation (overrides defaults)
    #[serde(default)]
    pub limits: Option<ResourceLimits>,
}

/// Default PATH for sandbox execution
pub const DEFAULT_SANDBOX_PATH: &str = "/usr/bin:/bin";

/// Configuration for the execution step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Command and arguments with placeholders
    /// Placeholders: {source}, {binary}
    pub command: Vec<String>,

    /// Environment variables to set
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Directory mounts
    #[serde(default)]
    pub mounts: Vec<MountConfig>,

    /// PATH environment variable for the sandbox
    ///
    /// Defaults to "/usr/bin:/bin" if not specified.
    #[serde(default = "default_sandbox_path")]
    pub path: String,

    /// Resource limits for execution (overrides defaults)
    #[serde(default)]
    pub limits: Option<ResourceLimits>,
}

fn default_sandbox_path() -> String {
    DEFAULT_SANDBOX_PATH.to_owned()
}


#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn source_file_name_rejects_all_strings_with_slash(s in ".*/.*") {
            prop_assert!(SourceFileName::new(&s).is_err());
        }

        #[test]
        fn source_file_name_accepts_simple_names(s in "[a-zA-Z0-9_-]+\\.[a-z]+") {
            prop_assert!(SourceFileName::new(&s).is_ok());
        }

        #[test]
        fn expand_command_preserves_args_without_placeholders(
            arg1 in "[a-z]+",
            arg2 in "[a-z]+",
            arg3 in "[a-z]+"
        ) {
            let cmd = vec![arg1.clone(), arg2.clone(), arg3.clone()];
            let result = Language::expand_command(&cmd, "source.c", "binary");
            prop_assert_eq!(&result[0], &arg1);
            prop_assert_eq!(&result[1], &arg2);
            prop_assert_eq!(&result[2], &arg3);
        }

        #[test]
        fn expand_command_length_preserved(cmd_len in 1usize..10) {
            let cmd: Vec<String> = (0..cmd_len).map(|i| format!("arg{i}")).collect();
            let result = Language::expand_command(&cmd, "source", "binary");
            prop_assert_eq!(result.len(), cmd_len);
        }
    }
}
