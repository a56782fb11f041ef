//! Problem metadata boundary
//!
//! The execution core consumes problem data (test cases plus an optional
//! code wrapper) from a store it does not define. [`ProblemStore`] is
//! that seam; [`StaticProblemStore`] is the in-memory implementation used
//! by tests and the CLI.

use std::collections::HashMap;

use crate::judge::CodeWrapper;
use crate::types::TestCase;

/// Test cases and wrapper for one (problem, language) pair
#[derive(Debug, Clone, Default)]
pub struct ProblemBundle {
    /// Test cases, samples first
    pub test_cases: Vec<TestCase>,

    /// Harness snippets for the requested language, if the problem has any
    pub execution_wrapper: Option<CodeWrapper>,
}

/// Source of problem metadata.
///
/// Returns `None` when either the problem or the language is unknown;
/// the transport layer turns that into its not-found response before the
/// execution core is involved.
pub trait ProblemStore: Send + Sync {
    fn get_tests_and_execution(
        &self,
        problem_slug: &str,
        language: &str,
    ) -> impl Future<Output = Option<ProblemBundle>> + Send;
}

/// One problem's stored data
#[derive(Debug, Clone, Default)]
pub struct ProblemDefinition {
    /// Test cases in authoring order
    pub test_cases: Vec<TestCase>,

    /// Language tags this problem accepts
    pub languages: Vec<String>,

    /// Per-language harness snippets
    pub wrappers: HashMap<String, CodeWrapper>,
}

/// In-memory problem store
#[derive(Debug, Clone, Default)]
pub struct StaticProblemStore {
    problems: HashMap<String, ProblemDefinition>,
}

impl StaticProblemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a problem
    pub fn insert(&mut self, slug: impl Into<String>, definition: ProblemDefinition) {
        self.problems.insert(slug.into(), definition);
    }
}

impl ProblemStore for StaticProblemStore {
    async fn get_tests_and_execution(
        &self,
        problem_slug: &str,
        language: &str,
    ) -> Option<ProblemBundle> {
        let problem = self.problems.get(problem_slug)?;
        if !problem.languages.iter().any(|tag| tag == language) {
            return None;
        }

        // Samples first, authoring order otherwise
        let mut test_cases = problem.test_cases.clone();
        test_cases.sort_by_key(|tc| !tc.is_sample);

        Some(ProblemBundle {
            test_cases,
            execution_wrapper: problem.wrappers.get(language).cloned(),
        })
    }
}
