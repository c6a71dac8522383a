use serde::{Deserialize, Serialize};

/// A single hidden test case bound to a problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub expected: String,
    #[serde(default)]
    pub description: String,
}

/// Resource/time constraints for sandboxed execution, kept as a nested
/// struct (rather than flattened onto `ProblemContext`) because the
/// original system stores them that way under `problem.constraints`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Constraints {
    pub time_limit_sec: f64,
    pub memory_limit_mb: u64,
}

/// Read-only problem specification, supplied externally and held by the
/// core for the lifetime of a session (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemContext {
    pub problem_id: String,
    pub title: String,
    pub input_format: String,
    pub output_format: String,
    pub constraints: Constraints,
    pub key_algorithms: Vec<String>,
    /// Four stages, weakest hint first.
    pub hint_roadmap: [String; 4],
    pub common_pitfalls: Vec<String>,
    /// Never surfaced to the user; consumed only by the guardrail filter
    /// and, never, the tutor reply generator.
    pub canonical_solution: String,
    pub test_cases: Vec<TestCase>,
    pub keyword_block_list: Vec<String>,
}

impl ProblemContext {
    pub fn time_limit_sec(&self) -> f64 {
        self.constraints.time_limit_sec
    }

    pub fn memory_limit_mb(&self) -> u64 {
        self.constraints.memory_limit_mb
    }
}
