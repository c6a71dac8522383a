//! Sandbox task record (spec.md §4.C), grounded on
//! `sa_gateway::runtime::tasks::{Task, TaskStatus}`, collapsed to the shapes
//! this domain's code evaluator needs (no run_id/result-string — the result
//! is a typed `ExecutionResult`, and there's no user-facing cancel path so
//! `Cancelled` folds into `Failed`).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use eval_domain::problem::TestCase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Running,
    Done,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

#[derive(Debug, Clone)]
pub struct Task {
    pub task_id: Uuid,
    pub code: String,
    pub language: String,
    pub test_cases: Vec<TestCase>,
    pub cpu_time_limit_sec: f64,
    pub memory_limit_mb: u64,
    pub meta: HashMap<String, String>,
}

impl Task {
    pub fn new(code: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            code: code.into(),
            language: language.into(),
            test_cases: Vec::new(),
            cpu_time_limit_sec: 1.0,
            memory_limit_mb: 128,
            meta: HashMap::new(),
        }
    }

    pub fn with_test_cases(mut self, test_cases: Vec<TestCase>) -> Self {
        self.test_cases = test_cases;
        self
    }

    pub fn with_limits(mut self, cpu_time_limit_sec: f64, memory_limit_mb: u64) -> Self {
        self.cpu_time_limit_sec = cpu_time_limit_sec;
        self.memory_limit_mb = memory_limit_mb;
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}

/// Outcome of a single test case run, when the task carried any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseOutcome {
    pub passed: bool,
    pub actual_output: String,
    pub expected_output: String,
}

/// Result of running a `Task`. `execution_time_sec`/`memory_used_mb` are
/// `None` when the run never started (e.g. queue timeout).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub succeeded: bool,
    pub cases: Vec<CaseOutcome>,
    pub execution_time_sec: Option<f64>,
    pub memory_used_mb: Option<f64>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionResult {
    pub fn cases_passed(&self) -> usize {
        self.cases.iter().filter(|c| c.passed).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Done.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }

    #[test]
    fn builder_sets_limits_and_meta() {
        let task = Task::new("print(1)", "python")
            .with_limits(2.0, 256)
            .with_meta("evaluation_type", "correctness");
        assert_eq!(task.cpu_time_limit_sec, 2.0);
        assert_eq!(task.memory_limit_mb, 256);
        assert_eq!(task.meta.get("evaluation_type").unwrap(), "correctness");
    }

    #[test]
    fn cases_passed_counts_only_passing() {
        let result = ExecutionResult {
            succeeded: true,
            cases: vec![
                CaseOutcome {
                    passed: true,
                    actual_output: "1".into(),
                    expected_output: "1".into(),
                },
                CaseOutcome {
                    passed: false,
                    actual_output: "2".into(),
                    expected_output: "1".into(),
                },
            ],
            execution_time_sec: Some(0.1),
            memory_used_mb: Some(10.0),
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(result.cases_passed(), 1);
    }
}
