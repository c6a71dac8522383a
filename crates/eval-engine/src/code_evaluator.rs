//! Code Evaluator (spec.md §4.H), grounded on
//! `original_source/.../holistic_evaluator/{correctness,performance,execution}.py`'s
//! strictly-ordered two-phase flow: correctness gates performance, and a
//! failed/timed-out performance phase still reports phase-1's measurements
//! as a fallback.

use eval_domain::config::SandboxConfig;
use eval_domain::{ProblemContext, TestOutcome};
use eval_sandbox::{poll_until_done, Queue, Task};

pub struct CodeEvaluation {
    pub correctness_score: f64,
    pub performance_score: f64,
    pub test_outcomes: Vec<TestOutcome>,
    pub measured_time_sec: Option<f64>,
    pub measured_memory_mb: Option<f64>,
    pub skip_reason: Option<String>,
}

/// Run both phases for one submission. `queue` is polled at
/// `sandbox.poll_interval_ms`, capped at `sandbox.poll_cap_ms` per phase.
pub async fn evaluate(
    queue: &dyn Queue,
    code: &str,
    language: &str,
    problem: &ProblemContext,
    sandbox: &SandboxConfig,
) -> CodeEvaluation {
    let sample_cases: Vec<_> = problem
        .test_cases
        .iter()
        .take(sandbox.test_case_count.max(1))
        .cloned()
        .collect();

    let phase1_task = Task::new(code, language)
        .with_test_cases(sample_cases.clone())
        .with_limits(problem.time_limit_sec(), problem.memory_limit_mb())
        .with_meta("evaluation_type", "correctness");
    let phase1_id = queue.enqueue(phase1_task).await;
    let phase1_result = poll_until_done(queue, phase1_id, sandbox.poll_interval_ms, sandbox.poll_cap_ms).await;

    let (correctness_score, test_outcomes, phase1_time, phase1_memory) = match &phase1_result {
        Ok(result) if result.succeeded && result.cases.iter().all(|c| c.passed) && !result.cases.is_empty() => (
            100.0,
            sample_cases
                .iter()
                .zip(result.cases.iter())
                .map(|(case, outcome)| TestOutcome {
                    description: case.description.clone(),
                    passed: outcome.passed,
                })
                .collect(),
            result.execution_time_sec,
            result.memory_used_mb,
        ),
        Ok(result) => (
            0.0,
            sample_cases
                .iter()
                .zip(result.cases.iter())
                .map(|(case, outcome)| TestOutcome {
                    description: case.description.clone(),
                    passed: outcome.passed,
                })
                .collect(),
            result.execution_time_sec,
            result.memory_used_mb,
        ),
        Err(e) => {
            tracing::warn!(error = %e, "correctness phase failed or timed out");
            (0.0, Vec::new(), None, None)
        }
    };

    if correctness_score == 0.0 {
        return CodeEvaluation {
            correctness_score,
            performance_score: 0.0,
            test_outcomes,
            measured_time_sec: phase1_time,
            measured_memory_mb: phase1_memory,
            skip_reason: Some("performance skipped: correctness phase failed".into()),
        };
    }

    let phase2_task = Task::new(code, language)
        .with_limits(problem.time_limit_sec(), problem.memory_limit_mb())
        .with_meta("evaluation_type", "performance");
    let phase2_id = queue.enqueue(phase2_task).await;
    let phase2_result = poll_until_done(queue, phase2_id, sandbox.poll_interval_ms, sandbox.poll_cap_ms).await;

    let (performance_score, measured_time_sec, measured_memory_mb) = match phase2_result {
        Ok(result) => {
            let time = result.execution_time_sec.or(phase1_time);
            let memory = result.memory_used_mb.or(phase1_memory);
            let time_score = time
                .map(|t| if t < problem.time_limit_sec() { 50.0 } else { 0.0 })
                .unwrap_or(0.0);
            let memory_score = memory
                .map(|m| if m < problem.memory_limit_mb() as f64 { 50.0 } else { 0.0 })
                .unwrap_or(0.0);
            (time_score + memory_score, time, memory)
        }
        Err(e) => {
            tracing::warn!(error = %e, "performance phase failed or timed out, falling back to phase 1 measurements");
            (0.0, phase1_time, phase1_memory)
        }
    };

    CodeEvaluation {
        correctness_score,
        performance_score,
        test_outcomes,
        measured_time_sec,
        measured_memory_mb,
        skip_reason: None,
    }
}
