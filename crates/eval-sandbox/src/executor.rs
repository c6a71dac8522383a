//! Judge0 HTTP client, grounded on `original_source`'s
//! `app/application/workers/judge_worker.py::_execute_task` (language id
//! dispatch, per-case actual/expected comparison, max time/memory
//! aggregation across cases) and `infrastructure/judge0/utils.py::clean_code`
//! (markdown-fence stripping before submission).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use eval_domain::{Error, Result};

use crate::task::{CaseOutcome, ExecutionResult, Task};

/// Judge0's well-known language ids for the handful of languages this
/// domain's problems are authored in.
fn language_id(language: &str) -> Option<u32> {
    match language.to_lowercase().as_str() {
        "python" | "python3" => Some(71),
        "cpp" | "c++" => Some(54),
        "c" => Some(50),
        "java" => Some(62),
        "javascript" | "js" | "nodejs" => Some(63),
        "go" => Some(60),
        "rust" => Some(73),
        _ => None,
    }
}

/// Strip a surrounding markdown code fence if the whole submission is
/// wrapped in one — ported from `clean_code`'s fence-stripping branch (the
/// escaped-newline unescaping in the original targets a JSON transport quirk
/// that doesn't apply to this executor's typed `Task::code` field).
pub fn clean_code(code: &str) -> String {
    let trimmed = code.trim();
    if let Some(body) = trimmed.strip_prefix("```") {
        if let Some(body) = body.strip_suffix("```") {
            let body = body.trim_start();
            let body = match body.split_once('\n') {
                Some((first_line, rest)) if !first_line.trim().is_empty() && !first_line.contains(' ') => rest,
                _ => body,
            };
            return body.trim().to_string();
        }
    }
    trimmed.to_string()
}

#[derive(Serialize)]
struct SubmissionRequest<'a> {
    language_id: u32,
    source_code: &'a str,
    stdin: &'a str,
    cpu_time_limit: f64,
    memory_limit: u64,
}

#[derive(Deserialize)]
struct SubmissionResponse {
    stdout: Option<String>,
    stderr: Option<String>,
    compile_output: Option<String>,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    memory: Option<u64>,
    status: JudgeStatus,
}

#[derive(Deserialize)]
struct JudgeStatus {
    id: u32,
}

/// Executes `Task`s against a Judge0-compatible REST API, or (when no
/// `base_url` is configured) a deterministic in-process stub used in tests
/// and local development without a sandbox deployment.
pub struct Judge0Executor {
    client: reqwest::Client,
    base_url: Option<String>,
    api_key: Option<String>,
}

impl Judge0Executor {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: Some(base_url.into()),
            api_key,
        }
    }

    /// A stub executor that "runs" code by checking whether it's non-empty
    /// and echoing each test case's expected output back as actual output —
    /// good enough to exercise the queue/polling machinery without a live
    /// Judge0 deployment.
    pub fn stub() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: None,
            api_key: None,
        }
    }

    pub async fn run(&self, task: &Task) -> Result<ExecutionResult> {
        let Some(base_url) = &self.base_url else {
            return Ok(self.run_stub(task));
        };

        let language_id = language_id(&task.language)
            .ok_or_else(|| Error::SandboxFailure(format!("unsupported language: {}", task.language)))?;
        let code = clean_code(&task.code);

        if task.test_cases.is_empty() {
            let resp = self
                .submit_one(base_url, language_id, &code, "", task.cpu_time_limit_sec, task.memory_limit_mb)
                .await?;
            return Ok(ExecutionResult {
                succeeded: resp.status.id == 3,
                cases: Vec::new(),
                execution_time_sec: resp.time.as_deref().and_then(|t| t.parse().ok()),
                memory_used_mb: resp.memory.map(|kb| kb as f64 / 1024.0),
                stdout: resp.stdout.unwrap_or_default(),
                stderr: resp
                    .stderr
                    .or(resp.compile_output)
                    .unwrap_or_default(),
            });
        }

        let mut cases = Vec::with_capacity(task.test_cases.len());
        let mut max_time = 0.0_f64;
        let mut max_memory_kb = 0_u64;
        let mut last_stderr = String::new();

        for case in &task.test_cases {
            let resp = self
                .submit_one(
                    base_url,
                    language_id,
                    &code,
                    &case.input,
                    task.cpu_time_limit_sec,
                    task.memory_limit_mb,
                )
                .await?;
            let actual = resp.stdout.clone().unwrap_or_default().trim().to_string();
            let passed = resp.status.id == 3 && actual == case.expected.trim();
            if let Some(t) = resp.time.as_deref().and_then(|t| t.parse::<f64>().ok()) {
                max_time = max_time.max(t);
            }
            if let Some(m) = resp.memory {
                max_memory_kb = max_memory_kb.max(m);
            }
            if !passed {
                last_stderr = resp.stderr.or(resp.compile_output).unwrap_or_default();
            }
            cases.push(CaseOutcome {
                passed,
                actual_output: actual,
                expected_output: case.expected.clone(),
            });
        }

        let succeeded = cases.iter().all(|c| c.passed);
        Ok(ExecutionResult {
            succeeded,
            cases,
            execution_time_sec: Some(max_time),
            memory_used_mb: Some(max_memory_kb as f64 / 1024.0),
            stdout: String::new(),
            stderr: last_stderr,
        })
    }

    async fn submit_one(
        &self,
        base_url: &str,
        language_id: u32,
        code: &str,
        stdin: &str,
        cpu_time_limit: f64,
        memory_limit_mb: u64,
    ) -> Result<SubmissionResponse> {
        let url = format!("{}/submissions?base64_encoded=false&wait=true", base_url.trim_end_matches('/'));
        let body = SubmissionRequest {
            language_id,
            source_code: code,
            stdin,
            cpu_time_limit,
            memory_limit: memory_limit_mb * 1024,
        };

        let mut req = self.client.post(url).json(&body).timeout(Duration::from_secs(
            (cpu_time_limit * 2.0).max(5.0) as u64,
        ));
        if let Some(key) = &self.api_key {
            req = req.header("X-RapidAPI-Key", key);
        }

        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(e.to_string())
            } else {
                Error::SandboxFailure(e.to_string())
            }
        })?;

        if !resp.status().is_success() {
            return Err(Error::SandboxFailure(format!("judge0 returned {}", resp.status())));
        }

        resp.json::<SubmissionResponse>()
            .await
            .map_err(|e| Error::SandboxFailure(format!("invalid judge0 response: {e}")))
    }

    fn run_stub(&self, task: &Task) -> ExecutionResult {
        if task.code.trim().is_empty() {
            return ExecutionResult {
                succeeded: false,
                cases: Vec::new(),
                execution_time_sec: None,
                memory_used_mb: None,
                stdout: String::new(),
                stderr: "empty submission".into(),
            };
        }
        let cases: Vec<CaseOutcome> = task
            .test_cases
            .iter()
            .map(|c| CaseOutcome {
                passed: true,
                actual_output: c.expected.clone(),
                expected_output: c.expected.clone(),
            })
            .collect();
        ExecutionResult {
            succeeded: true,
            cases,
            execution_time_sec: Some(0.05),
            memory_used_mb: Some(8.0),
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eval_domain::problem::TestCase;

    #[test]
    fn clean_code_strips_fenced_block() {
        let code = "```python\nprint(1)\n```";
        assert_eq!(clean_code(code), "print(1)");
    }

    #[test]
    fn clean_code_leaves_plain_code_untouched() {
        assert_eq!(clean_code("print(1)"), "print(1)");
    }

    #[tokio::test]
    async fn stub_executor_reports_success_for_nonempty_code() {
        let executor = Judge0Executor::stub();
        let task = Task::new("print(1)", "python").with_test_cases(vec![TestCase {
            input: "".into(),
            expected: "1".into(),
            description: String::new(),
        }]);
        let result = executor.run(&task).await.unwrap();
        assert!(result.succeeded);
        assert_eq!(result.cases_passed(), 1);
    }

    #[tokio::test]
    async fn stub_executor_fails_empty_submission() {
        let executor = Judge0Executor::stub();
        let task = Task::new("   ", "python");
        let result = executor.run(&task).await.unwrap();
        assert!(!result.succeeded);
    }
}
