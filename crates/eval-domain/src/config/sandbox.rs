use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sandbox execution queue (spec.md §4.G, §6)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Judge0-compatible execution backend. `None` leaves the in-process
    /// worker pool as the only queue backend.
    #[serde(default)]
    pub judge0_api_url: Option<String>,
    #[serde(default)]
    pub judge0_api_key: Option<String>,
    /// Reserved for a future distributed queue backend. The in-process
    /// `TaskStore` is the only implementation today; this flag is carried
    /// because the original system exposes it as a deployment knob.
    #[serde(default)]
    pub use_redis_queue: bool,
    #[serde(default = "d_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "d_poll_cap_ms")]
    pub poll_cap_ms: u64,
    /// How many hidden test cases to run per submission. Spec.md leaves
    /// this an open question; default is conservative (first case only).
    #[serde(default = "d_test_case_count")]
    pub test_case_count: usize,
    #[serde(default = "d_worker_count")]
    pub worker_count: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            judge0_api_url: None,
            judge0_api_key: None,
            use_redis_queue: false,
            poll_interval_ms: d_poll_interval_ms(),
            poll_cap_ms: d_poll_cap_ms(),
            test_case_count: d_test_case_count(),
            worker_count: d_worker_count(),
        }
    }
}

fn d_poll_interval_ms() -> u64 {
    500
}
fn d_poll_cap_ms() -> u64 {
    30_000
}
fn d_test_case_count() -> usize {
    1
}
fn d_worker_count() -> usize {
    2
}
