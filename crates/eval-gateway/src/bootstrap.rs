//! Subsystem construction, grounded on `sa_gateway::bootstrap::build_app_state`'s
//! sequential `Arc::new(...)` assembly with an `info!` log after each step,
//! trimmed to the handful of services this domain's `AppState` holds — no
//! skills/MCP/tools/agent registries, no workspace reader, no dashboard.

use std::sync::Arc;
use std::time::Duration;

use eval_domain::Config;
use eval_llm::{LlmGateway, OpenAiCompatProvider};
use eval_sandbox::{Judge0Executor, Queue, SandboxQueue};
use eval_sessions::durable::InMemoryDurableStore;
use eval_sessions::SessionStore;

use crate::runtime::{CancelMap, SessionLockMap};
use crate::state::AppState;

/// Build every subsystem `AppState` needs from `config`, seeding the durable
/// layer's problem catalog from `problems_dir` if one is configured — the
/// external `problem_specs` table spec.md §6 names is out of this workspace's
/// scope, but the in-memory fake needs *something* to read at `ensure_problem`
/// time for the gateway to be runnable without a real database behind it.
pub fn build_app_state(config: Arc<Config>, problems_dir: Option<&std::path::Path>) -> anyhow::Result<AppState> {
    let durable = Arc::new(InMemoryDurableStore::new());
    if let Some(dir) = problems_dir {
        let loaded = seed_problems_from_dir(&durable, dir)?;
        tracing::info!(dir = %dir.display(), count = loaded, "problem catalog seeded");
    } else {
        tracing::info!("no problems_dir configured — problem catalog starts empty");
    }

    let sessions = Arc::new(SessionStore::new(
        Duration::from_secs(config.sessions.checkpoint_ttl_seconds),
        durable,
    ));
    tracing::info!(ttl_seconds = config.sessions.checkpoint_ttl_seconds, "session store ready");

    let provider = Arc::new(OpenAiCompatProvider::from_env(
        "default",
        std::env::var("LLM_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
        "LLM_API_KEY",
    )?);
    let llm = Arc::new(LlmGateway::new(provider, (*config).clone()));
    tracing::info!(model = %config.llm.model_default, "llm gateway ready");

    let executor = if let Some(url) = &config.sandbox.judge0_api_url {
        Arc::new(Judge0Executor::new(url.clone(), config.sandbox.judge0_api_key.clone()))
    } else {
        tracing::warn!("JUDGE0_API_URL not set — sandbox executor running in stub mode");
        Arc::new(Judge0Executor::stub())
    };
    let sandbox: Arc<dyn Queue> = Arc::new(SandboxQueue::new(executor, config.sandbox.worker_count));
    tracing::info!(workers = config.sandbox.worker_count, "sandbox queue ready");

    let session_locks = Arc::new(SessionLockMap::new());
    let cancel_map = Arc::new(CancelMap::new());

    Ok(AppState {
        config,
        sessions,
        llm,
        sandbox,
        session_locks,
        cancel_map,
    })
}

fn seed_problems_from_dir(durable: &InMemoryDurableStore, dir: &std::path::Path) -> anyhow::Result<usize> {
    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(spec_id) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let raw = std::fs::read_to_string(&path)?;
        let problem: eval_domain::ProblemContext = serde_json::from_str(&raw)?;
        durable.seed_problem(spec_id.to_string(), problem);
        count += 1;
    }
    Ok(count)
}

/// Periodic maintenance, grounded on `sa_gateway::bootstrap::spawn_background_tasks`'s
/// per-concern `tokio::spawn` + `tokio::time::interval` loops, trimmed to the
/// one thing this domain's state actually accumulates garbage in: idle
/// per-session run-lock entries.
pub fn spawn_background_tasks(state: &AppState) {
    let session_locks = state.session_locks.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            session_locks.prune_idle();
            tracing::debug!(sessions = session_locks.session_count(), "pruned idle session locks");
        }
    });
}
