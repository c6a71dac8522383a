//! Shared application state, grounded on `sa_gateway::state::AppState`'s
//! `#[derive(Clone)]`-over-`Arc` shape, trimmed to the handful of services
//! this domain's orchestrator actually touches — no skills/MCP/tools/agent
//! registries, no dashboard or import-staging state, no admin tokens.

use std::sync::Arc;

use eval_domain::Config;
use eval_llm::LlmGateway;
use eval_sandbox::Queue;
use eval_sessions::SessionStore;

use crate::runtime::{CancelMap, SessionLockMap};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionStore>,
    pub llm: Arc<LlmGateway>,
    pub sandbox: Arc<dyn Queue>,
    pub session_locks: Arc<SessionLockMap>,
    pub cancel_map: Arc<CancelMap>,
}
