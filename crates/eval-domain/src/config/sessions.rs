use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session store lifecycle (spec.md §3, §6)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// How long an idle session's in-memory checkpoint survives before the
    /// ephemeral store evicts it. Durable records (logs, results) are
    /// unaffected — this only bounds the in-process dialogue buffer.
    #[serde(default = "d_ttl")]
    pub checkpoint_ttl_seconds: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            checkpoint_ttl_seconds: d_ttl(),
        }
    }
}

fn d_ttl() -> u64 {
    86_400
}
