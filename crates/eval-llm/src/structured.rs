//! Structured-output extraction, ported from `original_source`'s
//! `structured_output_parser.py::extract_json_from_content` (spec.md §4.B,
//! §9 Design Notes: "Implement the three-step parse ... plus a
//! provider-native fallback").

use serde::de::DeserializeOwned;
use serde_json::Value;

use eval_domain::{Error, Result};

use crate::traits::LlmProvider;

static FENCED_JSON: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();

fn fenced_json_re() -> &'static regex::Regex {
    FENCED_JSON.get_or_init(|| {
        regex::Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("valid regex")
    })
}

static FIRST_BRACE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();

fn first_brace_re() -> &'static regex::Regex {
    FIRST_BRACE.get_or_init(|| regex::Regex::new(r"(?s)\{.*\}").expect("valid regex"))
}

/// Step 1-3 of the three-step parse: fenced block, then first `{...}` match,
/// then the whole trimmed body. Returns `None` if none of the three yield
/// valid JSON, mirroring `extract_json_from_content` returning `None`.
pub fn extract_json(content: &str) -> Option<Value> {
    if content.is_empty() {
        return None;
    }

    if let Some(caps) = fenced_json_re().captures(content) {
        if let Ok(value) = serde_json::from_str(&caps[1]) {
            return Some(value);
        }
    }

    if let Some(m) = first_brace_re().find(content) {
        if let Ok(value) = serde_json::from_str(m.as_str()) {
            return Some(value);
        }
    }

    if let Ok(value) = serde_json::from_str(content.trim()) {
        return Some(value);
    }

    None
}

/// Parse `content` into `T`, falling back to a provider-native structured
/// request (`fallback`) when the three-step extraction fails or the JSON
/// doesn't validate against `T`. Mirrors `parse_structured_output`'s
/// fallback branch, but the fallback here is always async (this domain has
/// no synchronous provider path to special-case).
pub async fn parse_structured<T, F, Fut>(content: &str, fallback: F) -> Result<T>
where
    T: DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    if let Some(value) = extract_json(content) {
        match serde_json::from_value::<T>(value) {
            Ok(parsed) => return Ok(parsed),
            Err(e) => {
                tracing::warn!(error = %e, "structured output failed schema validation, retrying via fallback");
            }
        }
    } else {
        tracing::warn!(
            preview = %content.chars().take(200).collect::<String>(),
            "no JSON found in structured output, retrying via fallback"
        );
    }
    fallback().await
}

/// Provider-native fallback: ask the provider again with an explicit
/// json-mode request and parse the reply directly (no further fallback —
/// persistent failure surfaces `Transient`, per spec.md §8 boundary
/// behavior).
pub async fn provider_native_fallback<T: DeserializeOwned>(
    provider: &dyn LlmProvider,
    mut req: crate::traits::ChatRequest,
) -> Result<T> {
    req.json_mode = true;
    let resp = provider.chat(req).await?;
    serde_json::from_str(resp.content.trim())
        .map_err(|e| Error::Transient(format!("provider-native structured fallback failed: {e}")))
}
