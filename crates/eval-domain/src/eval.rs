use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::message::Turn;

/// Classified purpose of a user prompt. Drives which rubric evaluator runs
/// and which weight vector applies (spec.md §4.F).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    SystemPrompt,
    RuleSetting,
    Generation,
    Optimization,
    Debugging,
    TestCase,
    HintOrQuery,
    FollowUp,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::SystemPrompt => "SYSTEM_PROMPT",
            Intent::RuleSetting => "RULE_SETTING",
            Intent::Generation => "GENERATION",
            Intent::Optimization => "OPTIMIZATION",
            Intent::Debugging => "DEBUGGING",
            Intent::TestCase => "TEST_CASE",
            Intent::HintOrQuery => "HINT_OR_QUERY",
            Intent::FollowUp => "FOLLOW_UP",
        }
    }
}

/// One of the five rubric dimensions scored per turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Clarity,
    Examples,
    Rules,
    Context,
    ProblemRelevance,
}

pub const ALL_CRITERIA: [Criterion; 5] = [
    Criterion::Clarity,
    Criterion::Examples,
    Criterion::Rules,
    Criterion::Context,
    Criterion::ProblemRelevance,
];

/// One scored rubric dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricEntry {
    pub criterion: Criterion,
    /// 0..=100
    pub score: f64,
    pub reasoning: String,
}

/// The guide strategy selected for a tutor reply (spec.md §4.E glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuideStrategy {
    SyntaxGuide,
    LogicHint,
    Roadmap,
    Generation,
}

/// Guardrail block reason (spec.md §4.D).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockReason {
    DirectAnswer,
    Jailbreak,
    OffTopic,
}

/// Whether a SAFE message is a chat turn or a submission request (spec.md
/// §4.D: "the filter also reports `is_submission` so the orchestrator can
/// route").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestType {
    Chat,
    Submission,
}

/// Per (session, turn) evaluation record, written by the Turn Evaluator.
/// Upsert by (session, turn) — never append-duplicated (spec.md §3 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnLog {
    pub turn: Turn,
    pub intent: Intent,
    /// 0.0..=1.0
    pub intent_confidence: f64,
    pub rubrics: Vec<RubricEntry>,
    pub weighted_score: f64,
    /// At most 3 sentences.
    pub assistant_summary: String,
    pub guardrail_failed: bool,
    pub created_at: DateTime<Utc>,
}

impl TurnLog {
    /// Build the rubric map keyed by criterion for weighted-score lookups.
    pub fn rubric_map(&self) -> HashMap<Criterion, f64> {
        self.rubrics.iter().map(|r| (r.criterion, r.score)).collect()
    }
}

/// Session-level chaining-strategy score, written once at submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolisticLog {
    pub flow_score: f64,
    pub analysis: String,
}

/// Letter grade thresholds from spec.md §4.I `submit_pipeline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_total(total: f64) -> Self {
        if total >= 90.0 {
            Grade::A
        } else if total >= 80.0 {
            Grade::B
        } else if total >= 70.0 {
            Grade::C
        } else if total >= 60.0 {
            Grade::D
        } else {
            Grade::F
        }
    }
}

/// Raw per-test-case outcome recorded for audit in the submission result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestOutcome {
    pub description: String,
    pub passed: bool,
}

/// Final per-session result, at most one per session (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub correctness_score: f64,
    pub performance_score: f64,
    pub prompt_score: f64,
    pub total_score: f64,
    pub grade: Grade,
    pub test_outcomes: Vec<TestOutcome>,
    pub measured_time_sec: Option<f64>,
    pub measured_memory_mb: Option<f64>,
    /// Populated only when performance was skipped because correctness failed.
    pub skip_reason: Option<String>,
}
