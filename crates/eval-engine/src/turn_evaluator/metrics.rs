//! Deterministic reference metrics computed over the user's prompt before
//! the rubric model call (spec.md §4.F stage 2: "the model is told not to
//! score on raw counts but to use them as corroboration"). Ported from the
//! prompt-metric computation scattered across
//! `original_source/.../turn_evaluator/evaluators.py`, collapsed into one
//! pure function since none of these counts need the LLM.

use eval_domain::ProblemContext;

static CODE_BLOCK: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
static XML_TAG: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
static CONSTRAINT: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
static BACK_REFERENCE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();

fn code_block_re() -> &'static regex::Regex {
    CODE_BLOCK.get_or_init(|| regex::Regex::new(r"```").expect("valid regex"))
}

fn xml_tag_re() -> &'static regex::Regex {
    XML_TAG.get_or_init(|| regex::Regex::new(r"<[^>]+>").expect("valid regex"))
}

fn constraint_re() -> &'static regex::Regex {
    // Constraint-expression markers: comparisons, "~ 이하/이상", "must/should".
    CONSTRAINT.get_or_init(|| {
        regex::Regex::new(r"(?i)(<=|>=|<|>|이하|이상|반드시|해야|must|should|constraint)")
            .expect("valid regex")
    })
}

fn back_reference_re() -> &'static regex::Regex {
    // References to something already established in a prior turn.
    BACK_REFERENCE.get_or_init(|| {
        regex::Regex::new(r"(?i)(이전|아까|위에서|그거|그것|그 코드|방금|앞서|previous|earlier|that code|above)")
            .expect("valid regex")
    })
}

/// Reference-only numeric metrics handed to the rubric prompt alongside the
/// user's message, never used to compute the score directly.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct PromptMetrics {
    pub word_count: usize,
    pub sentence_count: usize,
    pub code_block_count: usize,
    pub xml_tag_count: usize,
    pub constraint_count: usize,
    pub back_reference_count: usize,
    pub tech_term_count: usize,
}

/// Split on whitespace; good enough for a reference count, not a scoring
/// primitive.
fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Count sentence-ending punctuation (`.`, `!`, `?`, and the Korean
/// equivalents `다.`/`요.` are already covered by `.`); at least 1 for any
/// non-empty text.
fn sentence_count(text: &str) -> usize {
    let count = text.chars().filter(|c| matches!(c, '.' | '!' | '?')).count();
    if count == 0 && !text.trim().is_empty() {
        1
    } else {
        count
    }
}

fn tech_term_count(text: &str, problem: &ProblemContext) -> usize {
    let lower = text.to_lowercase();
    problem
        .key_algorithms
        .iter()
        .filter(|term| lower.contains(&term.to_lowercase()))
        .count()
}

pub fn compute(text: &str, problem: &ProblemContext) -> PromptMetrics {
    PromptMetrics {
        word_count: word_count(text),
        sentence_count: sentence_count(text),
        code_block_count: code_block_re().find_iter(text).count() / 2,
        xml_tag_count: xml_tag_re().find_iter(text).count(),
        constraint_count: constraint_re().find_iter(text).count(),
        back_reference_count: back_reference_re().find_iter(text).count(),
        tech_term_count: tech_term_count(text, problem),
    }
}
