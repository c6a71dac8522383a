//! Layer 1 (deterministic) guardrail screen, ported from
//! `original_source/app/domain/langgraph/nodes/intent_analyzer.py::quick_answer_detection`.
//! No LLM call — a normalized-lowercase keyword/context scan that can only
//! ever return a BLOCKED verdict or `None` (pass-through to Layer 2).

use eval_domain::BlockReason;

const DIRECT_ANSWER_PATTERNS: &[&str] = &[
    "정답 코드",
    "정답 알려줘",
    "답 코드",
    "완성된 코드",
    "핵심 코드",
    "로직 전체",
    "점화식 알려줘",
    "재귀 구조",
    "핵심 로직",
    "dp[x][vis]",
    "점화식은",
    "재귀는",
    "알고리즘 전체",
    "complete solution",
    "answer code",
    "entire code",
    "whole solution",
    "complete algorithm",
    "recurrence relation",
    "dp formula",
];

const HINT_KEYWORDS: &[&str] = &[
    "힌트", "가이드", "방향", "수립", "어떻게", "학습", "hint", "guide", "direction",
];

const DIRECT_ANSWER_KEYWORDS: &[&str] = &[
    "알려줘", "알려", "뭐야", "뭐", "정답", "tell me", "what is", "show me",
];

const ANSWER_RELATED_KEYWORDS: &[&str] = &[
    "점화식",
    "recurrence",
    "재귀",
    "로직",
    "알고리즘",
    "solution",
    "code",
];

/// (pattern, required-prior-turn-keyword-set) pairs; a context-sensitive
/// request is only allowed through if one of the recent turns contains a
/// keyword from the matching set (the user is confirming an edit to code
/// they already negotiated, not fishing for it fresh).
const CONTEXT_SENSITIVE_PATTERNS: &[(&str, &[&str])] = &[
    (
        "전체 코드",
        &["코드 작성", "코드 생성", "코드를 작성", "코드를 생성", "작성해주신 코드", "write the code", "generate code", "code generation"],
    ),
    (
        "full code",
        &["코드 작성", "코드 생성", "코드를 작성", "코드를 생성", "작성해주신 코드", "write the code", "generate code", "code generation"],
    ),
    (
        "whole code",
        &["코드 작성", "코드 생성", "코드를 작성", "코드를 생성", "작성해주신 코드", "write the code", "generate code", "code generation"],
    ),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer1Block {
    pub block_reason: BlockReason,
    pub reasoning: String,
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Screen `message` against the fixed patterns. `recent_turns` is the last
/// (up to 3) prior turn texts, oldest first; `problem_keywords` are the
/// problem's `keyword_block_list` (spec.md §3 Problem Context).
pub fn screen(message: &str, recent_turns: &[String], problem_keywords: &[String]) -> Option<Layer1Block> {
    let lower = message.to_lowercase();
    let has_hint = contains_any(&lower, HINT_KEYWORDS);
    let has_direct_answer_kw = contains_any(&lower, DIRECT_ANSWER_KEYWORDS);

    // 1. Fixed direct-answer patterns, unless a hint keyword co-occurs.
    if contains_any(&lower, DIRECT_ANSWER_PATTERNS) && !has_hint {
        return Some(Layer1Block {
            block_reason: BlockReason::DirectAnswer,
            reasoning: "direct solution request pattern detected".into(),
        });
    }

    // 2. "recurrence relation" context: block only if asked for directly,
    //    not when framed as a hint request.
    if (lower.contains("점화식") || lower.contains("recurrence")) && has_direct_answer_kw && !has_hint {
        return Some(Layer1Block {
            block_reason: BlockReason::DirectAnswer,
            reasoning: "direct recurrence-relation request, no hint framing".into(),
        });
    }

    // 3. Context-sensitive "full code" requests: only allowed if the user
    //    previously asked for code generation in the last 3 turns.
    let recent_window: Vec<&str> = {
        let start = recent_turns.len().saturating_sub(3);
        recent_turns[start..].iter().map(String::as_str).collect()
    };
    for (pattern, code_gen_keywords) in CONTEXT_SENSITIVE_PATTERNS {
        if !lower.contains(pattern) {
            continue;
        }
        let prior_code_generation = recent_window
            .iter()
            .any(|turn| contains_any(&turn.to_lowercase(), code_gen_keywords));
        if !prior_code_generation {
            return Some(Layer1Block {
                block_reason: BlockReason::DirectAnswer,
                reasoning: "full-code request with no prior code-generation turn".into(),
            });
        }
    }

    // 4. Problem-specific keyword + answer-related-keyword combination.
    for keyword in problem_keywords {
        if !lower.contains(&keyword.to_lowercase()) {
            continue;
        }
        let has_answer_related = contains_any(&lower, ANSWER_RELATED_KEYWORDS);
        if (has_answer_related || has_direct_answer_kw) && !has_hint {
            return Some(Layer1Block {
                block_reason: BlockReason::DirectAnswer,
                reasoning: format!("problem-specific keyword '{keyword}' combined with an answer-seeking term"),
            });
        }
    }

    None
}
