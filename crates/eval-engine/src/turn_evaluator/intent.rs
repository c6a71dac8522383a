//! Intent classification post-processing (spec.md §4.F stage 1), ported
//! from `original_source/.../turn_evaluator/analysis.py::intent_analysis`'s
//! priority tables and first-turn FOLLOW_UP guard.

use eval_domain::Intent;

/// Whether `text` carries an `<Role>` or `<Content>` marker, case-insensitive
/// (ported from `analysis.py::has_role_content_tags`).
pub fn has_role_content_tags(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("<role>") || lower.contains("<content>")
}

fn priority(intent: Intent, is_first_turn: bool, has_role_content: bool) -> u32 {
    if has_role_content && matches!(intent, Intent::SystemPrompt | Intent::RuleSetting) {
        return 0;
    }
    if is_first_turn {
        match intent {
            Intent::SystemPrompt => 1,
            Intent::RuleSetting => 2,
            Intent::Generation => 3,
            Intent::Optimization => 4,
            Intent::Debugging => 5,
            Intent::TestCase => 6,
            Intent::HintOrQuery => 7,
            Intent::FollowUp => 999,
        }
    } else {
        match intent {
            Intent::Generation => 1,
            Intent::Optimization => 2,
            Intent::Debugging => 3,
            Intent::TestCase => 4,
            Intent::RuleSetting => 5,
            Intent::SystemPrompt => 6,
            Intent::HintOrQuery => 7,
            Intent::FollowUp => 8,
        }
    }
}

/// Resolve a (possibly multi-valued) raw intent list into the single
/// intent the turn is scored against, applying the turn-1 FOLLOW_UP guard
/// and the priority tables (spec.md §4.F stage 1, items i-iii).
///
/// `candidates` must be non-empty; an empty list is a caller bug, not a
/// recoverable input (the intent-classification-failure sentinel is
/// handled one layer up, by substituting `[HintOrQuery]` before calling
/// this function at all).
pub fn resolve(candidates: &[Intent], turn: u32, message: &str) -> Intent {
    assert!(!candidates.is_empty(), "resolve requires at least one candidate intent");

    let is_first_turn = turn == 1;
    let has_role_content = has_role_content_tags(message);

    let mut candidates: Vec<Intent> = candidates.to_vec();
    if is_first_turn {
        candidates.retain(|i| *i != Intent::FollowUp);
        if candidates.is_empty() {
            return if has_role_content {
                Intent::SystemPrompt
            } else {
                Intent::RuleSetting
            };
        }
    }

    candidates
        .into_iter()
        .min_by_key(|i| priority(*i, is_first_turn, has_role_content))
        .expect("non-empty after the turn-1 guard")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_role_and_content_tags_case_insensitively() {
        assert!(has_role_content_tags("<Role>expert</Role>"));
        assert!(has_role_content_tags("<CONTENT>rules</content>"));
        assert!(!has_role_content_tags("plain text"));
    }

    #[test]
    fn first_turn_follow_up_falls_back_to_rule_setting() {
        let resolved = resolve(&[Intent::FollowUp], 1, "진행해봐");
        assert_eq!(resolved, Intent::RuleSetting);
    }

    #[test]
    fn first_turn_follow_up_falls_back_to_system_prompt_with_role_tag() {
        let resolved = resolve(&[Intent::FollowUp], 1, "<Role>you are an expert</Role>");
        assert_eq!(resolved, Intent::SystemPrompt);
    }

    #[test]
    fn first_turn_prefers_system_prompt_over_generation() {
        let resolved = resolve(&[Intent::Generation, Intent::SystemPrompt], 1, "hello");
        assert_eq!(resolved, Intent::SystemPrompt);
    }

    #[test]
    fn later_turn_prefers_generation_over_rule_setting() {
        let resolved = resolve(&[Intent::RuleSetting, Intent::Generation], 5, "implement this");
        assert_eq!(resolved, Intent::Generation);
    }

    #[test]
    fn later_turn_role_content_tag_promotes_rule_setting_over_generation() {
        let resolved = resolve(
            &[Intent::Generation, Intent::RuleSetting],
            5,
            "<Content>use pseudo code</Content>",
        );
        assert_eq!(resolved, Intent::RuleSetting);
    }

    #[test]
    fn single_candidate_passes_through_unchanged() {
        assert_eq!(resolve(&[Intent::Debugging], 3, "fix this bug"), Intent::Debugging);
    }
}
