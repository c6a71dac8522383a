use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::eval::{Criterion, Intent};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Intent-indexed rubric weights (spec.md §4.F Design Notes: "weights
// are data, not code — keep them editable without a rebuild")
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One intent's weight vector across the five rubric criteria. Entries
/// are expected to sum to 1.0 but this is not enforced — a malformed
/// table just produces an out-of-range weighted score, which downstream
/// callers are free to clamp.
pub type WeightVector = HashMap<Criterion, f64>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricWeightTable {
    #[serde(default = "default_weights")]
    table: HashMap<Intent, WeightVector>,
    /// Applied when an intent has no entry in `table`.
    #[serde(default = "default_fallback")]
    fallback: WeightVector,
}

impl Default for RubricWeightTable {
    fn default() -> Self {
        Self {
            table: default_weights(),
            fallback: default_fallback(),
        }
    }
}

impl RubricWeightTable {
    pub fn weights_for(&self, intent: Intent) -> &WeightVector {
        self.table.get(&intent).unwrap_or(&self.fallback)
    }

    pub fn weight_for(&self, intent: Intent, criterion: Criterion) -> f64 {
        self.weights_for(intent).get(&criterion).copied().unwrap_or(0.2)
    }
}

fn vec_of(
    rules: f64,
    clarity: f64,
    examples: f64,
    problem_relevance: f64,
    context: f64,
) -> WeightVector {
    HashMap::from([
        (Criterion::Rules, rules),
        (Criterion::Clarity, clarity),
        (Criterion::Examples, examples),
        (Criterion::ProblemRelevance, problem_relevance),
        (Criterion::Context, context),
    ])
}

fn default_fallback() -> WeightVector {
    vec_of(0.2, 0.2, 0.2, 0.2, 0.2)
}

fn default_weights() -> HashMap<Intent, WeightVector> {
    HashMap::from([
        (Intent::Generation, vec_of(0.3, 0.25, 0.25, 0.1, 0.1)),
        (Intent::Optimization, vec_of(0.4, 0.2, 0.05, 0.05, 0.3)),
        (Intent::Debugging, vec_of(0.05, 0.3, 0.2, 0.05, 0.4)),
        (Intent::TestCase, vec_of(0.4, 0.2, 0.3, 0.05, 0.05)),
        (Intent::HintOrQuery, vec_of(0.0, 0.5, 0.0, 0.3, 0.2)),
        (Intent::RuleSetting, vec_of(0.7, 0.3, 0.0, 0.0, 0.0)),
        (Intent::FollowUp, vec_of(0.0, 0.2, 0.0, 0.0, 0.8)),
        (Intent::SystemPrompt, vec_of(0.6, 0.4, 0.0, 0.0, 0.0)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optimization_weighs_rules_and_context_heaviest() {
        let table = RubricWeightTable::default();
        let w = table.weights_for(Intent::Optimization);
        assert_eq!(w[&Criterion::Rules], 0.4);
        assert_eq!(w[&Criterion::Context], 0.3);
    }

    #[test]
    fn unknown_intent_falls_back_to_even_split() {
        // FollowUp is present, but exercise the fallback path directly.
        let table = RubricWeightTable::default();
        assert_eq!(table.weight_for(Intent::FollowUp, Criterion::Clarity), 0.2);
        assert_eq!(table.weight_for(Intent::FollowUp, Criterion::Context), 0.8);
    }

    #[test]
    fn every_intent_sums_close_to_one() {
        let table = RubricWeightTable::default();
        for intent in [
            Intent::Generation,
            Intent::Optimization,
            Intent::Debugging,
            Intent::TestCase,
            Intent::HintOrQuery,
            Intent::RuleSetting,
            Intent::FollowUp,
            Intent::SystemPrompt,
        ] {
            let sum: f64 = table.weights_for(intent).values().sum();
            assert!((sum - 1.0).abs() < 1e-9, "{:?} sums to {}", intent, sum);
        }
    }
}
