use std::collections::BTreeMap;

use proptest::prelude::*;

use rubriq_core::judge::JudgeVerdict;
use rubriq_eval::prelude::*;

/// Random level-indexed score table with binary answers.
fn arb_state() -> impl Strategy<Value = ScoreState> {
    prop::collection::vec(
        prop::collection::vec(prop::bool::ANY, 1..5),
        0..4,
    )
    .prop_map(|levels| {
        levels
            .into_iter()
            .enumerate()
            .map(|(i, layer)| {
                let scores: BTreeMap<String, JudgeVerdict> = layer
                    .into_iter()
                    .enumerate()
                    .map(|(j, yes)| {
                        (
                            format!("r{i}_{j}"),
                            JudgeVerdict::new(if yes { 1.0 } else { 0.0 }, "scripted"),
                        )
                    })
                    .collect();
                (i, scores)
            })
            .collect()
    })
}

fn all_strategies() -> Vec<RewardStrategy> {
    vec![
        RewardStrategy::Sum,
        RewardStrategy::Mean,
        RewardStrategy::default(),
        RewardStrategy::from_tag("level_based").unwrap(),
        RewardStrategy::from_tag("completion_ratio").unwrap(),
        RewardStrategy::from_tag("progressive").unwrap(),
    ]
}

proptest! {
    /// Strategies are pure: identical state maps produce identical rewards.
    #[test]
    fn strategies_are_deterministic(state in arb_state()) {
        let total = state.values().map(|l| l.len()).sum::<usize>().max(1);
        for strategy in all_strategies() {
            let a = strategy.reward(&EvalOutcome::State(state.clone()), total);
            let b = strategy.reward(&EvalOutcome::State(state.clone()), total);
            prop_assert_eq!(a, b, "strategy {}", strategy.name());
        }
    }

    /// `sum` equals `mean` times the number of evaluated requirements.
    #[test]
    fn sum_is_mean_times_count(state in arb_state()) {
        let outcome = EvalOutcome::State(state);
        let count = outcome.scored_count();
        let sum = RewardStrategy::Sum.reward(&outcome, count.max(1));
        let mean = RewardStrategy::Mean.reward(&outcome, count.max(1));
        prop_assert!((sum - mean * count as f64).abs() < 1e-9);
    }

    /// For a non-empty state, `mean` stays inside the answer domain hull.
    #[test]
    fn mean_stays_in_answer_hull(state in arb_state()) {
        let outcome = EvalOutcome::State(state);
        if outcome.scored_count() > 0 {
            let mean = RewardStrategy::Mean.reward(&outcome, outcome.scored_count());
            prop_assert!((0.0..=1.0).contains(&mean), "mean {mean} outside [0, 1]");
        }
    }

    /// With a zero level multiplier, level weighting degenerates to a
    /// scaled sum.
    #[test]
    fn flat_level_weighting_matches_sum(state in arb_state(), base in 0.1f64..4.0) {
        let outcome = EvalOutcome::State(state);
        let weighted = RewardStrategy::LevelWeighted {
            base_weight: base,
            level_multiplier: 0.0,
        }
        .reward(&outcome, outcome.scored_count().max(1));
        let sum = RewardStrategy::Sum.reward(&outcome, outcome.scored_count().max(1));
        prop_assert!((weighted - base * sum).abs() < 1e-9);
    }

    /// Progressive weighting with growth factor 1 is a plain scaled sum.
    #[test]
    fn progressive_without_growth_matches_sum(state in arb_state()) {
        let outcome = EvalOutcome::State(state);
        let progressive = RewardStrategy::Progressive {
            base_reward: 1.0,
            growth_factor: 1.0,
        }
        .reward(&outcome, outcome.scored_count().max(1));
        let sum = RewardStrategy::Sum.reward(&outcome, outcome.scored_count().max(1));
        prop_assert!((progressive - sum).abs() < 1e-9);
    }
}
