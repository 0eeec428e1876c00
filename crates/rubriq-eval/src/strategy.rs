use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use rubriq_core::error::{ConfigError, Result};

use crate::results::{EvalOutcome, ScoreState};

/// Pure reducer from an evaluation outcome to a scalar reward.
///
/// Variants are keyed by short tags for config-driven construction. Every
/// strategy accepts all three outcome shapes; the exhaustive flat map is
/// aggregated as a single level 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RewardStrategy {
    /// Sum of all scores across all levels.
    Sum,
    /// Average of all scores across all levels.
    Mean,
    /// Weighted sum where deeper levels weigh more:
    /// `sum_i (base_weight + i * level_multiplier) * S_i`.
    LevelWeighted {
        base_weight: f64,
        level_multiplier: f64,
    },
    /// Deepest level reached plus a completion bonus:
    /// `L * max_level_bonus + ratio * completion_bonus`.
    LevelBased {
        max_level_bonus: f64,
        completion_bonus: f64,
    },
    /// Completion ratio with a quality bonus:
    /// `ratio * ratio_weight + mean_score * quality_weight`.
    CompletionRatio {
        ratio_weight: f64,
        quality_weight: f64,
    },
    /// Exponentially growing per-level weights:
    /// `sum_i base_reward * growth_factor^i * S_i`.
    Progressive {
        base_reward: f64,
        growth_factor: f64,
    },
}

impl Default for RewardStrategy {
    fn default() -> Self {
        RewardStrategy::LevelWeighted {
            base_weight: 1.0,
            level_multiplier: 1.0,
        }
    }
}

impl RewardStrategy {
    /// Registry tag, as used in persisted rubric configs.
    pub fn name(&self) -> &'static str {
        match self {
            RewardStrategy::Sum => "sum",
            RewardStrategy::Mean => "mean",
            RewardStrategy::LevelWeighted { .. } => "level_weighted",
            RewardStrategy::LevelBased { .. } => "level_based",
            RewardStrategy::CompletionRatio { .. } => "completion_ratio",
            RewardStrategy::Progressive { .. } => "progressive",
        }
    }

    /// Look up a strategy by tag, with its conventional default parameters.
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "sum" => Ok(RewardStrategy::Sum),
            "mean" => Ok(RewardStrategy::Mean),
            "level_weighted" => Ok(RewardStrategy::default()),
            "level_based" => Ok(RewardStrategy::LevelBased {
                max_level_bonus: 1.0,
                completion_bonus: 0.5,
            }),
            "completion_ratio" => Ok(RewardStrategy::CompletionRatio {
                ratio_weight: 1.0,
                quality_weight: 0.5,
            }),
            "progressive" => Ok(RewardStrategy::Progressive {
                base_reward: 1.0,
                growth_factor: 1.5,
            }),
            other => Err(ConfigError::UnknownStrategy(other.to_string()).into()),
        }
    }

    /// Reduce an outcome to a scalar. `total_requirements` is side-channel
    /// context for ratio estimation on non-adaptive outcomes.
    pub fn reward(&self, outcome: &EvalOutcome, total_requirements: usize) -> f64 {
        let flat_as_level_zero;
        let state: &ScoreState = match outcome {
            EvalOutcome::State(state) => state,
            EvalOutcome::Adaptive(result) => &result.state,
            EvalOutcome::Flat(flat) => {
                flat_as_level_zero = BTreeMap::from([(0usize, flat.clone())]);
                &flat_as_level_zero
            }
        };

        match self {
            RewardStrategy::Sum => level_sums(state).map(|(_, s)| s).sum(),
            RewardStrategy::Mean => mean_score(state),
            RewardStrategy::LevelWeighted {
                base_weight,
                level_multiplier,
            } => level_sums(state)
                .map(|(level, s)| (base_weight + level as f64 * level_multiplier) * s)
                .sum(),
            RewardStrategy::LevelBased {
                max_level_bonus,
                completion_bonus,
            } => {
                if state.is_empty() {
                    return 0.0;
                }
                let deepest = state.keys().max().copied().unwrap_or(0) as f64;
                // A non-adaptive walk ran to its natural end, so it counts
                // as fully complete for the bonus.
                let ratio = match outcome {
                    EvalOutcome::Adaptive(result) => result.completion_ratio(),
                    _ => 1.0,
                };
                deepest * max_level_bonus + ratio * completion_bonus
            }
            RewardStrategy::CompletionRatio {
                ratio_weight,
                quality_weight,
            } => {
                completion_ratio(outcome, total_requirements) * ratio_weight
                    + mean_score(state) * quality_weight
            }
            RewardStrategy::Progressive {
                base_reward,
                growth_factor,
            } => level_sums(state)
                .map(|(level, s)| base_reward * growth_factor.powi(level as i32) * s)
                .sum(),
        }
    }
}

fn level_sums(state: &ScoreState) -> impl Iterator<Item = (usize, f64)> + '_ {
    state.iter().map(|(level, layer)| {
        (
            *level,
            layer.values().map(|verdict| verdict.answer).sum::<f64>(),
        )
    })
}

fn mean_score(state: &ScoreState) -> f64 {
    let count: usize = state.values().map(|layer| layer.len()).sum();
    if count == 0 {
        return 0.0;
    }
    let total: f64 = level_sums(state).map(|(_, s)| s).sum();
    total / count as f64
}

/// Adaptive outcomes carry their own ratio; for the other shapes it is
/// estimated from the number of verdicts.
fn completion_ratio(outcome: &EvalOutcome, total_requirements: usize) -> f64 {
    match outcome {
        EvalOutcome::Adaptive(result) => result.completion_ratio(),
        _ => {
            if total_requirements == 0 {
                0.0
            } else {
                outcome.scored_count() as f64 / total_requirements as f64
            }
        }
    }
}
