use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use rubriq_core::judge::JudgeVerdict;

/// Per-level verdict table: layer index of the frontier that produced the
/// verdict, then requirement name. Keys are integers internally and become
/// strings only at the JSON boundary.
pub type ScoreState = BTreeMap<usize, BTreeMap<String, JudgeVerdict>>;

/// How the engine walks the requirement graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// Follow the model's judged answers through the graph.
    ModelGuided,
    /// Follow the reference answers; score the model along the way.
    ReferenceGuided,
    /// Evaluate every requirement regardless of dependencies.
    Exhaustive,
    /// Model-guided with per-node error recovery and a depth cap.
    Adaptive,
}

impl EvaluationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationMode::ModelGuided => "model_guided",
            EvaluationMode::ReferenceGuided => "reference_guided",
            EvaluationMode::Exhaustive => "exhaustive",
            EvaluationMode::Adaptive => "adaptive",
        }
    }
}

impl std::fmt::Display for EvaluationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an adaptive walk stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalCondition {
    /// The frontier emptied naturally.
    Completed,
    /// A later frontier emptied because no answer mapped to a declared key.
    NoValidPath,
    /// An unrecoverable error stopped the walk.
    Error,
    /// The depth cap elapsed with a non-empty frontier.
    MaxDepthReached,
}

impl TerminalCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalCondition::Completed => "completed",
            TerminalCondition::NoValidPath => "no_valid_path",
            TerminalCondition::Error => "error",
            TerminalCondition::MaxDepthReached => "max_depth_reached",
        }
    }
}

/// Detailed result of an adaptive evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    pub state: ScoreState,
    pub terminal_condition: TerminalCondition,
    pub completed_requirements: BTreeSet<String>,
    pub total_requirements: usize,
}

impl EvaluationResult {
    pub fn completion_ratio(&self) -> f64 {
        if self.total_requirements == 0 {
            return 0.0;
        }
        self.completed_requirements.len() as f64 / self.total_requirements as f64
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "state": state_to_json(&self.state),
            "terminal_condition": self.terminal_condition.as_str(),
            "completed_requirements": self.completed_requirements.iter().collect::<Vec<_>>(),
            "completion_ratio": self.completion_ratio(),
        })
    }
}

/// Union of the shapes `evaluate` can produce, by mode.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalOutcome {
    /// Level-indexed verdicts (model-guided, reference-guided).
    State(ScoreState),
    /// Flat name-indexed verdicts (exhaustive).
    Flat(BTreeMap<String, JudgeVerdict>),
    /// Full adaptive result.
    Adaptive(EvaluationResult),
}

impl EvalOutcome {
    /// Names of every requirement that received a verdict.
    pub fn scored_names(&self) -> BTreeSet<String> {
        match self {
            EvalOutcome::State(state) => state
                .values()
                .flat_map(|layer| layer.keys().cloned())
                .collect(),
            EvalOutcome::Flat(flat) => flat.keys().cloned().collect(),
            EvalOutcome::Adaptive(result) => result
                .state
                .values()
                .flat_map(|layer| layer.keys().cloned())
                .collect(),
        }
    }

    /// Total number of verdicts recorded.
    pub fn scored_count(&self) -> usize {
        match self {
            EvalOutcome::State(state) => state.values().map(|l| l.len()).sum(),
            EvalOutcome::Flat(flat) => flat.len(),
            EvalOutcome::Adaptive(result) => result.state.values().map(|l| l.len()).sum(),
        }
    }

    /// JSON rendering of the verdict table (level keys stringified; the
    /// exhaustive shape stays flat).
    pub fn state_json(&self) -> serde_json::Value {
        match self {
            EvalOutcome::State(state) => state_to_json(state),
            EvalOutcome::Flat(flat) => serde_json::to_value(flat).unwrap_or_default(),
            EvalOutcome::Adaptive(result) => state_to_json(&result.state),
        }
    }
}

/// Convert the integer-keyed state to its string-keyed JSON form.
pub fn state_to_json(state: &ScoreState) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = state
        .iter()
        .map(|(level, layer)| {
            (
                level.to_string(),
                serde_json::to_value(layer).unwrap_or_default(),
            )
        })
        .collect();
    serde_json::Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(answer: f64) -> JudgeVerdict {
        JudgeVerdict::new(answer, "because")
    }

    fn sample_state() -> ScoreState {
        let mut state = ScoreState::new();
        state.insert(0, BTreeMap::from([("a".to_string(), verdict(1.0))]));
        state.insert(
            1,
            BTreeMap::from([
                ("b".to_string(), verdict(0.0)),
                ("c".to_string(), verdict(1.0)),
            ]),
        );
        state
    }

    #[test]
    fn mode_serializes_snake_case() {
        let json = serde_json::to_string(&EvaluationMode::ReferenceGuided).unwrap();
        assert_eq!(json, r#""reference_guided""#);
        assert_eq!(EvaluationMode::Adaptive.to_string(), "adaptive");
    }

    #[test]
    fn completion_ratio_bounds() {
        let result = EvaluationResult {
            state: sample_state(),
            terminal_condition: TerminalCondition::Completed,
            completed_requirements: ["a", "b", "c"].iter().map(|s| s.to_string()).collect(),
            total_requirements: 6,
        };
        assert_eq!(result.completion_ratio(), 0.5);
    }

    #[test]
    fn completion_ratio_empty_rubric_is_zero() {
        let result = EvaluationResult {
            state: ScoreState::new(),
            terminal_condition: TerminalCondition::Completed,
            completed_requirements: BTreeSet::new(),
            total_requirements: 0,
        };
        assert_eq!(result.completion_ratio(), 0.0);
    }

    #[test]
    fn state_json_stringifies_level_keys() {
        let json = state_to_json(&sample_state());
        assert!(json.get("0").is_some());
        assert!(json.get("1").is_some());
        assert_eq!(json["1"]["b"]["answer"], 0.0);
        assert_eq!(json["0"]["a"]["reasoning"], "because");
    }

    #[test]
    fn evaluation_result_to_json_shape() {
        let result = EvaluationResult {
            state: sample_state(),
            terminal_condition: TerminalCondition::NoValidPath,
            completed_requirements: ["a"].iter().map(|s| s.to_string()).collect(),
            total_requirements: 4,
        };
        let json = result.to_json();
        assert_eq!(json["terminal_condition"], "no_valid_path");
        assert_eq!(json["completion_ratio"], 0.25);
        assert_eq!(json["completed_requirements"][0], "a");
    }

    #[test]
    fn scored_names_union_across_levels() {
        let outcome = EvalOutcome::State(sample_state());
        let names = outcome.scored_names();
        assert_eq!(names.len(), 3);
        assert_eq!(outcome.scored_count(), 3);
    }

    #[test]
    fn flat_outcome_counts() {
        let outcome = EvalOutcome::Flat(BTreeMap::from([
            ("x".to_string(), verdict(1.0)),
            ("y".to_string(), verdict(0.0)),
        ]));
        assert_eq!(outcome.scored_count(), 2);
        assert_eq!(outcome.state_json()["x"]["answer"], 1.0);
    }
}
