use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, error};

use rubriq_core::answer::Answer;
use rubriq_core::config::EvalConfig;
use rubriq_core::error::{ConfigError, Result, RubriqError, ValidationError};
use rubriq_core::judge::{JudgeCallOptions, JudgeClient, JudgeVerdict};
use rubriq_core::prompt::JudgePrompt;
use rubriq_graph::levels::topological_levels;
use rubriq_graph::requirement::Requirement;

use crate::node::RequirementNode;
use crate::results::{
    EvalOutcome, EvaluationMode, EvaluationResult, ScoreState, TerminalCondition, state_to_json,
};
use crate::scenario::Scenario;
use crate::strategy::RewardStrategy;

/// Record returned by [`MultiStepRubric::score_rollout`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutReport {
    pub reward: f64,
    pub mode: EvaluationMode,
    pub reward_strategy: String,
    pub terminal_condition: TerminalCondition,
    pub state: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_requirements: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_ratio: Option<f64>,
}

/// A rubric: requirements with conditional dependencies, layered once at
/// construction, evaluated by walking frontiers of judge calls.
///
/// Immutable after construction and freely shared across concurrent
/// evaluations; per-evaluation state lives on the stack of each call.
#[derive(Debug)]
pub struct MultiStepRubric {
    requirements: Vec<Arc<Requirement>>,
    index: BTreeMap<String, Arc<Requirement>>,
    nodes: BTreeMap<String, RequirementNode>,
    levels: Vec<Vec<String>>,
    strategy: RewardStrategy,
    prompt: JudgePrompt,
    judge: Arc<dyn JudgeClient>,
}

impl MultiStepRubric {
    /// Build a rubric with the default judge prompt and reward strategy.
    ///
    /// Rejects duplicate names, dependency keys outside a requirement's
    /// answer domain, unknown unlock targets, and cyclic dependencies.
    pub fn new(requirements: Vec<Requirement>, judge: Arc<dyn JudgeClient>) -> Result<Self> {
        Self::build(
            requirements,
            judge,
            RewardStrategy::default(),
            JudgePrompt::default(),
        )
    }

    pub fn with_strategy(
        requirements: Vec<Requirement>,
        judge: Arc<dyn JudgeClient>,
        strategy: RewardStrategy,
    ) -> Result<Self> {
        Self::build(requirements, judge, strategy, JudgePrompt::default())
    }

    /// Replace the judge prompt template, rebuilding the judge nodes.
    pub fn with_judge_prompt(mut self, prompt: JudgePrompt) -> Self {
        self.nodes = Self::make_nodes(&self.requirements, &prompt, &self.judge);
        self.prompt = prompt;
        self
    }

    /// Replace the reward strategy.
    pub fn with_reward_strategy(mut self, strategy: RewardStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    fn build(
        requirements: Vec<Requirement>,
        judge: Arc<dyn JudgeClient>,
        strategy: RewardStrategy,
        prompt: JudgePrompt,
    ) -> Result<Self> {
        let requirements: Vec<Arc<Requirement>> =
            requirements.into_iter().map(Arc::new).collect();

        let mut index: BTreeMap<String, Arc<Requirement>> = BTreeMap::new();
        for req in &requirements {
            if index.insert(req.name.clone(), Arc::clone(req)).is_some() {
                return Err(ConfigError::DuplicateRequirement(req.name.clone()).into());
            }
        }

        for req in &requirements {
            for rule in &req.dependencies {
                if !req.response_format.contains(rule.when) {
                    return Err(ConfigError::DependencyKeyOutOfDomain {
                        requirement: req.name.clone(),
                        key: rule.when,
                    }
                    .into());
                }
                for target in &rule.unlocks {
                    if !index.contains_key(target) {
                        return Err(ConfigError::UnknownDependency {
                            requirement: req.name.clone(),
                            target: target.clone(),
                        }
                        .into());
                    }
                }
            }
        }

        let graph: BTreeMap<String, Vec<String>> = requirements
            .iter()
            .map(|req| (req.name.clone(), req.downstream_names()))
            .collect();
        let levels = topological_levels(&graph)?;

        let nodes = Self::make_nodes(&requirements, &prompt, &judge);

        Ok(Self {
            requirements,
            index,
            nodes,
            levels,
            strategy,
            prompt,
            judge,
        })
    }

    fn make_nodes(
        requirements: &[Arc<Requirement>],
        prompt: &JudgePrompt,
        judge: &Arc<dyn JudgeClient>,
    ) -> BTreeMap<String, RequirementNode> {
        requirements
            .iter()
            .map(|req| {
                (
                    req.name.clone(),
                    RequirementNode::new(Arc::clone(req), prompt.clone(), Arc::clone(judge)),
                )
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.requirements.iter().map(|r| r.as_ref())
    }

    pub fn requirement(&self, name: &str) -> Option<&Requirement> {
        self.index.get(name).map(|r| r.as_ref())
    }

    /// Layer partition, roots at index 0.
    pub fn levels(&self) -> &[Vec<String>] {
        &self.levels
    }

    pub fn reward_strategy(&self) -> &RewardStrategy {
        &self.strategy
    }

    pub fn judge_prompt(&self) -> &JudgePrompt {
        &self.prompt
    }

    /// Human-readable overview of the rubric's shape.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "{} requirements in {} levels (judge: {}, reward: {})\n",
            self.requirements.len(),
            self.levels.len(),
            self.judge.model_name(),
            self.strategy.name(),
        );
        for (i, level) in self.levels.iter().enumerate() {
            out.push_str(&format!("  level {i}: {}\n", level.join(", ")));
        }
        let terminal: Vec<&str> = self
            .requirements
            .iter()
            .filter(|r| r.terminal())
            .map(|r| r.name.as_str())
            .collect();
        out.push_str(&format!("  terminal: {}\n", terminal.join(", ")));
        out
    }

    /// Check a scenario against this rubric before any judge call.
    pub fn validate(&self, scenario: &Scenario, mode: EvaluationMode) -> Result<()> {
        if mode == EvaluationMode::ReferenceGuided && scenario.answers.is_empty() {
            return Err(ValidationError::MissingAnswers.into());
        }
        for (name, answer) in &scenario.answers {
            let req = self
                .index
                .get(name)
                .ok_or_else(|| ValidationError::UnknownRequirement(name.clone()))?;
            let value = answer.value();
            if !req.response_format.contains(value) {
                return Err(ValidationError::AnswerOutOfDomain {
                    requirement: name.clone(),
                    value,
                }
                .into());
            }
        }
        for name in scenario.revealed_info.keys() {
            if !self.index.contains_key(name) {
                return Err(ValidationError::UnknownRequirement(name.clone()).into());
            }
        }
        Ok(())
    }

    /// Dispatch to the mode-specific walk. Validation runs first.
    pub async fn evaluate(
        &self,
        scenario: &Scenario,
        mode: EvaluationMode,
        config: &EvalConfig,
    ) -> Result<EvalOutcome> {
        self.validate(scenario, mode)?;
        match mode {
            EvaluationMode::ModelGuided => Ok(EvalOutcome::State(
                self.evaluate_model_guided(scenario, config).await?,
            )),
            EvaluationMode::ReferenceGuided => Ok(EvalOutcome::State(
                self.evaluate_reference_guided(scenario, None, config).await?,
            )),
            EvaluationMode::Exhaustive => Ok(EvalOutcome::Flat(
                self.evaluate_exhaustive(scenario, config).await?,
            )),
            EvaluationMode::Adaptive => Ok(EvalOutcome::Adaptive(
                self.evaluate_adaptive(scenario, config).await?,
            )),
        }
    }

    /// Follow the model's judged answers through the graph.
    pub async fn evaluate_model_guided(
        &self,
        scenario: &Scenario,
        config: &EvalConfig,
    ) -> Result<ScoreState> {
        let scenario = Arc::new(scenario.clone());
        let mut state = ScoreState::new();
        let mut level: Vec<String> = self.levels.first().cloned().unwrap_or_default();
        let mut i = 0usize;

        while !level.is_empty() {
            debug!(level = i, frontier = ?level, "evaluating frontier");
            let results = self.evaluate_layer(&level, &scenario, &config.call).await?;
            let (layer_scores, failure) = split_results(results);
            if let Some((name, source)) = failure {
                state.insert(i, layer_scores);
                return Err(RubriqError::EvaluationAborted {
                    requirement: name,
                    source: Box::new(source),
                    partial_state: state_to_json(&state),
                });
            }

            let next = self.next_frontier(&layer_scores);
            state.insert(i, layer_scores);
            level = next;
            i += 1;
        }

        Ok(state)
    }

    /// Follow the reference answers through the graph while scoring the
    /// model's performance along that path. Frontier members without a
    /// reference answer are dropped: neither judged nor scored.
    pub async fn evaluate_reference_guided(
        &self,
        scenario: &Scenario,
        ground_truth: Option<&BTreeMap<String, f64>>,
        config: &EvalConfig,
    ) -> Result<ScoreState> {
        let gt: BTreeMap<String, f64> = match ground_truth {
            Some(map) => map.clone(),
            None => flatten_answers(&scenario.answers),
        };

        let scenario = Arc::new(scenario.clone());
        let mut state = ScoreState::new();
        let mut level: Vec<String> = self.levels.first().cloned().unwrap_or_default();
        let mut i = 0usize;

        while !level.is_empty() {
            let answered: Vec<String> = level
                .iter()
                .filter(|name| gt.contains_key(name.as_str()))
                .cloned()
                .collect();
            if answered.is_empty() {
                break;
            }

            debug!(level = i, frontier = ?answered, "evaluating reference frontier");
            let results = self.evaluate_layer(&answered, &scenario, &config.call).await?;
            let (layer_scores, failure) = split_results(results);
            if let Some((name, source)) = failure {
                state.insert(i, layer_scores);
                return Err(RubriqError::EvaluationAborted {
                    requirement: name,
                    source: Box::new(source),
                    partial_state: state_to_json(&state),
                });
            }

            let mut next: Vec<String> = Vec::new();
            for name in &answered {
                let Some(req) = self.index.get(name) else {
                    continue;
                };
                if !req.terminal() {
                    if let Some(unlocks) = req.downstream_for(gt[name]) {
                        next.extend(unlocks.iter().cloned());
                    }
                }
            }
            next.sort();
            next.dedup();

            state.insert(i, layer_scores);
            level = next;
            i += 1;
        }

        Ok(state)
    }

    /// One concurrent pass over every requirement, ignoring dependencies.
    pub async fn evaluate_exhaustive(
        &self,
        scenario: &Scenario,
        config: &EvalConfig,
    ) -> Result<BTreeMap<String, JudgeVerdict>> {
        let names: Vec<String> = self.requirements.iter().map(|r| r.name.clone()).collect();
        let scenario = Arc::new(scenario.clone());
        let results = self.evaluate_layer(&names, &scenario, &config.call).await?;
        let (scores, failure) = split_results(results);
        if let Some((name, source)) = failure {
            return Err(RubriqError::EvaluationAborted {
                requirement: name,
                source: Box::new(source),
                partial_state: serde_json::to_value(&scores).unwrap_or_default(),
            });
        }
        Ok(scores)
    }

    /// Model-guided walk that survives judge failures (scored `0.0`) and
    /// caps the layer count at `config.max_depth`.
    pub async fn evaluate_adaptive(
        &self,
        scenario: &Scenario,
        config: &EvalConfig,
    ) -> Result<EvaluationResult> {
        let total = self.requirements.len();
        let mut state = ScoreState::new();
        let mut completed: BTreeSet<String> = BTreeSet::new();

        let first: Vec<String> = self.levels.first().cloned().unwrap_or_default();
        if first.is_empty() || config.max_depth == 0 {
            return Ok(EvaluationResult {
                state,
                terminal_condition: TerminalCondition::Completed,
                completed_requirements: completed,
                total_requirements: total,
            });
        }

        let scenario = Arc::new(scenario.clone());
        let mut level = first;
        let mut i = 0usize;

        while !level.is_empty() && i < config.max_depth {
            debug!(level = i, frontier = ?level, "evaluating adaptive frontier");
            let results = self.evaluate_layer(&level, &scenario, &config.call).await?;

            let mut layer_scores: BTreeMap<String, JudgeVerdict> = BTreeMap::new();
            for (name, result) in results {
                let verdict = match result {
                    Ok(verdict) => verdict,
                    Err(e) => {
                        error!(requirement = %name, error = %e, "judge failed, recording 0.0");
                        JudgeVerdict::new(0.0, format!("judge error: {e}"))
                    }
                };
                completed.insert(name.clone());
                layer_scores.insert(name, verdict);
            }

            let next = self.next_frontier(&layer_scores);
            if next.is_empty() {
                let terminal_condition = self.stop_condition(&layer_scores, i);
                state.insert(i, layer_scores);
                return Ok(EvaluationResult {
                    state,
                    terminal_condition,
                    completed_requirements: completed,
                    total_requirements: total,
                });
            }

            state.insert(i, layer_scores);
            level = next;
            i += 1;
        }

        Ok(EvaluationResult {
            state,
            terminal_condition: TerminalCondition::MaxDepthReached,
            completed_requirements: completed,
            total_requirements: total,
        })
    }

    /// Evaluate a transient scenario and reduce it to a reward record.
    pub async fn score_rollout(
        &self,
        prompt: &str,
        completion: &str,
        reference_answers: &BTreeMap<String, Answer>,
        mode: EvaluationMode,
        config: &EvalConfig,
    ) -> Result<RolloutReport> {
        let scenario =
            Scenario::new(prompt, reference_answers.clone()).with_completion(completion);
        let outcome = self.evaluate(&scenario, mode, config).await?;
        let reward = self.strategy.reward(&outcome, self.requirements.len());

        let report = match &outcome {
            EvalOutcome::Adaptive(result) => RolloutReport {
                reward,
                mode,
                reward_strategy: self.strategy.name().to_string(),
                terminal_condition: result.terminal_condition,
                state: state_to_json(&result.state),
                completed_requirements: Some(
                    result.completed_requirements.iter().cloned().collect(),
                ),
                completion_ratio: Some(result.completion_ratio()),
            },
            other => RolloutReport {
                reward,
                mode,
                reward_strategy: self.strategy.name().to_string(),
                terminal_condition: TerminalCondition::Completed,
                state: other.state_json(),
                completed_requirements: None,
                completion_ratio: None,
            },
        };
        Ok(report)
    }

    /// Fan one judge call out per frontier member and join them all.
    /// Per-node judge failures come back as `Err` entries; only task
    /// panics and unknown names fail the whole layer.
    async fn evaluate_layer(
        &self,
        names: &[String],
        scenario: &Arc<Scenario>,
        options: &JudgeCallOptions,
    ) -> Result<BTreeMap<String, Result<JudgeVerdict>>> {
        let mut join_set = JoinSet::new();
        for name in names {
            let node = self
                .nodes
                .get(name)
                .ok_or_else(|| {
                    RubriqError::Other(format!("Requirement '{name}' not found during evaluation"))
                })?
                .clone();
            let scenario = Arc::clone(scenario);
            let options = options.clone();
            let name = name.clone();
            join_set.spawn(async move {
                let verdict = node.evaluate(&scenario, &options).await;
                (name, verdict)
            });
        }

        let mut results = BTreeMap::new();
        while let Some(joined) = join_set.join_next().await {
            let (name, verdict) = joined
                .map_err(|e| RubriqError::Other(format!("Judge task panicked: {e}")))?;
            results.insert(name, verdict);
        }
        Ok(results)
    }

    /// Union of declared activations for the recorded answers, deduped
    /// and sorted. Terminal requirements never contribute.
    fn next_frontier(&self, layer_scores: &BTreeMap<String, JudgeVerdict>) -> Vec<String> {
        let mut next: Vec<String> = Vec::new();
        for (name, verdict) in layer_scores {
            let Some(req) = self.index.get(name) else {
                continue;
            };
            if !req.terminal() {
                if let Some(unlocks) = req.downstream_for(verdict.answer) {
                    next.extend(unlocks.iter().cloned());
                }
            }
        }
        next.sort();
        next.dedup();
        next
    }

    /// Why an adaptive frontier emptied: at the root it is always a clean
    /// completion; later, it is `no_valid_path` only when every
    /// non-terminal answer failed to map to a declared dependency key.
    fn stop_condition(
        &self,
        layer_scores: &BTreeMap<String, JudgeVerdict>,
        step: usize,
    ) -> TerminalCondition {
        if step == 0 {
            return TerminalCondition::Completed;
        }
        let mut saw_non_terminal = false;
        for (name, verdict) in layer_scores {
            if let Some(req) = self.index.get(name) {
                if !req.terminal() {
                    saw_non_terminal = true;
                    if req.downstream_for(verdict.answer).is_some() {
                        return TerminalCondition::Completed;
                    }
                }
            }
        }
        if saw_non_terminal {
            TerminalCondition::NoValidPath
        } else {
            TerminalCondition::Completed
        }
    }
}

/// Flatten reference answers to their scalar values.
pub(crate) fn flatten_answers(answers: &BTreeMap<String, Answer>) -> BTreeMap<String, f64> {
    answers
        .iter()
        .map(|(name, answer)| (name.clone(), answer.value()))
        .collect()
}

fn split_results(
    results: BTreeMap<String, Result<JudgeVerdict>>,
) -> (BTreeMap<String, JudgeVerdict>, Option<(String, RubriqError)>) {
    let mut scores = BTreeMap::new();
    let mut failure = None;
    for (name, result) in results {
        match result {
            Ok(verdict) => {
                scores.insert(name, verdict);
            }
            Err(e) => {
                if failure.is_none() {
                    failure = Some((name, e));
                }
            }
        }
    }
    (scores, failure)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use rubriq_graph::requirement::DependencyRule;

    struct FixedJudge {
        reply: String,
    }

    #[async_trait]
    impl JudgeClient for FixedJudge {
        async fn complete(&self, _prompt: &str, _options: &JudgeCallOptions) -> Result<String> {
            Ok(self.reply.clone())
        }

        fn model_name(&self) -> &str {
            "fixed-judge"
        }
    }

    fn yes_judge() -> Arc<dyn JudgeClient> {
        Arc::new(FixedJudge {
            reply: r#"{"answer": 1.0, "reasoning": "covered"}"#.into(),
        })
    }

    fn chain() -> Vec<Requirement> {
        vec![
            Requirement::binary_with("a", "First?", vec![DependencyRule::new(1.0, ["b"])])
                .unwrap(),
            Requirement::binary_with("b", "Second?", vec![DependencyRule::new(1.0, ["c"])])
                .unwrap(),
            Requirement::binary("c", "Third?"),
        ]
    }

    #[test]
    fn construction_builds_levels() {
        let rubric = MultiStepRubric::new(chain(), yes_judge()).unwrap();
        let expected: Vec<Vec<String>> =
            vec![vec!["a".into()], vec!["b".into()], vec!["c".into()]];
        assert_eq!(rubric.levels(), expected.as_slice());
        assert_eq!(rubric.len(), 3);
    }

    #[test]
    fn construction_rejects_unknown_target() {
        let reqs = vec![
            Requirement::binary_with("a", "q", vec![DependencyRule::new(1.0, ["ghost"])])
                .unwrap(),
        ];
        let err = MultiStepRubric::new(reqs, yes_judge()).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn construction_rejects_duplicates() {
        let reqs = vec![
            Requirement::binary("a", "q1"),
            Requirement::binary("a", "q2"),
        ];
        let err = MultiStepRubric::new(reqs, yes_judge()).unwrap_err();
        assert!(err.to_string().contains("Duplicate"));
    }

    #[test]
    fn construction_rejects_cycles() {
        let reqs = vec![
            Requirement::binary_with("a", "q", vec![DependencyRule::new(1.0, ["b"])]).unwrap(),
            Requirement::binary_with("b", "q", vec![DependencyRule::new(1.0, ["a"])]).unwrap(),
        ];
        let err = MultiStepRubric::new(reqs, yes_judge()).unwrap_err();
        assert!(err.to_string().contains("Cycle"));
    }

    #[test]
    fn validate_rejects_unknown_requirement() {
        let rubric = MultiStepRubric::new(chain(), yes_judge()).unwrap();
        let scenario = Scenario::builder()
            .prompt("p")
            .answer("ghost", 1.0)
            .build()
            .unwrap();
        let err = rubric
            .validate(&scenario, EvaluationMode::ModelGuided)
            .unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn validate_rejects_out_of_domain_answer() {
        let rubric = MultiStepRubric::new(chain(), yes_judge()).unwrap();
        let scenario = Scenario::builder()
            .prompt("p")
            .answer("a", 0.5)
            .build()
            .unwrap();
        let err = rubric
            .validate(&scenario, EvaluationMode::ModelGuided)
            .unwrap_err();
        assert!(err.to_string().contains("0.5"));
    }

    #[test]
    fn reference_guided_requires_answers() {
        let rubric = MultiStepRubric::new(chain(), yes_judge()).unwrap();
        let scenario = Scenario::new("p", BTreeMap::new());
        let err = rubric
            .validate(&scenario, EvaluationMode::ReferenceGuided)
            .unwrap_err();
        assert!(err.to_string().contains("required"));
        assert!(
            rubric
                .validate(&scenario, EvaluationMode::ModelGuided)
                .is_ok()
        );
    }

    #[test]
    fn summary_names_levels() {
        let rubric = MultiStepRubric::new(chain(), yes_judge()).unwrap();
        let summary = rubric.summary();
        assert!(summary.contains("3 requirements in 3 levels"));
        assert!(summary.contains("level 0: a"));
        assert!(summary.contains("terminal: c"));
    }

    #[tokio::test]
    async fn model_guided_walks_the_yes_path() {
        let rubric = MultiStepRubric::new(chain(), yes_judge()).unwrap();
        let scenario = Scenario::builder()
            .prompt("p")
            .completion("did everything")
            .answer("a", 1.0)
            .answer("b", 1.0)
            .answer("c", 1.0)
            .build()
            .unwrap();
        let state = rubric
            .evaluate_model_guided(&scenario, &EvalConfig::default())
            .await
            .unwrap();
        assert_eq!(state.len(), 3);
        assert_eq!(state[&0]["a"].answer, 1.0);
        assert_eq!(state[&2]["c"].answer, 1.0);
    }

    #[tokio::test]
    async fn empty_rubric_returns_empty_state_in_every_mode() {
        let rubric = MultiStepRubric::new(Vec::new(), yes_judge()).unwrap();
        let scenario = Scenario::new("p", BTreeMap::new());
        let config = EvalConfig::default();

        for mode in [EvaluationMode::ModelGuided, EvaluationMode::Exhaustive] {
            let outcome = rubric.evaluate(&scenario, mode, &config).await.unwrap();
            assert_eq!(outcome.scored_count(), 0);
        }
        let result = rubric
            .evaluate_adaptive(&scenario, &config)
            .await
            .unwrap();
        assert_eq!(result.terminal_condition, TerminalCondition::Completed);
        assert!(result.state.is_empty());
    }
}
