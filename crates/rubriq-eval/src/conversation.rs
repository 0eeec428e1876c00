use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rubriq_core::answer::{Answer, format_answer_value};
use rubriq_core::config::EvalConfig;
use rubriq_core::error::{Result, RubriqError};
use rubriq_core::message::Message;

use crate::rubric::{MultiStepRubric, flatten_answers};
use crate::scenario::Scenario;

/// Sentinel appended when the reference path has nothing further to ask.
pub const CONCLUSION_SENTINEL: &str =
    "No further information is available. You may conclude.";

/// One turn of the interactive walk, kept for observability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnEvent {
    pub at: DateTime<Utc>,
    pub level_idx: usize,
    /// Judged score per requirement evaluated this turn.
    pub scores: BTreeMap<String, f64>,
    /// `name_value` keys revealed this turn.
    pub revealed: Vec<String>,
    pub next_frontier: Vec<String>,
}

/// Mutable per-conversation record driving the turn-level walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    /// Current frontier index in the walk.
    pub level_idx: usize,
    /// Requirements currently being asked about.
    pub active_reqs: Vec<String>,
    /// The scenario's reference answers.
    pub answers_gt: BTreeMap<String, Answer>,
    pub finished: bool,
    /// `name_value` keys already surfaced, to prevent repetition.
    pub revealed_info: BTreeSet<String>,
    /// The scenario's full revealed-info map.
    pub revealed_info_data: BTreeMap<String, BTreeMap<String, String>>,
    /// Append-only log of turn events.
    #[serde(default)]
    pub progression: Vec<TurnEvent>,
}

impl ConversationState {
    /// Initial state: level 0 active, nothing revealed yet.
    pub fn new(rubric: &MultiStepRubric, scenario: &Scenario) -> Self {
        Self {
            level_idx: 0,
            active_reqs: rubric.levels().first().cloned().unwrap_or_default(),
            answers_gt: scenario.answers.clone(),
            finished: false,
            revealed_info: BTreeSet::new(),
            revealed_info_data: scenario.revealed_info.clone(),
            progression: Vec::new(),
        }
    }
}

impl MultiStepRubric {
    /// Compute the next environment message for an ongoing dialogue.
    ///
    /// Judges the last assistant message against the initial user prompt
    /// along the reference path, advances the frontier by the judged
    /// answers, surfaces newly unlocked revealed information, and asks the
    /// next frontier's questions. Returns the reply text, the advanced
    /// state, and whether the conversation is finished.
    pub async fn next_conversation_step(
        &self,
        messages: &[Message],
        state: &ConversationState,
        config: &EvalConfig,
    ) -> Result<(String, ConversationState, bool)> {
        let initial_prompt = messages
            .first()
            .ok_or_else(|| {
                RubriqError::Other(
                    "messages should contain at least the initial user prompt".into(),
                )
            })?
            .content();
        let last_assistant = messages
            .iter()
            .rev()
            .find(|m| m.is_assistant())
            .map(|m| m.content())
            .unwrap_or("");

        let answers_gt = flatten_answers(&state.answers_gt);
        let scenario = Scenario::new(initial_prompt, state.answers_gt.clone())
            .with_completion(last_assistant);

        let eval_state = self
            .evaluate_reference_guided(&scenario, Some(&answers_gt), config)
            .await?;
        let level_scores = eval_state.get(&state.level_idx).cloned().unwrap_or_default();

        // Frontier advancement follows the judged answers.
        let mut next_reqs: Vec<String> = Vec::new();
        for (name, verdict) in &level_scores {
            let Some(req) = self.requirement(name) else {
                continue;
            };
            if !req.terminal() {
                if let Some(unlocks) = req.downstream_for(verdict.answer) {
                    next_reqs.extend(unlocks.iter().cloned());
                }
            }
        }
        next_reqs.sort();
        next_reqs.dedup();

        // Surface revealed information for newly observed (name, answer) pairs.
        let mut revealed_info = state.revealed_info.clone();
        let mut revealed_lines: Vec<String> = Vec::new();
        let mut revealed_keys: Vec<String> = Vec::new();
        for (name, verdict) in &level_scores {
            let Some(by_value) = state.revealed_info_data.get(name) else {
                continue;
            };
            let value_key = format_answer_value(verdict.answer);
            if let Some(info) = by_value.get(&value_key) {
                let info_key = format!("{name}_{value_key}");
                if revealed_info.insert(info_key.clone()) {
                    revealed_lines.push(format!("New information: {info}"));
                    revealed_keys.push(info_key);
                }
            }
        }

        // Assemble the environment reply.
        let mut lines: Vec<String> = Vec::new();
        if !revealed_lines.is_empty() {
            lines.extend(revealed_lines);
            lines.push(String::new());
        }
        if next_reqs.is_empty() {
            lines.push(CONCLUSION_SENTINEL.to_string());
        } else {
            for name in &next_reqs {
                if let Some(reasoning) =
                    state.answers_gt.get(name).and_then(|a| a.reasoning())
                {
                    lines.push(format!("Background ({name}): {reasoning}"));
                }
                if let Some(req) = self.requirement(name) {
                    lines.push(format!("Question ({name}): {}", req.question));
                }
            }
        }
        let content = lines.join("\n");

        let mut updated = state.clone();
        updated.progression.push(TurnEvent {
            at: Utc::now(),
            level_idx: state.level_idx,
            scores: level_scores
                .iter()
                .map(|(name, v)| (name.clone(), v.answer))
                .collect(),
            revealed: revealed_keys,
            next_frontier: next_reqs.clone(),
        });
        updated.revealed_info = revealed_info;
        let finished = next_reqs.is_empty();
        if finished {
            updated.finished = true;
        } else {
            updated.level_idx = state.level_idx + 1;
            updated.active_reqs = next_reqs;
        }

        Ok((content, updated, finished))
    }
}
