use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use rubriq_core::answer::{Answer, format_answer_value};
use rubriq_core::error::{Result, RubriqError};

/// An evaluation input: the situation presented, the response under
/// judgment, the reference answer path, and optional per-answer revealed
/// information for interactive use.
///
/// Immutable once built; one scenario is owned by exactly one evaluation
/// at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<String>,
    /// Reference answers by requirement name. A null answer in the source
    /// document means "unknown" and is dropped on load.
    #[serde(default, deserialize_with = "skip_null_answers")]
    pub answers: BTreeMap<String, Answer>,
    /// `requirement -> {answer value -> text}` surfaced by the
    /// conversation driver once that pair is observed.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub revealed_info: BTreeMap<String, BTreeMap<String, String>>,
}

fn skip_null_answers<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, Answer>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<String, Option<Answer>> = BTreeMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(name, answer)| answer.map(|a| (name, a)))
        .collect())
}

impl Scenario {
    pub fn new(prompt: impl Into<String>, answers: BTreeMap<String, Answer>) -> Self {
        Self {
            name: None,
            description: None,
            prompt: prompt.into(),
            completion: None,
            answers,
            revealed_info: BTreeMap::new(),
        }
    }

    pub fn with_completion(mut self, completion: impl Into<String>) -> Self {
        self.completion = Some(completion.into());
        self
    }

    /// The content block judged against each requirement.
    pub fn to_content(&self) -> String {
        format!(
            "prompt: {}\ncompletion: {}",
            self.prompt,
            self.completion.as_deref().unwrap_or("")
        )
    }

    pub fn builder() -> ScenarioBuilder {
        ScenarioBuilder::default()
    }
}

/// Fluent construction for test scenarios.
#[derive(Debug, Default)]
pub struct ScenarioBuilder {
    name: Option<String>,
    description: Option<String>,
    prompt: Option<String>,
    completion: Option<String>,
    answers: BTreeMap<String, Answer>,
    revealed_info: BTreeMap<String, BTreeMap<String, String>>,
}

impl ScenarioBuilder {
    pub fn prompt(mut self, text: impl Into<String>) -> Self {
        self.prompt = Some(text.into());
        self
    }

    pub fn completion(mut self, text: impl Into<String>) -> Self {
        self.completion = Some(text.into());
        self
    }

    pub fn answer(mut self, requirement: impl Into<String>, value: f64) -> Self {
        self.answers.insert(requirement.into(), Answer::Scalar(value));
        self
    }

    pub fn answer_with_reasoning(
        mut self,
        requirement: impl Into<String>,
        value: f64,
        reasoning: impl Into<String>,
    ) -> Self {
        self.answers
            .insert(requirement.into(), Answer::with_reasoning(value, reasoning));
        self
    }

    /// Attach revealed information for a `(requirement, answer value)` pair.
    pub fn reveal(
        mut self,
        requirement: impl Into<String>,
        value: f64,
        info: impl Into<String>,
    ) -> Self {
        self.revealed_info
            .entry(requirement.into())
            .or_default()
            .insert(format_answer_value(value), info.into());
        self
    }

    pub fn name(mut self, text: impl Into<String>) -> Self {
        self.name = Some(text.into());
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn build(self) -> Result<Scenario> {
        let prompt = self
            .prompt
            .ok_or_else(|| RubriqError::Other("Scenario prompt is required".into()))?;
        Ok(Scenario {
            name: self.name,
            description: self.description,
            prompt,
            completion: self.completion,
            answers: self.answers,
            revealed_info: self.revealed_info,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_content_includes_prompt_and_completion() {
        let scenario = Scenario::new("A car crash with two victims.", BTreeMap::new())
            .with_completion("First I would check the scene for hazards.");
        let content = scenario.to_content();
        assert!(content.starts_with("prompt: A car crash"));
        assert!(content.contains("completion: First I would check"));
    }

    #[test]
    fn to_content_without_completion() {
        let scenario = Scenario::new("A situation.", BTreeMap::new());
        assert_eq!(scenario.to_content(), "prompt: A situation.\ncompletion: ");
    }

    #[test]
    fn builder_requires_prompt() {
        let err = Scenario::builder().completion("response").build().unwrap_err();
        assert!(err.to_string().contains("prompt"));
    }

    #[test]
    fn builder_collects_answers_and_reveals() {
        let scenario = Scenario::builder()
            .prompt("What should we do?")
            .completion("Check safety first")
            .answer("check_safety", 1.0)
            .answer_with_reasoning("assess_patient", 0.0, "never mentioned the patient")
            .reveal("check_safety", 1.0, "The area is secure.")
            .name("basic")
            .build()
            .unwrap();

        assert_eq!(scenario.answers["check_safety"].value(), 1.0);
        assert_eq!(
            scenario.answers["assess_patient"].reasoning(),
            Some("never mentioned the patient")
        );
        assert_eq!(
            scenario.revealed_info["check_safety"]["1.0"],
            "The area is secure."
        );
        assert_eq!(scenario.name.as_deref(), Some("basic"));
    }

    #[test]
    fn null_answers_are_dropped_on_load() {
        let scenario: Scenario = serde_json::from_str(
            r#"{"prompt": "p", "answers": {"known": 1.0, "unknown": null}}"#,
        )
        .unwrap();
        assert_eq!(scenario.answers.len(), 1);
        assert!(scenario.answers.contains_key("known"));
    }

    #[test]
    fn serde_roundtrip_mixed_answer_shapes() {
        let scenario = Scenario::builder()
            .prompt("p")
            .answer("a", 1.0)
            .answer_with_reasoning("b", 0.0, "missing")
            .build()
            .unwrap();
        let json = serde_json::to_string(&scenario).unwrap();
        let back: Scenario = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scenario);
    }
}
