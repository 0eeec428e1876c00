use serde::{Deserialize, Serialize};

use rubriq_core::error::{ConfigError, Result};
use rubriq_core::format::ResponseFormat;

/// One conditional activation: when the recorded answer equals `when`,
/// the requirements in `unlocks` join the next frontier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyRule {
    pub when: f64,
    pub unlocks: Vec<String>,
}

impl DependencyRule {
    pub fn new(when: f64, unlocks: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            when,
            unlocks: unlocks.into_iter().map(Into::into).collect(),
        }
    }
}

/// A single node of a rubric: one question, its allowed verdicts, and the
/// downstream requirements each verdict activates.
///
/// Immutable once built; rubrics share requirements freely across
/// concurrent evaluations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub name: String,
    pub question: String,
    pub response_format: ResponseFormat,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyRule>,
}

impl Requirement {
    /// Build a requirement, rejecting dependency keys outside the declared
    /// answer domain.
    pub fn new(
        name: impl Into<String>,
        question: impl Into<String>,
        response_format: ResponseFormat,
        dependencies: Vec<DependencyRule>,
    ) -> Result<Self> {
        let name = name.into();
        for rule in &dependencies {
            if !response_format.contains(rule.when) {
                return Err(ConfigError::DependencyKeyOutOfDomain {
                    requirement: name,
                    key: rule.when,
                }
                .into());
            }
        }
        Ok(Self {
            name,
            question: question.into(),
            response_format,
            dependencies,
        })
    }

    /// A terminal yes/no requirement.
    pub fn binary(name: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            question: question.into(),
            response_format: ResponseFormat::binary(),
            dependencies: Vec::new(),
        }
    }

    /// A yes/no requirement with conditional activations.
    pub fn binary_with(
        name: impl Into<String>,
        question: impl Into<String>,
        dependencies: Vec<DependencyRule>,
    ) -> Result<Self> {
        Self::new(name, question, ResponseFormat::binary(), dependencies)
    }

    /// Registry-style construction from a response-format tag.
    pub fn from_tag(
        tag: &str,
        name: impl Into<String>,
        question: impl Into<String>,
        dependencies: Vec<DependencyRule>,
    ) -> Result<Self> {
        Self::new(name, question, ResponseFormat::from_tag(tag)?, dependencies)
    }

    /// Terminal iff no rule unlocks anything; a rule with an empty unlock
    /// list counts as terminal too.
    pub fn terminal(&self) -> bool {
        self.dependencies.iter().all(|r| r.unlocks.is_empty())
    }

    /// Downstream names activated by `answer`, if it is a declared key.
    pub fn downstream_for(&self, answer: f64) -> Option<&[String]> {
        self.dependencies
            .iter()
            .find(|r| r.when == answer)
            .map(|r| r.unlocks.as_slice())
    }

    /// All downstream names, flattened across rules. Used for layering.
    pub fn downstream_names(&self) -> Vec<String> {
        self.dependencies
            .iter()
            .flat_map(|r| r.unlocks.iter().cloned())
            .collect()
    }
}
