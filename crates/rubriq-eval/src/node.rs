use std::sync::Arc;

use tracing::warn;

use rubriq_core::error::{JudgeError, Result};
use rubriq_core::judge::{JudgeCallOptions, JudgeClient, JudgeVerdict};
use rubriq_core::prompt::JudgePrompt;
use rubriq_graph::requirement::Requirement;

use crate::scenario::Scenario;

/// Pairs a requirement with a judge invocation.
///
/// Cheap to clone; evaluations fan one clone out per frontier member.
#[derive(Debug, Clone)]
pub struct RequirementNode {
    requirement: Arc<Requirement>,
    prompt: JudgePrompt,
    client: Arc<dyn JudgeClient>,
}

impl RequirementNode {
    pub fn new(
        requirement: Arc<Requirement>,
        prompt: JudgePrompt,
        client: Arc<dyn JudgeClient>,
    ) -> Self {
        Self {
            requirement,
            prompt,
            client,
        }
    }

    pub fn name(&self) -> &str {
        &self.requirement.name
    }

    pub fn requirement(&self) -> &Requirement {
        &self.requirement
    }

    /// Judge this requirement against the scenario's content.
    ///
    /// A missing reference answer is not an error: the node records the
    /// format's neutral answer and moves on.
    pub async fn evaluate(
        &self,
        scenario: &Scenario,
        options: &JudgeCallOptions,
    ) -> Result<JudgeVerdict> {
        let Some(reference) = scenario.answers.get(&self.requirement.name) else {
            warn!(
                requirement = %self.requirement.name,
                "no reference answer provided, recording neutral score"
            );
            return Ok(JudgeVerdict::new(
                self.requirement.response_format.neutral_answer(),
                "no reference answer provided",
            ));
        };

        let rendered = self.prompt.render(
            &self.requirement.question,
            &scenario.to_content(),
            reference.value(),
            &self.requirement.response_format.instructions(),
        );

        let reply = match options.timeout {
            Some(deadline) => tokio::time::timeout(deadline, self.client.complete(&rendered, options))
                .await
                .map_err(|_| JudgeError::Timeout(deadline))??,
            None => self.client.complete(&rendered, options).await?,
        };

        self.requirement.response_format.parse(&reply)
    }
}
