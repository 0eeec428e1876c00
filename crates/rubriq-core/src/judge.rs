use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A parsed judge verdict: the scalar answer plus the judge's explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub answer: f64,
    pub reasoning: String,
}

impl JudgeVerdict {
    pub fn new(answer: f64, reasoning: impl Into<String>) -> Self {
        Self {
            answer,
            reasoning: reasoning.into(),
        }
    }
}

/// Options controlling a single judge invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeCallOptions {
    /// Cap on generated tokens; the reply is a small JSON object.
    pub max_tokens: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Deadline for the whole call. `None` leaves timing to the transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

impl Default for JudgeCallOptions {
    fn default() -> Self {
        Self {
            max_tokens: 256,
            temperature: None,
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl JudgeCallOptions {
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }
}

/// Trait for judge backends.
///
/// Implementations handle transport, request formatting, and raw reply
/// extraction for a specific provider. Shared across concurrent
/// evaluations, so implementations must be safe for concurrent use.
#[async_trait]
pub trait JudgeClient: Send + Sync {
    /// Send a fully rendered judge prompt and return the raw reply text.
    async fn complete(&self, prompt: &str, options: &JudgeCallOptions) -> Result<String>;

    /// Return the model name/identifier.
    fn model_name(&self) -> &str;
}

impl std::fmt::Debug for dyn JudgeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("dyn JudgeClient")
            .field("model_name", &self.model_name())
            .finish()
    }
}
