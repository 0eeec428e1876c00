use std::sync::Arc;

use serde::{Deserialize, Serialize};

use rubriq_core::error::{JudgeError, Result};
use rubriq_core::judge::JudgeClient;

use crate::openai::{DEFAULT_BASE_URL, OpenAiJudge};

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// Declarative judge-client settings, as persisted in rubric configs.
///
/// The key itself never touches disk; only the environment variable name
/// is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeClientConfig {
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl JudgeClientConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key_env(mut self, var: impl Into<String>) -> Self {
        self.api_key_env = var.into();
        self
    }
}

/// Instantiate the configured client, reading the key from the process
/// environment.
pub fn build_judge_client(config: &JudgeClientConfig) -> Result<Arc<dyn JudgeClient>> {
    let api_key = std::env::var(&config.api_key_env).map_err(|_| {
        JudgeError::Auth(format!(
            "environment variable '{}' is not set",
            config.api_key_env
        ))
    })?;
    Ok(Arc::new(
        OpenAiJudge::new(api_key, config.model.clone()).with_base_url(config.base_url.clone()),
    ))
}
