//! OpenAI-compatible Chat Completions judge client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use rubriq_core::error::{JudgeError, Result, RubriqError};
use rubriq_core::judge::{JudgeCallOptions, JudgeClient};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Judge backend speaking the Chat Completions protocol.
///
/// The base URL is configurable so any OpenAI-compatible gateway works.
/// One shared `reqwest::Client` underneath, safe for concurrent fan-out.
pub struct OpenAiJudge {
    api_key: String,
    model_id: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiJudge {
    pub fn new(api_key: String, model_id: String) -> Self {
        Self {
            api_key,
            model_id,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn build_request<'a>(
        &'a self,
        prompt: &'a str,
        options: &JudgeCallOptions,
    ) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model_id,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        }
    }
}

/// Map a non-success HTTP reply to the judge error taxonomy.
pub(crate) fn status_to_error(status: u16, body: &str) -> JudgeError {
    let message = serde_json::from_str::<ApiError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());
    match status {
        401 => JudgeError::Auth(message),
        429 => JudgeError::RateLimited {
            retry_after_secs: None,
        },
        _ => JudgeError::ApiRequest(format!("HTTP {status}: {message}")),
    }
}

#[async_trait]
impl JudgeClient for OpenAiJudge {
    async fn complete(&self, prompt: &str, options: &JudgeCallOptions) -> Result<String> {
        let request_body = self.build_request(prompt, options);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| RubriqError::Judge(JudgeError::ApiRequest(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read response body".into());
            return Err(status_to_error(status.as_u16(), &body).into());
        }

        let api_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| RubriqError::Judge(JudgeError::InvalidReply(e.to_string())))?;

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| JudgeError::InvalidReply("reply carried no content".into()).into())
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn judge() -> OpenAiJudge {
        OpenAiJudge::new("sk-test".into(), "gpt-4.1-nano".into())
    }

    #[test]
    fn build_request_shape() {
        let judge = judge();
        let options = JudgeCallOptions::default().with_max_tokens(128);
        let request = judge.build_request("Is the scene safe?", &options);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4.1-nano");
        assert_eq!(json["max_tokens"], 128);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Is the scene safe?");
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn build_request_with_temperature() {
        let judge = judge();
        let mut options = JudgeCallOptions::default();
        options.temperature = Some(0.0);
        let json = serde_json::to_value(judge.build_request("q", &options)).unwrap();
        assert_eq!(json["temperature"], 0.0);
    }

    #[test]
    fn custom_base_url() {
        let judge = judge().with_base_url("http://localhost:8000/v1");
        assert_eq!(judge.base_url, "http://localhost:8000/v1");
        assert_eq!(judge.model_name(), "gpt-4.1-nano");
    }

    #[test]
    fn status_mapping_auth() {
        let err = status_to_error(401, r#"{"error": {"message": "bad key"}}"#);
        assert!(matches!(err, JudgeError::Auth(_)));
        assert!(err.to_string().contains("bad key"));
    }

    #[test]
    fn status_mapping_rate_limited() {
        let err = status_to_error(429, "slow down");
        assert!(matches!(err, JudgeError::RateLimited { .. }));
    }

    #[test]
    fn status_mapping_other_keeps_raw_body() {
        let err = status_to_error(500, "upstream exploded");
        assert!(err.to_string().contains("HTTP 500"));
        assert!(err.to_string().contains("upstream exploded"));
    }
}
