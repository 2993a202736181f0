//! Minimal chat-completions client shared by the LLM-backed agents.
//!
//! Only the data contract matters here: one prompt in, one text completion
//! out. Prompt wording and model choice are configuration, not behavior
//! this crate specifies.

use serde::{Deserialize, Serialize};

use crate::domain::error::{MendError, Result};

/// Connection settings for the chat-completions backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    /// API key. Required.
    pub api_key: String,

    /// Base URL of the chat-completions API.
    pub base_url: String,

    /// Model identifier.
    pub model: String,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.mistral.ai".to_string(),
            model: "mistral-small-latest".to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
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
    content: String,
}

/// Blocking-from-the-caller's-perspective chat client.
pub struct LlmClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(MendError::LlmUnavailable(
                "no API key configured (set MISTRAL_API_KEY)".to_string(),
            ));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            config,
        })
    }

    /// The configured model identifier.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send one user prompt and return the completion text.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let url = format!("{}/v1/chat/completions", self.config.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| MendError::LlmUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MendError::LlmResponse(format!(
                "backend returned {status}: {body}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| MendError::LlmResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| MendError::LlmResponse("completion had no choices".to_string()))
    }
}

/// Extract the body of the first fenced code block, or the trimmed
/// response when no fence is present.
pub fn extract_code_block(response: &str) -> String {
    if let Some(after) = response.split("```python").nth(1) {
        if let Some(body) = after.split("```").next() {
            return body.trim().to_string();
        }
    }
    if let Some(body) = response.split("```").nth(1) {
        return body.trim().to_string();
    }
    response.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = LlmConfig::new("key");
        assert_eq!(config.model, "mistral-small-latest");
        assert!(config.base_url.starts_with("https://"));

        let config = config.with_model("mistral-large-latest");
        assert_eq!(config.model, "mistral-large-latest");
    }

    #[test]
    fn test_empty_api_key_is_rejected() {
        let err = LlmClient::new(LlmConfig::new("  ")).err().expect("error");
        assert!(matches!(err, MendError::LlmUnavailable(_)));
    }

    #[test]
    fn test_extract_python_fence() {
        let response = "Here you go:\n```python\ndef f():\n    return 1\n```\nDone.";
        assert_eq!(extract_code_block(response), "def f():\n    return 1");
    }

    #[test]
    fn test_extract_anonymous_fence() {
        let response = "```\nx = 1\n```";
        assert_eq!(extract_code_block(response), "x = 1");
    }

    #[test]
    fn test_extract_without_fence() {
        assert_eq!(extract_code_block("  x = 1\n"), "x = 1");
    }

    #[test]
    fn test_chat_response_deserializes() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"hello"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(json).expect("deserialize");
        assert_eq!(parsed.choices[0].message.content, "hello");
    }
}
