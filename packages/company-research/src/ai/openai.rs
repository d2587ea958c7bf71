//! OpenAI implementation of the completion service.
//!
//! Structured prompts are sent with OpenAI's `json_schema` response format in
//! strict mode, so replies decode directly into the requested type.
//!
//! # Example
//!
//! ```rust,ignore
//! use company_research::ai::OpenAI;
//!
//! let ai = OpenAI::new("sk-...").with_model("gpt-4o");
//! let researcher = Researcher::new(ai, searcher, ResearchConfig::default())?;
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{ResearchError, Result};
use crate::security::{ProviderCredentials, SecretString};
use crate::traits::completion::{CompletionService, Prompt};

/// OpenAI-based completion service.
#[derive(Clone)]
pub struct OpenAI {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
    temperature: f32,
}

impl OpenAI {
    /// Create a new OpenAI client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            api_key: SecretString::new(api_key),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            temperature: 0.1,
        }
    }

    /// Create from checked provider credentials, honoring a base URL override.
    pub fn from_credentials(credentials: ProviderCredentials) -> Self {
        let mut ai = Self::new(credentials.api_key.expose());
        if let Some(url) = credentials.base_url {
            ai.base_url = url;
        }
        ai
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        ProviderCredentials::from_env("OpenAI", "OPENAI_API_KEY").map(Self::from_credentials)
    }

    /// Set the chat model (default: gpt-4o-mini).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the sampling temperature (default: 0.1).
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Get the current model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn request<'a>(&'a self, prompt: &'a Prompt) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: self.temperature,
            response_format: prompt.schema.as_ref().map(|s| ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: &s.name,
                    strict: true,
                    schema: &s.schema,
                },
            }),
        }
    }
}

#[async_trait]
impl CompletionService for OpenAI {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        let request = self.request(prompt);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key.expose()))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ResearchError::Completion(Box::new(e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ResearchError::completion(format!(
                "OpenAI API error {}: {}",
                status, error_text
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::Completion(Box::new(e)))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ResearchError::completion("No response from OpenAI"))?;

        debug!(model = %self.model, chars = content.len(), "OpenAI completion received");
        Ok(content)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'a str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'a str,
    strict: bool,
    schema: &'a serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::record::RecordUpdate;

    #[test]
    fn test_structured_request_uses_json_schema() {
        let ai = OpenAI::new("sk-test");
        let prompt = Prompt::structured::<RecordUpdate>("system", "user");
        let json = serde_json::to_value(ai.request(&prompt)).unwrap();

        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["response_format"]["type"], "json_schema");
        assert_eq!(json["response_format"]["json_schema"]["name"], "RecordUpdate");
        assert_eq!(json["response_format"]["json_schema"]["strict"], true);
        assert_eq!(json["messages"][0]["role"], "system");
    }

    #[test]
    fn test_plain_request_has_no_response_format() {
        let ai = OpenAI::new("sk-test").with_model("gpt-4o");
        let prompt = Prompt::new("system", "user");
        let json = serde_json::to_value(ai.request(&prompt)).unwrap();

        assert_eq!(json["model"], "gpt-4o");
        assert!(json.get("response_format").is_none());
    }

    #[test]
    fn test_credentials_base_url_is_used() {
        let credentials = ProviderCredentials::new("OpenAI", "sk-test")
            .unwrap()
            .with_base_url("http://localhost:8080/v1");
        let ai = OpenAI::from_credentials(credentials);

        assert_eq!(ai.base_url, "http://localhost:8080/v1");
        assert_eq!(ai.api_key.expose(), "sk-test");
    }

    #[test]
    fn test_reply_with_null_content_decodes() {
        let chat: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(chat.choices[0].message.content.is_none());
    }
}
