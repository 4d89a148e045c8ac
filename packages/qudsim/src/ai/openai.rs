//! OpenAI implementation of the Capability trait.
//!
//! A reference implementation using chat completions with the strict
//! `json_schema` response format.
//!
//! # Example
//!
//! ```rust,ignore
//! use qudsim::ai::OpenAI;
//! use std::sync::Arc;
//!
//! let ai = Arc::new(OpenAI::from_env()?.with_model("gpt-4o"));
//! let qudsim = QudSim::new(ai.clone(), ai, QudSimConfig::default());
//! ```

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretBox};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{QudSimError, Result};
use crate::traits::capability::{Capability, CompletionRequest};

/// OpenAI-based capability.
///
/// The request's `model` wins over the client default, so one client can
/// serve both the generation and the answer role.
#[derive(Debug)]
pub struct OpenAI {
    client: Client,
    api_key: SecretBox<str>,
    model: String,
    base_url: String,
}

impl OpenAI {
    /// Create a new OpenAI client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: SecretBox::new(api_key.into().into_boxed_str()),
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| QudSimError::config("OPENAI_API_KEY", "environment variable not set"))?;
        Ok(Self::new(api_key))
    }

    /// Set the default chat model (default: gpt-4o).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Get the default model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn structured_request<'a>(&'a self, request: &'a CompletionRequest) -> StructuredRequest<'a> {
        let model = if request.model.is_empty() {
            self.model.as_str()
        } else {
            request.model.as_str()
        };

        StructuredRequest {
            model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: 0.0,
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: &request.schema_name,
                    strict: true,
                    schema: &request.schema,
                },
            },
        }
    }
}

#[async_trait]
impl Capability for OpenAI {
    async fn complete(&self, request: &CompletionRequest) -> Result<Value> {
        let body = self.structured_request(request);
        debug!(task = %request.task, model = body.model, "Sending structured completion");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| QudSimError::Capability(e.into()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(QudSimError::Capability(
                format!("OpenAI structured output error ({}): {}", status, error_text).into(),
            ));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| QudSimError::Capability(e.into()))?;

        let message = chat_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| QudSimError::Capability("No response from OpenAI".into()))?;

        match message.content {
            Some(content) if !content.trim().is_empty() => Ok(serde_json::from_str(&content)?),
            _ => {
                debug!(task = %request.task, refusal = ?message.refusal, "Empty completion");
                Ok(Value::Null)
            }
        }
    }
}

#[derive(Serialize)]
struct StructuredRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    response_format: ResponseFormat<'a>,
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
    schema: &'a Value,
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
    #[serde(default)]
    refusal: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::retry::request_for;
    use crate::pipeline::schema::SegmentationResponse;
    use crate::traits::capability::Task;

    #[test]
    fn test_builder() {
        let ai = OpenAI::new("sk-test")
            .with_model("gpt-4o-mini")
            .with_base_url("http://localhost:8080/v1");

        assert_eq!(ai.model(), "gpt-4o-mini");
        assert_eq!(ai.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_api_key_not_in_debug() {
        let ai = OpenAI::new("sk-super-secret-key");
        assert!(!format!("{:?}", ai).contains("sk-super-secret-key"));
    }

    #[test]
    fn test_structured_request_body() {
        let ai = OpenAI::new("sk-test");
        let request = request_for::<SegmentationResponse>(
            Task::Segmentation,
            "gpt-4.1",
            "Segment it.",
            "[1] A.".to_string(),
        );

        let body = serde_json::to_value(ai.structured_request(&request)).unwrap();

        assert_eq!(body["model"], "gpt-4.1");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "[1] A.");
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["name"], "SegmentationResponse");
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
    }

    #[test]
    fn test_empty_request_model_uses_default() {
        let ai = OpenAI::new("sk-test").with_model("gpt-4o-mini");
        let request = request_for::<SegmentationResponse>(
            Task::Segmentation,
            "",
            "Segment it.",
            "[1] A.".to_string(),
        );

        assert_eq!(ai.structured_request(&request).model, "gpt-4o-mini");
    }
}
