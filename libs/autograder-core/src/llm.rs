//! Hosted language-model clients.
//!
//! Three roles consume model text: test generation (Groq), judging and report
//! writing (Gemini). Every call is a single attempt bounded by the HTTP client
//! timeout. Any failure, including an empty response, is reported as an error
//! and the caller substitutes its deterministic fallback.

use async_trait::async_trait;
use autograder_common::config::ModelConfig;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model {0} is not configured")]
    Unavailable(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("invalid response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl GenerationParams {
    pub const PRECISE: GenerationParams = GenerationParams {
        temperature: 0.0,
        max_output_tokens: 1200,
    };

    pub const PROSE: GenerationParams = GenerationParams {
        temperature: 0.3,
        max_output_tokens: 1200,
    };
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str, params: GenerationParams) -> Result<String, ModelError>;
}

/// Single attempt; errors and blank text both map to `None`
pub async fn generate_or_none(
    model: &dyn LanguageModel,
    prompt: &str,
    params: GenerationParams,
) -> Option<String> {
    match model.generate(prompt, params).await {
        Ok(text) if !text.trim().is_empty() => Some(text),
        Ok(_) => {
            warn!(model = model.name(), "Model returned blank text");
            None
        }
        Err(e) => {
            warn!(model = model.name(), error = %e, "Model unavailable");
            None
        }
    }
}

/// Stand-in for a role whose API key is not set
#[derive(Debug, Clone)]
pub struct Unconfigured {
    name: String,
}

impl Unconfigured {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl LanguageModel for Unconfigured {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, _prompt: &str, _params: GenerationParams) -> Result<String, ModelError> {
        Err(ModelError::Unavailable(self.name.clone()))
    }
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// OpenAI-compatible chat completions client (Groq)
#[derive(Debug, Clone)]
pub struct GroqClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GroqClient {
    pub fn new(client: Client, endpoint: &str, model: &str, api_key: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl LanguageModel for GroqClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, params: GenerationParams) -> Result<String, ModelError> {
        let payload = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": params.temperature,
            "max_tokens": params.max_output_tokens,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status,
                body: truncate(&body, 320),
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Decode(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(ModelError::EmptyResponse)
    }
}

/// Gemini generateContent client
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(client: Client, endpoint: &str, model: &str, api_key: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, params: GenerationParams) -> Result<String, ModelError> {
        let payload = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": params.temperature,
                "maxOutputTokens": params.max_output_tokens,
            },
        });

        let response = self
            .client
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status,
                body: truncate(&body, 320),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ModelError::Decode(e.to_string()))?;

        let text = gemini_text(&body).ok_or(ModelError::EmptyResponse)?;
        if text.trim().is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(text)
    }
}

fn gemini_text(body: &Value) -> Option<String> {
    body["candidates"]
        .as_array()
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate["content"]["parts"].as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part["text"].as_str())
                .collect::<Vec<_>>()
                .join("\n")
        })
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

/// Models bound to their grading roles
#[derive(Clone)]
pub struct ModelSet {
    pub test_generator: Arc<dyn LanguageModel>,
    pub judge: Arc<dyn LanguageModel>,
    pub reporter: Arc<dyn LanguageModel>,
}

impl ModelSet {
    /// Build clients from configuration; roles without an API key are unavailable
    pub fn from_config(config: &ModelConfig) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let test_generator: Arc<dyn LanguageModel> = match config.groq_api_key.as_deref() {
            Some(key) => Arc::new(GroqClient::new(
                client.clone(),
                &config.groq_endpoint,
                &config.groq_model,
                key,
            )),
            None => Arc::new(Unconfigured::new("groq")),
        };

        let gemini: Arc<dyn LanguageModel> = match config.gemini_api_key.as_deref() {
            Some(key) => Arc::new(GeminiClient::new(
                client,
                &config.gemini_endpoint,
                &config.gemini_model,
                key,
            )),
            None => Arc::new(Unconfigured::new("gemini")),
        };

        Ok(Self {
            test_generator,
            judge: gemini.clone(),
            reporter: gemini,
        })
    }

    /// Every role unavailable; grading runs entirely on fallbacks
    pub fn unavailable() -> Self {
        Self {
            test_generator: Arc::new(Unconfigured::new("groq")),
            judge: Arc::new(Unconfigured::new("gemini")),
            reporter: Arc::new(Unconfigured::new("gemini")),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Returns canned responses in order, then reports unavailable
    pub struct ScriptedModel {
        responses: Mutex<Vec<String>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        pub fn new(responses: &[&str]) -> Self {
            let mut responses: Vec<String> = responses.iter().map(|r| r.to_string()).collect();
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, prompt: &str, _params: GenerationParams) -> Result<String, ModelError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| ModelError::Unavailable("scripted".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedModel;
    use super::*;
    use autograder_common::config::GraderConfig;

    #[test]
    fn test_gemini_text_joins_parts() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "first" }, { "text": "second" }] } }]
        });
        assert_eq!(gemini_text(&body).unwrap(), "first\nsecond");
        assert!(gemini_text(&json!({})).is_none());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }

    #[test]
    fn test_gemini_url() {
        let client = GeminiClient::new(Client::new(), "https://example.test/", "gemini-2.5-flash", "k");
        assert_eq!(
            client.url(),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn test_unconfigured_roles() {
        let config = GraderConfig::default();
        let models = ModelSet::from_config(&config.models).unwrap();

        let result = models.test_generator.generate("hi", GenerationParams::PRECISE).await;
        assert!(matches!(result, Err(ModelError::Unavailable(_))));
        let result = models.reporter.generate("hi", GenerationParams::PROSE).await;
        assert!(matches!(result, Err(ModelError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_generate_or_none_treats_blank_as_unavailable() {
        let model = ScriptedModel::new(&["   ", "text"]);
        assert!(generate_or_none(&model, "p", GenerationParams::PRECISE).await.is_none());
        assert_eq!(
            generate_or_none(&model, "p", GenerationParams::PRECISE).await.as_deref(),
            Some("text")
        );
        assert!(generate_or_none(&model, "p", GenerationParams::PRECISE).await.is_none());
    }
}
