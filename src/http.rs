//! HTTP-backed generator
//!
//! Reference [`Generator`] implementation over an OpenAI-style
//! chat-completions endpoint. The engine itself never depends on this; it is
//! one pluggable capability next to local models and test stubs.

use crate::error::{Error, Result};
use crate::generator::Generator;
use async_trait::async_trait;
use dotenvy::dotenv;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "anthropic/claude-sonnet-4";

/// HTTP generator configuration
#[derive(Clone)]
pub struct HttpGeneratorConfig {
    /// API key (loaded from environment variable)
    pub api_key: SecretString,
    /// Base URL of the chat-completions API
    pub base_url: Url,
    /// Model identifier
    pub model: String,
    /// Request timeout
    pub timeout: Duration,
    /// App name sent for request attribution
    pub app_name: String,
}

impl HttpGeneratorConfig {
    /// Create a configuration from environment variables
    ///
    /// Reads `CONVERGE_API_KEY` (required), `CONVERGE_BASE_URL`, and
    /// `CONVERGE_MODEL`. Loads `.env` if present so local development picks
    /// up the key.
    pub fn from_env() -> Result<Self> {
        let _ = dotenv();

        let api_key = std::env::var("CONVERGE_API_KEY")
            .map_err(|_| Error::config("CONVERGE_API_KEY environment variable not set"))?;
        let base_url = std::env::var("CONVERGE_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(&base_url)
            .map_err(|e| Error::config(format!("invalid CONVERGE_BASE_URL: {e}")))?;
        let model =
            std::env::var("CONVERGE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Ok(Self {
            api_key: SecretString::from(api_key),
            base_url,
            model,
            timeout: Duration::from_secs(120),
            app_name: "converge".to_string(),
        })
    }

    /// Create a configuration with a specific API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            base_url: Url::parse(DEFAULT_BASE_URL).expect("valid default URL"),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(120),
            app_name: "converge".to_string(),
        }
    }

    /// Set the base URL
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the API key as a string
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

impl std::fmt::Debug for HttpGeneratorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGeneratorConfig")
            .field("api_key", &"***REDACTED***")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("app_name", &self.app_name)
            .finish()
    }
}

/// Generator over an OpenAI-style chat-completions API
pub struct HttpGenerator {
    client: Client,
    config: HttpGeneratorConfig,
}

impl HttpGenerator {
    /// Create a generator from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(HttpGeneratorConfig::from_env()?)
    }

    /// Create a generator with the given configuration
    pub fn new(config: HttpGeneratorConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Get the configuration
    pub fn config(&self) -> &HttpGeneratorConfig {
        &self.config
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(&self, instruction: &str, input: &str) -> Result<String> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.as_str().trim_end_matches('/')
        );
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: instruction.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: input.to_string(),
                },
            ],
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key()))
            .header("X-Title", &self.config.app_name)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::generator(format!(
                "request failed with status {status}: {error_text}"
            )));
        }

        let completion: ChatResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::generator("response contained no choices"))
    }

    fn generator_type(&self) -> &str {
        "http"
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
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
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(server: &mockito::ServerGuard) -> HttpGenerator {
        let config = HttpGeneratorConfig::new("test-key")
            .with_base_url(Url::parse(&server.url()).unwrap())
            .with_model("test-model");
        HttpGenerator::new(config).unwrap()
    }

    #[tokio::test]
    async fn returns_the_first_choice_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "choices": [{"message": {"role": "assistant", "content": "synthesized"}}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let text = generator(&server)
            .generate("instruction", "input")
            .await
            .unwrap();

        assert_eq!(text, "synthesized");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_maps_to_generator_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let err = generator(&server)
            .generate("instruction", "input")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Generator(_)));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn empty_choices_is_a_generator_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let err = generator(&server)
            .generate("instruction", "input")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Generator(_)));
    }

    #[test]
    fn debug_output_redacts_the_api_key() {
        let config = HttpGeneratorConfig::new("super-secret");
        let debug = format!("{config:?}");
        assert!(debug.contains("***REDACTED***"));
        assert!(!debug.contains("super-secret"));
    }
}
