//! Generative-language backend.
//!
//! The pipeline only needs `generate(prompt) -> text`. Responses carry no
//! structural guarantee, so callers parse them defensively.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.2:1b";

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("generation disabled")]
    Disabled,
}

/// Prompt → text capability.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;

    /// Backend name for logs and reports.
    fn name(&self) -> &str;
}

/// Client for a local Ollama server (`POST /api/generate`, non-streaming).
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaClient {
    /// Create a client for the given Ollama base URL and model.
    ///
    /// `base_url` should be like `http://localhost:11434` (no trailing slash).
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            temperature: 0.0,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Generator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        debug!(url = %url, model = %self.model, prompt_len = prompt.len(), "calling ollama");
        let resp = self.client.post(&url).json(&request).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerateError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let result: GenerateResponse = resp.json().await?;
        info!(model = %self.model, response_len = result.response.len(), "generation complete");
        Ok(result.response)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Backend that refuses every call. Used when model judgment is switched off.
pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerateError> {
        Err(GenerateError::Disabled)
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Returns canned responses and records every prompt it receives.
    pub(crate) struct ScriptedGenerator {
        respond: Box<dyn Fn(&str) -> Result<String, GenerateError> + Send + Sync>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        pub fn new(
            respond: impl Fn(&str) -> Result<String, GenerateError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                respond: Box::new(respond),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn constant(text: &str) -> Self {
            let text = text.to_string();
            Self::new(move |_| Ok(text.clone()))
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            (self.respond)(prompt)
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = OllamaClient::new("http://localhost:11434/".into(), DEFAULT_MODEL.into());
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.model(), "llama3.2:1b");
    }

    #[test]
    fn request_body_shape() {
        let req = GenerateRequest {
            model: "llama3.2:1b",
            prompt: "hello",
            stream: false,
            options: GenerateOptions { temperature: 0.0 },
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "llama3.2:1b");
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["temperature"], 0.0);
    }

    #[test]
    fn response_body_ignores_extra_fields() {
        let raw = r#"{"model":"llama3.2:1b","created_at":"2026-01-01T00:00:00Z","response":"ok","done":true}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.response, "ok");
    }

    #[tokio::test]
    async fn disabled_generator_refuses() {
        let err = DisabledGenerator.generate("anything").await.unwrap_err();
        assert!(matches!(err, GenerateError::Disabled));
    }
}
