//! Thin non-streaming client for a local Ollama server.
//!
//! `POST {endpoint}/api/generate` with `stream=false`; the configured
//! timeout is the only retry/latency policy applied here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use docshelf_core::config::GenerationSettings;
use docshelf_core::traits::Generator;

#[derive(Debug, Error)]
pub enum OllamaError {
    #[error("invalid Ollama endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}: {snippet}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        snippet: String,
    },

    #[error("failed to decode response: {0}")]
    Decode(String),
}

pub struct OllamaGenerator {
    client: reqwest::Client,
    model: String,
    temperature: f32,
    url_generate: String,
}

impl OllamaGenerator {
    pub fn new(settings: &GenerationSettings) -> Result<Self, OllamaError> {
        let endpoint = settings.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(OllamaError::InvalidEndpoint(settings.endpoint.clone()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        let url_generate = format!("{}/api/generate", endpoint.trim_end_matches('/'));

        Ok(Self {
            client,
            model: settings.model.clone(),
            temperature: settings.temperature,
            url_generate,
        })
    }

    async fn generate_inner(&self, prompt: &str) -> Result<String, OllamaError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature: self.temperature },
        };

        debug!(url = %self.url_generate, model = %self.model, "requesting generation");
        let resp = self.client.post(&self.url_generate).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_generate.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = text.chars().take(240).collect::<String>();
            return Err(OllamaError::HttpStatus { status, url, snippet });
        }

        let out: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| OllamaError::Decode(format!("serde error: {e}; is stream=false honored?")))?;
        Ok(out.response)
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        Ok(self.generate_inner(prompt).await?)
    }
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
