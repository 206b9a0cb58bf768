//! Vision model backends.
//!
//! | Provider | Type | Behavior |
//! |----------|------|----------|
//! | `disabled` | [`DisabledVisionModel`] | Every analysis fails |
//! | `openai` | [`OpenAiVisionModel`] | `POST {base_url}/chat/completions` |
//!
//! The OpenAI backend sends one user message containing the instruction and
//! the image as an `image_url` part. There is no retry: a timeout, transport
//! error, non-2xx status or unreadable body is an [`AnalysisFailure`].

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use visionaid_core::{AnalysisFailure, DataUri, VisionModel};

use crate::config::VisionConfig;

/// Build the backend selected by `[vision].provider`.
///
/// # Errors
///
/// Returns an error for an unknown provider, or when the `openai` provider
/// is selected and the API key variable is unset.
pub fn create_vision_model(config: &VisionConfig) -> Result<Arc<dyn VisionModel>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledVisionModel)),
        "openai" => Ok(Arc::new(OpenAiVisionModel::new(config)?)),
        other => bail!("Unknown vision provider: {}", other),
    }
}

/// Placeholder backend used when no model is configured.
pub struct DisabledVisionModel;

#[async_trait]
impl VisionModel for DisabledVisionModel {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn analyze(&self, _image: &DataUri, _prompt: &str) -> Result<String, AnalysisFailure> {
        Err(AnalysisFailure::new("vision provider is disabled"))
    }
}

/// Backend for any OpenAI-compatible chat completions API.
pub struct OpenAiVisionModel {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    max_tokens: u32,
}

impl OpenAiVisionModel {
    pub fn new(config: &VisionConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            anyhow::anyhow!("{} environment variable not set", config.api_key_env)
        })?;
        Self::with_api_key(config, api_key)
    }

    /// Construct without reading the environment.
    pub fn with_api_key(config: &VisionConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: api_key.into(),
            max_tokens: config.max_tokens,
        })
    }

    fn request_body(&self, image: &DataUri, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    { "type": "image_url", "image_url": { "url": image.as_str() } },
                ],
            }],
        })
    }
}

#[async_trait]
impl VisionModel for OpenAiVisionModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn analyze(&self, image: &DataUri, prompt: &str) -> Result<String, AnalysisFailure> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&self.request_body(image, prompt))
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() { "request timed out" } else { "request failed" };
                warn!(model = %self.model, error = %e, "{}", reason);
                AnalysisFailure::new(format!("{}: {}", reason, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            warn!(model = %self.model, %status, "vision API returned an error status");
            return Err(AnalysisFailure::new(format!(
                "vision API error {}: {}",
                status, body_text
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| AnalysisFailure::new(format!("unreadable response body: {}", e)))?;

        Ok(completion_text(&json))
    }
}

/// Extract `choices[0].message.content`, or an empty string when absent.
///
/// An empty answer is not a failure; the parser turns it into a degraded
/// result.
fn completion_text(json: &Value) -> String {
    json.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
