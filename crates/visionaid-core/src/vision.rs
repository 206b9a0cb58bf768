//! Vision model abstraction.
//!
//! Defines the [`VisionModel`] trait that every multimodal backend
//! implements. Concrete backends (the OpenAI-compatible HTTP adapter, the
//! disabled placeholder) live in the `visionaid` app crate; tests supply
//! scripted fakes.

use async_trait::async_trait;

use crate::error::AnalysisFailure;
use crate::image::DataUri;

/// Output-length budget for a single analysis.
pub const DEFAULT_MAX_TOKENS: u32 = 300;

/// An external multimodal model that answers a prompt about one image.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Model identifier (e.g. `"gpt-4o"`), used in logs.
    fn model_name(&self) -> &str;

    /// Send one image and one instruction, returning the model's raw text.
    ///
    /// Exactly one outbound call is made; failures are final.
    async fn analyze(&self, image: &DataUri, prompt: &str) -> Result<String, AnalysisFailure>;
}
