//! GenerationProvider trait and LLM integration.
//!
//! Provides an abstraction layer over rig-core to decouple the
//! codebase from the specific LLM library.

pub mod rig;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the generation provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("LLM API error: {0}")]
    ApiError(String),

    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

/// JSON shape the model is asked to produce.
///
/// Providers that support structured output constrain the response with
/// the schema of the matching type in [`crate::models::generated`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    PullRequestDescription,
    Labels,
    ReleaseDescription,
    Review,
}

/// One structured generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub system: String,
    pub prompt: String,
    pub shape: ResultShape,
}

/// Trait for LLM-backed structured generation.
///
/// Implementations return the raw response text; validation against the
/// requested shape happens in [`crate::generation`].
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError>;
}
