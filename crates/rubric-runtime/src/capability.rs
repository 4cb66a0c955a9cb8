//! LLM and embedding capability seams.
//!
//! The adapter never talks to a provider directly; it consumes these
//! traits. Concrete HTTP-backed implementations live behind the
//! `http-providers` feature; tests supply mocks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::providers::{ProviderConfig, ProviderKind};

/// Errors from capability construction or invocation.
#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Response parse error: {0}")]
    Parse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Capability not configured: {0}")]
    NotConfigured(String),
}

/// Chat/completion handle bound to one provider.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Execute one completion for a judge prompt.
    async fn complete(&self, prompt: &str) -> Result<String, CapabilityError>;

    /// Provider-facing name for logs.
    fn name(&self) -> &str;
}

/// Embedding handle bound to one provider.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f64>, CapabilityError>;
}

/// Builds capability handles for a detected provider.
///
/// Chat construction failure is fatal for the engine path. Embedding
/// construction failure is not: the caller logs a warning and proceeds
/// without embeddings, leaving any degradation to be handled at
/// result-normalization time.
pub trait CapabilityFactory: Send + Sync {
    /// Build the chat handle for this provider.
    fn chat(
        &self,
        kind: ProviderKind,
        config: &ProviderConfig,
    ) -> Result<Arc<dyn ChatModel>, CapabilityError>;

    /// Build the embedding handle for this provider.
    fn embeddings(
        &self,
        kind: ProviderKind,
        config: &ProviderConfig,
    ) -> Result<Arc<dyn EmbeddingModel>, CapabilityError>;
}
