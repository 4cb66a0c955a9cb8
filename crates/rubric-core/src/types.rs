//! Evaluation request and recognized parameter keys.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Namespaced parameter keys recognized by the adapter.
///
/// The parameter bag arrives from the calling platform as loosely-typed
/// string pairs; presence of a credential key selects a provider family.
/// Unrecognized keys are ignored.
pub mod params {
    /// Azure OpenAI API key; presence selects the Azure provider.
    pub const AZURE_API_KEY: &str = "langfuse.azure_api_key";

    /// Azure OpenAI resource endpoint. Required once Azure is selected.
    pub const AZURE_ENDPOINT: &str = "langfuse.azure_endpoint";

    /// Azure chat deployment name. Required once Azure is selected.
    pub const AZURE_DEPLOYMENT: &str = "langfuse.azure_deployment";

    /// Azure API version for both chat and embedding calls.
    pub const MODEL_VERSION: &str = "langfuse.model_version";

    /// Azure embedding deployment name.
    pub const AZURE_EMBEDDING_DEPLOYMENT: &str = "langfuse.azure_embedding_deployment";

    /// Azure embedding model name.
    pub const AZURE_EMBEDDING_MODEL: &str = "langfuse.azure_embedding_model";

    /// Direct API key; presence selects the direct provider.
    pub const OPENAI_API_KEY: &str = "langfuse.openai_api_key";

    /// Direct API base URL override.
    pub const OPENAI_BASE_URL: &str = "langfuse.openai_base_url";

    /// Local (Ollama) base URL override.
    pub const OLLAMA_BASE_URL: &str = "langfuse.ollama_base_url";

    /// Local (Ollama) chat model override.
    pub const OLLAMA_MODEL: &str = "langfuse.ollama_model";

    /// Context passage handed to the engine alongside input/output.
    pub const CONTEXT: &str = "langfuse.context";

    /// Label describing where the context came from. Log-only.
    pub const CONTEXT_SOURCE: &str = "langfuse.context_source";
}

/// One evaluation call's inputs.
///
/// Immutable for the duration of the call; the adapter derives provider
/// configuration and metric bindings from it fresh each time and discards
/// them at call end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRequest {
    /// The prompt/question the evaluated system received.
    pub input_text: String,

    /// The response the evaluated system produced.
    pub output_text: String,

    /// Requested metric names, caller vocabulary, order preserved.
    pub metrics: Vec<String>,

    /// Provider credentials, context, and config as loose string pairs.
    pub params: BTreeMap<String, String>,
}

impl EvaluationRequest {
    pub fn new(
        input_text: impl Into<String>,
        output_text: impl Into<String>,
        metrics: Vec<String>,
    ) -> Self {
        Self {
            input_text: input_text.into(),
            output_text: output_text.into(),
            metrics,
            params: BTreeMap::new(),
        }
    }

    /// Attach a parameter, builder style.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// First available context string, if the caller supplied one.
    pub fn context(&self) -> Option<&str> {
        self.params
            .get(params::CONTEXT)
            .map(String::as_str)
            .filter(|ctx| !ctx.is_empty())
    }

    /// Where the context came from, for logging.
    pub fn context_source(&self) -> Option<&str> {
        self.params.get(params::CONTEXT_SOURCE).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_absent() {
        let request = EvaluationRequest::new("q", "a", vec!["relevance".to_string()]);
        assert_eq!(request.context(), None);
        assert_eq!(request.context_source(), None);
    }

    #[test]
    fn test_context_empty_string_treated_as_absent() {
        let request =
            EvaluationRequest::new("q", "a", vec![]).with_param(params::CONTEXT, "");
        assert_eq!(request.context(), None);
    }

    #[test]
    fn test_context_present() {
        let request = EvaluationRequest::new("q", "a", vec![])
            .with_param(params::CONTEXT, "Paris is in France.")
            .with_param(params::CONTEXT_SOURCE, "memory");

        assert_eq!(request.context(), Some("Paris is in France."));
        assert_eq!(request.context_source(), Some("memory"));
    }

    #[test]
    fn test_unrecognized_params_are_inert() {
        let request = EvaluationRequest::new("q", "a", vec![])
            .with_param("langfuse.unknown_key", "whatever");
        assert_eq!(request.context(), None);
    }
}
