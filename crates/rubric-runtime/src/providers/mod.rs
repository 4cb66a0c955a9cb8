//! Provider detection and normalized configuration.
//!
//! The caller's parameter bag is loosely typed; this module inspects the
//! recognized keys and chooses exactly one provider family from a fixed
//! priority-ordered list: Azure-hosted, then direct API, then local. Each
//! candidate is selected by the presence of its credential key; absent keys
//! fall through to the next candidate, terminating in the local provider,
//! which has no required fields.
//!
//! The resulting [`ProviderConfig`] is derived once per evaluation call and
//! never persisted.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rubric_core::params;

mod secrets;

#[cfg(feature = "http-providers")]
mod openai_compat;

pub use secrets::{ApiCredential, CredentialSource};

#[cfg(feature = "http-providers")]
pub use openai_compat::{HttpCapabilityFactory, OpenAiCompatClient};

/// Default Azure API version when the caller supplies none.
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-01";

/// Default embedding deployment/model for Azure.
pub const DEFAULT_EMBEDDING_DEPLOYMENT: &str = "text-embedding-ada-002";

/// Default embedding model for the direct API.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// Default chat model for the direct API.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_OLLAMA_BASE: &str = "http://localhost:11434/v1";
const DEFAULT_OLLAMA_MODEL: &str = "llama3";
const DEFAULT_OLLAMA_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// Errors from provider detection and configuration.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{provider} selected but required parameter missing: {field}")]
    MissingField {
        provider: ProviderKind,
        field: &'static str,
    },

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// Supported provider families, in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Azure-hosted OpenAI deployment.
    AzureOpenAi,
    /// Direct OpenAI API.
    OpenAi,
    /// Locally-hosted Ollama; the terminal default.
    Ollama,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::AzureOpenAi => "azure_openai",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Ollama => "ollama",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized provider configuration.
///
/// Optional fields are populated only when relevant to the detected
/// provider. Built once per call from the parameter bag, dropped at call
/// end.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfig {
    /// API credential, absent for the local provider.
    pub api_key: Option<ApiCredential>,

    /// Endpoint / base URL for chat and embedding calls.
    pub api_base: Option<String>,

    /// API version (Azure).
    pub api_version: Option<String>,

    /// Chat deployment name (Azure).
    pub deployment_name: Option<String>,

    /// Embedding deployment name (Azure).
    pub embedding_deployment: Option<String>,

    /// Embedding model name.
    pub embedding_model: Option<String>,

    /// Chat model name (direct API, local).
    pub model: Option<String>,
}

/// Choose exactly one provider family from the parameter bag.
///
/// Fails only when a provider has been selected but a field it requires is
/// missing; the caller treats that as a total-failure trigger, not a
/// partial result.
pub fn detect(
    parameters: &BTreeMap<String, String>,
) -> Result<(ProviderKind, ProviderConfig), ProviderError> {
    if let Some(api_key) = parameters.get(params::AZURE_API_KEY) {
        let endpoint = parameters.get(params::AZURE_ENDPOINT).ok_or(
            ProviderError::MissingField {
                provider: ProviderKind::AzureOpenAi,
                field: params::AZURE_ENDPOINT,
            },
        )?;
        let deployment = parameters.get(params::AZURE_DEPLOYMENT).ok_or(
            ProviderError::MissingField {
                provider: ProviderKind::AzureOpenAi,
                field: params::AZURE_DEPLOYMENT,
            },
        )?;

        let config = ProviderConfig {
            api_key: Some(ApiCredential::new(
                api_key,
                CredentialSource::Params,
                "Azure OpenAI API key",
            )),
            api_base: Some(endpoint.clone()),
            api_version: Some(
                parameters
                    .get(params::MODEL_VERSION)
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
            ),
            deployment_name: Some(deployment.clone()),
            embedding_deployment: Some(
                parameters
                    .get(params::AZURE_EMBEDDING_DEPLOYMENT)
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_EMBEDDING_DEPLOYMENT.to_string()),
            ),
            embedding_model: Some(
                parameters
                    .get(params::AZURE_EMBEDDING_MODEL)
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            ),
            model: None,
        };

        return Ok((ProviderKind::AzureOpenAi, config));
    }

    if let Some(api_key) = parameters.get(params::OPENAI_API_KEY) {
        let config = ProviderConfig {
            api_key: Some(ApiCredential::new(
                api_key,
                CredentialSource::Params,
                "OpenAI API key",
            )),
            api_base: Some(
                parameters
                    .get(params::OPENAI_BASE_URL)
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE.to_string()),
            ),
            embedding_model: Some(DEFAULT_EMBEDDING_MODEL.to_string()),
            model: Some(DEFAULT_OPENAI_MODEL.to_string()),
            ..ProviderConfig::default()
        };

        return Ok((ProviderKind::OpenAi, config));
    }

    // Terminal default: local provider, nothing required.
    let config = ProviderConfig {
        api_base: Some(
            parameters
                .get(params::OLLAMA_BASE_URL)
                .cloned()
                .unwrap_or_else(|| DEFAULT_OLLAMA_BASE.to_string()),
        ),
        model: Some(
            parameters
                .get(params::OLLAMA_MODEL)
                .cloned()
                .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
        ),
        embedding_model: Some(DEFAULT_OLLAMA_EMBEDDING_MODEL.to_string()),
        ..ProviderConfig::default()
    };

    Ok((ProviderKind::Ollama, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bag(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_bag_defaults_to_local() {
        let (kind, config) = detect(&BTreeMap::new()).unwrap();
        assert_eq!(kind, ProviderKind::Ollama);
        assert!(config.api_key.is_none());
        assert_eq!(config.api_base.as_deref(), Some(DEFAULT_OLLAMA_BASE));
        assert_eq!(config.model.as_deref(), Some(DEFAULT_OLLAMA_MODEL));
    }

    #[test]
    fn test_azure_takes_priority_over_direct() {
        let parameters = bag(&[
            (params::AZURE_API_KEY, "azure-key"),
            (params::AZURE_ENDPOINT, "https://example.openai.azure.com"),
            (params::AZURE_DEPLOYMENT, "gpt-4"),
            (params::OPENAI_API_KEY, "direct-key"),
        ]);

        let (kind, config) = detect(&parameters).unwrap();
        assert_eq!(kind, ProviderKind::AzureOpenAi);
        assert_eq!(config.api_key.unwrap().expose(), "azure-key");
        assert_eq!(config.deployment_name.as_deref(), Some("gpt-4"));
        assert_eq!(
            config.api_version.as_deref(),
            Some(DEFAULT_AZURE_API_VERSION)
        );
    }

    #[test]
    fn test_azure_missing_endpoint_fails() {
        let parameters = bag(&[
            (params::AZURE_API_KEY, "azure-key"),
            (params::AZURE_DEPLOYMENT, "gpt-4"),
        ]);

        let result = detect(&parameters);
        assert!(matches!(
            result,
            Err(ProviderError::MissingField {
                provider: ProviderKind::AzureOpenAi,
                field: params::AZURE_ENDPOINT,
            })
        ));
    }

    #[test]
    fn test_azure_missing_deployment_fails() {
        let parameters = bag(&[
            (params::AZURE_API_KEY, "azure-key"),
            (params::AZURE_ENDPOINT, "https://example.openai.azure.com"),
        ]);

        assert!(detect(&parameters).is_err());
    }

    #[test]
    fn test_azure_embedding_defaults() {
        let parameters = bag(&[
            (params::AZURE_API_KEY, "k"),
            (params::AZURE_ENDPOINT, "https://e"),
            (params::AZURE_DEPLOYMENT, "d"),
        ]);

        let (_, config) = detect(&parameters).unwrap();
        assert_eq!(
            config.embedding_deployment.as_deref(),
            Some(DEFAULT_EMBEDDING_DEPLOYMENT)
        );
        assert_eq!(
            config.embedding_model.as_deref(),
            Some(DEFAULT_EMBEDDING_MODEL)
        );
    }

    #[test]
    fn test_direct_api_selected_without_azure() {
        let parameters = bag(&[(params::OPENAI_API_KEY, "direct-key")]);

        let (kind, config) = detect(&parameters).unwrap();
        assert_eq!(kind, ProviderKind::OpenAi);
        assert_eq!(config.api_base.as_deref(), Some(DEFAULT_OPENAI_BASE));
        assert_eq!(config.model.as_deref(), Some(DEFAULT_OPENAI_MODEL));
    }

    #[test]
    fn test_unrecognized_keys_ignored() {
        let parameters = bag(&[("langfuse.totally_unknown", "x"), ("other", "y")]);
        let (kind, _) = detect(&parameters).unwrap();
        assert_eq!(kind, ProviderKind::Ollama);
    }

    #[test]
    fn test_error_message_names_missing_field() {
        let parameters = bag(&[(params::AZURE_API_KEY, "k")]);
        let message = detect(&parameters).unwrap_err().to_string();
        assert!(message.contains(params::AZURE_ENDPOINT));
    }
}
