//! OpenAI-compatible HTTP capability client.
//!
//! One wire client covers all three provider families: Azure OpenAI uses
//! deployment-scoped paths with an `api-key` header and an `api-version`
//! query parameter; the direct API and Ollama's OpenAI-compatible surface
//! use `/v1`-style paths with bearer auth.
//!
//! ## Security
//!
//! Credentials ride in [`ApiCredential`] and are exposed only where the
//! request headers are built.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ApiCredential, ProviderConfig, ProviderKind};
use crate::capability::{CapabilityError, CapabilityFactory, ChatModel, EmbeddingModel};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// OpenAI-compatible chat + embeddings client for one detected provider.
#[derive(Debug)]
pub struct OpenAiCompatClient {
    kind: ProviderKind,
    credential: Option<ApiCredential>,
    base_url: String,
    api_version: Option<String>,
    chat_target: String,
    embedding_target: String,
    timeout: Duration,
}

impl OpenAiCompatClient {
    /// Build a client from a normalized provider config.
    ///
    /// Fails when the config lacks a field the provider family requires;
    /// for configs produced by detection the defaults are already filled
    /// in.
    pub fn from_config(kind: ProviderKind, config: &ProviderConfig) -> Result<Self, CapabilityError> {
        let base_url = config
            .api_base
            .clone()
            .ok_or_else(|| missing(kind, "api_base"))?;

        let (credential, api_version, chat_target, embedding_target) = match kind {
            ProviderKind::AzureOpenAi => (
                Some(config.api_key.clone().ok_or_else(|| missing(kind, "api_key"))?),
                Some(
                    config
                        .api_version
                        .clone()
                        .ok_or_else(|| missing(kind, "api_version"))?,
                ),
                config
                    .deployment_name
                    .clone()
                    .ok_or_else(|| missing(kind, "deployment_name"))?,
                config
                    .embedding_deployment
                    .clone()
                    .ok_or_else(|| missing(kind, "embedding_deployment"))?,
            ),
            ProviderKind::OpenAi => (
                Some(config.api_key.clone().ok_or_else(|| missing(kind, "api_key"))?),
                None,
                config.model.clone().ok_or_else(|| missing(kind, "model"))?,
                config
                    .embedding_model
                    .clone()
                    .ok_or_else(|| missing(kind, "embedding_model"))?,
            ),
            ProviderKind::Ollama => (
                None,
                None,
                config.model.clone().ok_or_else(|| missing(kind, "model"))?,
                config
                    .embedding_model
                    .clone()
                    .ok_or_else(|| missing(kind, "embedding_model"))?,
            ),
        };

        Ok(Self {
            kind,
            credential,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version,
            chat_target,
            embedding_target,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn client() -> &'static reqwest::Client {
        static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
        CLIENT.get_or_init(|| {
            reqwest::Client::builder()
                .build()
                .expect("Failed to build HTTP client")
        })
    }

    fn chat_url(&self) -> String {
        match self.kind {
            ProviderKind::AzureOpenAi => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.base_url,
                self.chat_target,
                self.api_version.as_deref().unwrap_or_default()
            ),
            _ => format!("{}/chat/completions", self.base_url),
        }
    }

    fn embeddings_url(&self) -> String {
        match self.kind {
            ProviderKind::AzureOpenAi => format!(
                "{}/openai/deployments/{}/embeddings?api-version={}",
                self.base_url,
                self.embedding_target,
                self.api_version.as_deref().unwrap_or_default()
            ),
            _ => format!("{}/embeddings", self.base_url),
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        // Credentials are exposed here, at the point of use, and nowhere else.
        match (&self.kind, &self.credential) {
            (ProviderKind::AzureOpenAi, Some(credential)) => {
                request.header("api-key", credential.expose())
            }
            (_, Some(credential)) => request.bearer_auth(credential.expose()),
            (_, None) => request,
        }
    }

    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R, CapabilityError>
    where
        B: Serialize,
        R: serde::de::DeserializeOwned,
    {
        let response = self
            .authorize(Self::client().post(url))
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    CapabilityError::Timeout(self.timeout)
                } else {
                    CapabilityError::Http(error.to_string())
                }
            })?;

        let status = response.status();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(CapabilityError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let message = match response.json::<WireError>().await {
                Ok(body) => body.error.message,
                Err(_) => "unparseable error body".to_string(),
            };
            return Err(CapabilityError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|error| CapabilityError::Parse(error.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: WireErrorDetail,
}

#[derive(Debug, Deserialize)]
struct WireErrorDetail {
    message: String,
}

#[async_trait]
impl ChatModel for OpenAiCompatClient {
    async fn complete(&self, prompt: &str) -> Result<String, CapabilityError> {
        let request = ChatRequest {
            model: &self.chat_target,
            messages: vec![WireMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
        };

        let response: ChatResponse = self.post_json(&self.chat_url(), &request).await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| CapabilityError::Parse("response contained no choices".to_string()))
    }

    fn name(&self) -> &str {
        self.kind.as_str()
    }
}

#[async_trait]
impl EmbeddingModel for OpenAiCompatClient {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, CapabilityError> {
        let request = EmbeddingRequest {
            model: &self.embedding_target,
            input: text,
        };

        let response: EmbeddingResponse = self.post_json(&self.embeddings_url(), &request).await?;

        response
            .data
            .into_iter()
            .next()
            .map(|datum| datum.embedding)
            .ok_or_else(|| CapabilityError::Parse("response contained no embeddings".to_string()))
    }
}

fn missing(kind: ProviderKind, field: &str) -> CapabilityError {
    CapabilityError::NotConfigured(format!("{kind} config missing {field}"))
}

/// Builds HTTP-backed capabilities for any detected provider.
pub struct HttpCapabilityFactory {
    timeout: Duration,
}

impl HttpCapabilityFactory {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpCapabilityFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityFactory for HttpCapabilityFactory {
    fn chat(
        &self,
        kind: ProviderKind,
        config: &ProviderConfig,
    ) -> Result<Arc<dyn ChatModel>, CapabilityError> {
        let client = OpenAiCompatClient::from_config(kind, config)?.with_timeout(self.timeout);
        Ok(Arc::new(client))
    }

    fn embeddings(
        &self,
        kind: ProviderKind,
        config: &ProviderConfig,
    ) -> Result<Arc<dyn EmbeddingModel>, CapabilityError> {
        let client = OpenAiCompatClient::from_config(kind, config)?.with_timeout(self.timeout);
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{detect, CredentialSource};
    use rubric_core::params;
    use std::collections::BTreeMap;

    fn azure_config() -> ProviderConfig {
        let parameters: BTreeMap<String, String> = [
            (params::AZURE_API_KEY, "azure-key"),
            (params::AZURE_ENDPOINT, "https://example.openai.azure.com/"),
            (params::AZURE_DEPLOYMENT, "gpt-4"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        detect(&parameters).unwrap().1
    }

    #[test]
    fn test_azure_urls_use_deployment_paths() {
        let client =
            OpenAiCompatClient::from_config(ProviderKind::AzureOpenAi, &azure_config()).unwrap();

        let url = client.chat_url();
        assert!(url.starts_with("https://example.openai.azure.com/openai/deployments/gpt-4/"));
        assert!(url.contains("api-version=2024-02-01"));

        let url = client.embeddings_url();
        assert!(url.contains("/deployments/text-embedding-ada-002/embeddings"));
    }

    #[test]
    fn test_direct_urls_are_flat() {
        let parameters: BTreeMap<String, String> =
            [(params::OPENAI_API_KEY.to_string(), "sk-abc".to_string())].into();
        let (kind, config) = detect(&parameters).unwrap();

        let client = OpenAiCompatClient::from_config(kind, &config).unwrap();
        assert_eq!(
            client.chat_url(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(client.embeddings_url(), "https://api.openai.com/v1/embeddings");
    }

    #[test]
    fn test_local_provider_needs_no_credential() {
        let (kind, config) = detect(&BTreeMap::new()).unwrap();
        let client = OpenAiCompatClient::from_config(kind, &config).unwrap();

        assert_eq!(kind, ProviderKind::Ollama);
        assert!(client.credential.is_none());
        assert!(client.chat_url().starts_with("http://localhost:11434/v1/"));
    }

    #[test]
    fn test_missing_required_field_fails() {
        let config = ProviderConfig::default();
        let result = OpenAiCompatClient::from_config(ProviderKind::AzureOpenAi, &config);
        assert!(matches!(result, Err(CapabilityError::NotConfigured(_))));
    }

    #[test]
    fn test_trailing_slash_normalized() {
        let client =
            OpenAiCompatClient::from_config(ProviderKind::AzureOpenAi, &azure_config()).unwrap();
        assert!(!client.chat_url().contains(".com//"));
    }

    #[test]
    fn test_debug_does_not_leak_credential() {
        let config = ProviderConfig {
            api_key: Some(ApiCredential::new(
                "sk-super-secret",
                CredentialSource::Params,
                "test key",
            )),
            api_base: Some("https://api.openai.com/v1".to_string()),
            model: Some("gpt-4o-mini".to_string()),
            embedding_model: Some("text-embedding-ada-002".to_string()),
            ..ProviderConfig::default()
        };

        let client = OpenAiCompatClient::from_config(ProviderKind::OpenAi, &config).unwrap();
        let debug_output = format!("{client:?}");

        assert!(!debug_output.contains("sk-super-secret"));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn test_factory_builds_both_capabilities() {
        let factory = HttpCapabilityFactory::new();
        let (kind, config) = detect(&BTreeMap::new()).unwrap();

        assert!(factory.chat(kind, &config).is_ok());
        assert!(factory.embeddings(kind, &config).is_ok());
    }
}
