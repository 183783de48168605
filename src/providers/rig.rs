//! Generation through rig-core agents.
//!
//! Every request becomes a single-turn agent constrained to the JSON schema
//! of the expected result, so providers with structured output support
//! return parseable text directly.

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers;
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::constants::ENV_API_KEY;
use crate::models::ProviderName;
use crate::models::generated::{
    GeneratedLabels, GeneratedReview, PullRequestDescription, ReleaseDescription,
};

use super::{GenerationProvider, GenerationRequest, ProviderError, ResultShape};

/// Completion budget. Thinking models spend part of it on reasoning, and
/// some providers truncate early when no limit is sent at all.
const MAX_TOKENS: u64 = 65536;

/// Prompt a schema-constrained agent built from `$client`.
macro_rules! complete {
    ($client:expr, $model:expr, $request:expr, $schema:ty, $label:expr) => {{
        let agent = $client
            .agent($model)
            .preamble($request.system.as_str())
            .temperature(0.0)
            .max_tokens(MAX_TOKENS)
            .output_schema::<$schema>()
            .build();
        agent
            .prompt($request.prompt.as_str())
            .await
            .map_err(|e| ProviderError::ApiError(format!("{} request failed: {e}", $label)))
    }};
}

/// Build a client with the `Client::new(api_key)` constructor.
macro_rules! keyed_client {
    ($client:path, $api_key:expr, $label:expr) => {
        <$client>::new($api_key).map_err(|e| client_error($label, e))
    };
}

fn client_error(label: &str, err: impl std::fmt::Display) -> ProviderError {
    ProviderError::ApiError(format!("cannot create {label} client: {err}"))
}

/// [`GenerationProvider`] backed by one of rig-core's provider clients.
///
/// A fresh client is built per request; requests are few and long-running.
pub struct RigProvider {
    name: ProviderName,
    model: String,
    api_key: String,
    base_url: Option<String>,
}

impl std::fmt::Debug for RigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RigProvider")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("api_key", &"[redacted]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl RigProvider {
    /// Fails when the configuration cannot produce a working client: no API
    /// key, or an OpenAI-compatible provider without a base URL.
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let Some(api_key) = config.api_key else {
            return Err(ProviderError::NotConfigured(format!(
                "no API key for provider '{}'; set {ENV_API_KEY} or {}",
                config.name,
                config.name.api_key_env_var(),
            )));
        };
        if config.name == ProviderName::OpenAICompatible && config.base_url.is_none() {
            return Err(ProviderError::NotConfigured(
                "the openai-compatible provider needs provider.base_url".to_string(),
            ));
        }
        Ok(Self {
            name: config.name,
            model: config.model,
            api_key,
            base_url: config.base_url,
        })
    }

    fn openai_client(&self, label: &str) -> Result<providers::openai::CompletionsClient, ProviderError> {
        let mut builder = providers::openai::CompletionsClient::builder().api_key(self.api_key.as_str());
        if let Some(base_url) = &self.base_url {
            builder = builder.base_url(base_url);
        }
        builder.build().map_err(|e| client_error(label, e))
    }

    async fn complete<T>(&self, request: &GenerationRequest) -> Result<String, ProviderError>
    where
        T: JsonSchema + Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let key = self.api_key.as_str();
        let model = self.model.as_str();

        match self.name {
            ProviderName::Anthropic => {
                let client: providers::anthropic::Client = providers::anthropic::Client::builder()
                    .api_key(key)
                    .build()
                    .map_err(|e| client_error("Anthropic", e))?;
                complete!(client, model, request, T, "Anthropic")
            }
            ProviderName::OpenAI => {
                let client = self.openai_client("OpenAI")?;
                complete!(client, model, request, T, "OpenAI")
            }
            ProviderName::OpenAICompatible => {
                let client = self.openai_client("OpenAI-compatible")?;
                complete!(client, model, request, T, "OpenAI-compatible")
            }
            ProviderName::Cohere => {
                let client = keyed_client!(providers::cohere::Client, key, "Cohere")?;
                complete!(client, model, request, T, "Cohere")
            }
            ProviderName::Gemini => {
                let client = keyed_client!(providers::gemini::Client, key, "Gemini")?;
                complete!(client, model, request, T, "Gemini")
            }
            ProviderName::Perplexity => {
                let client = keyed_client!(providers::perplexity::Client, key, "Perplexity")?;
                complete!(client, model, request, T, "Perplexity")
            }
            ProviderName::DeepSeek => {
                let client = keyed_client!(providers::deepseek::Client, key, "DeepSeek")?;
                complete!(client, model, request, T, "DeepSeek")
            }
            ProviderName::XAI => {
                let client = keyed_client!(providers::xai::Client, key, "xAI")?;
                complete!(client, model, request, T, "xAI")
            }
            ProviderName::Groq => {
                let client = keyed_client!(providers::groq::Client, key, "Groq")?;
                complete!(client, model, request, T, "Groq")
            }
        }
    }
}

#[async_trait]
impl GenerationProvider for RigProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        debug!(
            provider = %self.name,
            model = %self.model,
            shape = ?request.shape,
            prompt_len = request.prompt.len(),
            "generating"
        );
        match request.shape {
            ResultShape::PullRequestDescription => {
                self.complete::<PullRequestDescription>(request).await
            }
            ResultShape::Labels => self.complete::<GeneratedLabels>(request).await,
            ResultShape::ReleaseDescription => self.complete::<ReleaseDescription>(request).await,
            ResultShape::Review => self.complete::<GeneratedReview>(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: ProviderName, api_key: Option<&str>, base_url: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            name,
            model: "some-model".to_string(),
            base_url: base_url.map(str::to_string),
            api_key: api_key.map(str::to_string),
        }
    }

    #[test]
    fn missing_key_names_both_variables() {
        let err = RigProvider::new(config(ProviderName::Gemini, None, None)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("RELGEN_API_KEY"), "got: {msg}");
        assert!(msg.contains("GEMINI_API_KEY"), "got: {msg}");
    }

    #[test]
    fn openai_compatible_needs_base_url() {
        let err = RigProvider::new(config(ProviderName::OpenAICompatible, Some("k"), None))
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
        assert!(err.to_string().contains("base_url"));

        let ok = RigProvider::new(config(
            ProviderName::OpenAICompatible,
            Some("k"),
            Some("http://localhost:11434/v1"),
        ));
        assert!(ok.is_ok());
    }

    #[test]
    fn hosted_providers_only_need_a_key() {
        let provider = RigProvider::new(config(ProviderName::Anthropic, Some("sk-test"), None)).unwrap();
        assert_eq!(provider.name, ProviderName::Anthropic);
        assert_eq!(provider.base_url, None);
    }
}
