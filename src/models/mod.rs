//! Shared types used across all modules.
//!
//! This module defines the context envelope, the records fetched from the
//! code host, parsed diffs, generation results, and the options callers
//! pass to the high-level operations. Other modules import from here
//! rather than reaching into each other's internals.

pub mod context;
pub mod diff;
pub mod generated;
pub mod options;
pub mod refs;
pub mod remote;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use context::{ChangeBundle, Context, ContextKind};
pub use diff::FileDiff;
pub use generated::{
    Complexity, GeneratedLabels, GeneratedReview, InlineComment, PullRequestDescription,
    ReleaseDescription, ReviewFinding,
};
pub use options::{
    DescribeTargets, ExcludeSpec, ExcludedContexts, Persona, ReleaseInclude, ReleaseWindow,
    WriteMode,
};
pub use refs::{IssueRef, RepoRef};

/// LLM backends reachable through rig-core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    #[default]
    Anthropic,
    #[serde(rename = "openai")]
    OpenAI,
    Cohere,
    Gemini,
    Perplexity,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "xai")]
    XAI,
    Groq,
    /// Ollama, vLLM, LiteLLM and other servers speaking the OpenAI API.
    /// Requires `provider.base_url`.
    #[serde(rename = "openai-compatible")]
    OpenAICompatible,
}

/// Config name and API key variable of each provider. The key variables
/// are the ones rig-core's own `from_env()` constructors read.
const PROVIDERS: [(ProviderName, &str, &str); 9] = [
    (ProviderName::Anthropic, "anthropic", "ANTHROPIC_API_KEY"),
    (ProviderName::OpenAI, "openai", "OPENAI_API_KEY"),
    (ProviderName::Cohere, "cohere", "COHERE_API_KEY"),
    (ProviderName::Gemini, "gemini", "GEMINI_API_KEY"),
    (ProviderName::Perplexity, "perplexity", "PERPLEXITY_API_KEY"),
    (ProviderName::DeepSeek, "deepseek", "DEEPSEEK_API_KEY"),
    (ProviderName::XAI, "xai", "XAI_API_KEY"),
    (ProviderName::Groq, "groq", "GROQ_API_KEY"),
    (ProviderName::OpenAICompatible, "openai-compatible", "OPENAI_API_KEY"),
];

impl ProviderName {
    fn entry(self) -> (ProviderName, &'static str, &'static str) {
        PROVIDERS
            .into_iter()
            .find(|(name, _, _)| *name == self)
            .unwrap_or(PROVIDERS[0])
    }

    pub fn as_str(self) -> &'static str {
        self.entry().1
    }

    /// Environment variable holding this provider's API key.
    pub fn api_key_env_var(self) -> &'static str {
        self.entry().2
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        PROVIDERS
            .iter()
            .find(|(_, name, _)| *name == wanted)
            .map(|(provider, _, _)| *provider)
            .ok_or_else(|| {
                let known: Vec<&str> = PROVIDERS.iter().map(|(_, name, _)| *name).collect();
                format!("unsupported provider '{s}' (expected one of: {})", known.join(", "))
            })
    }
}
