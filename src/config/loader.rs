//! Config struct and loading logic.
//!
//! Priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables
//! 3. `.relgen.toml` in the working directory (or `--config PATH`)
//! 4. `~/.config/relgen/config.toml` (global defaults)
//! 5. Built-in defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::constants::{
    CONFIG_DIR, CONFIG_FILENAME, DEFAULT_GITHUB_API_URL, ENV_API_KEY, ENV_BASE_URL,
    ENV_GITHUB_API_URL, ENV_GITHUB_TOKEN, ENV_GITHUB_TOKEN_FALLBACK, ENV_MODEL, ENV_PROVIDER,
};
use crate::env::Env;
use crate::models::{Persona, ProviderName};
use crate::remote::Platform;

/// Errors during config loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to read {path}: {source}")]
    ReadText {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub remote: RemoteConfig,
    pub generation: GenerationConfig,
    pub pr: PrConfig,
    pub issue: IssueConfig,
    pub release: ReleaseConfig,
}

/// A prompt fragment given inline or read from a file.
///
/// ```toml
/// template = "## Changes"
/// prompt = { file = "prompts/describe.md" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextSource {
    Inline(String),
    File { file: PathBuf },
}

impl TextSource {
    /// Resolve to text, trimming surrounding whitespace.
    pub fn read(&self) -> Result<String, ConfigError> {
        match self {
            TextSource::Inline(text) => Ok(text.trim().to_string()),
            TextSource::File { file } => std::fs::read_to_string(file)
                .map(|text| text.trim().to_string())
                .map_err(|e| ConfigError::ReadText {
                    path: file.clone(),
                    source: e,
                }),
        }
    }

    /// Make a relative file path relative to `dir`.
    fn rebase(&mut self, dir: &Path) {
        if let TextSource::File { file } = self {
            if file.is_relative() {
                *file = dir.join(&*file);
            }
        }
    }
}

/// LLM provider configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub name: ProviderName,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: ProviderName::Anthropic,
            model: "claude-sonnet-4-20250514".to_string(),
            base_url: None,
            api_key: None,
        }
    }
}

/// Code host configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub platform: Platform,
    pub token: Option<String>,
    pub api_url: String,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("platform", &self.platform)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            platform: Platform::Github,
            token: None,
            api_url: DEFAULT_GITHUB_API_URL.to_string(),
        }
    }
}

/// Settings shared by all generation operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Maximum concurrent generation calls when a release needs several.
    pub concurrency: usize,
    /// Minimum similarity (0.0 to 1.0) for a quoted review line to match a
    /// diff line.
    pub line_match_threshold: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            line_match_threshold: 0.95,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrConfig {
    pub describe: DescribeConfig,
    pub label: LabelConfig,
    pub review: ReviewConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueConfig {
    pub label: LabelConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    pub describe: ReleaseDescribeConfig,
    pub ascribe: AscribeConfig,
}

/// `[pr.describe]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DescribeConfig {
    pub template: Option<TextSource>,
    pub prompt: Option<TextSource>,
    pub footer: Option<String>,
    pub excluded_file_patterns: Vec<String>,
}

/// `[pr.label]` and `[issue.label]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub prompt: Option<TextSource>,
    /// Globs left out of the diff shown to the model. Issues have no diff.
    pub excluded_file_patterns: Vec<String>,
}

/// `[pr.review]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub rules: Vec<TextSource>,
    pub prompt: Option<TextSource>,
    pub footer: Option<String>,
    pub excluded_file_patterns: Vec<String>,
}

/// `[release.describe]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseDescribeConfig {
    pub template: Option<TextSource>,
    pub prompt: Option<TextSource>,
    pub persona: Option<Persona>,
}

/// `[release.ascribe]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AscribeConfig {
    /// Regex; merged pull requests whose title matches are skipped.
    pub excluded_pattern: Option<String>,
}

impl Config {
    /// Load configuration with proper layering.
    ///
    /// Reads from global config, then `config_file` if given or
    /// `.relgen.toml` under `root` otherwise, then applies environment
    /// variable overrides.
    pub fn load(
        root: Option<&Path>,
        config_file: Option<&Path>,
        env: &Env,
    ) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // Layer 4: global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global = Self::load_file(&global_path)?;
                config.merge(global);
            }
        }

        // Layer 3: explicit or repo-local config
        let local_path = match (config_file, root) {
            (Some(path), _) => Some(path.to_path_buf()),
            (None, Some(root)) => Some(root.join(CONFIG_FILENAME)),
            (None, None) => None,
        };
        if let Some(local_path) = local_path {
            // An explicit path must exist; the implicit one is optional.
            if config_file.is_some() || local_path.exists() {
                let local = Self::load_file(&local_path)?;
                config.merge(local);
            }
        }

        // Layer 2: environment variables
        config.apply_env_vars(env);

        Ok(config)
    }

    /// Load a config from a specific file.
    ///
    /// Relative `{ file = ... }` references are resolved against the
    /// file's directory.
    fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        if let Some(dir) = path.parent() {
            config.rebase_text_sources(dir);
        }
        Ok(config)
    }

    fn rebase_text_sources(&mut self, dir: &Path) {
        let sources = [
            self.pr.describe.template.as_mut(),
            self.pr.describe.prompt.as_mut(),
            self.pr.label.prompt.as_mut(),
            self.pr.review.prompt.as_mut(),
            self.issue.label.prompt.as_mut(),
            self.release.describe.template.as_mut(),
            self.release.describe.prompt.as_mut(),
        ];
        for source in sources.into_iter().flatten() {
            source.rebase(dir);
        }
        for rule in &mut self.pr.review.rules {
            rule.rebase(dir);
        }
    }

    /// Get the global config file path.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONFIG_DIR).join("config.toml"))
    }

    /// Merge another config into this one (other takes precedence for non-default values).
    fn merge(&mut self, other: Config) {
        // Provider settings
        let default_provider = ProviderConfig::default();
        if other.provider.name != default_provider.name {
            self.provider.name = other.provider.name;
        }
        if other.provider.model != default_provider.model {
            self.provider.model = other.provider.model;
        }
        merge_option(&mut self.provider.base_url, other.provider.base_url);
        merge_option(&mut self.provider.api_key, other.provider.api_key);

        // Remote settings
        let default_remote = RemoteConfig::default();
        if other.remote.platform != default_remote.platform {
            self.remote.platform = other.remote.platform;
        }
        merge_option(&mut self.remote.token, other.remote.token);
        if other.remote.api_url != default_remote.api_url {
            self.remote.api_url = other.remote.api_url;
        }

        // Generation settings
        let default_generation = GenerationConfig::default();
        if other.generation.concurrency != default_generation.concurrency {
            self.generation.concurrency = other.generation.concurrency;
        }
        if other.generation.line_match_threshold != default_generation.line_match_threshold {
            self.generation.line_match_threshold = other.generation.line_match_threshold;
        }

        // Per-command settings
        let describe = other.pr.describe;
        merge_option(&mut self.pr.describe.template, describe.template);
        merge_option(&mut self.pr.describe.prompt, describe.prompt);
        merge_option(&mut self.pr.describe.footer, describe.footer);
        merge_vec(
            &mut self.pr.describe.excluded_file_patterns,
            describe.excluded_file_patterns,
        );

        merge_option(&mut self.pr.label.prompt, other.pr.label.prompt);
        merge_vec(
            &mut self.pr.label.excluded_file_patterns,
            other.pr.label.excluded_file_patterns,
        );
        merge_option(&mut self.issue.label.prompt, other.issue.label.prompt);

        let review = other.pr.review;
        merge_vec(&mut self.pr.review.rules, review.rules);
        merge_option(&mut self.pr.review.prompt, review.prompt);
        merge_option(&mut self.pr.review.footer, review.footer);
        merge_vec(
            &mut self.pr.review.excluded_file_patterns,
            review.excluded_file_patterns,
        );

        let release = other.release.describe;
        merge_option(&mut self.release.describe.template, release.template);
        merge_option(&mut self.release.describe.prompt, release.prompt);
        merge_option(&mut self.release.describe.persona, release.persona);
        merge_option(
            &mut self.release.ascribe.excluded_pattern,
            other.release.ascribe.excluded_pattern,
        );
    }

    /// Apply command-line provider overrides, the highest layer.
    ///
    /// Switching provider re-resolves the API key from the environment.
    pub fn override_provider(
        &mut self,
        name: Option<ProviderName>,
        model: Option<String>,
        env: &Env,
    ) {
        if let Some(name) = name.filter(|name| *name != self.provider.name) {
            self.provider.name = name;
            if let Some(key) = env.first_of(&[ENV_API_KEY, name.api_key_env_var()]) {
                self.provider.api_key = Some(key);
            }
        }
        if let Some(model) = model {
            self.provider.model = model;
        }
    }

    /// Apply environment variable overrides.
    fn apply_env_vars(&mut self, env: &Env) {
        if let Some(val) = env.get(ENV_PROVIDER) {
            if let Ok(name) = val.parse::<ProviderName>() {
                self.provider.name = name;
            } else {
                warn!("ignoring invalid {ENV_PROVIDER} value: {val}");
            }
        }
        if let Some(val) = env.get(ENV_MODEL) {
            self.provider.model = val;
        }
        if let Some(val) = env.get(ENV_BASE_URL) {
            self.provider.base_url = Some(val);
        }

        // Provider-specific API key resolution
        let api_key = env.first_of(&[ENV_API_KEY, self.provider.name.api_key_env_var()]);
        if api_key.is_some() {
            self.provider.api_key = api_key;
        }

        let token = env.first_of(&[ENV_GITHUB_TOKEN, ENV_GITHUB_TOKEN_FALLBACK]);
        if token.is_some() {
            self.remote.token = token;
        }
        if let Some(val) = env.get(ENV_GITHUB_API_URL) {
            self.remote.api_url = val;
        }
    }
}

fn merge_option<T>(target: &mut Option<T>, other: Option<T>) {
    if other.is_some() {
        *target = other;
    }
}

fn merge_vec<T>(target: &mut Vec<T>, other: Vec<T>) {
    if !other.is_empty() {
        *target = other;
    }
}
