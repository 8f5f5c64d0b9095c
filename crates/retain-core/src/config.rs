//! Configuration system for retain.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{RetainError, RetainResult};
use crate::traits::LlmConfig;

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Gemini,
    Anthropic,
    OpenAI,
}

impl LlmProvider {
    /// Human-readable service name, used in fallback summaries.
    pub fn service_name(&self) -> &'static str {
        match self {
            LlmProvider::Gemini => "Gemini",
            LlmProvider::Anthropic => "Anthropic",
            LlmProvider::OpenAI => "OpenAI",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn api_key_env(&self) -> &'static str {
        match self {
            LlmProvider::Gemini => "GEMINI_API_KEY",
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
            LlmProvider::OpenAI => "OPENAI_API_KEY",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "gemini" | "google" => Some(LlmProvider::Gemini),
            "anthropic" | "claude" => Some(LlmProvider::Anthropic),
            "openai" => Some(LlmProvider::OpenAI),
            _ => None,
        }
    }
}

/// Provider configuration with type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmProviderConfig {
    /// Provider type.
    pub provider: LlmProvider,
    /// Provider-specific configuration.
    #[serde(flatten)]
    pub config: LlmConfig,
}

impl LlmProviderConfig {
    pub fn new(provider: LlmProvider, config: LlmConfig) -> Self {
        Self { provider, config }
    }
}

/// Retry policy for classifier calls. Zero retries means a single attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first call.
    pub max_retries: u32,
    /// Initial delay before first retry (milliseconds).
    pub initial_delay_ms: u64,
    /// Maximum delay between retries (milliseconds).
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay_ms: 200,
            max_delay_ms: 2_000,
        }
    }
}

/// Memory classifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Backing LLM. `None` leaves the classifier unconfigured, in which case
    /// every comparison resolves to the fallback verdict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmProviderConfig>,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
    /// Retry policy for transient failures.
    pub retry: RetryPolicy,
}

impl ClassifierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Name of the configured service, or the default provider's name.
    pub fn service_name(&self) -> &'static str {
        self.llm
            .as_ref()
            .map(|l| l.provider)
            .unwrap_or_default()
            .service_name()
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            llm: None,
            timeout_secs: 30,
            retry: RetryPolicy::default(),
        }
    }
}

/// Main retain configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetainConfig {
    /// Path to the SQLite database.
    pub database_path: PathBuf,
    /// Memory classifier configuration.
    pub classifier: ClassifierConfig,
}

impl Default for RetainConfig {
    fn default() -> Self {
        let retain_dir = dirs::home_dir()
            .map(|h| h.join(".retain"))
            .unwrap_or_else(|| PathBuf::from(".retain"));

        Self {
            database_path: retain_dir.join("retain.db"),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl RetainConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> RetainResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| RetainError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| RetainError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| RetainError::Configuration(e.to_string())),
            _ => Err(RetainError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// The classifier is only configured when the selected provider's API
    /// key is present.
    pub fn from_env() -> RetainResult<Self> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("RETAIN_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }

        let provider = match std::env::var("RETAIN_LLM_PROVIDER") {
            Ok(raw) => LlmProvider::parse(&raw).ok_or_else(|| RetainError::UnsupportedProvider {
                provider: raw.clone(),
            })?,
            Err(_) => LlmProvider::default(),
        };

        if let Ok(api_key) = std::env::var(provider.api_key_env()) {
            if !api_key.trim().is_empty() {
                let mut llm = LlmConfig {
                    api_key: Some(api_key),
                    ..Default::default()
                };
                if let Ok(model) = std::env::var("RETAIN_LLM_MODEL") {
                    llm.model = model;
                }
                config.classifier.llm = Some(LlmProviderConfig::new(provider, llm));
            }
        }

        if let Ok(raw) = std::env::var("RETAIN_CLASSIFIER_TIMEOUT_SECS") {
            config.classifier.timeout_secs = raw.parse().map_err(|_| {
                RetainError::Configuration(format!("Invalid RETAIN_CLASSIFIER_TIMEOUT_SECS: {}", raw))
            })?;
        }
        if let Ok(raw) = std::env::var("RETAIN_CLASSIFIER_MAX_RETRIES") {
            config.classifier.retry.max_retries = raw.parse().map_err(|_| {
                RetainError::Configuration(format!("Invalid RETAIN_CLASSIFIER_MAX_RETRIES: {}", raw))
            })?;
        }

        Ok(config)
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> RetainConfigBuilder {
        RetainConfigBuilder::default()
    }
}

/// Builder for RetainConfig.
#[derive(Default)]
pub struct RetainConfigBuilder {
    config: RetainConfig,
}

impl RetainConfigBuilder {
    /// Set database path.
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = path.into();
        self
    }

    /// Set the classifier's LLM.
    pub fn llm(mut self, config: LlmProviderConfig) -> Self {
        self.config.classifier.llm = Some(config);
        self
    }

    /// Set the classifier timeout.
    pub fn classifier_timeout_secs(mut self, secs: u64) -> Self {
        self.config.classifier.timeout_secs = secs;
        self
    }

    /// Set the classifier retry policy.
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.classifier.retry = policy;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> RetainConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_unconfigured() {
        let config = RetainConfig::default();
        assert!(config.classifier.llm.is_none());
        assert_eq!(config.classifier.timeout_secs, 30);
        assert_eq!(config.classifier.retry.max_retries, 0);
        assert!(config.database_path.ends_with("retain.db"));
        assert_eq!(config.classifier.service_name(), "Gemini");
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("retain.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
database_path = "/tmp/retain-test.db"

[classifier]
timeout_secs = 5

[classifier.llm]
provider = "anthropic"
model = "claude-3-5-sonnet-20240620"
api_key = "sk-test"

[classifier.retry]
max_retries = 2
initial_delay_ms = 10
max_delay_ms = 50
"#
        )
        .unwrap();

        let config = RetainConfig::from_file(&path).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/retain-test.db"));
        assert_eq!(config.classifier.timeout(), Duration::from_secs(5));
        assert_eq!(config.classifier.retry.max_retries, 2);

        let llm = config.classifier.llm.unwrap();
        assert_eq!(llm.provider, LlmProvider::Anthropic);
        assert_eq!(llm.config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(llm.config.max_tokens, 1024);
    }

    #[test]
    fn test_from_json_file_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("retain.json");
        std::fs::write(&path, r#"{"classifier": {"timeout_secs": 12}}"#).unwrap();

        let config = RetainConfig::from_file(&path).unwrap();
        assert_eq!(config.classifier.timeout_secs, 12);
        assert!(config.classifier.llm.is_none());
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("retain.ini");
        std::fs::write(&path, "x=1").unwrap();
        assert!(matches!(
            RetainConfig::from_file(&path),
            Err(RetainError::Configuration(_))
        ));
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!(LlmProvider::parse("Gemini"), Some(LlmProvider::Gemini));
        assert_eq!(LlmProvider::parse("claude"), Some(LlmProvider::Anthropic));
        assert_eq!(LlmProvider::parse("OPENAI"), Some(LlmProvider::OpenAI));
        assert_eq!(LlmProvider::parse("llama"), None);
    }

    #[test]
    fn test_builder() {
        let config = RetainConfig::builder()
            .database_path("/tmp/x.db")
            .classifier_timeout_secs(3)
            .llm(LlmProviderConfig::new(LlmProvider::OpenAI, LlmConfig::default()))
            .build();

        assert_eq!(config.database_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.classifier.timeout_secs, 3);
        assert_eq!(config.classifier.service_name(), "OpenAI");
    }
}
