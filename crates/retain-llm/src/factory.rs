//! Factory for creating LLM providers and the classifier built on them.

use std::sync::Arc;

use retain_core::classifier::LlmClassifier;
use retain_core::config::{ClassifierConfig, LlmProvider};
use retain_core::error::RetainResult;
use retain_core::traits::{Llm, LlmConfig};
use tracing::{info, warn};

use crate::anthropic::AnthropicLlm;
use crate::gemini::GeminiLlm;
use crate::openai::OpenAIProvider;

/// Factory for creating LLM providers.
pub struct LlmFactory;

impl LlmFactory {
    /// Create an LLM provider from the given configuration.
    pub fn create(provider: LlmProvider, config: LlmConfig) -> RetainResult<Arc<dyn Llm>> {
        match provider {
            LlmProvider::Gemini => Ok(Arc::new(GeminiLlm::new(config)?)),
            LlmProvider::Anthropic => Ok(Arc::new(AnthropicLlm::new(config)?)),
            LlmProvider::OpenAI => Ok(Arc::new(OpenAIProvider::new(config)?)),
        }
    }

    /// Build the memory classifier described by `config`.
    ///
    /// Never fails: if no provider is configured, or the provider cannot be
    /// built (typically a missing API key), the classifier is returned in
    /// its unconfigured state and every comparison falls back.
    pub fn classifier(config: &ClassifierConfig) -> LlmClassifier {
        let service = config.service_name();

        let Some(llm_config) = &config.llm else {
            warn!(service, "No LLM configured for the memory classifier");
            return LlmClassifier::unconfigured(service);
        };

        match Self::create(llm_config.provider, llm_config.config.clone()) {
            Ok(llm) => {
                info!(service, model = llm.model_name(), "Memory classifier ready");
                LlmClassifier::new(llm, service, config)
            }
            Err(e) => {
                warn!(service, error = %e, "Memory classifier unavailable");
                LlmClassifier::unconfigured(service)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retain_core::config::LlmProviderConfig;

    #[test]
    fn test_create_with_explicit_key() {
        let config = LlmConfig {
            api_key: Some("key".to_string()),
            ..Default::default()
        };
        let llm = LlmFactory::create(LlmProvider::Gemini, config.clone()).unwrap();
        assert_eq!(llm.model_name(), "gemini-1.5-flash");

        let llm = LlmFactory::create(LlmProvider::Anthropic, config).unwrap();
        assert!(!llm.supports_json_mode());
    }

    #[test]
    fn test_classifier_without_llm_is_unconfigured() {
        let classifier = LlmFactory::classifier(&ClassifierConfig::default());
        assert!(!classifier.is_configured());
        assert_eq!(classifier.service(), "Gemini");
    }

    #[test]
    fn test_classifier_with_llm_is_configured() {
        let config = ClassifierConfig {
            llm: Some(LlmProviderConfig::new(
                LlmProvider::Anthropic,
                LlmConfig {
                    api_key: Some("sk-ant".to_string()),
                    ..Default::default()
                },
            )),
            ..Default::default()
        };
        let classifier = LlmFactory::classifier(&config);
        assert!(classifier.is_configured());
        assert_eq!(classifier.service(), "Anthropic");
    }
}
