//! retain-llm - LLM provider implementations for retain.
//!
//! The memory classifier in `retain-core` talks to an [`Llm`]. This crate
//! provides the concrete providers and a factory that wires one into an
//! [`LlmClassifier`].
//!
//! # Supported Providers
//!
//! - **Gemini** - the default service
//! - **Anthropic** - Claude models via the Messages API
//! - **OpenAI** (feature: `openai`) - chat completions via `async-openai`
//!
//! # Example
//!
//! ```ignore
//! use retain_core::RetainConfig;
//! use retain_llm::LlmFactory;
//!
//! let config = RetainConfig::from_env()?;
//! let classifier = LlmFactory::classifier(&config.classifier);
//! ```

mod anthropic;
mod factory;
mod gemini;
mod openai;

pub use anthropic::AnthropicLlm;
pub use factory::LlmFactory;
pub use gemini::GeminiLlm;
pub use openai::OpenAIProvider;

// Re-export core types for convenience
pub use retain_core::classifier::LlmClassifier;
pub use retain_core::config::LlmProvider;
pub use retain_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse, ResponseFormat};
