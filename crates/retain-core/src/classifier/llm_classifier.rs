//! Memory classifier backed by an [`Llm`].

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::parse::parse_judgment;
use super::prompts::comparison_messages;
use super::{ClassifierOutcome, ComparisonRequest, FallbackReason, Judgment, MemoryClassifier};
use crate::config::{ClassifierConfig, RetryPolicy};
use crate::traits::{GenerationOptions, Llm, ResponseFormat};

/// Classifier that asks an LLM to compare attempts.
///
/// Built without an LLM it is "unconfigured" and every comparison yields
/// [`FallbackReason::NotConfigured`].
pub struct LlmClassifier {
    llm: Option<Arc<dyn Llm>>,
    service: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl LlmClassifier {
    pub fn new(llm: Arc<dyn Llm>, service: impl Into<String>, config: &ClassifierConfig) -> Self {
        Self::from_parts(Some(llm), service, config.timeout(), config.retry.clone())
    }

    /// A classifier with no backing service.
    pub fn unconfigured(service: impl Into<String>) -> Self {
        let config = ClassifierConfig::default();
        Self::from_parts(None, service, config.timeout(), config.retry)
    }

    pub fn from_parts(
        llm: Option<Arc<dyn Llm>>,
        service: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            llm,
            service: service.into(),
            timeout,
            retry,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.llm.is_some()
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    async fn call_once(
        &self,
        llm: &dyn Llm,
        request: &ComparisonRequest,
    ) -> Result<Judgment, FallbackReason> {
        let messages = comparison_messages(request);
        let options = GenerationOptions {
            temperature: Some(0.1),
            response_format: llm.supports_json_mode().then_some(ResponseFormat::Json),
            ..Default::default()
        };

        let response = tokio::time::timeout(self.timeout, llm.generate(&messages, Some(options)))
            .await
            .map_err(|_| FallbackReason::Timeout {
                after_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            })?
            .map_err(|e| FallbackReason::Unavailable(e.to_string()))?;

        let content = response.content_or_empty();
        debug!(model = llm.model_name(), "classifier response: {}", content);
        parse_judgment(content)
    }
}

#[async_trait]
impl MemoryClassifier for LlmClassifier {
    async fn compare(&self, request: &ComparisonRequest) -> ClassifierOutcome {
        let Some(llm) = self.llm.as_deref() else {
            warn!(service = %self.service, "classifier not configured, using fallback verdict");
            return ClassifierOutcome::Fallback(FallbackReason::NotConfigured {
                service: self.service.clone(),
            });
        };

        let policy = &self.retry;
        let result = (|| self.call_once(llm, request))
            .retry(
                ExponentialBuilder::default()
                    .with_max_times(policy.max_retries as usize)
                    .with_min_delay(Duration::from_millis(policy.initial_delay_ms))
                    .with_max_delay(Duration::from_millis(policy.max_delay_ms)),
            )
            .when(FallbackReason::is_transient)
            .notify(|reason, dur| {
                warn!(
                    "Classifier call to {} failed, retrying in {:?}: {}",
                    self.service, dur, reason
                );
            })
            .await;

        match result {
            Ok(judgment) => ClassifierOutcome::Judged(judgment),
            Err(reason) => {
                warn!(service = %self.service, %reason, "classifier fell back to FORGOT");
                ClassifierOutcome::Fallback(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RetainError, RetainResult};
    use crate::traits::LlmResponse;
    use crate::types::{MemoryRating, Message};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    enum Step {
        Reply(&'static str),
        Fail,
        Hang,
    }

    /// Llm that plays back a fixed script, one step per call.
    struct ScriptedLlm {
        steps: Mutex<VecDeque<Step>>,
        calls: AtomicUsize,
    }

    impl ScriptedLlm {
        fn new(steps: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Llm for ScriptedLlm {
        async fn generate(
            &self,
            _messages: &[Message],
            _options: Option<GenerationOptions>,
        ) -> RetainResult<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self.steps.lock().unwrap().pop_front();
            match step {
                Some(Step::Reply(text)) => Ok(LlmResponse::text(text)),
                Some(Step::Fail) | None => Err(RetainError::llm("503 Service Unavailable")),
                Some(Step::Hang) => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(LlmResponse::text("{}"))
                }
            }
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn request() -> ComparisonRequest {
        ComparisonRequest {
            problem_description: "Two sum".into(),
            original_approach: "hash map".into(),
            original_code: None,
            new_approach: "hash map again".into(),
            new_code: None,
        }
    }

    fn classifier(llm: Arc<ScriptedLlm>, max_retries: u32, timeout: Duration) -> LlmClassifier {
        LlmClassifier::from_parts(
            Some(llm),
            "Gemini",
            timeout,
            RetryPolicy {
                max_retries,
                initial_delay_ms: 1,
                max_delay_ms: 5,
            },
        )
    }

    #[tokio::test]
    async fn test_judged_response() {
        let llm = ScriptedLlm::new(vec![Step::Reply(
            r#"{"summary": "Same idea.", "rating": "REMEMBERED"}"#,
        )]);
        let outcome = classifier(llm.clone(), 0, Duration::from_secs(5))
            .compare(&request())
            .await;

        assert_eq!(
            outcome,
            ClassifierOutcome::Judged(Judgment {
                summary: "Same idea.".into(),
                rating: MemoryRating::Remembered,
            })
        );
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_unconfigured_falls_back() {
        let outcome = LlmClassifier::unconfigured("Gemini").compare(&request()).await;
        assert_eq!(
            outcome.fallback_reason(),
            Some(&FallbackReason::NotConfigured {
                service: "Gemini".into()
            })
        );
        assert_eq!(outcome.judgment().summary, "Gemini not configured.");
    }

    #[tokio::test]
    async fn test_malformed_response_is_not_retried() {
        let llm = ScriptedLlm::new(vec![Step::Reply("no json here"), Step::Reply("{}")]);
        let outcome = classifier(llm.clone(), 3, Duration::from_secs(5))
            .compare(&request())
            .await;

        assert!(matches!(
            outcome.fallback_reason(),
            Some(FallbackReason::Malformed(_))
        ));
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_rating_falls_back_to_forgot() {
        let llm = ScriptedLlm::new(vec![Step::Reply(r#"{"summary": "?", "rating": "ALMOST"}"#)]);
        let outcome = classifier(llm, 0, Duration::from_secs(5))
            .compare(&request())
            .await;

        assert_eq!(
            outcome.fallback_reason(),
            Some(&FallbackReason::InvalidRating("ALMOST".into()))
        );
        assert_eq!(outcome.judgment().rating, MemoryRating::Forgot);
        assert_eq!(outcome.judgment().summary, "Error analyzing attempt.");
    }

    #[tokio::test]
    async fn test_service_error_without_retries() {
        let llm = ScriptedLlm::new(vec![Step::Fail]);
        let outcome = classifier(llm.clone(), 0, Duration::from_secs(5))
            .compare(&request())
            .await;

        assert!(matches!(
            outcome.fallback_reason(),
            Some(FallbackReason::Unavailable(_))
        ));
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_transient_error_is_retried() {
        let llm = ScriptedLlm::new(vec![
            Step::Fail,
            Step::Fail,
            Step::Reply(r#"{"summary": "Got there.", "rating": "PARTIAL"}"#),
        ]);
        let outcome = classifier(llm.clone(), 2, Duration::from_secs(5))
            .compare(&request())
            .await;

        assert_eq!(outcome.judgment().rating, MemoryRating::Partial);
        assert!(!outcome.is_fallback());
        assert_eq!(llm.calls(), 3);
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let llm = ScriptedLlm::new(vec![Step::Hang]);
        let outcome = classifier(llm, 0, Duration::from_millis(20))
            .compare(&request())
            .await;

        assert_eq!(
            outcome.fallback_reason(),
            Some(&FallbackReason::Timeout { after_ms: 20 })
        );
        assert_eq!(outcome.judgment().rating, MemoryRating::Forgot);
    }
}
