//! LLM-backed explanation, action and justification generation.
//!
//! The generative service is the only network dependency in the pipeline,
//! so calls carry their own timeout and a bounded exponential-backoff retry
//! budget. When the budget is exhausted the classification fails; canned
//! explanation text is never substituted.

use crate::config::LlmConfig;
use crate::error::{GenerationError, PipelineError, PipelineResult};
use crate::types::DisputeCategory;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// A generative-language service: one prompt in, free-form text out.
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Narrative annotations produced for one classified dispute.
#[derive(Debug, Clone)]
pub struct Narrative {
    pub explanation: String,
    pub suggested_action: String,
    pub justification: String,
}

/// Generates the explanation, suggested action and justification for a
/// predicted category.
pub struct ExplanationGenerator<C: GenerativeClient> {
    client: C,
    max_attempts: u32,
    base_backoff: Duration,
}

impl<C: GenerativeClient> ExplanationGenerator<C> {
    pub fn new(client: C, max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            client,
            max_attempts: max_attempts.max(1),
            base_backoff,
        }
    }

    /// Produce the full narrative for a dispute.
    ///
    /// The action comes from the fixed per-category resolution table; the
    /// explanation and justification each cost one generative call.
    pub async fn explain(
        &self,
        description: &str,
        category: DisputeCategory,
    ) -> PipelineResult<Narrative> {
        let action = category.suggested_action();

        let explanation = self
            .generate_with_retry(&explanation_prompt(description, category))
            .await?;
        let justification = self
            .generate_with_retry(&justification_prompt(description, category, action))
            .await?;

        Ok(Narrative {
            explanation,
            suggested_action: action.to_string(),
            justification,
        })
    }

    async fn generate_with_retry(&self, prompt: &str) -> PipelineResult<String> {
        let mut backoff = self.base_backoff;

        for attempt in 1..=self.max_attempts {
            match self.client.generate(prompt).await {
                Ok(text) => {
                    let text = text.trim().to_string();
                    if !text.is_empty() {
                        debug!(attempt, "generation succeeded");
                        return Ok(text);
                    }
                    // An empty completion is as unusable as a failed call.
                    if attempt == self.max_attempts {
                        return Err(PipelineError::ExplanationUnavailable {
                            attempts: attempt,
                            source: GenerationError::Malformed("empty completion".to_string()),
                        });
                    }
                    warn!(attempt, "empty completion, retrying");
                }
                Err(e) => {
                    if attempt == self.max_attempts {
                        return Err(PipelineError::ExplanationUnavailable {
                            attempts: attempt,
                            source: e,
                        });
                    }
                    warn!(attempt, error = %e, "generation failed, retrying");
                }
            }

            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }

        unreachable!("retry loop returns on final attempt")
    }
}

fn explanation_prompt(description: &str, category: DisputeCategory) -> String {
    format!(
        "You are an AI assistant for a financial support agent. A customer's \
         dispute has been classified.\n\
         - Customer's description: \"{description}\"\n\
         - Predicted category: {category}\n\
         Explain in one clear sentence why this dispute falls into the \
         '{category}' category, quoting key evidence from the customer's \
         description."
    )
}

fn justification_prompt(description: &str, category: DisputeCategory, action: &str) -> String {
    format!(
        "You are an AI assistant helping a financial support agent. A customer \
         dispute has been analyzed.\n\
         - Customer's description: \"{description}\"\n\
         - Classified as: {category}\n\
         - Suggested next action: {action}\n\
         Write a brief, one-sentence justification for the agent explaining why \
         '{action}' is the correct next step, connecting it to the customer's \
         complaint."
    )
}

// ── OpenAI-compatible chat-completions client ──

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    max_tokens: u32,
}

impl OpenAiGenerator {
    /// Build the client from configuration. The API key is read from the
    /// environment variable named in the config; a missing key is a startup
    /// failure, not a per-request one.
    pub fn from_config(config: &LlmConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            anyhow::anyhow!(
                "environment variable '{}' with the LLM API key is not set",
                config.api_key_env
            )
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl GenerativeClient for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You write clear, evidence-based answers for financial support agents.",
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.0,
            max_tokens: self.max_tokens,
        };

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationError::Malformed("no completion choices".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Client that fails a fixed number of times before answering.
    struct FlakyClient {
        fail_first: u32,
        calls: AtomicU32,
        answer: &'static str,
    }

    impl FlakyClient {
        fn new(fail_first: u32, answer: &'static str) -> Self {
            Self {
                fail_first,
                calls: AtomicU32::new(0),
                answer,
            }
        }
    }

    #[async_trait]
    impl GenerativeClient for FlakyClient {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                Err(GenerationError::Api {
                    status: 429,
                    body: "rate limited".to_string(),
                })
            } else {
                Ok(self.answer.to_string())
            }
        }
    }

    /// Client that records the prompts it receives.
    struct RecordingClient {
        prompts: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl GenerativeClient for RecordingClient {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("Because the customer says so.".to_string())
        }
    }

    fn generator<C: GenerativeClient>(client: C) -> ExplanationGenerator<C> {
        ExplanationGenerator::new(client, 3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn narrative_carries_category_action() {
        let gen = generator(FlakyClient::new(0, "The customer was charged twice."));
        let narrative = gen
            .explain("charged twice for one coffee", DisputeCategory::DuplicateCharge)
            .await
            .unwrap();

        assert_eq!(narrative.suggested_action, "Auto-refund");
        assert_eq!(narrative.explanation, "The customer was charged twice.");
        assert!(!narrative.justification.is_empty());
    }

    #[tokio::test]
    async fn prompts_quote_description_and_category() {
        let client = RecordingClient {
            prompts: std::sync::Mutex::new(Vec::new()),
        };
        let gen = generator(client);
        gen.explain("my refund never arrived", DisputeCategory::RefundPending)
            .await
            .unwrap();

        let prompts = gen.client.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("my refund never arrived"));
        assert!(prompts[0].contains("REFUND_PENDING"));
        assert!(prompts[1].contains("Ask for more info"));
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        // Two failures, then success: inside the 3-attempt budget.
        let gen = generator(FlakyClient::new(2, "Recovered."));
        let text = gen.generate_with_retry("prompt").await.unwrap();
        assert_eq!(text, "Recovered.");
        assert_eq!(gen.client.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_budget_surfaces_unavailable() {
        let gen = generator(FlakyClient::new(10, "never reached"));
        let err = gen.generate_with_retry("prompt").await.unwrap_err();

        match err {
            PipelineError::ExplanationUnavailable { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected ExplanationUnavailable, got {other:?}"),
        }
        assert_eq!(gen.client.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_completions_are_rejected() {
        struct EmptyClient;

        #[async_trait]
        impl GenerativeClient for EmptyClient {
            async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
                Ok("   ".to_string())
            }
        }

        let gen = generator(EmptyClient);
        let err = gen.generate_with_retry("prompt").await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ExplanationUnavailable { attempts: 3, .. }
        ));
    }
}
