/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::working()` - Always succeeds with translated text
 * - `MockProvider::intermittent(n)` - Fails every nth request
 * - `MockProvider::failing()` - Always fails with an error
 */

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::ProviderError;
use crate::providers::{Provider, TranslationRequest, TranslationResponse};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a marked-up translation
    Working,
    /// Fails intermittently (every nth request)
    Intermittent { fail_every: usize },
    /// Fails transiently for the first n requests, then succeeds
    FailFirst { failures: usize },
    /// Always fails with a permanent error
    Failing,
    /// Always fails with a transient error
    Transient,
    /// Simulates a slow backend (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    behavior: MockBehavior,
    /// Request counter, shared across clones
    request_count: Arc<AtomicUsize>,
    /// Fixed translations per source text
    lexicon: HashMap<String, String>,
}

impl MockProvider {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            lexicon: HashMap::new(),
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a mock that fails transiently n times before succeeding
    pub fn fail_first(failures: usize) -> Self {
        Self::new(MockBehavior::FailFirst { failures })
    }

    /// Create a failing mock provider that always errors permanently
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that always fails with a transient error
    pub fn transient() -> Self {
        Self::new(MockBehavior::Transient)
    }

    /// Create a mock that delays every response
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Add a fixed translation for a source text
    pub fn with_translation(mut self, source: &str, target: &str) -> Self {
        self.lexicon.insert(source.to_string(), target.to_string());
        self
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    fn translate(&self, request: &TranslationRequest) -> String {
        match self.lexicon.get(&request.text) {
            Some(t) => t.clone(),
            None => format!("[{}] {}", request.target_language, request.text),
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            lexicon: self.lexicon.clone(),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        request: &TranslationRequest,
    ) -> Result<TranslationResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            MockBehavior::Working => Ok(TranslationResponse {
                text: self.translate(request),
                prompt_tokens: Some(request.text.len() as u64),
                completion_tokens: Some((request.text.len() / 2) as u64),
            }),

            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        status_code: 503,
                        message: "Simulated intermittent failure".to_string(),
                    })
                } else {
                    Ok(TranslationResponse {
                        text: self.translate(request),
                        prompt_tokens: None,
                        completion_tokens: None,
                    })
                }
            }

            MockBehavior::FailFirst { failures } => {
                if count < failures {
                    Err(ProviderError::ApiError {
                        status_code: 500,
                        message: "Simulated startup failure".to_string(),
                    })
                } else {
                    Ok(TranslationResponse {
                        text: self.translate(request),
                        prompt_tokens: None,
                        completion_tokens: None,
                    })
                }
            }

            MockBehavior::Failing => Err(ProviderError::AuthenticationError(
                "Simulated permanent failure".to_string(),
            )),

            MockBehavior::Transient => Err(ProviderError::ApiError {
                status_code: 500,
                message: "Simulated transient failure".to_string(),
            }),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                Ok(TranslationResponse {
                    text: self.translate(request),
                    prompt_tokens: None,
                    completion_tokens: None,
                })
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::AuthenticationError(
                "Simulated permanent failure".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
