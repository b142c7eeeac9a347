use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use rand::Rng;

use crate::app_config::TranslationConfig;
use crate::errors::{ProviderError, TranslationError};
use crate::language_utils::{language_codes_match, normalize_to_part3};
use crate::providers::{Provider, TranslationRequest};
use crate::translation::{RateLimiter, TranslationCache};

/// Result of translating one unit's text.
#[derive(Debug, Clone)]
pub struct UnitOutcome {
    /// Translated text, markers preserved
    pub text: String,
    /// Whether the result came from the cache
    pub cache_hit: bool,
}

/// Per-unit translation with caching, rate limiting and retry.
///
/// The service is cheap to clone; provider, cache and limiter are shared.
#[derive(Clone)]
pub struct TranslationService {
    provider: Arc<dyn Provider>,
    cache: Arc<TranslationCache>,
    rate_limiter: Option<Arc<RateLimiter>>,
    config: TranslationConfig,
}

impl TranslationService {
    pub fn new(
        provider: Arc<dyn Provider>,
        cache: Arc<TranslationCache>,
        config: TranslationConfig,
    ) -> Self {
        let rate_limiter = config.rate_limit.map(|rpm| Arc::new(RateLimiter::new(rpm)));
        Self {
            provider,
            cache,
            rate_limiter,
            config,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Probe the provider with a minimal request.
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        self.provider.test_connection().await
    }

    /// Translate one unit's text.
    ///
    /// Identity language pairs short-circuit to the source text. Transient
    /// provider failures are retried with exponential backoff; permanent
    /// failures surface immediately.
    pub async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        context_before: Option<String>,
        context_after: Option<String>,
    ) -> Result<UnitOutcome, TranslationError> {
        if language_codes_match(source_language, target_language) {
            return Ok(UnitOutcome {
                text: text.to_string(),
                cache_hit: false,
            });
        }

        if normalize_to_part3(source_language).is_err()
            || normalize_to_part3(target_language).is_err()
        {
            return Err(TranslationError::InvalidLanguagePair {
                source_language: source_language.to_string(),
                target_language: target_language.to_string(),
            });
        }

        if let Some(hit) = self
            .cache
            .get(text, source_language, target_language, &self.config.model)
            .await
        {
            return Ok(UnitOutcome {
                text: hit,
                cache_hit: true,
            });
        }

        let request = TranslationRequest {
            text: text.to_string(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            context_before,
            context_after,
        };

        let translated = self.complete_with_retry(&request).await?;
        self.cache
            .put(
                text,
                source_language,
                target_language,
                &self.config.model,
                &translated,
            )
            .await;

        Ok(UnitOutcome {
            text: translated,
            cache_hit: false,
        })
    }

    async fn complete_with_retry(
        &self,
        request: &TranslationRequest,
    ) -> Result<String, TranslationError> {
        let attempts = self.config.retry_count.max(1);
        let mut last_error: Option<ProviderError> = None;

        for attempt in 1..=attempts {
            if let Some(limiter) = &self.rate_limiter {
                limiter.acquire().await;
            }

            let result = tokio::time::timeout(
                Duration::from_secs(self.config.timeout_secs),
                self.provider.complete(request),
            )
            .await
            .unwrap_or(Err(ProviderError::Timeout(self.config.timeout_secs)));

            match result {
                Ok(response) => {
                    debug!(
                        "Translated {} chars on attempt {}",
                        request.text.len(),
                        attempt
                    );
                    return Ok(response.text);
                }
                Err(e) if e.is_transient() && attempt < attempts => {
                    let backoff = self.backoff_delay(attempt);
                    warn!(
                        "Transient provider error on attempt {}/{}: {}. Retrying in {:?}",
                        attempt, attempts, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(TranslationError::Provider(e)),
            }
        }

        // Reachable only when the final attempt hit the transient arm, which
        // the attempt guard prevents; keep a sane error anyway.
        Err(TranslationError::Provider(last_error.unwrap_or(
            ProviderError::RequestFailed("Retries exhausted".to_string()),
        )))
    }

    /// Exponential backoff with jitter: `base * 2^(attempt-1)` plus up to
    /// half the base.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.retry_backoff_ms;
        let exp = base.saturating_mul(1u64 << (attempt.min(16) - 1));
        let jitter = rand::rng().random_range(0..=base / 2);
        Duration::from_millis(exp.saturating_add(jitter))
    }
}
