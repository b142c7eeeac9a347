/*!
 * Provider implementations for translation backends.
 *
 * This module contains client implementations for translation services:
 * - OpenAI: any OpenAI-compatible chat-completions server, Azure included
 * - Mock: configurable in-process provider for tests
 */

use std::fmt::Debug;

use async_trait::async_trait;

use crate::errors::ProviderError;

pub mod mock;
pub mod openai;

pub use mock::MockProvider;
pub use openai::OpenAiProvider;

/// One translation request: a single unit's text plus its surroundings.
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    /// Source text with placeholder markers inlined
    pub text: String,
    /// Source language code
    pub source_language: String,
    /// Target language code
    pub target_language: String,
    /// Neighboring-unit text preceding this unit, if any
    pub context_before: Option<String>,
    /// Neighboring-unit text following this unit, if any
    pub context_after: Option<String>,
}

/// A provider's answer for one unit.
#[derive(Debug, Clone)]
pub struct TranslationResponse {
    /// Translated text, markers preserved
    pub text: String,
    /// Prompt tokens billed, when the backend reports usage
    pub prompt_tokens: Option<u64>,
    /// Completion tokens billed, when the backend reports usage
    pub completion_tokens: Option<u64>,
}

/// Common trait for all translation providers.
///
/// The trait is object safe so the service can hold `Arc<dyn Provider>` and
/// swap backends at runtime.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Translate one unit.
    async fn complete(&self, request: &TranslationRequest)
        -> Result<TranslationResponse, ProviderError>;

    /// Test the connection to the provider.
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Provider name for logs and reports.
    fn name(&self) -> &str;
}
