/*!
 * Translation service.
 *
 * This module owns everything between a [`crate::segment::TranslationUnit`]
 * and its translated text: rate limiting, caching, retry with exponential
 * backoff, and the concurrent orchestration that keeps job output in
 * deterministic document order regardless of completion order.
 */

pub mod cache;
pub mod core;
pub mod orchestrator;
pub mod rate_limit;

pub use cache::TranslationCache;
pub use core::TranslationService;
pub use orchestrator::{translate_units, OrchestratorOutcome};
pub use rate_limit::RateLimiter;
