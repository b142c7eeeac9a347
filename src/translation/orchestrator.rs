/*!
 * Concurrent translation orchestration.
 *
 * Units are fanned out over a bounded worker pool and collected back into
 * document order, so output is deterministic regardless of which request
 * finishes first. A unit that exhausts its retries falls back to its source
 * text and is recorded in the job report; only cancellation aborts the run.
 */

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use log::{info, warn};
use tokio::sync::{watch, Semaphore};

use crate::errors::TranslationError;
use crate::report::JobWarning;
use crate::segment::TranslationUnit;
use crate::translation::TranslationService;

/// Result of orchestrating one document's units.
pub struct OrchestratorOutcome {
    /// The input units with `translation` filled in where it succeeded
    pub units: Vec<TranslationUnit>,
    /// Per-unit fallbacks, in document order
    pub warnings: Vec<JobWarning>,
    /// Units translated, cache hits included
    pub translated: usize,
    /// Units that fell back to their source text
    pub failed: usize,
    /// Cache hits among the translated units
    pub cache_hits: usize,
}

/// Tail of a unit's text, at most `budget` characters.
fn context_tail(text: &str, budget: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let start = chars.len().saturating_sub(budget);
    chars[start..].iter().collect()
}

/// Head of a unit's text, at most `budget` characters.
fn context_head(text: &str, budget: usize) -> String {
    text.chars().take(budget).collect()
}

/// Neighboring-unit context for each unit, one neighbor per side.
fn build_contexts(
    units: &[TranslationUnit],
    budget: usize,
) -> Vec<(Option<String>, Option<String>)> {
    (0..units.len())
        .map(|i| {
            let before = (i > 0 && budget > 0)
                .then(|| context_tail(&units[i - 1].source_text, budget));
            let after = (i + 1 < units.len() && budget > 0)
                .then(|| context_head(&units[i + 1].source_text, budget));
            (before, after)
        })
        .collect()
}

/// Translate a document's units concurrently.
///
/// `units` must be in document order; they are returned in the same order.
/// `cancel` aborts the job between units when it flips to `true`.
#[allow(clippy::too_many_arguments)]
pub async fn translate_units(
    service: &TranslationService,
    mut units: Vec<TranslationUnit>,
    source_language: &str,
    target_language: &str,
    worker_count: usize,
    context_chars: usize,
    cancel: Option<watch::Receiver<bool>>,
    progress_callback: impl Fn(usize, usize) + Clone + Send + Sync + 'static,
) -> Result<OrchestratorOutcome, TranslationError> {
    let total = units.len();
    if total == 0 {
        return Ok(OrchestratorOutcome {
            units,
            warnings: Vec::new(),
            translated: 0,
            failed: 0,
            cache_hits: 0,
        });
    }

    let contexts = build_contexts(&units, context_chars);
    let semaphore = Arc::new(Semaphore::new(worker_count.max(1)));
    let processed = Arc::new(AtomicUsize::new(0));

    let jobs: Vec<(usize, String, Option<String>, Option<String>)> = units
        .iter()
        .enumerate()
        .zip(contexts)
        .map(|((i, u), (before, after))| (i, u.source_text.clone(), before, after))
        .collect();

    let results = stream::iter(jobs)
        .map(|(index, text, before, after)| {
            let service = service.clone();
            let semaphore = Arc::clone(&semaphore);
            let processed = Arc::clone(&processed);
            let progress_callback = progress_callback.clone();
            let cancel = cancel.clone();
            let source_language = source_language.to_string();
            let target_language = target_language.to_string();

            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| TranslationError::Cancelled)?;

                if cancel.as_ref().map(|c| *c.borrow()).unwrap_or(false) {
                    return Err(TranslationError::Cancelled);
                }

                let result = service
                    .translate(&text, &source_language, &target_language, before, after)
                    .await;

                let current = processed.fetch_add(1, Ordering::SeqCst) + 1;
                progress_callback(current, total);

                Ok::<_, TranslationError>((index, result))
            }
        })
        .buffer_unordered(worker_count.max(1))
        .collect::<Vec<_>>()
        .await;

    let mut indexed = Vec::with_capacity(total);
    for r in results {
        match r {
            Ok(pair) => indexed.push(pair),
            Err(TranslationError::Cancelled) => return Err(TranslationError::Cancelled),
            Err(e) => return Err(e),
        }
    }
    // Completion order is arbitrary; document order is restored here
    indexed.sort_by_key(|(index, _)| *index);

    let mut warnings = Vec::new();
    let mut translated = 0;
    let mut failed = 0;
    let mut cache_hits = 0;

    for (index, result) in indexed {
        match result {
            Ok(outcome) => {
                if outcome.cache_hit {
                    cache_hits += 1;
                }
                translated += 1;
                units[index].translation = Some(outcome.text);
            }
            Err(e) => {
                warn!(
                    "Unit {} on page {} fell back to source text: {}",
                    units[index].unit_index, units[index].page_index, e
                );
                failed += 1;
                warnings.push(JobWarning::TranslationFallback {
                    page: units[index].page_index,
                    unit: units[index].unit_index,
                    error: e.to_string(),
                });
                units[index].translation = None;
            }
        }
    }

    info!(
        "Translated {}/{} units ({} cache hits, {} fallbacks)",
        translated, total, cache_hits, failed
    );

    Ok(OrchestratorOutcome {
        units,
        warnings,
        translated,
        failed,
        cache_hits,
    })
}
