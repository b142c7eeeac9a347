/*!
 * Job reporting.
 *
 * Every translation job produces a [`JobReport`]: a structured list of
 * non-fatal degradations plus overall counters. The report is the only place
 * a caller learns that a unit fell back to its source text, a page was
 * emitted untranslated, or a font was substituted by the universal fallback.
 */

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A single non-fatal degradation recorded during a job.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobWarning {
    /// The region detector was unavailable; the heuristic stood in
    LayoutDegraded {
        page: usize,
        reason: String,
    },

    /// No substitute font for a script; the universal fallback stood in
    FontSubstitutionDegraded {
        script: String,
        style: String,
        fallback: String,
    },

    /// Translated text exceeds its region box even at the floor font size
    Overflow {
        page: usize,
        unit: usize,
        /// Font size after shrinking, in points
        floor_size: f32,
    },

    /// A unit exhausted its retries and passed through untranslated
    TranslationFallback {
        page: usize,
        unit: usize,
        error: String,
    },

    /// A page failed to rebuild and was emitted with its original content
    PageFallback {
        page: usize,
        error: String,
    },
}

/// Aggregate report for one translation job.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    /// Unique job identifier
    pub job_id: String,
    /// Source language code as configured
    pub source_language: String,
    /// Target language code as configured
    pub target_language: String,
    /// Job start time
    pub started_at: DateTime<Utc>,
    /// Job completion time, set by [`JobReport::finish`]
    pub finished_at: Option<DateTime<Utc>>,
    /// Number of pages in the document
    pub pages: usize,
    /// Translation units produced by segmentation
    pub units_total: usize,
    /// Units successfully translated (cache hits included)
    pub units_translated: usize,
    /// Units that fell back to their source text
    pub units_failed: usize,
    /// Translation cache hits
    pub cache_hits: usize,
    /// All non-fatal degradations, in deterministic document order
    pub warnings: Vec<JobWarning>,
}

impl JobReport {
    pub fn new(source_language: &str, target_language: &str) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            pages: 0,
            units_total: 0,
            units_translated: 0,
            units_failed: 0,
            cache_hits: 0,
            warnings: Vec::new(),
        }
    }

    pub fn record(&mut self, warning: JobWarning) {
        self.warnings.push(warning);
    }

    pub fn record_all(&mut self, warnings: impl IntoIterator<Item = JobWarning>) {
        self.warnings.extend(warnings);
    }

    /// Mark the job complete.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// A job succeeds whenever it produced output; warnings do not fail it.
    pub fn is_success(&self) -> bool {
        self.finished_at.is_some()
    }

    /// Failure entries for a specific unit, used by degradation tests.
    pub fn translation_failures(&self) -> impl Iterator<Item = &JobWarning> {
        self.warnings
            .iter()
            .filter(|w| matches!(w, JobWarning::TranslationFallback { .. }))
    }
}
