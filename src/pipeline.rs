/*!
 * The translation pipeline.
 *
 * One [`Pipeline`] runs one or more jobs end to end: parse, layout, segment,
 * translate, resolve fonts, rebuild. Only a parse failure aborts a job;
 * every other condition degrades into the job report. Output artifacts are
 * deterministic for a given input and configuration regardless of worker
 * count.
 */

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::watch;

use crate::app_config::{Config, OutputMode};
use crate::document::{Document, DocumentParser};
use crate::errors::AppError;
use crate::fonts::{
    dominant_script, glyph_subset_of, BuiltinFontProvider, BundledFontProvider,
    ChainedFontProvider, FontFamily, FontKey, FontProvider, FontResolver, Script,
};
use crate::layout::{detect_with_fallback, HeuristicDetector, RegionDetector, RemoteDetector};
use crate::providers::{OpenAiProvider, Provider};
use crate::reconstruct::{unit_source_run, Reconstructor};
use crate::report::JobReport;
use crate::segment::{build_units, TranslationUnit};
use crate::translation::{translate_units, TranslationCache, TranslationService};

/// Everything a finished job hands back to the caller.
pub struct JobOutput {
    /// Monolingual artifact, when the output mode includes it
    pub mono: Option<Vec<u8>>,
    /// Bilingual artifact, when the output mode includes it
    pub dual: Option<Vec<u8>>,
    /// The job report, warnings included
    pub report: JobReport,
}

/// End-to-end translation pipeline.
pub struct Pipeline {
    config: Config,
    detector: Arc<dyn RegionDetector>,
    service: TranslationService,
    resolver: FontResolver,
}

/// Parse a font-config key like `han` or `cyrillic-mono`.
fn parse_font_key(key: &str) -> Option<(Script, FontFamily)> {
    let (script_part, family) = match key.split_once('-') {
        Some((s, "serif")) => (s, FontFamily::Serif),
        Some((s, "sans")) => (s, FontFamily::Sans),
        Some((s, "mono")) => (s, FontFamily::Mono),
        Some(_) => return None,
        None => (key, FontFamily::Sans),
    };
    Script::from_str(script_part).ok().map(|s| (s, family))
}

impl Pipeline {
    /// Build a pipeline with explicit collaborators, for tests and embedding.
    pub fn new(
        config: Config,
        detector: Arc<dyn RegionDetector>,
        provider: Arc<dyn Provider>,
        cache: Arc<TranslationCache>,
    ) -> Result<Self, AppError> {
        config.validate().map_err(|e| AppError::Config(e.to_string()))?;

        let mut bundled: HashMap<(Script, FontFamily), _> = HashMap::new();
        for (key, path) in &config.fonts.files {
            match parse_font_key(key) {
                Some(k) => {
                    bundled.insert(k, path.clone());
                }
                None => {
                    return Err(AppError::Config(format!("Invalid font key: {key}")));
                }
            }
        }
        let font_provider: Arc<dyn FontProvider> = Arc::new(ChainedFontProvider::new(vec![
            Arc::new(BuiltinFontProvider),
            Arc::new(BundledFontProvider::new(
                bundled,
                config.fonts.fallback.clone(),
            )),
        ]));
        // Warn up front when the configured fonts cannot cover the target
        // language; jobs will still run but degrade to the fallback font.
        let target_script = crate::language_utils::script_for_language(&config.target_language);
        if font_provider
            .font_for(target_script, &crate::fonts::StyleClass::default())
            .is_none()
            && font_provider.fallback_font().is_none()
        {
            warn!(
                "No substitute font configured for script '{}'; output will degrade",
                target_script
            );
        }
        let resolver = FontResolver::new(font_provider, config.font_subsetting_enabled);

        let service = TranslationService::new(provider, cache, config.translation.clone());
        Ok(Self {
            config,
            detector,
            service,
            resolver,
        })
    }

    /// Build a pipeline entirely from configuration.
    pub fn from_config(config: Config) -> Result<Self, AppError> {
        let detector: Arc<dyn RegionDetector> = match &config.detector.endpoint {
            Some(endpoint) => Arc::new(
                RemoteDetector::new(endpoint, config.detector.timeout_secs)
                    .map_err(|e| AppError::Config(e.to_string()))?,
            ),
            None => Arc::new(HeuristicDetector::new()),
        };
        let provider: Arc<dyn Provider> = Arc::new(OpenAiProvider::new(&config.translation)?);
        let cache = Arc::new(
            TranslationCache::open(config.cache.enabled, config.cache.path.as_deref())
                .map_err(|e| AppError::Config(e.to_string()))?,
        );
        Self::new(config, detector, provider, cache)
    }

    /// Probe the translation backend before starting work, so a bad key or
    /// endpoint fails up front instead of once per unit. Identity jobs never
    /// call the provider and skip the check.
    pub async fn verify_provider(&self) -> Result<(), AppError> {
        if crate::language_utils::language_codes_match(
            &self.config.source_language,
            &self.config.target_language,
        ) {
            return Ok(());
        }
        info!(
            "Checking connectivity of '{}' provider",
            self.service.provider_name()
        );
        self.service
            .test_connection()
            .await
            .map_err(AppError::Provider)
    }

    /// Run one job to completion.
    pub async fn run(&self, input: &[u8]) -> Result<JobOutput, AppError> {
        self.run_with(input, None, |_, _| {}).await
    }

    /// Run one job with cancellation and progress reporting.
    pub async fn run_with(
        &self,
        input: &[u8],
        cancel: Option<watch::Receiver<bool>>,
        progress_callback: impl Fn(usize, usize) + Clone + Send + Sync + 'static,
    ) -> Result<JobOutput, AppError> {
        let mut report = JobReport::new(&self.config.source_language, &self.config.target_language);

        // Parse. The only fatal stage.
        let document = DocumentParser::parse(input)?;
        report.pages = document.page_count();
        info!(
            "Parsed document: {} pages, translating {} -> {}",
            report.pages, report.source_language, report.target_language
        );

        // Layout and segmentation, page by page.
        let mut units: Vec<TranslationUnit> = Vec::new();
        for page in &document.pages {
            let (regions, warning) = detect_with_fallback(self.detector.as_ref(), page).await;
            report.record_all(warning);
            units.extend(build_units(page, &regions));
        }
        report.units_total = units.len();

        // Translate, collated back into document order.
        let outcome = translate_units(
            &self.service,
            units,
            &self.config.source_language,
            &self.config.target_language,
            self.config.worker_count,
            self.config.translation.context_chars,
            cancel,
            progress_callback,
        )
        .await
        .map_err(|e| match e {
            crate::errors::TranslationError::Cancelled => AppError::Cancelled,
            other => AppError::Translation(other),
        })?;
        report.units_translated = outcome.translated;
        report.units_failed = outcome.failed;
        report.cache_hits = outcome.cache_hits;
        report.record_all(outcome.warnings);
        let units = outcome.units;

        // Resolve fonts up front so each (font, script) pair aggregates the
        // glyphs of every unit sharing it before any page is rebuilt.
        self.resolve_fonts(&document, &units, &mut report);

        // Rebuild.
        let reconstructor = Reconstructor::new(&self.resolver, self.config.overflow_floor_ratio);
        let mut mono = None;
        let mut dual = None;

        if matches!(self.config.output_mode, OutputMode::Mono | OutputMode::Both) {
            let (mut doc, warnings) = reconstructor.rebuild_mono(&document, &units);
            report.record_all(warnings);
            mono = Some(save_document(&mut doc)?);
        }
        if matches!(self.config.output_mode, OutputMode::Dual | OutputMode::Both) {
            let (mut doc, warnings) =
                reconstructor.rebuild_dual(&document, &units, self.config.dual_layout)?;
            report.record_all(warnings);
            dual = Some(save_document(&mut doc)?);
        }

        report.finish();
        info!(
            "Job {} finished: {}/{} units translated, {} warnings",
            report.job_id,
            report.units_translated,
            report.units_total,
            report.warnings.len()
        );
        Ok(JobOutput { mono, dual, report })
    }

    /// Memoize every (source font, target script) pair with its full glyph
    /// set so the subset is complete before reconstruction reads it.
    fn resolve_fonts(
        &self,
        document: &Document,
        units: &[TranslationUnit],
        report: &mut JobReport,
    ) {
        let mut grouped: HashMap<FontKey, (crate::fonts::StyleClass, Vec<String>)> =
            HashMap::new();
        for unit in units {
            if unit.translation.is_none() {
                continue;
            }
            let text = unit.output_text();
            if text.trim().is_empty() {
                continue;
            }
            let Some(page) = document.pages.get(unit.page_index) else {
                continue;
            };
            let Some(run) = unit_source_run(page, unit) else {
                warn!("Unit {} has no source run", unit.unit_index);
                continue;
            };
            let key = FontKey::new(run.font.base_font.clone(), dominant_script(&text));
            grouped
                .entry(key)
                .or_insert_with(|| (unit.style, Vec::new()))
                .1
                .push(text);
        }

        // Deterministic resolution order
        let mut keys: Vec<_> = grouped.into_iter().collect();
        keys.sort_by(|a, b| {
            (a.0.source_font.as_str(), a.0.script.to_string())
                .cmp(&(b.0.source_font.as_str(), b.0.script.to_string()))
        });

        for (key, (style, texts)) in keys {
            let glyphs = glyph_subset_of(texts.iter().map(String::as_str));
            let (_, warning) = self.resolver.resolve(&key, &style, &glyphs);
            report.record_all(warning);
        }
    }
}

fn save_document(doc: &mut lopdf::Document) -> Result<Vec<u8>, AppError> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| AppError::File(e.to_string()))?;
    Ok(buffer)
}
