use std::sync::Arc;

use tokio::sync::watch;

use pdflate::app_config::Config;
use pdflate::document::DocumentParser;
use pdflate::errors::AppError;
use pdflate::geometry::Rect;
use pdflate::layout::{Region, RegionClass};
use pdflate::pipeline::Pipeline;
use pdflate::providers::MockProvider;
use pdflate::report::JobWarning;
use pdflate::translation::TranslationCache;

use crate::common::{ScriptedDetector, TestPdf};

fn config() -> Config {
    Config {
        source_language: "en".to_string(),
        target_language: "fr".to_string(),
        ..Config::default()
    }
}

fn pipeline(detector: ScriptedDetector, provider: MockProvider) -> Pipeline {
    crate::common::init_logging();
    Pipeline::new(
        config(),
        Arc::new(detector),
        Arc::new(provider),
        Arc::new(TranslationCache::in_memory(false).unwrap()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_run_withFailingProvider_shouldPassThroughUntranslated() {
    let input = TestPdf::single_text("Hello World", 72.0, 700.0, 12.0);
    let pipeline = pipeline(ScriptedDetector::Failing, MockProvider::failing());

    let output = pipeline.run(&input).await.unwrap();
    // The job still succeeds; the failure is reported, not fatal.
    assert!(output.report.is_success());
    assert_eq!(output.report.units_failed, 1);
    assert_eq!(output.report.units_translated, 0);
    assert_eq!(output.report.translation_failures().count(), 1);

    // Untranslated units keep their exact original appearance.
    let mono = output.mono.expect("mono artifact");
    let reparsed = DocumentParser::parse(&mono).unwrap();
    assert_eq!(reparsed.pages[0].plain_text(), "Hello World");
}

#[tokio::test]
async fn test_run_withFailingDetector_shouldFallBackToHeuristic() {
    let input = TestPdf::single_text("Hello World", 72.0, 700.0, 12.0);
    let pipeline = pipeline(ScriptedDetector::Failing, MockProvider::working());

    let output = pipeline.run(&input).await.unwrap();
    assert!(output
        .report
        .warnings
        .iter()
        .any(|w| matches!(w, JobWarning::LayoutDegraded { page: 0, .. })));
    // The heuristic still yields a translatable unit
    assert_eq!(output.report.units_translated, 1);
}

#[tokio::test]
async fn test_run_withFormulaRegion_shouldNotTranslateItsText() {
    let input = TestPdf::single_text("E = mc^2", 72.0, 700.0, 12.0);
    let provider = MockProvider::working();
    let observer = provider.clone();
    let detector = ScriptedDetector::Regions(vec![Region {
        bbox: Rect::new(0.0, 0.0, 612.0, 792.0),
        class: RegionClass::Formula,
        confidence: 0.95,
    }]);
    let pipeline = pipeline(detector, provider);

    let output = pipeline.run(&input).await.unwrap();
    assert_eq!(output.report.units_total, 0);
    assert_eq!(observer.request_count(), 0);

    let mono = output.mono.expect("mono artifact");
    let reparsed = DocumentParser::parse(&mono).unwrap();
    assert_eq!(reparsed.pages[0].plain_text(), "E = mc^2");
}

#[tokio::test]
async fn test_run_withCancellation_shouldAbortTheJob() {
    let input = TestPdf::single_text("Hello World", 72.0, 700.0, 12.0);
    let pipeline = pipeline(ScriptedDetector::Failing, MockProvider::slow(10_000));

    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();
    let result = pipeline.run_with(&input, Some(rx), |_, _| {}).await;
    assert!(matches!(result, Err(AppError::Cancelled)));
}

#[tokio::test]
async fn test_run_withUncoveredScript_shouldDegradeFontAndReport() {
    let input = TestPdf::single_text("Hello World", 72.0, 700.0, 12.0);
    // Chinese output with no bundled CJK font: the builtin Latin fallback
    // stands in and the degradation is reported.
    let provider = MockProvider::working().with_translation("Hello World", "你好世界");
    let pipeline = Pipeline::new(
        Config {
            source_language: "en".to_string(),
            target_language: "zh".to_string(),
            ..Config::default()
        },
        Arc::new(ScriptedDetector::Failing),
        Arc::new(provider),
        Arc::new(TranslationCache::in_memory(false).unwrap()),
    )
    .unwrap();

    let output = pipeline.run(&input).await.unwrap();
    assert!(output.report.is_success());
    assert!(output
        .report
        .warnings
        .iter()
        .any(|w| matches!(w, JobWarning::FontSubstitutionDegraded { .. })));
    assert!(output.mono.is_some());
}
