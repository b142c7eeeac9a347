use std::sync::Arc;

use pdflate::app_config::{Config, OutputMode};
use pdflate::document::DocumentParser;
use pdflate::layout::HeuristicDetector;
use pdflate::pipeline::Pipeline;
use pdflate::providers::MockProvider;
use pdflate::report::JobWarning;
use pdflate::translation::TranslationCache;

use crate::common::{TestPage, TestPdf, TestText};

fn config(source: &str, target: &str) -> Config {
    Config {
        source_language: source.to_string(),
        target_language: target.to_string(),
        ..Config::default()
    }
}

fn pipeline(config: Config, provider: MockProvider) -> Pipeline {
    crate::common::init_logging();
    Pipeline::new(
        config,
        Arc::new(HeuristicDetector::new()),
        Arc::new(provider),
        Arc::new(TranslationCache::in_memory(true).unwrap()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_run_withWorkingProvider_shouldProduceTranslatedMono() {
    let input = TestPdf::single_text("Hello World", 72.0, 700.0, 12.0);
    let provider = MockProvider::working().with_translation("Hello World", "Bonjour le monde");
    let pipeline = pipeline(config("en", "fr"), provider);

    let output = pipeline.run(&input).await.unwrap();
    assert!(output.report.is_success());
    assert_eq!(output.report.pages, 1);
    assert_eq!(output.report.units_total, 1);
    assert_eq!(output.report.units_translated, 1);
    assert_eq!(output.report.units_failed, 0);
    assert!(output.dual.is_none());

    let mono = output.mono.expect("mono artifact");
    let reparsed = DocumentParser::parse(&mono).unwrap();
    let text = reparsed.pages[0].plain_text();
    assert!(text.contains("Bonjour le monde"), "got: {text}");
    assert!(!text.contains("Hello World"));
}

#[tokio::test]
async fn test_run_withOutputModeBoth_shouldProduceBothArtifacts() {
    let input = TestPdf::single_text("Hello World", 72.0, 700.0, 12.0);
    let provider = MockProvider::working().with_translation("Hello World", "Bonjour le monde");
    let mut cfg = config("en", "fr");
    cfg.output_mode = OutputMode::Both;
    let pipeline = pipeline(cfg, provider);

    let output = pipeline.run(&input).await.unwrap();
    let mono = output.mono.expect("mono artifact");
    let dual = output.dual.expect("dual artifact");

    assert_eq!(DocumentParser::parse(&mono).unwrap().page_count(), 1);
    // Default dual layout interleaves source and translation
    let dual_doc = DocumentParser::parse(&dual).unwrap();
    assert_eq!(dual_doc.page_count(), 2);
    assert_eq!(dual_doc.pages[0].plain_text(), "Hello World");
    assert!(dual_doc.pages[1].plain_text().contains("Bonjour le monde"));
}

#[tokio::test]
async fn test_run_withIdentityLanguagePair_shouldSkipProvider() {
    let input = TestPdf::single_text("Unchanged text", 72.0, 700.0, 12.0);
    let provider = MockProvider::failing();
    let observer = provider.clone();
    let pipeline = pipeline(config("en", "eng"), provider);

    let output = pipeline.run(&input).await.unwrap();
    assert_eq!(output.report.units_failed, 0);
    assert_eq!(observer.request_count(), 0);

    let mono = output.mono.expect("mono artifact");
    let reparsed = DocumentParser::parse(&mono).unwrap();
    assert!(reparsed.pages[0].plain_text().contains("Unchanged text"));
}

#[tokio::test]
async fn test_run_withMultiplePages_shouldTranslateEveryPage() {
    let input = TestPdf::new()
        .page(TestPage::with_texts(vec![TestText::new(
            "First page", 72.0, 700.0, 12.0,
        )]))
        .page(TestPage::with_texts(vec![TestText::new(
            "Second page", 72.0, 700.0, 12.0,
        )]))
        .build();
    let provider = MockProvider::working();
    let pipeline = pipeline(config("en", "fr"), provider);

    let output = pipeline.run(&input).await.unwrap();
    assert_eq!(output.report.pages, 2);
    assert_eq!(output.report.units_translated, 2);

    let mono = output.mono.expect("mono artifact");
    let reparsed = DocumentParser::parse(&mono).unwrap();
    assert!(reparsed.pages[0].plain_text().contains("[fr] First page"));
    assert!(reparsed.pages[1].plain_text().contains("[fr] Second page"));
}

#[tokio::test]
async fn test_run_withRepeatedText_shouldHitCache() {
    let input = TestPdf::new()
        .page(TestPage::with_texts(vec![TestText::new(
            "Same text", 72.0, 700.0, 12.0,
        )]))
        .page(TestPage::with_texts(vec![TestText::new(
            "Same text", 72.0, 700.0, 12.0,
        )]))
        .build();
    let provider = MockProvider::working();
    let observer = provider.clone();
    // One worker serializes the two units so the second sees the cache entry
    let mut cfg = config("en", "fr");
    cfg.worker_count = 1;
    let pipeline = pipeline(cfg, provider);

    let output = pipeline.run(&input).await.unwrap();
    assert_eq!(output.report.units_translated, 2);
    assert_eq!(output.report.cache_hits, 1);
    assert_eq!(observer.request_count(), 1);
}

#[tokio::test]
async fn test_run_withOverlongTranslation_shouldReportOverflow() {
    let input = TestPdf::single_text("Hello World", 72.0, 700.0, 12.0);
    // Far too wide for the run box even at the floor size
    let provider = MockProvider::working().with_translation(
        "Hello World",
        "Une traduction beaucoup trop longue pour tenir dans la geometrie du texte d'origine",
    );
    let pipeline = pipeline(config("en", "fr"), provider);

    let output = pipeline.run(&input).await.unwrap();
    assert!(output.report.is_success());
    assert!(output.mono.is_some());
    assert!(output
        .report
        .warnings
        .iter()
        .any(|w| matches!(w, JobWarning::Overflow { page: 0, .. })));
}

#[tokio::test]
async fn test_verify_provider_withFailingBackend_shouldError() {
    let pipeline = pipeline(config("en", "fr"), MockProvider::failing());
    assert!(pipeline.verify_provider().await.is_err());
}

#[tokio::test]
async fn test_verify_provider_withIdentityPair_shouldSkipProbe() {
    let provider = MockProvider::failing();
    let observer = provider.clone();
    let pipeline = pipeline(config("en", "eng"), provider);
    assert!(pipeline.verify_provider().await.is_ok());
    assert_eq!(observer.request_count(), 0);
}

#[tokio::test]
async fn test_run_withInvalidBytes_shouldFailToParse() {
    let pipeline = pipeline(config("en", "fr"), MockProvider::working());
    assert!(pipeline.run(b"not a pdf").await.is_err());
}
