use std::sync::Arc;

use pdflate::app_config::{Config, OutputMode};
use pdflate::layout::HeuristicDetector;
use pdflate::pipeline::Pipeline;
use pdflate::providers::MockProvider;
use pdflate::translation::TranslationCache;

use crate::common::{TestPage, TestPdf, TestText};

/// Several well-separated units per page so concurrent translation actually
/// has work to reorder.
fn input() -> Vec<u8> {
    TestPdf::new()
        .page(TestPage::with_texts(vec![
            TestText::new("Alpha paragraph", 72.0, 700.0, 12.0),
            TestText::new("Beta paragraph", 72.0, 600.0, 12.0),
            TestText::new("Gamma paragraph", 72.0, 500.0, 12.0),
            TestText::new("Delta paragraph", 72.0, 400.0, 12.0),
        ]))
        .page(TestPage::with_texts(vec![
            TestText::new("Epsilon paragraph", 72.0, 700.0, 12.0),
            TestText::new("Zeta paragraph", 72.0, 500.0, 12.0),
        ]))
        .build()
}

async fn run_with_workers(input: &[u8], worker_count: usize) -> Vec<u8> {
    crate::common::init_logging();
    let config = Config {
        source_language: "en".to_string(),
        target_language: "fr".to_string(),
        worker_count,
        output_mode: OutputMode::Mono,
        ..Config::default()
    };
    let pipeline = Pipeline::new(
        config,
        Arc::new(HeuristicDetector::new()),
        Arc::new(MockProvider::working()),
        Arc::new(TranslationCache::in_memory(false).unwrap()),
    )
    .unwrap();
    let output = pipeline.run(input).await.unwrap();
    output.mono.expect("mono artifact")
}

#[tokio::test]
async fn test_run_withDifferentWorkerCounts_shouldProduceIdenticalBytes() {
    let input = input();
    let serial = run_with_workers(&input, 1).await;
    let concurrent = run_with_workers(&input, 8).await;
    assert_eq!(serial, concurrent);
}

#[tokio::test]
async fn test_run_repeatedly_shouldBeReproducible() {
    let input = input();
    let first = run_with_workers(&input, 4).await;
    let second = run_with_workers(&input, 4).await;
    assert_eq!(first, second);
}
