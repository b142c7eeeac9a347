use std::sync::Arc;

use pdflate::errors::ProviderError;
use pdflate::providers::{MockProvider, Provider, TranslationRequest};

fn request(text: &str) -> TranslationRequest {
    TranslationRequest {
        text: text.to_string(),
        source_language: "en".to_string(),
        target_language: "fr".to_string(),
        context_before: None,
        context_after: None,
    }
}

#[tokio::test]
async fn test_mock_lexicon_shouldOverrideDefaultTranslation() {
    let provider = MockProvider::working()
        .with_translation("Hello", "Bonjour")
        .with_translation("World", "Monde");

    let response = provider.complete(&request("Hello")).await.unwrap();
    assert_eq!(response.text, "Bonjour");
    let response = provider.complete(&request("Unknown")).await.unwrap();
    assert_eq!(response.text, "[fr] Unknown");
}

#[tokio::test]
async fn test_mock_request_count_shouldBeSharedAcrossClones() {
    let provider = MockProvider::working();
    let observer = provider.clone();
    provider.complete(&request("a")).await.unwrap();
    provider.complete(&request("b")).await.unwrap();
    assert_eq!(observer.request_count(), 2);
}

#[tokio::test]
async fn test_mock_fail_first_shouldRecoverAfterNFailures() {
    let provider = MockProvider::fail_first(2);
    assert!(provider.complete(&request("a")).await.is_err());
    assert!(provider.complete(&request("a")).await.is_err());
    assert!(provider.complete(&request("a")).await.is_ok());
}

#[tokio::test]
async fn test_mock_test_connection_shouldReflectBehavior() {
    assert!(MockProvider::working().test_connection().await.is_ok());
    let err = MockProvider::failing().test_connection().await.unwrap_err();
    assert!(matches!(err, ProviderError::AuthenticationError(_)));
}

#[tokio::test(start_paused = true)]
async fn test_mock_slow_shouldDelayResponses() {
    let provider = MockProvider::slow(500);
    let start = tokio::time::Instant::now();
    provider.complete(&request("a")).await.unwrap();
    assert!(start.elapsed() >= std::time::Duration::from_millis(500));
}

#[tokio::test]
async fn test_provider_trait_shouldBeObjectSafe() {
    let provider: Arc<dyn Provider> = Arc::new(MockProvider::working());
    assert_eq!(provider.name(), "mock");
    let response = provider.complete(&request("Hello")).await.unwrap();
    assert_eq!(response.text, "[fr] Hello");
}
